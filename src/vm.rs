use std::io::{self, BufRead, Write};

use crate::bytecode::{Opcode, Program};
use crate::runtime::{NativeRef, Runtime};
use crate::runtime_error::RuntimeError;

/// A runtime value on the operand stack.
///
/// Values are copied by value on push and pop; equality is structural and
/// no value carries identity beyond its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    /// A bytecode offset denoting a compiled function entry point, or a
    /// return address pushed by CALL.
    Addr(usize),
    /// Reference into the native function registry.
    Native(NativeRef),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Addr(_) => "address",
            Value::Native(_) => "native function",
        }
    }
}

/// The stack machine.
///
/// One instance exclusively owns its program counter, its operand stack,
/// and the instruction stream it executes. The stack doubles as expression
/// scratch space, argument-passing area, and return-address storage; there
/// is no separate call stack.
pub struct Vm<'r> {
    program: Program,
    runtime: &'r Runtime,
    stack: Vec<Value>,
    pc: usize,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl<'r> Vm<'r> {
    /// A machine wired to the process's standard input and output.
    pub fn new(program: Program, runtime: &'r Runtime) -> Self {
        Vm::with_io(
            program,
            runtime,
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    pub fn with_io(
        program: Program,
        runtime: &'r Runtime,
        input: Box<dyn BufRead>,
        output: Box<dyn Write>,
    ) -> Self {
        Vm {
            program,
            runtime,
            stack: Vec::new(),
            pc: 0,
            input,
            output,
        }
    }

    /// The fetch-decode-execute loop. Runs from the current counter until
    /// STOP; a runtime error aborts the run and leaves the machine state
    /// as-is for inspection.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let op = self.program.opcode(&mut self.pc)?;
            match op {
                Opcode::PushInt => {
                    let v = self.read::<i64>()?;
                    self.stack.push(Value::Int(v));
                }
                Opcode::PushBool => {
                    let v = self.read::<bool>()?;
                    self.stack.push(Value::Bool(v));
                }
                Opcode::PushString => {
                    return Err(RuntimeError::new("PUSH_STRING is not supported"));
                }
                Opcode::PushFunc => {
                    let addr = self.read::<u64>()?;
                    self.stack.push(Value::Addr(addr as usize));
                }
                Opcode::PushProto => {
                    let idx = self.read::<u32>()?;
                    self.stack.push(Value::Native(NativeRef(idx)));
                }
                Opcode::Peek => {
                    let count = self.read::<u32>()? as usize;
                    let idx = self
                        .stack
                        .len()
                        .checked_sub(count + 1)
                        .ok_or_else(RuntimeError::stack_underflow)?;
                    self.stack.push(self.stack[idx].clone());
                }
                Opcode::Pop => {
                    self.pop()?;
                }
                Opcode::Call => self.call()?,
                Opcode::Ret => {
                    let depth = self.read::<u32>()?;
                    let nargs = self.read::<u32>()?;
                    self.ret(depth, nargs)?;
                }
                Opcode::Jump => {
                    self.pc = self.read::<u64>()? as usize;
                }
                Opcode::JumpFalse => {
                    let cond = self.pop_bool()?;
                    let addr = self.read::<u64>()? as usize;
                    if !cond {
                        self.pc = addr;
                    }
                }
                Opcode::Add => self.binary_int(i64::wrapping_add)?,
                Opcode::Sub => self.binary_int(i64::wrapping_sub)?,
                Opcode::Mul => self.binary_int(i64::wrapping_mul)?,
                Opcode::Div => {
                    let rhs = self.pop_int()?;
                    let lhs = self.pop_int()?;
                    if rhs == 0 {
                        return Err(RuntimeError::division_by_zero());
                    }
                    self.stack.push(Value::Int(lhs.wrapping_div(rhs)));
                }
                Opcode::Mod => {
                    let rhs = self.pop_int()?;
                    let lhs = self.pop_int()?;
                    if rhs == 0 {
                        return Err(RuntimeError::modulo_by_zero());
                    }
                    self.stack.push(Value::Int(lhs.wrapping_rem(rhs)));
                }
                Opcode::Eq => self.compare_int(|lhs, rhs| lhs == rhs)?,
                Opcode::Neq => self.compare_int(|lhs, rhs| lhs != rhs)?,
                Opcode::Le => self.compare_int(|lhs, rhs| lhs < rhs)?,
                Opcode::Gr => self.compare_int(|lhs, rhs| lhs > rhs)?,
                Opcode::Leq => self.compare_int(|lhs, rhs| lhs <= rhs)?,
                Opcode::Greq => self.compare_int(|lhs, rhs| lhs >= rhs)?,
                Opcode::Neg => {
                    let v = self.pop_int()?;
                    self.stack.push(Value::Int(v.wrapping_neg()));
                }
                Opcode::Not => {
                    let v = self.pop_bool()?;
                    self.stack.push(Value::Bool(!v));
                }
                Opcode::Stop => return Ok(()),
            }
        }
    }

    /// CALL: pops the callee and dispatches on its kind.
    ///
    /// A native function runs synchronously on the shared stack and the
    /// counter is untouched. An address callee pushes the current counter
    /// as the return address and transfers control; the pushed address
    /// marks the frame boundary for the matching RET.
    fn call(&mut self) -> Result<(), RuntimeError> {
        let callee = self.pop()?;
        match callee {
            Value::Native(native) => {
                let f = self.runtime.get(native)?;
                f(self)
            }
            Value::Addr(target) => {
                self.stack.push(Value::Addr(self.pc));
                self.pc = target;
                Ok(())
            }
            other => Err(RuntimeError::new(&format!(
                "cannot call {}",
                other.kind_name()
            ))),
        }
    }

    /// RET: pops the return value, drops `depth` callee slots, restores the
    /// counter from the return address, drops `nargs` caller-supplied
    /// argument slots, and pushes the return value back.
    ///
    /// `depth` and `nargs` are fixed per call site by the bytecode producer
    /// and are not validated against the actual stack contents.
    fn ret(&mut self, depth: u32, nargs: u32) -> Result<(), RuntimeError> {
        let value = self.pop()?;
        self.drop_slots(depth as usize)?;
        self.pc = self.pop_addr()?;
        self.drop_slots(nargs as usize)?;
        self.stack.push(value);
        Ok(())
    }

    fn read<T: crate::bytecode::Operand>(&mut self) -> Result<T, RuntimeError> {
        self.program.read(&mut self.pc)
    }

    fn drop_slots(&mut self, n: usize) -> Result<(), RuntimeError> {
        let len = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or_else(RuntimeError::stack_underflow)?;
        self.stack.truncate(len);
        Ok(())
    }

    fn binary_int(&mut self, f: impl Fn(i64, i64) -> i64) -> Result<(), RuntimeError> {
        let rhs = self.pop_int()?;
        let lhs = self.pop_int()?;
        self.stack.push(Value::Int(f(lhs, rhs)));
        Ok(())
    }

    fn compare_int(&mut self, f: impl Fn(i64, i64) -> bool) -> Result<(), RuntimeError> {
        let rhs = self.pop_int()?;
        let lhs = self.pop_int()?;
        self.stack.push(Value::Bool(f(lhs, rhs)));
        Ok(())
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(RuntimeError::stack_underflow)
    }

    pub fn peek(&self) -> Result<&Value, RuntimeError> {
        self.stack.last().ok_or_else(RuntimeError::stack_underflow)
    }

    pub fn pop_int(&mut self) -> Result<i64, RuntimeError> {
        match self.pop()? {
            Value::Int(v) => Ok(v),
            other => Err(RuntimeError::type_mismatch("integer", other.kind_name())),
        }
    }

    pub fn pop_bool(&mut self) -> Result<bool, RuntimeError> {
        match self.pop()? {
            Value::Bool(v) => Ok(v),
            other => Err(RuntimeError::type_mismatch("boolean", other.kind_name())),
        }
    }

    fn pop_addr(&mut self) -> Result<usize, RuntimeError> {
        match self.pop()? {
            Value::Addr(v) => Ok(v),
            other => Err(RuntimeError::type_mismatch(
                "return address",
                other.kind_name(),
            )),
        }
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn input(&mut self) -> &mut dyn BufRead {
        &mut *self.input
    }

    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Writer;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_ok(program: Program) -> Vec<Value> {
        let runtime = Runtime::new();
        let mut vm = Vm::with_io(
            program,
            &runtime,
            Box::new(io::empty()),
            Box::new(io::sink()),
        );
        vm.run().unwrap();
        vm.stack().to_vec()
    }

    fn run_err(program: Program) -> RuntimeError {
        let runtime = Runtime::new();
        let mut vm = Vm::with_io(
            program,
            &runtime,
            Box::new(io::empty()),
            Box::new(io::sink()),
        );
        vm.run().unwrap_err()
    }

    #[test]
    fn test_add_two_literals() {
        let mut w = Writer::new();
        w.push_int(3).push_int(4).add().stop();
        assert_eq!(run_ok(w.finish()), vec![Value::Int(7)]);
    }

    #[test]
    fn test_sub_operand_order() {
        let mut w = Writer::new();
        w.push_int(10).push_int(3).sub().stop();
        assert_eq!(run_ok(w.finish()), vec![Value::Int(7)]);
    }

    #[test]
    fn test_arithmetic_wraps_on_overflow() {
        let mut w = Writer::new();
        w.push_int(i64::MAX).push_int(1).add().stop();
        assert_eq!(run_ok(w.finish()), vec![Value::Int(i64::MIN)]);
    }

    #[test]
    fn test_division() {
        let mut w = Writer::new();
        w.push_int(7).push_int(2).div().stop();
        assert_eq!(run_ok(w.finish()), vec![Value::Int(3)]);
    }

    #[test]
    fn test_division_by_zero() {
        let mut w = Writer::new();
        w.push_int(1).push_int(0).div().stop();
        assert_eq!(run_err(w.finish()).message, "division by zero");
    }

    #[test]
    fn test_modulo_by_zero() {
        let mut w = Writer::new();
        w.push_int(1).push_int(0).modulo().stop();
        assert_eq!(run_err(w.finish()).message, "modulo by zero");
    }

    #[test]
    fn test_comparisons_push_bool() {
        let mut w = Writer::new();
        w.push_int(1).push_int(2).le().stop();
        assert_eq!(run_ok(w.finish()), vec![Value::Bool(true)]);

        let mut w = Writer::new();
        w.push_int(1).push_int(2).greq().stop();
        assert_eq!(run_ok(w.finish()), vec![Value::Bool(false)]);
    }

    #[test]
    fn test_neg_and_not() {
        let mut w = Writer::new();
        w.push_int(5).neg().push_bool(false).not().stop();
        assert_eq!(run_ok(w.finish()), vec![Value::Int(-5), Value::Bool(true)]);
    }

    #[test]
    fn test_peek_copies_slot_below_top() {
        let mut w = Writer::new();
        w.push_int(10).push_int(20).push_int(30).peek(2).stop();
        assert_eq!(
            run_ok(w.finish()),
            vec![
                Value::Int(10),
                Value::Int(20),
                Value::Int(30),
                Value::Int(10),
            ]
        );
    }

    #[test]
    fn test_pop_discards_top() {
        let mut w = Writer::new();
        w.push_int(1).push_int(2).pop().stop();
        assert_eq!(run_ok(w.finish()), vec![Value::Int(1)]);
    }

    #[test]
    fn test_jump_false_takes_branch() {
        // PUSH_BOOL false; JUMP_FALSE L; PUSH_INT 1; JUMP end; L: PUSH_INT 2; end: STOP
        let mut w = Writer::new();
        w.push_bool(false);
        w.jump_false(0);
        let else_slot = w.position() - 8;
        w.push_int(1);
        w.jump(0);
        let end_slot = w.position() - 8;
        let else_addr = w.position();
        w.push_int(2);
        let end_addr = w.position();
        w.stop();
        w.patch_addr(else_slot, else_addr);
        w.patch_addr(end_slot, end_addr);

        assert_eq!(run_ok(w.finish()), vec![Value::Int(2)]);
    }

    #[test]
    fn test_jump_false_falls_through_on_true() {
        let mut w = Writer::new();
        w.push_bool(true);
        w.jump_false(0);
        let else_slot = w.position() - 8;
        w.push_int(1);
        w.jump(0);
        let end_slot = w.position() - 8;
        let else_addr = w.position();
        w.push_int(2);
        let end_addr = w.position();
        w.stop();
        w.patch_addr(else_slot, else_addr);
        w.patch_addr(end_slot, end_addr);

        assert_eq!(run_ok(w.finish()), vec![Value::Int(1)]);
    }

    #[test]
    fn test_jump_false_requires_bool_condition() {
        let mut w = Writer::new();
        w.push_int(1).jump_false(0).stop();
        assert_eq!(run_err(w.finish()).message, "expected boolean, got integer");
    }

    #[test]
    fn test_call_and_ret_round_trip() {
        // Two-argument function summing its arguments. The caller pushes the
        // arguments, then the entry address, then CALL; RET replaces the
        // arguments and callee reference with the single result.
        let mut w = Writer::new();
        w.jump(0);
        let main_slot = w.position() - 8;
        let func_addr = w.position();
        w.peek(2).peek(2).add().ret(0, 2);
        let main_addr = w.position();
        w.push_int(4).push_int(5).push_func(func_addr).call();
        w.push_int(100).stop();
        w.patch_addr(main_slot, main_addr);

        // The instruction after CALL runs, so the counter was restored.
        assert_eq!(run_ok(w.finish()), vec![Value::Int(9), Value::Int(100)]);
    }

    #[test]
    fn test_ret_drops_callee_locals() {
        // The callee accumulates two scratch values before returning;
        // depth=2 discards them.
        let mut w = Writer::new();
        w.jump(0);
        let main_slot = w.position() - 8;
        let func_addr = w.position();
        w.push_int(7).push_int(8).push_int(42).ret(2, 1);
        let main_addr = w.position();
        w.push_int(1).push_func(func_addr).call().stop();
        w.patch_addr(main_slot, main_addr);

        assert_eq!(run_ok(w.finish()), vec![Value::Int(42)]);
    }

    #[test]
    fn test_nested_calls() {
        // inner(a) = a * 2, outer(a) = inner(a) + 1, main pushes 10.
        let mut w = Writer::new();
        w.jump(0);
        let main_slot = w.position() - 8;

        let inner_addr = w.position();
        w.peek(1).push_int(2).mul().ret(0, 1);

        let outer_addr = w.position();
        w.peek(1).push_func(inner_addr).call();
        w.push_int(1).add().ret(0, 1);

        let main_addr = w.position();
        w.push_int(10).push_func(outer_addr).call().stop();
        w.patch_addr(main_slot, main_addr);

        assert_eq!(run_ok(w.finish()), vec![Value::Int(21)]);
    }

    #[test]
    fn test_call_on_integer_fails() {
        let mut w = Writer::new();
        w.push_int(5).call().stop();
        assert_eq!(run_err(w.finish()).message, "cannot call integer");
    }

    #[test]
    fn test_call_on_boolean_fails() {
        let mut w = Writer::new();
        w.push_bool(true).call().stop();
        assert_eq!(run_err(w.finish()).message, "cannot call boolean");
    }

    #[test]
    fn test_push_string_is_fatal() {
        let mut w = Writer::new();
        w.push_string().stop();
        assert_eq!(run_err(w.finish()).message, "PUSH_STRING is not supported");
    }

    #[test]
    fn test_stack_underflow_on_add() {
        let mut w = Writer::new();
        w.push_int(1).add().stop();
        assert_eq!(run_err(w.finish()).message, "stack underflow");
    }

    #[test]
    fn test_running_off_the_stream_fails() {
        let mut w = Writer::new();
        w.push_int(1);
        assert_eq!(run_err(w.finish()).message, "unexpected end of bytecode");
    }

    #[test]
    fn test_print_int_writes_and_leaves_value() {
        let runtime = Runtime::new();
        let print_int = runtime.lookup("print_int").unwrap();

        let mut w = Writer::new();
        w.push_int(5).push_proto(print_int).call().stop();

        let out = SharedBuf::default();
        let mut vm = Vm::with_io(
            w.finish(),
            &runtime,
            Box::new(io::empty()),
            Box::new(out.clone()),
        );
        vm.run().unwrap();

        assert_eq!(out.contents(), "5");
        assert_eq!(vm.stack(), &[Value::Int(5)]);
    }

    #[test]
    fn test_print_bool_renders_keywords() {
        let runtime = Runtime::new();
        let print_bool = runtime.lookup("print_bool").unwrap();

        let mut w = Writer::new();
        w.push_bool(false).push_proto(print_bool).call().stop();

        let out = SharedBuf::default();
        let mut vm = Vm::with_io(
            w.finish(),
            &runtime,
            Box::new(io::empty()),
            Box::new(out.clone()),
        );
        vm.run().unwrap();

        assert_eq!(out.contents(), "false");
        assert_eq!(vm.stack(), &[Value::Bool(false)]);
    }

    #[test]
    fn test_read_int_pushes_parsed_value() {
        let runtime = Runtime::new();
        let read_int = runtime.lookup("read_int").unwrap();

        let mut w = Writer::new();
        w.push_proto(read_int).call().stop();

        let mut vm = Vm::with_io(
            w.finish(),
            &runtime,
            Box::new(io::Cursor::new(b"-42\n".to_vec())),
            Box::new(io::sink()),
        );
        vm.run().unwrap();

        assert_eq!(vm.stack(), &[Value::Int(-42)]);
    }

    #[test]
    fn test_read_int_rejects_garbage() {
        let runtime = Runtime::new();
        let read_int = runtime.lookup("read_int").unwrap();

        let mut w = Writer::new();
        w.push_proto(read_int).call().stop();

        let mut vm = Vm::with_io(
            w.finish(),
            &runtime,
            Box::new(io::Cursor::new(b"abc\n".to_vec())),
            Box::new(io::sink()),
        );
        let err = vm.run().unwrap_err();
        assert_eq!(err.message, "invalid integer input \"abc\"");
    }

    #[test]
    fn test_native_call_leaves_counter_unchanged() {
        let runtime = Runtime::new();
        let print_int = runtime.lookup("print_int").unwrap();

        // The instructions after CALL execute in sequence, so the native
        // call created no return frame.
        let mut w = Writer::new();
        w.push_int(1).push_proto(print_int).call();
        w.push_int(2).add().stop();

        let mut vm = Vm::with_io(
            w.finish(),
            &runtime,
            Box::new(io::empty()),
            Box::new(io::sink()),
        );
        vm.run().unwrap();
        assert_eq!(vm.stack(), &[Value::Int(3)]);
    }

    #[test]
    fn test_unknown_native_ref_fails() {
        let mut w = Writer::new();
        w.push_proto(NativeRef(99)).call().stop();
        assert_eq!(run_err(w.finish()).message, "unknown native function #99");
    }

    #[test]
    fn test_while_loop_counts_down() {
        // let n = 3; while (n > 0) n = n - 1  -- expressed directly in
        // bytecode, leaving the final counter value on the stack.
        let mut w = Writer::new();
        w.push_int(3);
        let loop_addr = w.position();
        w.peek(0).push_int(0).gr();
        w.jump_false(0);
        let exit_slot = w.position() - 8;
        w.push_int(1).sub();
        w.jump(loop_addr);
        let exit_addr = w.position();
        w.stop();
        w.patch_addr(exit_slot, exit_addr);

        assert_eq!(run_ok(w.finish()), vec![Value::Int(0)]);
    }
}
