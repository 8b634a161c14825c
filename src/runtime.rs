//! The native function registry: host-implemented primitives that bytecode
//! invokes through CALL on a reference pushed by PUSH_PROTO.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::runtime_error::RuntimeError;
use crate::vm::{Value, Vm};

/// A host-implemented function. It runs synchronously with full access to
/// the machine's operand stack and I/O; the program counter is untouched.
pub type NativeFn = fn(&mut Vm<'_>) -> Result<(), RuntimeError>;

/// Index into the registry, as carried by PUSH_PROTO operands and
/// `Value::Native`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeRef(pub u32);

/// An immutable table of native functions, assembled before any machine is
/// constructed and shared by reference with every machine that runs against
/// it.
///
/// There is no registry-enforced arity or calling convention: each native
/// documents its own stack contract, stating per argument whether it is
/// peeked (left in place) or popped (consumed) and how many results are
/// pushed.
pub struct Runtime {
    fns: Vec<(String, NativeFn)>,
}

impl Runtime {
    /// A registry with the standard natives registered: `print_int`,
    /// `print_bool`, and `read_int`.
    pub fn new() -> Self {
        let mut runtime = Runtime::empty();
        runtime.register("print_int", print_int);
        runtime.register("print_bool", print_bool);
        runtime.register("read_int", read_int);
        runtime
    }

    pub fn empty() -> Self {
        Runtime { fns: Vec::new() }
    }

    /// Adds a native under `name` and returns its reference. Registration
    /// order fixes reference values, so it must match whatever produced the
    /// bytecode.
    pub fn register(&mut self, name: &str, f: NativeFn) -> NativeRef {
        self.fns.push((name.to_string(), f));
        NativeRef((self.fns.len() - 1) as u32)
    }

    pub fn lookup(&self, name: &str) -> Option<NativeRef> {
        self.fns
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| NativeRef(i as u32))
    }

    pub fn name(&self, native: NativeRef) -> Option<&str> {
        self.fns.get(native.0 as usize).map(|(n, _)| n.as_str())
    }

    pub fn get(&self, native: NativeRef) -> Result<NativeFn, RuntimeError> {
        self.fns
            .get(native.0 as usize)
            .map(|(_, f)| *f)
            .ok_or_else(|| RuntimeError::new(&format!("unknown native function #{}", native.0)))
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

/// Stack contract: `( Int -- Int )`. Writes the decimal form of the top
/// value to the machine's output and leaves the value in place.
fn print_int(vm: &mut Vm<'_>) -> Result<(), RuntimeError> {
    let v = vm.pop_int()?;
    write!(vm.output(), "{}", v).map_err(write_failed)?;
    vm.push(Value::Int(v));
    Ok(())
}

/// Stack contract: `( Bool -- Bool )`. Writes `true` or `false` and leaves
/// the value in place.
fn print_bool(vm: &mut Vm<'_>) -> Result<(), RuntimeError> {
    let v = vm.pop_bool()?;
    let text = if v { "true" } else { "false" };
    write!(vm.output(), "{}", text).map_err(write_failed)?;
    vm.push(Value::Bool(v));
    Ok(())
}

/// Stack contract: `( -- Int )`. Blocks reading one line from the machine's
/// input and pushes it as a signed 64-bit integer.
fn read_int(vm: &mut Vm<'_>) -> Result<(), RuntimeError> {
    let mut line = String::new();
    vm.input()
        .read_line(&mut line)
        .map_err(|e| RuntimeError::new(&format!("read failed: {}", e)))?;
    let text = line.trim();
    let v: i64 = text
        .parse()
        .map_err(|_| RuntimeError::new(&format!("invalid integer input {:?}", text)))?;
    vm.push(Value::Int(v));
    Ok(())
}

fn write_failed(e: std::io::Error) -> RuntimeError {
    RuntimeError::new(&format!("write failed: {}", e))
}
