use serde::{Deserialize, Serialize};

use crate::bytecode::op::Opcode;
use crate::runtime::NativeRef;
use crate::runtime_error::RuntimeError;

/// A fixed-size instruction operand.
///
/// `decode` is only called with a slice of exactly `SIZE` bytes; `encode`
/// appends exactly `SIZE` bytes. Multi-byte operands are little-endian.
pub trait Operand: Sized {
    const SIZE: usize;

    fn decode(bytes: &[u8]) -> Self;
    fn encode(&self, out: &mut Vec<u8>);
}

impl Operand for i64 {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        i64::from_le_bytes(buf)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Operand for u64 {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        u64::from_le_bytes(buf)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Operand for u32 {
    const SIZE: usize = 4;

    fn decode(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        u32::from_le_bytes(buf)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Operand for bool {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

/// A compiled program: a flat, byte-addressable instruction stream.
///
/// Jump targets and function entry points are absolute byte offsets into
/// `code`, so the stream can be stored and reloaded without relocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<u8>,
}

impl Program {
    pub fn new(code: Vec<u8>) -> Self {
        Program { code }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Reads the opcode byte at `pc` and advances past it.
    pub fn opcode(&self, pc: &mut usize) -> Result<Opcode, RuntimeError> {
        let byte = *self
            .code
            .get(*pc)
            .ok_or_else(|| RuntimeError::new("unexpected end of bytecode"))?;
        let op = Opcode::from_byte(byte)
            .ok_or_else(|| RuntimeError::new(&format!("unknown opcode 0x{:02x}", byte)))?;
        *pc += 1;
        Ok(op)
    }

    /// Reads one typed operand at `pc` and advances past it.
    pub fn read<T: Operand>(&self, pc: &mut usize) -> Result<T, RuntimeError> {
        let bytes = self
            .code
            .get(*pc..*pc + T::SIZE)
            .ok_or_else(|| RuntimeError::new("unexpected end of bytecode"))?;
        let value = T::decode(bytes);
        *pc += T::SIZE;
        Ok(value)
    }

    pub fn to_bytes(&self) -> postcard::Result<Vec<u8>> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> postcard::Result<Self> {
        postcard::from_bytes(bytes)
    }
}

/// Incremental assembler for instruction streams.
///
/// Emitter methods append one whole instruction and return the writer for
/// chaining. A forward jump is emitted with a placeholder target; once the
/// destination offset is known, `patch_addr` overwrites the recorded
/// operand slot.
#[derive(Debug, Default)]
pub struct Writer {
    code: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { code: Vec::new() }
    }

    /// Offset at which the next instruction will be emitted.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    pub fn finish(self) -> Program {
        Program::new(self.code)
    }

    fn op(&mut self, op: Opcode) -> &mut Self {
        self.code.push(op as u8);
        self
    }

    fn operand<T: Operand>(&mut self, value: T) -> &mut Self {
        value.encode(&mut self.code);
        self
    }

    pub fn push_int(&mut self, value: i64) -> &mut Self {
        self.op(Opcode::PushInt).operand(value)
    }

    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.op(Opcode::PushBool).operand(value)
    }

    /// Reserved opcode; executing it is a fatal error.
    pub fn push_string(&mut self) -> &mut Self {
        self.op(Opcode::PushString)
    }

    pub fn push_func(&mut self, addr: usize) -> &mut Self {
        self.op(Opcode::PushFunc).operand(addr as u64)
    }

    pub fn push_proto(&mut self, native: NativeRef) -> &mut Self {
        self.op(Opcode::PushProto).operand(native.0)
    }

    pub fn peek(&mut self, count: u32) -> &mut Self {
        self.op(Opcode::Peek).operand(count)
    }

    pub fn pop(&mut self) -> &mut Self {
        self.op(Opcode::Pop)
    }

    pub fn call(&mut self) -> &mut Self {
        self.op(Opcode::Call)
    }

    pub fn ret(&mut self, depth: u32, nargs: u32) -> &mut Self {
        self.op(Opcode::Ret).operand(depth).operand(nargs)
    }

    pub fn jump(&mut self, addr: usize) -> &mut Self {
        self.op(Opcode::Jump).operand(addr as u64)
    }

    pub fn jump_false(&mut self, addr: usize) -> &mut Self {
        self.op(Opcode::JumpFalse).operand(addr as u64)
    }

    pub fn add(&mut self) -> &mut Self {
        self.op(Opcode::Add)
    }

    pub fn sub(&mut self) -> &mut Self {
        self.op(Opcode::Sub)
    }

    pub fn mul(&mut self) -> &mut Self {
        self.op(Opcode::Mul)
    }

    pub fn div(&mut self) -> &mut Self {
        self.op(Opcode::Div)
    }

    pub fn modulo(&mut self) -> &mut Self {
        self.op(Opcode::Mod)
    }

    pub fn eq(&mut self) -> &mut Self {
        self.op(Opcode::Eq)
    }

    pub fn neq(&mut self) -> &mut Self {
        self.op(Opcode::Neq)
    }

    pub fn le(&mut self) -> &mut Self {
        self.op(Opcode::Le)
    }

    pub fn gr(&mut self) -> &mut Self {
        self.op(Opcode::Gr)
    }

    pub fn leq(&mut self) -> &mut Self {
        self.op(Opcode::Leq)
    }

    pub fn greq(&mut self) -> &mut Self {
        self.op(Opcode::Greq)
    }

    pub fn neg(&mut self) -> &mut Self {
        self.op(Opcode::Neg)
    }

    pub fn not(&mut self) -> &mut Self {
        self.op(Opcode::Not)
    }

    pub fn stop(&mut self) -> &mut Self {
        self.op(Opcode::Stop)
    }

    /// Overwrites the 8-byte address operand at `at` with `target`.
    pub fn patch_addr(&mut self, at: usize, target: usize) {
        self.code[at..at + u64::SIZE].copy_from_slice(&(target as u64).to_le_bytes());
    }
}
