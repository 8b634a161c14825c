use std::fmt;

/// Instruction opcodes.
///
/// Every instruction is one opcode byte followed by that opcode's fixed
/// operand layout:
///
/// | Opcode      | Operands          |
/// |-------------|-------------------|
/// | PUSH_INT    | i64               |
/// | PUSH_BOOL   | bool (1 byte)     |
/// | PUSH_STRING | reserved          |
/// | PUSH_FUNC   | address (u64)     |
/// | PUSH_PROTO  | native ref (u32)  |
/// | PEEK        | count (u32)       |
/// | RET         | depth, nargs (u32 each) |
/// | JUMP        | address (u64)     |
/// | JUMP_FALSE  | address (u64)     |
/// | others      | none              |
///
/// Multi-byte operands are little-endian. Addresses are absolute byte
/// offsets into the instruction stream.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    PushInt = 0,
    PushBool,
    PushString,
    PushFunc,
    PushProto,
    Peek,
    Pop,
    Call,
    Ret,
    Jump,
    JumpFalse,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Le,
    Gr,
    Leq,
    Greq,
    Neg,
    Not,
    Stop,
}

impl Opcode {
    // Indexed by discriminant; the discriminants are dense from 0.
    const ALL: [Opcode; 25] = [
        Opcode::PushInt,
        Opcode::PushBool,
        Opcode::PushString,
        Opcode::PushFunc,
        Opcode::PushProto,
        Opcode::Peek,
        Opcode::Pop,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Jump,
        Opcode::JumpFalse,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Eq,
        Opcode::Neq,
        Opcode::Le,
        Opcode::Gr,
        Opcode::Leq,
        Opcode::Greq,
        Opcode::Neg,
        Opcode::Not,
        Opcode::Stop,
    ];

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Opcode::ALL.get(byte as usize).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::PushInt => "PUSH_INT",
            Opcode::PushBool => "PUSH_BOOL",
            Opcode::PushString => "PUSH_STRING",
            Opcode::PushFunc => "PUSH_FUNC",
            Opcode::PushProto => "PUSH_PROTO",
            Opcode::Peek => "PEEK",
            Opcode::Pop => "POP",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Jump => "JUMP",
            Opcode::JumpFalse => "JUMP_FALSE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::Le => "LE",
            Opcode::Gr => "GR",
            Opcode::Leq => "LEQ",
            Opcode::Greq => "GREQ",
            Opcode::Neg => "NEG",
            Opcode::Not => "NOT",
            Opcode::Stop => "STOP",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
