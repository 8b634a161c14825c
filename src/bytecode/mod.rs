//! The bytecode format: opcodes, the flat instruction stream, an assembler
//! for building streams by hand, and a disassembler.

pub mod disasm;
pub mod op;
pub mod program;

pub use disasm::disassemble;
pub use op::Opcode;
pub use program::{Operand, Program, Writer};
