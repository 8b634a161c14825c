use crate::bytecode::op::Opcode;
use crate::bytecode::program::Program;
use crate::runtime_error::RuntimeError;

/// Returns the disassembly of a program, one instruction per line:
///
/// ```text
/// 0000  PUSH_INT    3
/// 0009  PUSH_INT    4
/// 0018  ADD
/// 0019  STOP
/// ```
///
/// Offsets and jump targets are absolute byte offsets. Decoding stops at
/// the first byte that is not a valid instruction, marked `??`.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    let mut pc = 0;

    while pc < program.len() {
        let at = pc;
        match format_instr(program, &mut pc) {
            Ok(line) => {
                out.push_str(&format!("{:04}  {}\n", at, line));
            }
            Err(_) => {
                out.push_str(&format!("{:04}  ??\n", at));
                break;
            }
        }
    }
    out
}

fn format_instr(program: &Program, pc: &mut usize) -> Result<String, RuntimeError> {
    let op = program.opcode(pc)?;
    let line = match op {
        Opcode::PushInt => format!("{:<12}{}", op.name(), program.read::<i64>(pc)?),
        Opcode::PushBool => format!("{:<12}{}", op.name(), program.read::<bool>(pc)?),
        Opcode::PushFunc | Opcode::Jump | Opcode::JumpFalse => {
            format!("{:<12}{:04}", op.name(), program.read::<u64>(pc)?)
        }
        Opcode::PushProto => format!("{:<12}#{}", op.name(), program.read::<u32>(pc)?),
        Opcode::Peek => format!("{:<12}{}", op.name(), program.read::<u32>(pc)?),
        Opcode::Ret => {
            let depth = program.read::<u32>(pc)?;
            let nargs = program.read::<u32>(pc)?;
            format!("{:<12}{} {}", op.name(), depth, nargs)
        }
        _ => op.name().to_string(),
    };
    Ok(line)
}
