/// An error raised while executing bytecode.
///
/// Runtime errors are fatal: the interpreter loop stops at the instruction
/// that raised the error and the machine state is left as-is for inspection.
#[derive(Debug, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.message)
    }
}

impl RuntimeError {
    pub fn new(msg: &str) -> Self {
        RuntimeError {
            message: msg.to_string(),
        }
    }

    pub fn stack_underflow() -> Self {
        RuntimeError::new("stack underflow")
    }

    pub fn division_by_zero() -> Self {
        RuntimeError::new("division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        RuntimeError::new("modulo by zero")
    }

    /// An operand of the wrong kind where `expected` was required.
    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        RuntimeError::new(&format!("expected {}, got {}", expected, got))
    }
}
