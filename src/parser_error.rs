use crate::lexer::LexerError;
use crate::token::Location;

/// A parsing error with source location.
///
/// The location is the offending token's, i.e. where the mismatch was
/// detected; parsing halts at the first error with no recovery.
#[derive(Debug)]
pub struct ParserError {
    pub message: String,
    pub loc: Location,
}

impl std::fmt::Display for ParserError {
    /// Formats as `[name:line:col] message` for CLI-friendly diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.loc, self.message)
    }
}

/// Terminal outcome of the front end: the first lexer or parser error wins
/// and aborts the whole parse.
#[derive(Debug)]
pub enum SyntaxError {
    Lexer(LexerError),
    Parser(ParserError),
}

impl SyntaxError {
    pub fn message(&self) -> &str {
        match self {
            SyntaxError::Lexer(e) => &e.message,
            SyntaxError::Parser(e) => &e.message,
        }
    }

    pub fn loc(&self) -> &Location {
        match self {
            SyntaxError::Lexer(e) => &e.loc,
            SyntaxError::Parser(e) => &e.loc,
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxError::Lexer(e) => write!(f, "{}", e),
            SyntaxError::Parser(e) => write!(f, "{}", e),
        }
    }
}

impl From<LexerError> for SyntaxError {
    fn from(err: LexerError) -> Self {
        SyntaxError::Lexer(err)
    }
}

impl From<ParserError> for SyntaxError {
    fn from(err: ParserError) -> Self {
        SyntaxError::Parser(err)
    }
}
