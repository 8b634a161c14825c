use std::fmt;

/// Source position attached to every token and every diagnostic.
///
/// `line` and `column` are 1-based. Diagnostics render locations as
/// `<source-name>:<line>:<column>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(name: &str, line: usize, column: usize) -> Self {
        Location {
            name: name.to_string(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Func,
    Return,
    While,
    Let,
    If,
    Else,
    True,
    False,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Colon,
    Semi,
    Comma,

    // Operators
    Eq,
    EqEq,
    Neq,
    Le,
    Leq,
    Gr,
    Greq,
    Bang,
    Plus,
    Incr,
    Minus,
    Decr,
    Star,
    Slash,
    Percent,

    // Literals
    Int(u64),
    Str(String),
    Ident(String),

    // End of input
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Func => write!(f, "func"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Let => write!(f, "let"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Semi => write!(f, ";"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Eq => write!(f, "="),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::Neq => write!(f, "!="),
            TokenKind::Le => write!(f, "<"),
            TokenKind::Leq => write!(f, "<="),
            TokenKind::Gr => write!(f, ">"),
            TokenKind::Greq => write!(f, ">="),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Incr => write!(f, "++"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Decr => write!(f, "--"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Int(n) => write!(f, "INT({})", n),
            TokenKind::Str(s) => write!(f, "STRING(\"{}\")", s),
            TokenKind::Ident(s) => write!(f, "IDENT({})", s),
            TokenKind::End => write!(f, "END"),
        }
    }
}

/// A classified, located unit of lexical input.
///
/// `String` payloads are owned, so cloning a token deep-copies its text; no
/// two tokens share string storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Location,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}
