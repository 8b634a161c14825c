use crate::token::{Location, Token, TokenKind};

#[derive(Debug)]
pub struct LexerError {
    pub message: String,
    pub loc: Location,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.loc, self.message)
    }
}

/// Streaming lexer with exactly one token of lookahead.
///
/// The lexer holds only the current token; `current()` is always valid
/// because construction primes the first token. `advance()` scans the next
/// one. There is no token buffer or history.
pub struct Lexer {
    name: String,
    source: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    token: Token,
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

fn is_ident_letter(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

impl Lexer {
    /// Creates a lexer over a named character source and primes the first
    /// token, so `current()` is valid immediately.
    pub fn new(name: &str, source: &str) -> Result<Self, LexerError> {
        let mut lexer = Lexer {
            name: name.to_string(),
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            token: Token {
                kind: TokenKind::End,
                loc: Location::new(name, 1, 1),
            },
        };
        lexer.advance()?;
        Ok(lexer)
    }

    /// The current (lookahead) token.
    pub fn current(&self) -> &Token {
        &self.token
    }

    fn chr(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chr();
        if ch == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
        ch
    }

    fn location(&self) -> Location {
        Location::new(&self.name, self.line, self.column)
    }

    /// Errors carry the location at the point of detection, not the start of
    /// the offending token.
    fn error(&self, message: &str) -> LexerError {
        LexerError {
            message: message.to_string(),
            loc: self.location(),
        }
    }

    /// Scans the next token, replacing the current one.
    pub fn advance(&mut self) -> Result<&Token, LexerError> {
        while matches!(self.chr(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }

        let loc = self.location();
        let kind = match self.chr() {
            None => TokenKind::End,
            Some('(') => {
                self.bump();
                TokenKind::LParen
            }
            Some(')') => {
                self.bump();
                TokenKind::RParen
            }
            Some('{') => {
                self.bump();
                TokenKind::LBrace
            }
            Some('}') => {
                self.bump();
                TokenKind::RBrace
            }
            Some(':') => {
                self.bump();
                TokenKind::Colon
            }
            Some(';') => {
                self.bump();
                TokenKind::Semi
            }
            Some(',') => {
                self.bump();
                TokenKind::Comma
            }
            Some('*') => {
                self.bump();
                TokenKind::Star
            }
            Some('/') => {
                self.bump();
                TokenKind::Slash
            }
            Some('%') => {
                self.bump();
                TokenKind::Percent
            }
            Some('=') => self.one_or_two('=', TokenKind::Eq, TokenKind::EqEq),
            Some('+') => self.one_or_two('+', TokenKind::Plus, TokenKind::Incr),
            Some('-') => self.one_or_two('-', TokenKind::Minus, TokenKind::Decr),
            Some('<') => self.one_or_two('=', TokenKind::Le, TokenKind::Leq),
            Some('>') => self.one_or_two('=', TokenKind::Gr, TokenKind::Greq),
            Some('!') => self.one_or_two('=', TokenKind::Bang, TokenKind::Neq),
            Some('"') => self.scan_string()?,
            Some(ch) if ch.is_ascii_digit() => self.scan_int()?,
            Some(ch) if is_ident_start(ch) => self.scan_ident(),
            Some(ch) => {
                return Err(self.error(&format!("unknown character '{}'", ch)));
            }
        };

        self.token = Token { kind, loc };
        Ok(&self.token)
    }

    /// Resolves a one- or two-character operator with a single character of
    /// peek: `single` unless the next character is `second`, then `double`.
    fn one_or_two(&mut self, second: char, single: TokenKind, double: TokenKind) -> TokenKind {
        self.bump();
        if self.chr() == Some(second) {
            self.bump();
            double
        } else {
            single
        }
    }

    fn scan_string(&mut self) -> Result<TokenKind, LexerError> {
        self.bump();

        let mut text = String::new();
        loop {
            match self.chr() {
                Some('"') => {
                    self.bump();
                    return Ok(TokenKind::Str(text));
                }
                Some('\\') => {
                    self.bump();
                    match self.chr() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('r') => text.push('\r'),
                        Some('\\') => text.push('\\'),
                        Some('"') => text.push('"'),
                        Some(ch) => {
                            return Err(self.error(&format!("unknown escape sequence: \\{}", ch)));
                        }
                        None => {
                            return Err(self.error("string not terminated"));
                        }
                    }
                    self.bump();
                }
                Some(ch) => {
                    text.push(ch);
                    self.bump();
                }
                None => {
                    return Err(self.error("string not terminated"));
                }
            }
        }
    }

    fn scan_int(&mut self) -> Result<TokenKind, LexerError> {
        let mut digits = String::new();
        while let Some(ch) = self.chr() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.bump();
            } else {
                break;
            }
        }

        // Digits are parsed directly into a u64; no lossy intermediate.
        let value: u64 = digits
            .parse()
            .map_err(|_| self.error("integer literal out of range"))?;
        Ok(TokenKind::Int(value))
    }

    fn scan_ident(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(ch) = self.chr() {
            if is_ident_letter(ch) {
                word.push(ch);
                self.bump();
            } else {
                break;
            }
        }

        match word.as_str() {
            "func" => TokenKind::Func,
            "return" => TokenKind::Return,
            "while" => TokenKind::While,
            "let" => TokenKind::Let,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Ident(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new("test", source).unwrap();
        let mut kinds = Vec::new();
        loop {
            let kind = lexer.current().kind.clone();
            let end = kind == TokenKind::End;
            kinds.push(kind);
            if end {
                break;
            }
            lexer.advance().unwrap();
        }
        kinds
    }

    fn lex_err(source: &str) -> LexerError {
        let mut lexer = Lexer::new("test", source);
        loop {
            match lexer {
                Err(e) => return e,
                Ok(ref mut lx) => {
                    if lx.current().kind == TokenKind::End {
                        panic!("expected a lexer error for {:?}", source);
                    }
                    if let Err(e) = lx.advance() {
                        return e;
                    }
                }
            }
        }
    }

    #[test]
    fn test_var_decl_tokens() {
        let t = tokens("let x: int = 1+2;");
        assert_eq!(
            t,
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".to_string()),
                TokenKind::Colon,
                TokenKind::Ident("int".to_string()),
                TokenKind::Eq,
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Int(2),
                TokenKind::Semi,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        let t = tokens("func return while let if else true false");
        assert_eq!(
            t,
            vec![
                TokenKind::Func,
                TokenKind::Return,
                TokenKind::While,
                TokenKind::Let,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::True,
                TokenKind::False,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_keyword_vs_ident() {
        let t = tokens("while whilex _if iff");
        assert_eq!(
            t,
            vec![
                TokenKind::While,
                TokenKind::Ident("whilex".to_string()),
                TokenKind::Ident("_if".to_string()),
                TokenKind::Ident("iff".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_single_vs_double_operators() {
        let t = tokens("= == + ++ - -- < <= > >= ! !=");
        assert_eq!(
            t,
            vec![
                TokenKind::Eq,
                TokenKind::EqEq,
                TokenKind::Plus,
                TokenKind::Incr,
                TokenKind::Minus,
                TokenKind::Decr,
                TokenKind::Le,
                TokenKind::Leq,
                TokenKind::Gr,
                TokenKind::Greq,
                TokenKind::Bang,
                TokenKind::Neq,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_adjacent_double_operators() {
        // No whitespace needed: '==' resolves by one character of peek.
        let t = tokens("1==2<=3");
        assert_eq!(
            t,
            vec![
                TokenKind::Int(1),
                TokenKind::EqEq,
                TokenKind::Int(2),
                TokenKind::Leq,
                TokenKind::Int(3),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        let t = tokens("( ) { } : ; , * / %");
        assert_eq!(
            t,
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Colon,
                TokenKind::Semi,
                TokenKind::Comma,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        let t = tokens(r#""hello world""#);
        assert_eq!(
            t,
            vec![
                TokenKind::Str("hello world".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let t = tokens(r#""a\nb\t\"c\"""#);
        assert_eq!(
            t,
            vec![TokenKind::Str("a\nb\t\"c\"".to_string()), TokenKind::End]
        );
    }

    #[test]
    fn test_unterminated_string_error_at_eof() {
        let err = lex_err("\"abc");
        assert_eq!(err.message, "string not terminated");
        // Detection happens at end-of-input, past the 4 consumed characters.
        assert_eq!(err.loc.line, 1);
        assert_eq!(err.loc.column, 5);
    }

    #[test]
    fn test_int_literal_out_of_range() {
        // One past u64::MAX.
        let err = lex_err("18446744073709551616");
        assert_eq!(err.message, "integer literal out of range");
    }

    #[test]
    fn test_max_int_literal() {
        let t = tokens("18446744073709551615");
        assert_eq!(t, vec![TokenKind::Int(u64::MAX), TokenKind::End]);
    }

    #[test]
    fn test_unknown_character() {
        let err = lex_err("let @");
        assert_eq!(err.message, "unknown character '@'");
        assert_eq!(err.loc.column, 5);
    }

    #[test]
    fn test_locations_track_lines_and_columns() {
        let mut lexer = Lexer::new("demo.imp", "let x\n  = 1").unwrap();

        assert_eq!(lexer.current().kind, TokenKind::Let);
        assert_eq!(lexer.current().loc, Location::new("demo.imp", 1, 1));

        lexer.advance().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Ident("x".to_string()));
        assert_eq!(lexer.current().loc, Location::new("demo.imp", 1, 5));

        lexer.advance().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Eq);
        assert_eq!(lexer.current().loc, Location::new("demo.imp", 2, 3));

        lexer.advance().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Int(1));
        assert_eq!(lexer.current().loc, Location::new("demo.imp", 2, 5));
    }

    #[test]
    fn test_end_is_sticky() {
        let mut lexer = Lexer::new("test", "").unwrap();
        assert_eq!(lexer.current().kind, TokenKind::End);
        lexer.advance().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::End);
    }

    #[test]
    fn test_error_format() {
        let err = lex_err("~");
        assert_eq!(format!("{}", err), "[test:1:1] unknown character '~'");
    }
}
