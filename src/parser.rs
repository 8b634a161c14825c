use crate::ast::{BinOp, Expr, FuncDecl, Item, Module, ProtoDecl, Stmt, UnaryOp};
use crate::lexer::Lexer;
use crate::parser_error::{ParserError, SyntaxError};
use crate::token::{Token, TokenKind};

/// Recursive-descent parser with precedence climbing.
///
/// The parser pulls tokens from the lexer one at a time and produces a
/// `Module`. It never looks more than one token ahead and never backtracks:
/// each production consumes exactly the tokens it recognizes before
/// returning.
///
/// Precedence, lowest to highest:
/// equality (`==` `!=`) -> comparison (`<` `<=` `>` `>=`) -> add/sub ->
/// mul/div/mod -> unary (`!` `-`, prefix, right-associative) -> call ->
/// term. Binary levels are left-associative.
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Parser { lexer }
    }

    /// Parses a whole module: top-level items until end of input.
    pub fn parse_module(&mut self) -> Result<Module, SyntaxError> {
        let mut items = Vec::new();
        loop {
            match self.current().kind {
                TokenKind::End => break,
                TokenKind::Func => {
                    let item = self.parse_func_or_proto()?;
                    items.push(item);
                }
                // Separator left behind by a top-level `let`.
                TokenKind::Semi => {
                    self.advance()?;
                }
                _ => {
                    let stmt = self.parse_stmt()?;
                    items.push(Item::Stmt(stmt));
                }
            }
        }
        Ok(Module { items })
    }

    /// Parses a `func` declaration. The shared header is
    /// `func name(arg: type, ...): type`; an `=` with a string literal makes
    /// it a native prototype, a block makes it a compiled function.
    fn parse_func_or_proto(&mut self) -> Result<Item, SyntaxError> {
        self.check(&TokenKind::Func)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        self.advance()?; // past '('
        while self.current().kind != TokenKind::RParen {
            let arg = self.check_ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.expect_ident()?;
            args.push((arg, ty));

            self.advance()?; // past the type name
            if self.current().kind != TokenKind::Comma {
                break;
            }
            self.advance()?; // past ','
        }
        self.check(&TokenKind::RParen)?;

        self.expect(TokenKind::Colon)?;
        let ret = self.expect_ident()?;

        self.advance()?; // past the return type
        if self.current().kind == TokenKind::Eq {
            self.advance()?; // past '='
            let primitive = self.check_string()?;
            self.advance()?; // past the primitive name
            Ok(Item::Proto(ProtoDecl {
                name,
                args,
                ret,
                primitive,
            }))
        } else {
            let body = self.parse_block()?;
            Ok(Item::Func(FuncDecl {
                name,
                args,
                ret,
                body,
            }))
        }
    }

    /// Parses a single statement, dispatching on the current token.
    fn parse_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        match self.current().kind {
            TokenKind::Return => self.parse_return(),
            TokenKind::While => self.parse_while(),
            TokenKind::If => self.parse_if(),
            TokenKind::Let => self.parse_var_decl(),
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    /// Parses `{ stmt (; stmt)* [;] }` and returns the statements.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.check(&TokenKind::LBrace)?;

        let mut body = Vec::new();
        loop {
            self.advance()?; // past '{' or ';'
            if self.current().kind == TokenKind::RBrace {
                break;
            }
            body.push(self.parse_stmt()?);
            if self.current().kind != TokenKind::Semi {
                break;
            }
        }
        self.check(&TokenKind::RBrace)?;
        self.advance()?; // past '}'
        Ok(body)
    }

    /// `return expr`
    fn parse_return(&mut self) -> Result<Stmt, SyntaxError> {
        self.check(&TokenKind::Return)?;
        self.advance()?;
        let expr = self.parse_expr()?;
        Ok(Stmt::Return(expr))
    }

    /// `while (cond) stmt`
    fn parse_while(&mut self) -> Result<Stmt, SyntaxError> {
        self.check(&TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        self.advance()?;
        let cond = self.parse_expr()?;
        self.check(&TokenKind::RParen)?;
        self.advance()?;
        let body = self.parse_stmt()?;
        Ok(Stmt::While {
            cond,
            body: Box::new(body),
        })
    }

    /// `if (cond) stmt [else stmt]`
    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        self.check(&TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        self.advance()?;
        let cond = self.parse_expr()?;
        self.check(&TokenKind::RParen)?;
        self.advance()?;
        let then_stmt = self.parse_stmt()?;

        if self.current().kind != TokenKind::Else {
            return Ok(Stmt::If {
                cond,
                then_stmt: Box::new(then_stmt),
                else_stmt: None,
            });
        }
        self.advance()?; // past 'else'
        let else_stmt = self.parse_stmt()?;
        Ok(Stmt::If {
            cond,
            then_stmt: Box::new(then_stmt),
            else_stmt: Some(Box::new(else_stmt)),
        })
    }

    /// `let name: type = expr;` -- the terminating `;` is checked but left
    /// for the enclosing block or module loop to consume as a separator.
    fn parse_var_decl(&mut self) -> Result<Stmt, SyntaxError> {
        self.check(&TokenKind::Let)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.expect_ident()?;
        self.expect(TokenKind::Eq)?;
        self.advance()?;
        let init = self.parse_expr()?;
        self.check(&TokenKind::Semi)?;
        Ok(Stmt::VarDecl { name, ty, init })
    }

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.current().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::Neq => BinOp::Neq,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_add_sub()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Le => BinOp::Le,
                TokenKind::Leq => BinOp::Leq,
                TokenKind::Gr => BinOp::Gr,
                TokenKind::Greq => BinOp::Greq,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_add_sub()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_add_sub(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_mul_div()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_mul_div()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_mul_div(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// Prefix `!` and `-`, right-associative.
    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.current().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance()?; // consume the operator
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.parse_call(),
        }
    }

    /// Postfix argument list, applied at most once: `f()()` is not a call
    /// chain.
    fn parse_call(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.parse_term()?;
        if self.current().kind == TokenKind::LParen {
            return self.parse_args(expr);
        }
        Ok(expr)
    }

    fn parse_args(&mut self, callee: Expr) -> Result<Expr, SyntaxError> {
        let mut args = Vec::new();
        loop {
            self.advance()?; // past '(' or ','
            if self.current().kind == TokenKind::RParen {
                break;
            }
            args.push(self.parse_expr()?);
            if self.current().kind != TokenKind::Comma {
                break;
            }
        }
        self.check(&TokenKind::RParen)?;
        self.advance()?; // past ')'
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
        })
    }

    /// Literals, identifiers, and parenthesized sub-expressions.
    fn parse_term(&mut self) -> Result<Expr, SyntaxError> {
        let expr = match &self.current().kind {
            TokenKind::Int(n) => {
                let n = *n;
                self.advance()?;
                Expr::Int(n)
            }
            TokenKind::True => {
                self.advance()?;
                Expr::Bool(true)
            }
            TokenKind::False => {
                self.advance()?;
                Expr::Bool(false)
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance()?;
                Expr::Str(s)
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Expr::Ref(name)
            }
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.check(&TokenKind::RParen)?;
                self.advance()?;
                expr
            }
            _ => {
                return Err(self.error(&format!("unexpected {}, expecting term", self.current())));
            }
        };
        Ok(expr)
    }

    fn current(&self) -> &Token {
        self.lexer.current()
    }

    fn advance(&mut self) -> Result<(), SyntaxError> {
        self.lexer.advance()?;
        Ok(())
    }

    /// Requires the current token to be of the given kind.
    fn check(&self, kind: &TokenKind) -> Result<(), SyntaxError> {
        if &self.current().kind == kind {
            Ok(())
        } else {
            Err(self.error(&format!("unexpected {}, expecting {}", self.current(), kind)))
        }
    }

    /// Advances, then requires the new current token to be of the given kind.
    fn expect(&mut self, kind: TokenKind) -> Result<(), SyntaxError> {
        self.advance()?;
        self.check(&kind)
    }

    fn check_ident(&self) -> Result<String, SyntaxError> {
        match &self.current().kind {
            TokenKind::Ident(name) => Ok(name.clone()),
            _ => Err(self.error(&format!(
                "unexpected {}, expecting identifier",
                self.current()
            ))),
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        self.advance()?;
        self.check_ident()
    }

    fn check_string(&self) -> Result<String, SyntaxError> {
        match &self.current().kind {
            TokenKind::Str(s) => Ok(s.clone()),
            _ => Err(self.error(&format!(
                "unexpected {}, expecting string literal",
                self.current()
            ))),
        }
    }

    /// Constructs a parse error at the offending (current) token.
    fn error(&self, message: &str) -> SyntaxError {
        SyntaxError::Parser(ParserError {
            message: message.to_string(),
            loc: self.current().loc.clone(),
        })
    }
}
