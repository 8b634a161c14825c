//! A small imperative language implementation.
//!
//! The front end is a streaming lexer with one token of lookahead and a
//! recursive-descent parser with precedence climbing, producing an AST.
//! The back end is a stack machine executing a flat, byte-addressable
//! instruction stream, with one shared operand stack serving expression
//! evaluation, argument passing, and return-address storage. Host-provided
//! native functions are invoked through the same calling convention as
//! compiled functions.

pub mod ast;
pub mod bytecode;
pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod runtime;
pub mod runtime_error;
pub mod token;
pub mod vm;

pub use ast::Module;
pub use bytecode::{Opcode, Program, Writer, disassemble};
pub use lexer::{Lexer, LexerError};
pub use parser::Parser;
pub use parser_error::{ParserError, SyntaxError};
pub use runtime::{NativeFn, NativeRef, Runtime};
pub use runtime_error::RuntimeError;
pub use token::{Location, Token, TokenKind};
pub use vm::{Value, Vm};
