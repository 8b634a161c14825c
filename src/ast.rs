//! The abstract syntax tree produced by the parser.
//!
//! Nodes are immutable once built and exclusively owned by their parent; the
//! tree is constructed bottom-up and never mutated afterwards.

/// Unary operators: `!expr`, `-expr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Binary operators, named after their opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Neq,
    Le,
    Gr,
    Leq,
    Greq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal.
    Int(u64),
    /// Boolean literal (`true` | `false`).
    Bool(bool),
    /// String literal.
    Str(String),
    /// Reference to a named value.
    Ref(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Call with an ordered argument list. Calls are not chainable:
    /// the postfix `(args...)` applies at most once.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `{ stmt; ... }`
    Block(Vec<Stmt>),
    /// `while (cond) stmt`
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// `if (cond) stmt [else stmt]`
    If {
        cond: Expr,
        then_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
    },
    /// `return expr`
    Return(Expr),
    /// `let name: type = expr;`
    VarDecl {
        name: String,
        ty: String,
        init: Expr,
    },
    /// Bare expression statement.
    Expr(Expr),
}

/// Function declaration with a compiled body:
///
/// ```text
/// func name(arg: type, ...): type { ... }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    /// Ordered `(argument name, type name)` pairs.
    pub args: Vec<(String, String)>,
    pub ret: String,
    pub body: Vec<Stmt>,
}

/// Prototype declaration bound to a host-implemented primitive:
///
/// ```text
/// func name(arg: type, ...): type = "native-name"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoDecl {
    pub name: String,
    pub args: Vec<(String, String)>,
    pub ret: String,
    pub primitive: String,
}

/// A top-level construct.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Func(FuncDecl),
    Proto(ProtoDecl),
    Stmt(Stmt),
}

/// Root of a parse unit: an ordered sequence of top-level items.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub items: Vec<Item>,
}
