//! AST node shapes (§3), split into `Expr` and `Stmt` rather than one flat
//! tagged node: the code generator's l-value/r-value distinction, and the
//! type resolver's by-node-kind table, both read more directly against two
//! enums than against a single variant-with-many-optional-fields node.

use crate::env::{Env, Var};
use cmini_util::Span;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Num(i64),
    VarRef(Rc<Var>),
    /// Index into the program's global string table.
    StringLit(u32),
    Addr(Box<Expr>),
    Deref(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Assign(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// True for the only two node shapes the grammar allows as the left side of
/// `=` or the operand of `&` (§4.4's l-value generation).
pub fn is_lvalue(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::VarRef(_) | ExprKind::Deref(_))
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Expr(Expr),
    /// A statement with no effect: a bare `type ident;` declaration, whose
    /// only observable effect already happened as an `Env` side effect
    /// during parsing.
    Null,
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    For(Option<Expr>, Option<Expr>, Option<Expr>, Box<Stmt>),
    Return(Expr),
    Block(Vec<Stmt>),
}

pub struct Function {
    pub name: String,
    pub env: Env,
    pub params: Vec<Rc<Var>>,
    pub body: Stmt,
}

pub struct Program {
    pub functions: Vec<Function>,
    pub globals: Env,
    /// Unique string literal texts in first-use order; `ExprKind::StringLit`
    /// indexes into this, and the code generator emits one `.rodata` entry
    /// per slot.
    pub strings: Vec<String>,
}
