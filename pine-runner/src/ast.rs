//! AST for the recognized Pine subset.
//!
//! Replaces ordered text rewriting with an explicit tree the host walks;
//! a rewrite can no longer corrupt another rewrite's preconditions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
}

/// Call argument; keyword form is `name=expr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

impl Arg {
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Na,
    Ident(String),
    Call { name: String, args: Vec<Arg> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// `series[k]` history shift or array element access.
    Index { target: Box<Expr>, index: Box<Expr> },
}

/// How a binding was introduced. `var`/`varip` initialize once; the engine
/// evaluates the script in a single whole-series pass, so per-bar
/// accumulation semantics are not preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindKind {
    Plain,
    Var,
    Varip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `indicator("t", ...)` / `strategy` / `library`: title binding only.
    Title(String),
    Let {
        kind: BindKind,
        name: String,
        value: Expr,
        line: usize,
    },
    /// `[a, b, c] = ta.bb(...)` / `ta.macd(...)`.
    Destructure {
        names: Vec<String>,
        call: Expr,
        line: usize,
    },
    Expr { expr: Expr, line: usize },
    /// Line comments survive translation as annotations.
    Comment(String),
    /// Outside the recognized subset; surfaces as a runtime diagnostic
    /// only when executed.
    Unsupported { line: usize, text: String },
}

/// Translator output: the intermediate executable form of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub version: u32,
    pub title: Option<String>,
    pub stmts: Vec<Stmt>,
}
