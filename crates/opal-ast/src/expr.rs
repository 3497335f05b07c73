//! Expressions and patterns.
//!
//! Expression nodes are plain owned trees. Every node carries a source span
//! and a `ty` slot that the type checker fills; the checker treats the rest
//! of the node as read-only.

use opal_common::{DeclId, Span};
use opal_types::{PrimTy, Ty};

/// An expression with its source span and inference slot.
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<Ty>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: None,
        }
    }
}

/// Expression shapes.
#[derive(Debug)]
pub enum ExprKind {
    /// Integer literal; a suffix pins the type, otherwise it defaults during
    /// inference.
    Int { value: u64, suffix: Option<PrimTy> },
    /// Float literal; same defaulting story as integers.
    Float { value: f64, suffix: Option<PrimTy> },
    Bool(bool),
    Str(String),
    Unit,
    /// A resolved reference to a declaration.
    Var(DeclId),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Lambda {
        params: Vec<DeclId>,
        body: Box<Expr>,
    },
    /// A local binding; evaluates to unit. The bound declaration lives in
    /// the arena, the initializer here.
    Let {
        decl: DeclId,
        value: Box<Expr>,
    },
    /// Assignment to a mutable location; evaluates to unit.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// A sequence of expressions; the value is the last one's.
    Block(Vec<Expr>),
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Option<Box<Expr>>,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    /// Record field access `base.field`.
    Field {
        base: Box<Expr>,
        field: String,
    },
    /// Tuple literal, or record literal when `names` is present.
    Tuple {
        fields: Vec<Expr>,
        names: Option<Vec<String>>,
    },
    /// Type ascription `expr : ty`, already resolved to a type.
    Ascribe {
        expr: Box<Expr>,
        ascribed: Ty,
    },
    /// Construction of a data type variant.
    Ctor {
        data: DeclId,
        variant: usize,
        args: Vec<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Operators whose operands and result share one numeric type.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }

    /// Operators producing `Bool` from two operands of one type.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    /// Operators over `Bool` operands.
    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        };
        write!(f, "{s}")
    }
}

/// One arm of a match expression.
#[derive(Debug)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Expr,
}

/// A pattern with its source span and inference slot.
#[derive(Debug)]
pub struct Pattern {
    pub kind: PatKind,
    pub span: Span,
    pub ty: Option<Ty>,
}

impl Pattern {
    pub fn new(kind: PatKind, span: Span) -> Self {
        Pattern {
            kind,
            span,
            ty: None,
        }
    }
}

/// Pattern shapes.
#[derive(Debug)]
pub enum PatKind {
    /// Binds the scrutinee to a declaration.
    Bind(DeclId),
    Wildcard,
    Int(u64),
    Bool(bool),
    Str(String),
    Unit,
    Tuple(Vec<Pattern>),
    /// Matches one variant of a data type.
    Ctor {
        data: DeclId,
        variant: usize,
        args: Vec<Pattern>,
    },
}
