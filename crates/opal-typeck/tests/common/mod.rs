//! Shared AST-building helpers for the type checker's integration tests.
//!
//! The parser is a separate component, so tests construct the resolved AST
//! the way the parser would hand it over. Spans default to dummies; tests
//! that assert on rendered diagnostics pass real spans into a small source
//! string.
#![allow(dead_code)]

use opal_ast::{Decl, DeclKind, Expr, ExprKind, Module};
use opal_common::{DeclId, Span};
use opal_types::TypeCtx;
use opal_typeck::TypeckResult;

pub fn sp(start: u32, end: u32) -> Span {
    Span::new(start, end)
}

// ── Expressions ────────────────────────────────────────────────────────

pub fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::dummy())
}

pub fn expr_at(kind: ExprKind, span: Span) -> Expr {
    Expr::new(kind, span)
}

pub fn int(value: u64) -> Expr {
    expr(ExprKind::Int {
        value,
        suffix: None,
    })
}

pub fn int_at(value: u64, span: Span) -> Expr {
    expr_at(
        ExprKind::Int {
            value,
            suffix: None,
        },
        span,
    )
}

pub fn boolean(value: bool) -> Expr {
    expr(ExprKind::Bool(value))
}

pub fn boolean_at(value: bool, span: Span) -> Expr {
    expr_at(ExprKind::Bool(value), span)
}

pub fn str_lit(value: &str) -> Expr {
    expr(ExprKind::Str(value.into()))
}

pub fn unit() -> Expr {
    expr(ExprKind::Unit)
}

pub fn var(decl: DeclId) -> Expr {
    expr(ExprKind::Var(decl))
}

pub fn var_at(decl: DeclId, span: Span) -> Expr {
    expr_at(ExprKind::Var(decl), span)
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(callee),
        args,
    })
}

pub fn call_at(callee: Expr, args: Vec<Expr>, span: Span) -> Expr {
    expr_at(
        ExprKind::Call {
            callee: Box::new(callee),
            args,
        },
        span,
    )
}

pub fn lambda(params: Vec<DeclId>, body: Expr) -> Expr {
    expr(ExprKind::Lambda {
        params,
        body: Box::new(body),
    })
}

pub fn tuple(fields: Vec<Expr>) -> Expr {
    expr(ExprKind::Tuple {
        fields,
        names: None,
    })
}

pub fn record(fields: Vec<(&str, Expr)>) -> Expr {
    let (names, exprs): (Vec<_>, Vec<_>) = fields
        .into_iter()
        .map(|(n, e)| (n.to_string(), e))
        .unzip();
    expr(ExprKind::Tuple {
        fields: exprs,
        names: Some(names),
    })
}

pub fn field(base: Expr, name: &str) -> Expr {
    expr(ExprKind::Field {
        base: Box::new(base),
        field: name.into(),
    })
}

pub fn field_at(base: Expr, name: &str, span: Span) -> Expr {
    expr_at(
        ExprKind::Field {
            base: Box::new(base),
            field: name.into(),
        },
        span,
    )
}

pub fn if_(cond: Expr, then: Expr, els: Option<Expr>) -> Expr {
    expr(ExprKind::If {
        cond: Box::new(cond),
        then: Box::new(then),
        els: els.map(Box::new),
    })
}

pub fn binary(op: opal_ast::BinOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

// ── Declarations ───────────────────────────────────────────────────────

pub fn global(module: &mut Module, name: &str) -> DeclId {
    let id = module.decls.alloc(Decl::new(
        name,
        Span::dummy(),
        DeclKind::Global {
            mutable: false,
            comptime: false,
        },
    ));
    module.symbols.define(name, id);
    id
}

pub fn global_full(module: &mut Module, name: &str, mutable: bool, comptime: bool) -> DeclId {
    let id = module
        .decls
        .alloc(Decl::new(name, Span::dummy(), DeclKind::Global { mutable, comptime }));
    module.symbols.define(name, id);
    id
}

pub fn param(module: &mut Module, name: &str) -> DeclId {
    module.decls.alloc(Decl::new(
        name,
        Span::dummy(),
        DeclKind::Param {
            mutable: false,
            comptime: false,
        },
    ))
}

pub fn local(module: &mut Module, name: &str, mutable: bool) -> DeclId {
    module
        .decls
        .alloc(Decl::new(name, Span::dummy(), DeclKind::Local { mutable }))
}

// ── Running the checker ────────────────────────────────────────────────

pub fn check(module: &mut Module) -> (TypeCtx, TypeckResult) {
    let mut ctx = TypeCtx::new();
    let result = opal_typeck::check(&mut ctx, module);
    (ctx, result)
}

pub fn decl_ty_string(module: &Module, decl: DeclId) -> String {
    format!(
        "{}",
        module
            .decls
            .get(decl)
            .ty
            .as_ref()
            .expect("declaration should be typed")
    )
}

pub fn scheme_of(module: &Module, decl: DeclId) -> &opal_types::Scheme {
    module
        .decls
        .get(decl)
        .scheme
        .as_ref()
        .expect("declaration should have a scheme")
}

pub fn assert_no_errors(result: &TypeckResult) {
    assert!(
        result.errors.is_empty(),
        "expected no errors, got: {:?}",
        result.errors
    );
}

pub fn result_type_string(result: &TypeckResult) -> String {
    format!(
        "{}",
        result
            .result_type
            .as_ref()
            .expect("expected a result type from inference")
    )
}
