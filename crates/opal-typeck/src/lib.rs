//! Opal type inference: Hindley-Milner with extensions.
//!
//! This crate assigns a fully resolved type to every expression and binding
//! of a parsed [`Module`], reporting localized errors where no consistent
//! typing exists. The extensions over plain Hindley-Milner:
//!
//! - polymorphic record/tuple rows (width subsumption via row variables)
//! - traits with functional dependencies, resolved against an impl table
//! - `mut` and compile-time modifiers as carrier-only type wrappers
//! - tagged unions, algebraic data types, pointer and array constructors
//!
//! # Architecture
//!
//! Inference is a four-stage pipeline per top-level item, sharing one
//! [`TypeCtx`]:
//!
//! - [`annotate`]: attach a placeholder (or determined) type to every node
//! - [`constraints`]: walk the annotated tree, emit equality and trait
//!   obligations
//! - [`unify`]: solve the obligations right-to-left into a substitution
//! - [`apply`]: write solved types back, generalize top-level bindings
//!
//! [`traits`] holds the impl table consulted during solving, [`error`] the
//! error types, [`diagnostics`] the ariadne rendering, and [`builtins`] the
//! starting vocabulary.

pub mod annotate;
pub mod apply;
pub mod builtins;
pub mod constraints;
pub mod diagnostics;
pub mod error;
pub mod traits;
pub mod unify;

use opal_ast::{Expr, ExprKind, Item, Module};
use opal_common::{DeclId, DiagnosticSink, Span};
use opal_types::{PrimTy, Ty, TyKind, TypeCtx};

use crate::annotate::Annotator;
use crate::apply::Applier;
use crate::constraints::Generator;
use crate::error::TypeError;
use crate::traits::TraitTable;

pub use crate::error::ConstraintOrigin;

/// The result of type checking an Opal module.
///
/// The module itself now carries the resolved types (every `ty` slot filled,
/// every generalizable binding holding a scheme); this struct carries what
/// checking produced alongside: the errors, the structured diagnostic
/// records, and the type of the last item.
pub struct TypeckResult {
    /// Type errors found during checking, in discovery order.
    pub errors: Vec<TypeError>,
    /// Structured `{span, severity, message}` records, including the
    /// occurs-check notes attached to infinite-type errors.
    pub diagnostics: DiagnosticSink,
    /// The resolved type of the last item, if the module has one.
    pub result_type: Option<Ty>,
}

impl TypeckResult {
    /// Whether checking succeeded with no errors.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Render all errors as formatted diagnostic strings.
    pub fn render_errors(&self, source: &str, filename: &str) -> Vec<String> {
        self.errors
            .iter()
            .map(|err| diagnostics::render_diagnostic(err, source, filename))
            .collect()
    }
}

/// Type-check a module.
///
/// Registers builtins and the trait impl table, then runs the four-stage
/// pipeline over each top-level item in source order. A failed constraint
/// produces one diagnostic and an empty substitution for that constraint;
/// checking always continues with the remaining constraints and items, so
/// independent errors surface together.
pub fn check(ctx: &mut TypeCtx, module: &mut Module) -> TypeckResult {
    let builtins = builtins::register(ctx, module);
    let impl_table = TraitTable::from_decls(&module.decls);

    let mut errors: Vec<TypeError> = Vec::new();
    let mut result_type = None;

    let Module { decls, items, .. } = module;

    for item in items.iter_mut() {
        let errors_before = errors.len();

        // A binding may only mention itself when it is marked recursive.
        // Inference still proceeds (the self-use is monomorphic either way),
        // so the rest of the item keeps producing useful diagnostics.
        if let Item::Binding(binding) = &*item {
            if !binding.recursive {
                let mut uses = Vec::new();
                self_references(&binding.value, binding.decl, &mut uses);
                for span in uses {
                    errors.push(TypeError::SelfReference {
                        name: decls.get(binding.decl).name.clone(),
                        span,
                    });
                }
            }
        }

        Annotator::new(ctx, decls, builtins.str_ty.clone()).annotate_item(item);
        let list = Generator::new(ctx, decls).generate(item);
        let outcome = unify::unify(ctx, &impl_table, &list, &mut errors);
        Applier::new(ctx, decls, &outcome.subs).apply_item(item);

        match item {
            Item::Binding(binding) => {
                // Trait constraints still open after solving become part of
                // the binding's scheme; each use re-emits them.
                let attached = outcome.deferred.into_iter().map(|(c, _)| c).collect();
                apply::finish_binding(ctx, decls, binding, attached);
                result_type = decls.get(binding.decl).ty.clone();
            }
            Item::Expr(expr) => {
                // A bare expression has no scheme to carry an open trait
                // constraint: nothing will ever determine it.
                for (constraint, origin) in outcome.deferred {
                    errors.push(TypeError::TraitUnsatisfied { constraint, origin });
                }
                // Residual variables in a non-generalizable position are
                // ambiguities, but only worth reporting when the item did
                // not already fail for a real reason.
                if errors.len() == errors_before {
                    if let Some(ty) = &expr.ty {
                        if ty.is_generic() {
                            errors.push(TypeError::AmbiguousType {
                                ty: ty.clone(),
                                span: expr.span,
                            });
                        }
                    }
                }
                result_type = expr.ty.clone();
            }
        }
    }

    let mut sink = DiagnosticSink::new();
    for err in &errors {
        let span = err.span().unwrap_or(Span::dummy());
        sink.error(span, err.to_string());
        if let TypeError::InfiniteType { var, ty, .. } = err {
            sink.note(span, format!("`{var}` occurs inside `{ty}`"));
        }
    }

    TypeckResult {
        errors,
        diagnostics: sink,
        result_type,
    }
}

/// Collect the spans of every use of `decl` within `expr`. Patterns only
/// bind names, so expressions are the only place a use can hide.
fn self_references(expr: &Expr, decl: DeclId, out: &mut Vec<Span>) {
    match &expr.kind {
        ExprKind::Var(id) => {
            if *id == decl {
                out.push(expr.span);
            }
        }
        ExprKind::Int { .. }
        | ExprKind::Float { .. }
        | ExprKind::Bool(_)
        | ExprKind::Str(_)
        | ExprKind::Unit => {}
        ExprKind::Call { callee, args } => {
            self_references(callee, decl, out);
            for arg in args {
                self_references(arg, decl, out);
            }
        }
        ExprKind::Lambda { body, .. } => self_references(body, decl, out),
        ExprKind::Let { value, .. } => self_references(value, decl, out),
        ExprKind::Assign { target, value } => {
            self_references(target, decl, out);
            self_references(value, decl, out);
        }
        ExprKind::Block(exprs) => {
            for e in exprs {
                self_references(e, decl, out);
            }
        }
        ExprKind::If { cond, then, els } => {
            self_references(cond, decl, out);
            self_references(then, decl, out);
            if let Some(els) = els {
                self_references(els, decl, out);
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            self_references(scrutinee, decl, out);
            for arm in arms {
                self_references(&arm.body, decl, out);
            }
        }
        ExprKind::Field { base, .. } => self_references(base, decl, out),
        ExprKind::Tuple { fields, .. } => {
            for field in fields {
                self_references(field, decl, out);
            }
        }
        ExprKind::Ascribe { expr, .. } => self_references(expr, decl, out),
        ExprKind::Ctor { args, .. } => {
            for arg in args {
                self_references(arg, decl, out);
            }
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            self_references(lhs, decl, out);
            self_references(rhs, decl, out);
        }
    }
}

/// The code-generation-facing shape of a function type: compile-time-only
/// parameters are erased, unit-sized parameters dropped, and `mut`
/// parameters passed by pointer. Trait constraints do not survive lowering.
pub fn lowered_signature(ctx: &mut TypeCtx, ty: &Ty) -> Ty {
    let func = match ty.strip_modifiers().kind() {
        TyKind::Func(func) | TyKind::MetaFunc(func) => func.clone(),
        _ => return ty.clone(),
    };

    let mut params = Vec::with_capacity(func.params.len());
    for param in func.params {
        if param.has_modifier(opal_types::Modifier::Comptime) {
            continue;
        }
        if matches!(param.strip_modifiers().kind(), TyKind::Prim(PrimTy::Unit)) {
            continue;
        }
        if param.has_modifier(opal_types::Modifier::Mut) {
            params.push(ctx.ptr_of(param));
        } else {
            params.push(param);
        }
    }
    ctx.func_of(params, func.ret, vec![])
}

#[cfg(test)]
mod tests {
    use opal_types::Modifier;

    use super::*;

    #[test]
    fn lowered_signature_erases_comptime_and_wraps_mut() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let boolean = ctx.bool();
        let unit = ctx.unit();

        let ct = ctx.modified(Modifier::Comptime, i32.clone());
        let mt = ctx.modified(Modifier::Mut, boolean.clone());
        let func = ctx.func_of(vec![ct, mt, unit.clone(), i32.clone()], unit, vec![]);

        let lowered = lowered_signature(&mut ctx, &func);
        assert_eq!(format!("{lowered}"), "(*(mut Bool), I32) -> Unit");
    }

    #[test]
    fn lowered_signature_passes_non_functions_through() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let lowered = lowered_signature(&mut ctx, &i32);
        assert!(lowered.ptr_eq(&i32));
    }
}
