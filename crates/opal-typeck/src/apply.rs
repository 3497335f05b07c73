//! Final inference pass: write solved types back into the tree.
//!
//! Every annotation is replaced by its image under the solved substitution;
//! non-generic annotations short-circuit untouched. Once a top-level
//! binding's tree is rewritten, its remaining variables are quantified into
//! the declaration's scheme (with the function's trait constraints
//! deduplicated). Variables remaining anywhere else are ambiguity errors,
//! reported by the driver.

use opal_ast::{Binding, DeclArena, DeclKind, Expr, ExprKind, Item, MatchArm, Pattern, PatKind};
use opal_common::DeclId;
use opal_types::{Scheme, Subst, TraitConstraint, Ty, TyKind, TypeCtx};

/// The substitution pass over one item.
pub struct Applier<'a> {
    ctx: &'a mut TypeCtx,
    decls: &'a mut DeclArena,
    subs: &'a Subst,
}

impl<'a> Applier<'a> {
    pub fn new(ctx: &'a mut TypeCtx, decls: &'a mut DeclArena, subs: &'a Subst) -> Self {
        Applier { ctx, decls, subs }
    }

    pub fn apply_item(&mut self, item: &mut Item) {
        match item {
            Item::Binding(binding) => {
                self.apply_decl(binding.decl);
                self.apply_expr(&mut binding.value);
            }
            Item::Expr(expr) => self.apply_expr(expr),
        }
    }

    fn apply_decl(&mut self, id: DeclId) {
        let decl = self.decls.get(id);
        if let Some(ty) = &decl.ty {
            if ty.is_generic() {
                let applied = self.subs.apply(self.ctx, ty);
                self.decls.get_mut(id).ty = Some(applied);
            }
        }
    }

    fn apply_slot(&mut self, slot: &mut Option<Ty>) {
        if let Some(ty) = slot {
            if ty.is_generic() {
                *slot = Some(self.subs.apply(self.ctx, ty));
            }
        }
    }

    pub fn apply_expr(&mut self, expr: &mut Expr) {
        self.apply_slot(&mut expr.ty);
        match &mut expr.kind {
            ExprKind::Int { .. }
            | ExprKind::Float { .. }
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Unit
            | ExprKind::Var(_) => {}
            ExprKind::Call { callee, args } => {
                self.apply_expr(callee);
                for arg in args {
                    self.apply_expr(arg);
                }
            }
            ExprKind::Lambda { params, body } => {
                for param in params.clone() {
                    self.apply_decl(param);
                }
                self.apply_expr(body);
            }
            ExprKind::Let { decl, value } => {
                let decl = *decl;
                self.apply_decl(decl);
                self.apply_expr(value);
            }
            ExprKind::Assign { target, value } => {
                self.apply_expr(target);
                self.apply_expr(value);
            }
            ExprKind::Block(exprs) => {
                for e in exprs {
                    self.apply_expr(e);
                }
            }
            ExprKind::If { cond, then, els } => {
                self.apply_expr(cond);
                self.apply_expr(then);
                if let Some(els) = els {
                    self.apply_expr(els);
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                self.apply_expr(scrutinee);
                for MatchArm { pattern, body } in arms {
                    self.apply_pattern(pattern);
                    self.apply_expr(body);
                }
            }
            ExprKind::Field { base, .. } => self.apply_expr(base),
            ExprKind::Tuple { fields, .. } => {
                for field in fields {
                    self.apply_expr(field);
                }
            }
            ExprKind::Ascribe { expr, .. } => self.apply_expr(expr),
            ExprKind::Ctor { args, .. } => {
                for arg in args {
                    self.apply_expr(arg);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.apply_expr(lhs);
                self.apply_expr(rhs);
            }
        }
    }

    fn apply_pattern(&mut self, pattern: &mut Pattern) {
        self.apply_slot(&mut pattern.ty);
        match &mut pattern.kind {
            PatKind::Bind(decl) => {
                let decl = *decl;
                self.apply_decl(decl);
            }
            PatKind::Tuple(subpatterns) => {
                for sub in subpatterns {
                    self.apply_pattern(sub);
                }
            }
            PatKind::Ctor { args, .. } => {
                for arg in args {
                    self.apply_pattern(arg);
                }
            }
            _ => {}
        }
    }
}

/// Quantify a solved top-level binding into its scheme.
///
/// `attached` carries the trait constraints the solver could not discharge
/// because their arguments stayed open: they ride on the binding's function
/// type (deduplicated) and on its scheme, and each use site re-emits them.
/// Compile-time bindings whose type resolved to a function become
/// meta-functions at this point: they exist for the compile-time evaluator,
/// not for code emission.
pub fn finish_binding(
    ctx: &mut TypeCtx,
    decls: &mut DeclArena,
    binding: &Binding,
    attached: Vec<TraitConstraint>,
) {
    let decl = decls.get(binding.decl);
    let comptime = matches!(
        decl.kind,
        DeclKind::Global { comptime: true, .. }
    );
    let mut resolved = decl
        .ty
        .clone()
        .expect("binding declaration was annotated");

    if comptime {
        if let TyKind::Func(func) = resolved.strip_modifiers().kind() {
            let func = func.clone();
            resolved = ctx.meta_func_of(func.params, func.ret);
        }
    }

    if !attached.is_empty() {
        if let TyKind::Func(func) = resolved.kind() {
            let mut func = func.clone();
            func.constraints.extend(attached.iter().cloned());
            resolved = ctx.func_of(func.params, func.ret, func.constraints);
        }
    }

    let resolved = ctx.clean_constraints(&resolved);
    let vars = resolved.contained_vars();
    let constraints = match resolved.kind() {
        TyKind::Func(func) => func.constraints.clone(),
        _ => attached,
    };

    let decl = decls.get_mut(binding.decl);
    decl.ty = Some(resolved.clone());
    decl.scheme = Some(Scheme {
        vars,
        constraints,
        ty: resolved,
    });
}
