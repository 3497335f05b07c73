//! First inference pass: attach a type to every node.
//!
//! Nodes whose type is syntactically determined (suffixed literals, `true`,
//! string literals, ascriptions) receive that type directly; every other
//! node and every declared slot receives a fresh type variable. Mutable
//! bindings and compile-time parameters wrap their slot in the matching
//! modifier.
//!
//! Contract: after this pass every expression, pattern, and visited
//! declaration has a non-`None` type, and no constraint has been emitted.

use opal_ast::{Binding, DeclArena, DeclKind, Expr, ExprKind, Item, MatchArm, PatKind, Pattern};
use opal_common::DeclId;
use opal_types::{Modifier, Ty, TypeCtx};

/// The annotation pass. Holds the context for fresh variables and the
/// arena for declared slots.
pub struct Annotator<'a> {
    ctx: &'a mut TypeCtx,
    decls: &'a mut DeclArena,
    /// The builtin string type, for string literals.
    str_ty: Ty,
}

impl<'a> Annotator<'a> {
    pub fn new(ctx: &'a mut TypeCtx, decls: &'a mut DeclArena, str_ty: Ty) -> Self {
        Annotator { ctx, decls, str_ty }
    }

    pub fn annotate_item(&mut self, item: &mut Item) {
        match item {
            Item::Binding(binding) => self.annotate_binding(binding),
            Item::Expr(expr) => self.annotate_expr(expr),
        }
    }

    fn annotate_binding(&mut self, binding: &mut Binding) {
        self.annotate_decl(binding.decl);
        self.annotate_expr(&mut binding.value);
    }

    /// Give a declaration's slot its placeholder (or determined) type.
    /// Already-annotated declarations are left alone.
    pub fn annotate_decl(&mut self, id: DeclId) {
        if self.decls.get(id).ty.is_some() {
            return;
        }
        let ty = self.decl_ty(id);
        self.decls.get_mut(id).ty = Some(ty);
    }

    fn decl_ty(&mut self, id: DeclId) -> Ty {
        let decl = self.decls.get(id);
        match &decl.kind {
            DeclKind::Global { mutable, comptime } | DeclKind::Param { mutable, comptime } => {
                let (mutable, comptime) = (*mutable, *comptime);
                let mut ty = self.ctx.fresh_var();
                if mutable {
                    ty = self.ctx.modified(Modifier::Mut, ty);
                }
                if comptime {
                    ty = self.ctx.modified(Modifier::Comptime, ty);
                }
                ty
            }
            DeclKind::Local { mutable } => {
                let mutable = *mutable;
                let ty = self.ctx.fresh_var();
                if mutable {
                    self.ctx.modified(Modifier::Mut, ty)
                } else {
                    ty
                }
            }
            DeclKind::Builtin | DeclKind::Method { .. } => {
                let scheme = decl
                    .scheme
                    .as_ref()
                    .expect("builtin and method declarations carry a preset scheme");
                scheme.ty.clone()
            }
            DeclKind::Data(def) => {
                let (name, params, is_union) =
                    (decl.name.clone(), def.params.clone(), def.is_union);
                let applied = if is_union {
                    self.ctx.union_of(name, params, id)
                } else {
                    self.ctx.data_of(name, params, id)
                };
                self.ctx.kind_of(applied)
            }
            DeclKind::Trait(_) | DeclKind::Impl { .. } => self.ctx.void(),
        }
    }

    pub fn annotate_expr(&mut self, expr: &mut Expr) {
        let ty = match &expr.kind {
            ExprKind::Int {
                suffix: Some(p), ..
            }
            | ExprKind::Float {
                suffix: Some(p), ..
            } => self.ctx.prim(*p),
            ExprKind::Int { suffix: None, .. } | ExprKind::Float { suffix: None, .. } => {
                self.ctx.fresh_var()
            }
            ExprKind::Bool(_) => self.ctx.bool(),
            ExprKind::Str(_) => self.str_ty.clone(),
            ExprKind::Unit => self.ctx.unit(),
            // Local bindings and assignments evaluate to unit.
            ExprKind::Let { .. } | ExprKind::Assign { .. } => self.ctx.unit(),
            ExprKind::Ascribe { ascribed, .. } => ascribed.clone(),
            _ => self.ctx.fresh_var(),
        };
        expr.ty = Some(ty);

        match &mut expr.kind {
            ExprKind::Int { .. }
            | ExprKind::Float { .. }
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Unit
            | ExprKind::Var(_) => {}
            ExprKind::Call { callee, args } => {
                self.annotate_expr(callee);
                for arg in args {
                    self.annotate_expr(arg);
                }
            }
            ExprKind::Lambda { params, body } => {
                for param in params.clone() {
                    self.annotate_decl(param);
                }
                self.annotate_expr(body);
            }
            ExprKind::Let { decl, value } => {
                let decl = *decl;
                self.annotate_decl(decl);
                self.annotate_expr(value);
            }
            ExprKind::Assign { target, value } => {
                self.annotate_expr(target);
                self.annotate_expr(value);
            }
            ExprKind::Block(exprs) => {
                for e in exprs {
                    self.annotate_expr(e);
                }
            }
            ExprKind::If { cond, then, els } => {
                self.annotate_expr(cond);
                self.annotate_expr(then);
                if let Some(els) = els {
                    self.annotate_expr(els);
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                self.annotate_expr(scrutinee);
                for MatchArm { pattern, body } in arms {
                    self.annotate_pattern(pattern);
                    self.annotate_expr(body);
                }
            }
            ExprKind::Field { base, .. } => self.annotate_expr(base),
            ExprKind::Tuple { fields, .. } => {
                for field in fields {
                    self.annotate_expr(field);
                }
            }
            ExprKind::Ascribe { expr, .. } => self.annotate_expr(expr),
            ExprKind::Ctor { args, .. } => {
                for arg in args {
                    self.annotate_expr(arg);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.annotate_expr(lhs);
                self.annotate_expr(rhs);
            }
        }
    }

    pub fn annotate_pattern(&mut self, pattern: &mut Pattern) {
        let ty = match &pattern.kind {
            PatKind::Bind(decl) => {
                let decl = *decl;
                self.annotate_decl(decl);
                self.decls
                    .get(decl)
                    .ty
                    .clone()
                    .expect("binding pattern declaration was just annotated")
            }
            PatKind::Bool(_) => self.ctx.bool(),
            PatKind::Str(_) => self.str_ty.clone(),
            PatKind::Unit => self.ctx.unit(),
            // Int patterns default like int literals; the rest are shaped by
            // constraints.
            PatKind::Int(_) | PatKind::Wildcard | PatKind::Tuple(_) | PatKind::Ctor { .. } => {
                self.ctx.fresh_var()
            }
        };
        pattern.ty = Some(ty);

        match &mut pattern.kind {
            PatKind::Tuple(subpatterns) => {
                for sub in subpatterns {
                    self.annotate_pattern(sub);
                }
            }
            PatKind::Ctor { args, .. } => {
                for arg in args {
                    self.annotate_pattern(arg);
                }
            }
            _ => {}
        }
    }
}
