//! Ordered substitutions and the single-binding substitute operation.
//!
//! A [`Subst`] is an ordered list of `(variable, replacement)` pairs. The
//! unifier composes them newest-first: when a constraint is solved, its
//! bindings are prepended, so the list runs from the most recently solved
//! binding down to the oldest. [`Subst::apply`] walks the list in reverse
//! (oldest first), which applies the most recently solved binding outermost
//! and lets an older binding's replacement mention variables that a newer
//! binding resolves.

use crate::ctx::TypeCtx;
use crate::ty::{TraitConstraint, Ty, TyKind};

/// Hard cap on substitution and unification recursion depth. Exceeding it is
/// an internal error, not a user diagnostic.
pub const RECURSION_LIMIT: i32 = 10_000;

/// An ordered mapping from type variables to types.
#[derive(Debug, Clone, Default)]
pub struct Subst {
    /// Newest binding first.
    pairs: Vec<(Ty, Ty)>,
}

impl Subst {
    pub fn new() -> Self {
        Self::default()
    }

    /// A substitution of a single binding `var ↦ ty`.
    pub fn bind(var: Ty, ty: Ty) -> Self {
        debug_assert!(var.as_var().is_some(), "substitution key must be a variable");
        Subst {
            pairs: vec![(var, ty)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Newest-first iteration over the bindings.
    pub fn iter(&self) -> impl Iterator<Item = &(Ty, Ty)> {
        self.pairs.iter()
    }

    /// Compose with the bindings from a more recently solved constraint:
    /// `head`'s pairs end up before the existing ones.
    pub fn prepend(&mut self, head: Subst) {
        if head.is_empty() {
            return;
        }
        let mut pairs = head.pairs;
        pairs.append(&mut self.pairs);
        self.pairs = pairs;
    }

    /// Apply the substitution to a type.
    ///
    /// Entries are processed in reverse insertion order (oldest binding
    /// first), so the most recently solved binding is applied outermost.
    /// Non-generic types are returned unchanged without a walk.
    pub fn apply(&self, ctx: &mut TypeCtx, ty: &Ty) -> Ty {
        let mut ty = ty.clone();
        for (var, replacement) in self.pairs.iter().rev() {
            ty = ctx.substitute(replacement, var, &ty);
        }
        ty
    }

    /// Apply the substitution to a trait constraint's arguments and
    /// functional-dependency witnesses.
    pub fn apply_constraint(&self, ctx: &mut TypeCtx, constraint: &TraitConstraint) -> TraitConstraint {
        TraitConstraint {
            decl: constraint.decl,
            name: constraint.name.clone(),
            args: constraint
                .args
                .iter()
                .map(|t| self.apply(ctx, t))
                .collect(),
            fundeps: constraint
                .fundeps
                .iter()
                .map(|t| self.apply(ctx, t))
                .collect(),
        }
    }
}

impl TypeCtx {
    /// Replace every occurrence of `var` in `ty` with `replacement`.
    ///
    /// Non-generic subterms are returned unchanged; modifiers are preserved
    /// on the result.
    pub fn substitute(&mut self, replacement: &Ty, var: &Ty, ty: &Ty) -> Ty {
        self.substitute_rec(replacement, var, ty, RECURSION_LIMIT)
    }

    fn substitute_rec(&mut self, replacement: &Ty, var: &Ty, ty: &Ty, limit: i32) -> Ty {
        if !ty.is_generic() {
            return ty.clone();
        }
        assert!(
            limit >= 0,
            "internal recursion limit (10,000) reached during substitution"
        );

        match ty.kind() {
            TyKind::Var(_) => {
                if ty == var {
                    replacement.clone()
                } else {
                    ty.clone()
                }
            }
            TyKind::Modified(flag, inner) => {
                let flag = *flag;
                let inner = self.substitute_rec(replacement, var, inner, limit - 1);
                self.modified(flag, inner)
            }
            TyKind::Ptr(inner) => {
                let inner = self.substitute_rec(replacement, var, inner, limit - 1);
                self.ptr_of(inner)
            }
            TyKind::Array(elem, len) => {
                let len = *len;
                let elem = self.substitute_rec(replacement, var, elem, limit - 1);
                self.array_of(elem, len)
            }
            TyKind::Tuple(tup) => {
                let names = tup.names.clone();
                let fields = tup
                    .fields
                    .iter()
                    .map(|t| self.substitute_rec(replacement, var, t, limit - 1))
                    .collect::<Vec<_>>();
                self.tuple_like(fields, names)
            }
            TyKind::Data(d) => {
                let (name, decl) = (d.name.clone(), d.decl);
                let args = d
                    .args
                    .iter()
                    .map(|t| self.substitute_rec(replacement, var, t, limit - 1))
                    .collect();
                self.data_of(name, args, decl)
            }
            TyKind::Union(d) => {
                let (name, decl) = (d.name.clone(), d.decl);
                let args = d
                    .args
                    .iter()
                    .map(|t| self.substitute_rec(replacement, var, t, limit - 1))
                    .collect();
                self.union_of(name, args, decl)
            }
            TyKind::Func(func) => {
                let func = func.clone();
                let params = func
                    .params
                    .iter()
                    .map(|t| self.substitute_rec(replacement, var, t, limit - 1))
                    .collect::<Vec<_>>();
                let ret = self.substitute_rec(replacement, var, &func.ret, limit - 1);
                let constraints = func
                    .constraints
                    .iter()
                    .map(|c| self.substitute_constraint(replacement, var, c, limit - 1))
                    .collect();
                self.func_of(params, ret, constraints)
            }
            TyKind::MetaFunc(func) => {
                let func = func.clone();
                let params = func
                    .params
                    .iter()
                    .map(|t| self.substitute_rec(replacement, var, t, limit - 1))
                    .collect::<Vec<_>>();
                let ret = self.substitute_rec(replacement, var, &func.ret, limit - 1);
                self.meta_func_of(params, ret)
            }
            TyKind::FuncList(fns) => {
                let fns = fns
                    .iter()
                    .map(|t| self.substitute_rec(replacement, var, t, limit - 1))
                    .collect();
                self.func_list_of(fns)
            }
            TyKind::Kind(inner) => {
                let inner = self.substitute_rec(replacement, var, inner, limit - 1);
                self.kind_of(inner)
            }
            TyKind::Prim(_) | TyKind::Void => ty.clone(),
        }
    }

    fn substitute_constraint(
        &mut self,
        replacement: &Ty,
        var: &Ty,
        constraint: &TraitConstraint,
        limit: i32,
    ) -> TraitConstraint {
        TraitConstraint {
            decl: constraint.decl,
            name: constraint.name.clone(),
            args: constraint
                .args
                .iter()
                .map(|t| self.substitute_rec(replacement, var, t, limit - 1))
                .collect(),
            fundeps: constraint
                .fundeps
                .iter()
                .map(|t| self.substitute_rec(replacement, var, t, limit - 1))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ty::Modifier;

    use super::*;

    #[test]
    fn apply_binds_variable() {
        let mut ctx = TypeCtx::new();
        let a = ctx.fresh_var();
        let i32 = ctx.i32();
        let subs = Subst::bind(a.clone(), i32.clone());

        let ptr = ctx.ptr_of(a);
        let applied = subs.apply(&mut ctx, &ptr);
        assert_eq!(format!("{applied}"), "*I32");
    }

    #[test]
    fn apply_is_idempotent() {
        let mut ctx = TypeCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();
        let i32 = ctx.i32();
        let ptr_b = ctx.ptr_of(b.clone());

        // Older binding 'a ↦ *'b, newer binding 'b ↦ I32.
        let mut subs = Subst::bind(a.clone(), ptr_b);
        subs.prepend(Subst::bind(b, i32));

        let once = subs.apply(&mut ctx, &a);
        let twice = subs.apply(&mut ctx, &once);
        assert_eq!(once, twice);
        assert_eq!(format!("{once}"), "*I32");
    }

    #[test]
    fn older_binding_resolved_by_newer_entry() {
        let mut ctx = TypeCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();
        let i32 = ctx.i32();
        let ptr_b = ctx.ptr_of(b.clone());

        let mut subs = Subst::bind(a.clone(), ptr_b);
        // Solved later, so prepended: applied outermost.
        subs.prepend(Subst::bind(b, i32));

        let applied = subs.apply(&mut ctx, &a);
        assert_eq!(format!("{applied}"), "*I32");
    }

    #[test]
    fn non_generic_short_circuit() {
        let mut ctx = TypeCtx::new();
        let a = ctx.fresh_var();
        let i32 = ctx.i32();
        let bool_ = ctx.bool();
        let concrete = ctx.func_of(vec![i32.clone()], bool_, vec![]);

        let subs = Subst::bind(a, i32);
        let applied = subs.apply(&mut ctx, &concrete);
        assert!(applied.ptr_eq(&concrete));
    }

    #[test]
    fn substitution_preserves_modifiers() {
        let mut ctx = TypeCtx::new();
        let a = ctx.fresh_var();
        let i32 = ctx.i32();
        let mut_a = ctx.modified(Modifier::Mut, a.clone());

        let subs = Subst::bind(a, i32);
        let applied = subs.apply(&mut ctx, &mut_a);
        assert_eq!(format!("{applied}"), "mut I32");
    }

    #[test]
    fn substitution_depth_is_capped() {
        // Run on a thread with a larger stack: 10,001 levels of nested
        // pointer types can exceed the default test-thread stack size in
        // debug builds before the recursion-limit assert is reached.
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let mut ctx = TypeCtx::new();
                let a = ctx.fresh_var();
                let mut deep = a.clone();
                for _ in 0..10_001 {
                    deep = ctx.ptr_of(deep);
                }
                let i32 = ctx.i32();
                let subs = Subst::bind(a, i32);
                let _ = subs.apply(&mut ctx, &deep);
            })
            .unwrap();
        let result = handle.join();
        assert!(result.is_err(), "expected a panic due to recursion limit");
        let panic_msg = result.unwrap_err();
        let msg = panic_msg
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| panic_msg.downcast_ref::<&str>().copied())
            .unwrap_or("");
        assert!(
            msg.contains("recursion limit"),
            "unexpected panic message: {msg}"
        );
    }
}
