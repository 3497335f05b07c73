//! The type context: fresh variable supply and hash-consing constructors.
//!
//! One `TypeCtx` exists per compilation. Every type handle is produced here,
//! so structurally equal types share a pointer and the `generic` flag is
//! computed exactly once per distinct shape. Creating a new context resets
//! the fresh-variable counter, which keeps independent compilations
//! independent.

use rustc_hash::FxHashMap;

use opal_common::DeclId;

use crate::ty::{
    DataTy, FuncTy, Modifier, PrimTy, TraitConstraint, TupleTy, Ty, TyInfo, TyKind, TyVar,
};
use crate::Scheme;

/// Fresh-variable supply plus the interning table.
pub struct TypeCtx {
    interner: FxHashMap<TyKind, Ty>,
    next_var: u32,
}

impl TypeCtx {
    pub fn new() -> Self {
        TypeCtx {
            interner: FxHashMap::default(),
            next_var: 0,
        }
    }

    /// Number of distinct types interned so far.
    pub fn interned_count(&self) -> usize {
        self.interner.len()
    }

    fn intern(&mut self, kind: TyKind) -> Ty {
        if let Some(ty) = self.interner.get(&kind) {
            return ty.clone();
        }
        let generic = kind_is_generic(&kind);
        let ty = Ty::new(TyInfo {
            kind: kind.clone(),
            generic,
        });
        self.interner.insert(kind, ty.clone());
        ty
    }

    // ── Fresh Variables ─────────────────────────────────────────────────

    /// A fresh type variable `'N`. Each call returns a strictly greater `N`
    /// than any prior call on this context, starting from `'1`.
    pub fn fresh_var(&mut self) -> Ty {
        self.next_var += 1;
        self.intern(TyKind::Var(TyVar {
            id: self.next_var,
            row: false,
            name: None,
        }))
    }

    /// A fresh row variable, usable only as the trailing field of a tuple.
    pub fn fresh_row_var(&mut self) -> Ty {
        self.next_var += 1;
        self.intern(TyKind::Var(TyVar {
            id: self.next_var,
            row: true,
            name: None,
        }))
    }

    /// A fresh variable carrying a user-facing display name (for source-level
    /// type variables such as `'a` in a data declaration).
    pub fn named_var(&mut self, name: &str) -> Ty {
        self.next_var += 1;
        self.intern(TyKind::Var(TyVar {
            id: self.next_var,
            row: false,
            name: Some(name.into()),
        }))
    }

    // ── Constructors ────────────────────────────────────────────────────

    pub fn prim(&mut self, p: PrimTy) -> Ty {
        self.intern(TyKind::Prim(p))
    }

    pub fn unit(&mut self) -> Ty {
        self.prim(PrimTy::Unit)
    }

    pub fn bool(&mut self) -> Ty {
        self.prim(PrimTy::Bool)
    }

    pub fn i32(&mut self) -> Ty {
        self.prim(PrimTy::I32)
    }

    pub fn f64(&mut self) -> Ty {
        self.prim(PrimTy::F64)
    }

    pub fn usz(&mut self) -> Ty {
        self.prim(PrimTy::Usz)
    }

    pub fn ptr_of(&mut self, inner: Ty) -> Ty {
        self.intern(TyKind::Ptr(inner))
    }

    pub fn array_of(&mut self, elem: Ty, len: Option<u64>) -> Ty {
        self.intern(TyKind::Array(elem, len))
    }

    /// A positional tuple. Row variables may only appear in trailing
    /// position; the constructor enforces this.
    pub fn tuple_of(&mut self, fields: Vec<Ty>) -> Ty {
        debug_assert_row_vars_trailing(&fields);
        self.intern(TyKind::Tuple(TupleTy {
            fields,
            names: None,
        }))
    }

    /// An anonymous record with named fields and an optional trailing row
    /// variable.
    pub fn record_of(&mut self, fields: Vec<(String, Ty)>, row: Option<Ty>) -> Ty {
        let (names, mut tys): (Vec<_>, Vec<_>) = fields.into_iter().unzip();
        if let Some(row) = row {
            debug_assert!(row.is_row_var(), "record tail must be a row variable");
            tys.push(row);
        }
        debug_assert_row_vars_trailing(&tys);
        self.intern(TyKind::Tuple(TupleTy {
            fields: tys,
            names: Some(names),
        }))
    }

    /// Rebuild a tuple preserving its record-ness.
    pub(crate) fn tuple_like(&mut self, fields: Vec<Ty>, names: Option<Vec<String>>) -> Ty {
        debug_assert_row_vars_trailing(&fields);
        self.intern(TyKind::Tuple(TupleTy { fields, names }))
    }

    pub fn data_of(&mut self, name: impl Into<String>, args: Vec<Ty>, decl: DeclId) -> Ty {
        self.intern(TyKind::Data(DataTy {
            name: name.into(),
            args,
            decl,
        }))
    }

    pub fn union_of(&mut self, name: impl Into<String>, args: Vec<Ty>, decl: DeclId) -> Ty {
        self.intern(TyKind::Union(DataTy {
            name: name.into(),
            args,
            decl,
        }))
    }

    pub fn func_of(&mut self, params: Vec<Ty>, ret: Ty, constraints: Vec<TraitConstraint>) -> Ty {
        self.intern(TyKind::Func(FuncTy {
            params,
            ret,
            constraints,
        }))
    }

    pub fn meta_func_of(&mut self, params: Vec<Ty>, ret: Ty) -> Ty {
        self.intern(TyKind::MetaFunc(FuncTy {
            params,
            ret,
            constraints: Vec::new(),
        }))
    }

    pub fn func_list_of(&mut self, overloads: Vec<Ty>) -> Ty {
        self.intern(TyKind::FuncList(overloads))
    }

    pub fn kind_of(&mut self, ty: Ty) -> Ty {
        self.intern(TyKind::Kind(ty))
    }

    pub fn void(&mut self) -> Ty {
        self.intern(TyKind::Void)
    }

    /// Wrap `inner` in a modifier. Re-wrapping with a flag the type already
    /// carries is a no-op, so the same flag never nests.
    pub fn modified(&mut self, flag: Modifier, inner: Ty) -> Ty {
        if inner.has_modifier(flag) {
            return inner;
        }
        self.intern(TyKind::Modified(flag, inner))
    }

    // ── Instantiation ───────────────────────────────────────────────────

    /// Deep-copy `ty`, replacing each distinct variable with a fresh one.
    ///
    /// Within one call the mapping is consistent: equal input variables map
    /// to the same output variable, distinct inputs to distinct outputs.
    /// Non-generic subterms are returned unchanged (same handle).
    pub fn copy_with_fresh_vars(&mut self, ty: &Ty) -> Ty {
        let mut map = FxHashMap::default();
        self.copy_ty(ty, &mut map)
    }

    /// Instantiate a scheme: replace its variables with fresh ones,
    /// consistently across the body type and the attached constraints.
    pub fn instantiate(&mut self, scheme: &Scheme) -> (Ty, Vec<TraitConstraint>) {
        if scheme.is_mono() && scheme.constraints.is_empty() {
            return (scheme.ty.clone(), Vec::new());
        }
        let mut map = FxHashMap::default();
        let ty = self.copy_ty(&scheme.ty, &mut map);
        let constraints = scheme
            .constraints
            .iter()
            .map(|c| self.copy_constraint(c, &mut map))
            .collect();
        (ty, constraints)
    }

    fn copy_ty(&mut self, ty: &Ty, map: &mut FxHashMap<u32, Ty>) -> Ty {
        if !ty.is_generic() {
            return ty.clone();
        }
        match ty.kind() {
            TyKind::Var(v) => {
                if let Some(fresh) = map.get(&v.id) {
                    return fresh.clone();
                }
                let fresh = if v.row {
                    self.fresh_row_var()
                } else {
                    self.fresh_var()
                };
                map.insert(v.id, fresh.clone());
                fresh
            }
            TyKind::Modified(flag, inner) => {
                let flag = *flag;
                let inner = self.copy_ty(inner, map);
                self.modified(flag, inner)
            }
            TyKind::Ptr(inner) => {
                let inner = self.copy_ty(inner, map);
                self.ptr_of(inner)
            }
            TyKind::Array(elem, len) => {
                let len = *len;
                let elem = self.copy_ty(elem, map);
                self.array_of(elem, len)
            }
            TyKind::Tuple(tup) => {
                let names = tup.names.clone();
                let fields = tup
                    .fields
                    .iter()
                    .map(|t| self.copy_ty(t, map))
                    .collect::<Vec<_>>();
                self.tuple_like(fields, names)
            }
            TyKind::Data(d) => {
                let (name, decl) = (d.name.clone(), d.decl);
                let args = d.args.iter().map(|t| self.copy_ty(t, map)).collect();
                self.data_of(name, args, decl)
            }
            TyKind::Union(d) => {
                let (name, decl) = (d.name.clone(), d.decl);
                let args = d.args.iter().map(|t| self.copy_ty(t, map)).collect();
                self.union_of(name, args, decl)
            }
            TyKind::Func(func) => {
                let params = func
                    .params
                    .iter()
                    .map(|t| self.copy_ty(t, map))
                    .collect::<Vec<_>>();
                let ret = self.copy_ty(&func.ret, map);
                let constraints = func
                    .constraints
                    .iter()
                    .map(|c| self.copy_constraint(c, map))
                    .collect();
                self.func_of(params, ret, constraints)
            }
            TyKind::MetaFunc(func) => {
                let params = func
                    .params
                    .iter()
                    .map(|t| self.copy_ty(t, map))
                    .collect::<Vec<_>>();
                let ret = self.copy_ty(&func.ret, map);
                self.meta_func_of(params, ret)
            }
            TyKind::FuncList(fns) => {
                let fns = fns.iter().map(|t| self.copy_ty(t, map)).collect();
                self.func_list_of(fns)
            }
            TyKind::Kind(inner) => {
                let inner = self.copy_ty(inner, map);
                self.kind_of(inner)
            }
            // Non-generic shapes are returned above; these arms are
            // unreachable but harmless.
            TyKind::Prim(_) | TyKind::Void => ty.clone(),
        }
    }

    /// Freshen a trait constraint on its own: one consistent mapping across
    /// its arguments and functional dependencies. Used when trial-matching
    /// registered impls.
    pub fn copy_constraint_with_fresh_vars(&mut self, constraint: &TraitConstraint) -> TraitConstraint {
        let mut map = FxHashMap::default();
        self.copy_constraint(constraint, &mut map)
    }

    pub(crate) fn copy_constraint(
        &mut self,
        constraint: &TraitConstraint,
        map: &mut FxHashMap<u32, Ty>,
    ) -> TraitConstraint {
        TraitConstraint {
            decl: constraint.decl,
            name: constraint.name.clone(),
            args: constraint
                .args
                .iter()
                .map(|t| self.copy_ty(t, map))
                .collect(),
            fundeps: constraint
                .fundeps
                .iter()
                .map(|t| self.copy_ty(t, map))
                .collect(),
        }
    }

    // ── Constraint Hygiene ──────────────────────────────────────────────

    /// Drop structurally duplicate trait constraints from a function type,
    /// keeping the last occurrence of each.
    pub fn clean_constraints(&mut self, ty: &Ty) -> Ty {
        let func = match ty.kind() {
            TyKind::Func(func) if !func.constraints.is_empty() => func.clone(),
            _ => return ty.clone(),
        };
        let mut kept = Vec::with_capacity(func.constraints.len());
        for (i, constraint) in func.constraints.iter().enumerate() {
            let duplicated_later = func.constraints[i + 1..].iter().any(|c| c == constraint);
            if !duplicated_later {
                kept.push(constraint.clone());
            }
        }
        self.func_of(func.params, func.ret, kept)
    }
}

impl Default for TypeCtx {
    fn default() -> Self {
        Self::new()
    }
}

fn debug_assert_row_vars_trailing(fields: &[Ty]) {
    if cfg!(debug_assertions) && fields.len() > 1 {
        for field in &fields[..fields.len() - 1] {
            debug_assert!(
                !field.is_row_var(),
                "row variable in non-trailing tuple position"
            );
        }
    }
}

fn kind_is_generic(kind: &TyKind) -> bool {
    match kind {
        TyKind::Var(_) => true,
        TyKind::Prim(_) | TyKind::Void => false,
        TyKind::Ptr(inner) | TyKind::Modified(_, inner) | TyKind::Kind(inner) => {
            inner.is_generic()
        }
        TyKind::Array(elem, _) => elem.is_generic(),
        TyKind::Tuple(tup) => tup.fields.iter().any(Ty::is_generic),
        TyKind::Data(d) | TyKind::Union(d) => d.args.iter().any(Ty::is_generic),
        TyKind::Func(func) | TyKind::MetaFunc(func) => {
            func.params.iter().any(Ty::is_generic)
                || func.ret.is_generic()
                || func.constraints.iter().any(|c| {
                    c.args.iter().any(Ty::is_generic) || c.fundeps.iter().any(Ty::is_generic)
                })
        }
        TyKind::FuncList(fns) => fns.iter().any(Ty::is_generic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_vars_are_strictly_monotone() {
        let mut ctx = TypeCtx::new();
        let ids: Vec<u32> = (0..5)
            .map(|_| ctx.fresh_var().as_var().unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let row = ctx.fresh_row_var();
        assert_eq!(row.as_var().unwrap().id, 6);
        assert!(row.is_row_var());
    }

    #[test]
    fn interning_shares_handles() {
        let mut ctx = TypeCtx::new();
        let a = ctx.i32();
        let b = ctx.i32();
        assert!(a.ptr_eq(&b));

        let p1 = ctx.ptr_of(a.clone());
        let p2 = ctx.ptr_of(b);
        assert!(p1.ptr_eq(&p2));
    }

    #[test]
    fn modified_never_nests_same_flag() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let once = ctx.modified(Modifier::Mut, i32);
        let twice = ctx.modified(Modifier::Mut, once.clone());
        assert!(once.ptr_eq(&twice));

        // A different flag still stacks.
        let both = ctx.modified(Modifier::Comptime, once.clone());
        assert!(both.has_modifier(Modifier::Mut));
        assert!(both.has_modifier(Modifier::Comptime));
    }

    #[test]
    fn copy_with_fresh_vars_is_consistent() {
        let mut ctx = TypeCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();
        // ('a, 'b) -> 'a
        let func = ctx.func_of(vec![a.clone(), b.clone()], a.clone(), vec![]);
        let copy = ctx.copy_with_fresh_vars(&func);

        let orig_vars = func.contained_vars();
        let copy_vars = copy.contained_vars();
        assert_eq!(copy_vars.len(), 2);
        // Distinct inputs map to distinct outputs.
        assert_ne!(copy_vars[0].id, copy_vars[1].id);
        // All fresh.
        for v in &copy_vars {
            assert!(orig_vars.iter().all(|o| o.id != v.id));
        }
        // Equal inputs map to equal outputs: first param and return were the
        // same variable, so they still are.
        match (copy.kind(), func.kind()) {
            (TyKind::Func(c), TyKind::Func(_)) => assert_eq!(c.params[0], c.ret),
            _ => unreachable!(),
        }
    }

    #[test]
    fn copy_returns_non_generic_unchanged() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let concrete = ctx.tuple_of(vec![i32.clone(), i32]);
        let copy = ctx.copy_with_fresh_vars(&concrete);
        assert!(copy.ptr_eq(&concrete));
    }

    #[test]
    fn clean_constraints_dedupes_keeping_last() {
        let mut ctx = TypeCtx::new();
        let a = ctx.fresh_var();
        let c = TraitConstraint {
            decl: opal_common::DeclId(0),
            name: "Num".into(),
            args: vec![a.clone()],
            fundeps: vec![],
        };
        let func = ctx.func_of(
            vec![a.clone()],
            a.clone(),
            vec![c.clone(), c.clone(), c.clone()],
        );
        let cleaned = ctx.clean_constraints(&func);
        match cleaned.kind() {
            TyKind::Func(f) => assert_eq!(f.constraints.len(), 1),
            _ => unreachable!(),
        }
    }
}
