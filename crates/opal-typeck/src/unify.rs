//! Unification: solve a constraint list into a substitution.
//!
//! The list is processed right-to-left (most recently emitted constraint
//! first). For each equality the accumulated substitution is applied to both
//! sides before solving, and the new bindings are composed in front, so the
//! most recently solved binding applies outermost. A failed constraint
//! contributes an empty substitution and one diagnostic; solving continues,
//! letting independent errors surface together instead of cascading.
//!
//! Unification itself returns `Result` values rather than unwinding: nested
//! structural descent propagates the first error up to the per-constraint
//! driver, and only that driver turns errors into diagnostics.

use opal_types::{Subst, TraitConstraint, Ty, TyKind, TupleTy, TypeCtx, RECURSION_LIMIT};

use crate::constraints::{Constraint, ConstraintList};
use crate::error::{ConstraintOrigin, TypeError};
use crate::traits::TraitTable;

/// A unification failure: the offending pair plus what went wrong.
///
/// The pair is the *innermost* mismatching pair, not the constraint's
/// original types: unifying `(I32) -> I32` with `(Bool) -> '2` reports
/// `I32` against `Bool`.
#[derive(Clone, Debug)]
pub struct UnifyError {
    pub lhs: Ty,
    pub rhs: Ty,
    pub kind: UnifyErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnifyErrorKind {
    /// Head constructors differ, or non-generic types are unequal.
    Mismatch,
    /// The left-hand variable occurs in the right-hand type.
    InfRecursion1,
    /// The right-hand variable occurs in the left-hand type.
    InfRecursion2,
    /// Function or type-constructor argument counts differ.
    ArityMismatch { expected: usize, found: usize },
    /// Tuple widths differ with no row variable to absorb the rest.
    TupleWidth { expected: usize, found: usize },
}

impl UnifyError {
    fn new(lhs: &Ty, rhs: &Ty, kind: UnifyErrorKind) -> Self {
        UnifyError {
            lhs: lhs.clone(),
            rhs: rhs.clone(),
            kind,
        }
    }

    fn into_type_error(self, origin: &ConstraintOrigin) -> TypeError {
        let origin = origin.clone();
        match self.kind {
            UnifyErrorKind::Mismatch => TypeError::Mismatch {
                expected: self.lhs,
                found: self.rhs,
                origin,
            },
            UnifyErrorKind::InfRecursion1 => TypeError::InfiniteType {
                var: self.lhs,
                ty: self.rhs,
                var_on_left: true,
                origin,
            },
            UnifyErrorKind::InfRecursion2 => TypeError::InfiniteType {
                var: self.rhs,
                ty: self.lhs,
                var_on_left: false,
                origin,
            },
            UnifyErrorKind::ArityMismatch { expected, found } => TypeError::ArityMismatch {
                expected,
                found,
                origin,
            },
            UnifyErrorKind::TupleWidth { expected, found } => TypeError::TupleWidth {
                expected,
                found,
                origin,
            },
        }
    }
}

/// The solver's result: the substitution, plus trait constraints that were
/// still open (arguments carrying variables) when solving finished. The
/// driver attaches those to the enclosing binding's scheme, or reports them
/// if there is no binding to carry them.
pub struct UnifyOutcome {
    pub subs: Subst,
    pub deferred: Vec<(TraitConstraint, ConstraintOrigin)>,
}

/// Solve a constraint list. Failures are reported into `errors`; the
/// returned substitution is always usable (partial under errors).
///
/// Trait constraints resolve only once their arguments are ground under the
/// substitution so far. Anything still open goes into a deferral queue that
/// is retried to a fixpoint at the end, since a later equality (or another
/// constraint's functional dependency) may ground it.
pub fn unify(
    ctx: &mut TypeCtx,
    impls: &TraitTable,
    list: &ConstraintList,
    errors: &mut Vec<TypeError>,
) -> UnifyOutcome {
    let mut subs = Subst::new();
    let mut deferred: Vec<(TraitConstraint, ConstraintOrigin)> = Vec::new();

    for constraint in list.iter().rev() {
        match constraint {
            Constraint::Impl { constraint, origin } => {
                let applied = subs.apply_constraint(ctx, constraint);
                if TraitTable::is_ground(&applied) {
                    match impls.resolve_ground(ctx, &applied, origin) {
                        Ok(narrowing) => subs.prepend(narrowing),
                        Err(err) => errors.push(err),
                    }
                } else {
                    deferred.push((applied, origin.clone()));
                }
            }
            Constraint::Eq { lhs, rhs, origin } => {
                let l = subs.apply(ctx, lhs);
                let r = subs.apply(ctx, rhs);
                match unify_one(ctx, &l, &r, RECURSION_LIMIT) {
                    Ok(head) => subs.prepend(head),
                    Err(err) => errors.push(err.into_type_error(origin)),
                }
            }
        }
    }

    // Retry deferred constraints until nothing more becomes ground. Each
    // resolution can narrow variables (fundeps), which can ground another.
    loop {
        let mut progressed = false;
        let mut still_open = Vec::with_capacity(deferred.len());
        for (constraint, origin) in deferred {
            let applied = subs.apply_constraint(ctx, &constraint);
            if TraitTable::is_ground(&applied) {
                progressed = true;
                match impls.resolve_ground(ctx, &applied, &origin) {
                    Ok(narrowing) => subs.prepend(narrowing),
                    Err(err) => errors.push(err),
                }
            } else {
                still_open.push((applied, origin));
            }
        }
        deferred = still_open;
        if !progressed {
            break;
        }
    }

    UnifyOutcome { subs, deferred }
}

/// Unify a single pair of types.
pub fn unify_one(ctx: &mut TypeCtx, t1: &Ty, t2: &Ty, depth: i32) -> Result<Subst, UnifyError> {
    assert!(
        depth >= 0,
        "internal recursion limit (10,000) reached during unification"
    );

    // Variable binding first: a variable absorbs the whole other side,
    // modifiers included.
    if let Some(v1) = t1.as_var() {
        if t2.as_var() == Some(v1) {
            return Ok(Subst::new());
        }
        if v1.row && !row_bindable(t2) {
            return Err(UnifyError::new(t1, t2, UnifyErrorKind::Mismatch));
        }
        if t2.contains_var(v1) {
            return Err(UnifyError::new(t1, t2, UnifyErrorKind::InfRecursion1));
        }
        return Ok(Subst::bind(t1.clone(), t2.clone()));
    }
    if let Some(v2) = t2.as_var() {
        if v2.row && !row_bindable(t1) {
            return Err(UnifyError::new(t1, t2, UnifyErrorKind::Mismatch));
        }
        if t1.contains_var(v2) {
            return Err(UnifyError::new(t1, t2, UnifyErrorKind::InfRecursion2));
        }
        return Ok(Subst::bind(t2.clone(), t1.clone()));
    }

    // Modifiers are carriers: descend through them. Substitution preserves
    // the wrapper on the annotated side.
    if let TyKind::Modified(_, inner) = t1.kind() {
        return unify_one(ctx, inner, t2, depth - 1);
    }
    if let TyKind::Modified(_, inner) = t2.kind() {
        return unify_one(ctx, t1, inner, depth - 1);
    }

    if t1.tag() != t2.tag() {
        return Err(UnifyError::new(t1, t2, UnifyErrorKind::Mismatch));
    }

    // Two non-generic types either already agree or never will.
    if !t1.is_generic() && !t2.is_generic() {
        return if t1.approx_eq(t2) {
            Ok(Subst::new())
        } else {
            Err(shape_error(t1, t2))
        };
    }

    match (t1.kind(), t2.kind()) {
        (TyKind::Ptr(a), TyKind::Ptr(b)) => unify_one(ctx, a, b, depth - 1),

        // Lengths are not unified; only the element types meet.
        (TyKind::Array(a, _), TyKind::Array(b, _)) => unify_one(ctx, a, b, depth - 1),

        (TyKind::Data(d1), TyKind::Data(d2)) | (TyKind::Union(d1), TyKind::Union(d2)) => {
            if d1.decl != d2.decl {
                return Err(UnifyError::new(t1, t2, UnifyErrorKind::Mismatch));
            }
            if d1.args.len() != d2.args.len() {
                return Err(UnifyError::new(
                    t1,
                    t2,
                    UnifyErrorKind::ArityMismatch {
                        expected: d1.args.len(),
                        found: d2.args.len(),
                    },
                ));
            }
            let pairs: Vec<(Ty, Ty)> = d1.args.iter().cloned().zip(d2.args.iter().cloned()).collect();
            unify_pairs(ctx, &pairs, depth)
        }

        (TyKind::Func(f1), TyKind::Func(f2)) => {
            if f1.params.len() != f2.params.len() {
                return Err(UnifyError::new(
                    t1,
                    t2,
                    UnifyErrorKind::ArityMismatch {
                        expected: f1.params.len(),
                        found: f2.params.len(),
                    },
                ));
            }
            // Params first, return type last; the solver works the pair list
            // from the back, so the return type unifies first. Trait
            // constraints are propagated on the types themselves, never
            // unified.
            let mut pairs: Vec<(Ty, Ty)> = f1
                .params
                .iter()
                .cloned()
                .zip(f2.params.iter().cloned())
                .collect();
            pairs.push((f1.ret.clone(), f2.ret.clone()));
            unify_pairs(ctx, &pairs, depth)
        }

        (TyKind::Tuple(tup1), TyKind::Tuple(tup2)) => {
            unify_tuple(ctx, tup1, tup2, t1, t2, depth)
        }

        // Terminal variants (MetaFunc, FuncList, Kind, Void) with equal tags
        // and a generic payload: nothing to descend into.
        _ => Ok(Subst::new()),
    }
}

/// What a row variable may be bound to: another row variable or a field set.
fn row_bindable(ty: &Ty) -> bool {
    ty.is_row_var() || matches!(ty.strip_modifiers().kind(), TyKind::Tuple(_))
}

/// Classify a shape disagreement between two types that will never unify:
/// function and constructor arity differences and tuple width differences
/// get their own kinds, everything else is a plain mismatch.
fn shape_error(t1: &Ty, t2: &Ty) -> UnifyError {
    let a = t1.strip_modifiers();
    let b = t2.strip_modifiers();
    let kind = match (a.kind(), b.kind()) {
        (TyKind::Func(f1), TyKind::Func(f2)) if f1.params.len() != f2.params.len() => {
            UnifyErrorKind::ArityMismatch {
                expected: f1.params.len(),
                found: f2.params.len(),
            }
        }
        (TyKind::Data(d1), TyKind::Data(d2)) | (TyKind::Union(d1), TyKind::Union(d2))
            if d1.decl == d2.decl && d1.args.len() != d2.args.len() =>
        {
            UnifyErrorKind::ArityMismatch {
                expected: d1.args.len(),
                found: d2.args.len(),
            }
        }
        (TyKind::Tuple(x), TyKind::Tuple(y))
            if x.names.is_some() == y.names.is_some() && x.width() != y.width() =>
        {
            UnifyErrorKind::TupleWidth {
                expected: x.width(),
                found: y.width(),
            }
        }
        _ => UnifyErrorKind::Mismatch,
    };
    UnifyError::new(t1, t2, kind)
}

/// Fold a pair list right-to-left, applying intermediate bindings as it
/// goes. Errors propagate to the caller; only the top-level constraint
/// driver reports them.
fn unify_pairs(ctx: &mut TypeCtx, pairs: &[(Ty, Ty)], depth: i32) -> Result<Subst, UnifyError> {
    let mut subs = Subst::new();
    for (a, b) in pairs.iter().rev() {
        let l = subs.apply(ctx, a);
        let r = subs.apply(ctx, b);
        let head = unify_one(ctx, &l, &r, depth - 1)?;
        subs.prepend(head);
    }
    Ok(subs)
}

/// Row-variable-aware tuple unification.
///
/// Positional tuples unify pairwise over the shared prefix, with a trailing
/// row variable absorbing the longer side's remainder. Records unify
/// field-by-name; fields present on only one side must be absorbed by the
/// other side's row variable or the widths are in error.
fn unify_tuple(
    ctx: &mut TypeCtx,
    tup1: &TupleTy,
    tup2: &TupleTy,
    t1: &Ty,
    t2: &Ty,
    depth: i32,
) -> Result<Subst, UnifyError> {
    let width_error = || {
        UnifyError::new(
            t1,
            t2,
            UnifyErrorKind::TupleWidth {
                expected: tup1.width(),
                found: tup2.width(),
            },
        )
    };

    match (&tup1.names, &tup2.names) {
        (Some(_), Some(_)) => {
            let fields1: Vec<(&str, &Ty)> = tup1.named_fields().expect("checked").collect();
            let fields2: Vec<(&str, &Ty)> = tup2.named_fields().expect("checked").collect();

            let mut pairs = Vec::new();
            let mut only_in_1 = Vec::new();
            for (name, ty) in &fields1 {
                match fields2.iter().find(|(n, _)| n == name) {
                    Some((_, other)) => pairs.push(((*ty).clone(), (*other).clone())),
                    None => only_in_1.push((name.to_string(), (*ty).clone())),
                }
            }
            let only_in_2: Vec<(String, Ty)> = fields2
                .iter()
                .filter(|(n, _)| !fields1.iter().any(|(m, _)| m == n))
                .map(|(n, t)| (n.to_string(), (*t).clone()))
                .collect();

            // A side's extra fields must fit into the other side's row var.
            if !only_in_1.is_empty() && tup2.row_var().is_none() {
                return Err(width_error());
            }
            if !only_in_2.is_empty() && tup1.row_var().is_none() {
                return Err(width_error());
            }

            let mut subs = unify_pairs(ctx, &pairs, depth)?;
            match (tup1.row_var().cloned(), tup2.row_var().cloned()) {
                (Some(row1), Some(row2)) => {
                    // Both open: each row absorbs the other's extras, and a
                    // shared fresh tail keeps both extensible.
                    let shared = ctx.fresh_row_var();
                    let rest2 = ctx.record_of(only_in_2, Some(shared.clone()));
                    let rest1 = ctx.record_of(only_in_1, Some(shared));
                    subs.prepend(Subst::bind(row1, rest2));
                    subs.prepend(Subst::bind(row2, rest1));
                }
                (Some(row1), None) => {
                    let rest = ctx.record_of(only_in_2, None);
                    subs.prepend(Subst::bind(row1, rest));
                }
                (None, Some(row2)) => {
                    let rest = ctx.record_of(only_in_1, None);
                    subs.prepend(Subst::bind(row2, rest));
                }
                (None, None) => {}
            }
            Ok(subs)
        }

        (None, None) => {
            let w1 = tup1.width();
            let w2 = tup2.width();
            let shared = w1.min(w2);
            if w1 != w2 {
                let shorter_has_row = if w1 < w2 {
                    tup1.row_var().is_some()
                } else {
                    tup2.row_var().is_some()
                };
                if !shorter_has_row {
                    return Err(width_error());
                }
            }

            let pairs: Vec<(Ty, Ty)> = tup1.fields[..shared]
                .iter()
                .cloned()
                .zip(tup2.fields[..shared].iter().cloned())
                .collect();
            let mut subs = unify_pairs(ctx, &pairs, depth)?;

            // Bind the shorter side's row variable to the remainder.
            match (tup1.row_var().cloned(), tup2.row_var().cloned()) {
                (Some(row1), Some(row2)) if w1 == w2 => {
                    if row1 != row2 {
                        subs.prepend(Subst::bind(row1, row2));
                    }
                }
                (Some(row1), _) if w1 < w2 => {
                    let rest = ctx.tuple_of(tup2.fields[shared..].to_vec());
                    subs.prepend(Subst::bind(row1, rest));
                }
                (_, Some(row2)) if w2 < w1 => {
                    let rest = ctx.tuple_of(tup1.fields[shared..].to_vec());
                    subs.prepend(Subst::bind(row2, rest));
                }
                (Some(row1), None) => {
                    // Equal widths against a closed tuple: the row is empty.
                    let empty = ctx.tuple_of(Vec::new());
                    subs.prepend(Subst::bind(row1, empty));
                }
                (None, Some(row2)) => {
                    let empty = ctx.tuple_of(Vec::new());
                    subs.prepend(Subst::bind(row2, empty));
                }
                _ => {}
            }
            Ok(subs)
        }

        // A record and a bare tuple are different shapes.
        _ => Err(UnifyError::new(t1, t2, UnifyErrorKind::Mismatch)),
    }
}

/// Unify a single pair for a yes/no answer: the substitution on success,
/// `None` on failure, no diagnostic either way. Used by trait resolution.
pub fn try_unify(ctx: &mut TypeCtx, a: &Ty, b: &Ty) -> Option<Subst> {
    unify_one(ctx, a, b, RECURSION_LIMIT).ok()
}

/// [`try_unify`] over parallel lists. Length mismatch is a failure.
pub fn try_unify_all(ctx: &mut TypeCtx, xs: &[Ty], ys: &[Ty]) -> Option<Subst> {
    if xs.len() != ys.len() {
        return None;
    }
    let pairs: Vec<(Ty, Ty)> = xs.iter().cloned().zip(ys.iter().cloned()).collect();
    unify_pairs(ctx, &pairs, RECURSION_LIMIT).ok()
}
