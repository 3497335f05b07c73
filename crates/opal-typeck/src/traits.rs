//! Trait implementation table and constraint resolution.
//!
//! Implementations are registered before inference starts (the driver scans
//! the declaration arena). During solving, each trait constraint is looked
//! up here under the current substitution: every registered impl of the
//! trait is instantiated with fresh variables and its argument pattern is
//! trial-unified against the constraint's arguments.
//!
//! Resolution only ever commits on *ground* argument types (no variables
//! left): zero matches is an unsatisfied-trait error, more than one is an
//! overlap error, and exactly one match also unifies the
//! functional-dependency witnesses, which is what lets an impl determine
//! output types from input types. Constraints whose arguments still carry
//! variables are the solver's problem: it defers them and retries once the
//! substitution has grown, rather than guessing an impl early.

use rustc_hash::FxHashMap;

use opal_ast::{DeclArena, DeclKind};
use opal_common::DeclId;
use opal_types::{Subst, TraitConstraint, Ty, TypeCtx};

use crate::error::{ConstraintOrigin, TypeError};
use crate::unify::try_unify_all;

/// All registered trait implementations, keyed by trait declaration.
#[derive(Debug, Default)]
pub struct TraitTable {
    impls: FxHashMap<DeclId, Vec<TraitConstraint>>,
}

impl TraitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `impl` declaration from the arena.
    pub fn from_decls(decls: &DeclArena) -> Self {
        let mut table = Self::new();
        for (_, decl) in decls.iter() {
            if let DeclKind::Impl { constraint } = &decl.kind {
                table.register(constraint.clone());
            }
        }
        table
    }

    pub fn register(&mut self, imp: TraitConstraint) {
        self.impls.entry(imp.decl).or_default().push(imp);
    }

    pub fn impls_for(&self, trait_decl: DeclId) -> &[TraitConstraint] {
        self.impls
            .get(&trait_decl)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the constraint's arguments are fully determined, i.e. whether
    /// [`TraitTable::resolve_ground`] may be called on it.
    pub fn is_ground(constraint: &TraitConstraint) -> bool {
        constraint.args.iter().all(|t| !t.is_generic())
    }

    /// Resolve a ground constraint. Returns the narrowing substitution from
    /// the matching impl's functional dependencies.
    ///
    /// The caller guarantees the arguments carry no variables; the fundep
    /// witnesses may still be open, and narrowing them is the point.
    pub fn resolve_ground(
        &self,
        ctx: &mut TypeCtx,
        constraint: &TraitConstraint,
        origin: &ConstraintOrigin,
    ) -> Result<Subst, TypeError> {
        debug_assert!(Self::is_ground(constraint));

        let mut matches: Vec<(TraitConstraint, Subst)> = Vec::new();
        for imp in self.impls_for(constraint.decl) {
            // Fresh variables per candidate so one trial cannot contaminate
            // the next.
            let candidate = ctx.copy_constraint_with_fresh_vars(imp);
            if let Some(subs) = try_unify_all(ctx, &constraint.args, &candidate.args) {
                matches.push((candidate, subs));
            }
        }

        match matches.len() {
            0 => Err(TypeError::TraitUnsatisfied {
                constraint: constraint.clone(),
                origin: origin.clone(),
            }),
            1 => {
                let (candidate, mut subs) = matches.pop().expect("one match");
                // Functional dependencies narrow whatever the argument
                // match left open.
                if !constraint.fundeps.is_empty() {
                    let deps: Vec<Ty> = constraint
                        .fundeps
                        .iter()
                        .map(|t| subs.apply(ctx, t))
                        .collect();
                    let impl_deps: Vec<Ty> = candidate
                        .fundeps
                        .iter()
                        .map(|t| subs.apply(ctx, t))
                        .collect();
                    match try_unify_all(ctx, &deps, &impl_deps) {
                        Some(narrowed) => subs.prepend(narrowed),
                        // The only candidate's dependencies conflict with
                        // what is already known: nothing satisfies this.
                        None => {
                            return Err(TypeError::TraitUnsatisfied {
                                constraint: constraint.clone(),
                                origin: origin.clone(),
                            })
                        }
                    }
                }
                Ok(subs)
            }
            _ => Err(TypeError::OverlappingImpls {
                constraint: constraint.clone(),
                candidates: matches.into_iter().map(|(c, _)| c).collect(),
                origin: origin.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trait_id() -> DeclId {
        DeclId(100)
    }

    fn constraint(args: Vec<Ty>, fundeps: Vec<Ty>) -> TraitConstraint {
        TraitConstraint {
            decl: trait_id(),
            name: "Cast".into(),
            args,
            fundeps,
        }
    }

    #[test]
    fn ground_constraint_resolves_against_single_impl() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let mut table = TraitTable::new();
        table.register(constraint(vec![i32.clone()], vec![]));

        let result = table.resolve_ground(
            &mut ctx,
            &constraint(vec![i32], vec![]),
            &ConstraintOrigin::Builtin,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn groundness_check() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let open = ctx.fresh_var();
        assert!(TraitTable::is_ground(&constraint(vec![i32], vec![open.clone()])));
        assert!(!TraitTable::is_ground(&constraint(vec![open], vec![])));
    }

    #[test]
    fn unsatisfied_when_no_impl_matches() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let boolean = ctx.bool();
        let mut table = TraitTable::new();
        table.register(constraint(vec![i32], vec![]));

        let err = table
            .resolve_ground(
                &mut ctx,
                &constraint(vec![boolean], vec![]),
                &ConstraintOrigin::Builtin,
            )
            .unwrap_err();
        assert!(matches!(err, TypeError::TraitUnsatisfied { .. }));
    }

    #[test]
    fn overlapping_ground_impls_are_an_error() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let a = ctx.named_var("a");
        let mut table = TraitTable::new();
        table.register(constraint(vec![i32.clone()], vec![]));
        // A blanket impl overlapping the concrete one.
        table.register(constraint(vec![a], vec![]));

        let err = table
            .resolve_ground(
                &mut ctx,
                &constraint(vec![i32], vec![]),
                &ConstraintOrigin::Builtin,
            )
            .unwrap_err();
        match err {
            TypeError::OverlappingImpls { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected OverlappingImpls, got {other:?}"),
        }
    }

    #[test]
    fn fundep_narrows_the_output_variable() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let f64 = ctx.f64();
        let mut table = TraitTable::new();
        // impl Cast I32 -> F64
        table.register(constraint(vec![i32.clone()], vec![f64.clone()]));

        let out = ctx.fresh_var();
        let subs = table
            .resolve_ground(
                &mut ctx,
                &constraint(vec![i32], vec![out.clone()]),
                &ConstraintOrigin::Builtin,
            )
            .unwrap();
        assert_eq!(subs.apply(&mut ctx, &out), f64);
    }

    #[test]
    fn fundep_conflict_is_unsatisfied() {
        let mut ctx = TypeCtx::new();
        let i32 = ctx.i32();
        let f64 = ctx.f64();
        let boolean = ctx.bool();
        let mut table = TraitTable::new();
        table.register(constraint(vec![i32.clone()], vec![f64]));

        let err = table
            .resolve_ground(
                &mut ctx,
                &constraint(vec![i32], vec![boolean]),
                &ConstraintOrigin::Builtin,
            )
            .unwrap_err();
        assert!(matches!(err, TypeError::TraitUnsatisfied { .. }));
    }
}
