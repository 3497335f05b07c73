//! Type system for the Opal compiler.
//!
//! This crate defines the data the inference pipeline operates on:
//!
//! - [`ty`]: the interned [`Ty`] handle, its closed [`TyKind`] set, type
//!   variables, trait constraints, and polymorphic [`Scheme`]s
//! - [`ctx`]: the per-compilation [`TypeCtx`] owning the fresh-variable
//!   supply and the hash-consing constructors
//! - [`subst`]: ordered [`Subst`]itutions and the bounded substitute
//!   operation that applies them
//!
//! The inference pipeline itself lives in `opal-typeck`; the AST that carries
//! the type slots lives in `opal-ast`.

pub mod ctx;
pub mod subst;
pub mod ty;

pub use ctx::TypeCtx;
pub use subst::{Subst, RECURSION_LIMIT};
pub use ty::{
    DataTy, FuncTy, Modifier, PrimTy, Scheme, TraitConstraint, TupleTy, Ty, TyKind, TyTag, TyVar,
};
