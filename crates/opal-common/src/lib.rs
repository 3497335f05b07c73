//! Shared infrastructure for the Opal compiler.
//!
//! This crate holds the types that every compiler stage agrees on:
//! byte-offset [`Span`]s with on-demand line/column lookup, the stable
//! [`DeclId`] handle into the declaration arena, and the structured
//! [`diag::Diagnostic`] records that stages emit into a [`diag::DiagnosticSink`].

pub mod diag;
pub mod span;

pub use diag::{Diagnostic, DiagnosticSink, Severity};
pub use span::{LineIndex, Span};

use serde::Serialize;

/// A stable index into the declaration arena.
///
/// Declarations (parameters, let-bindings, functions, data types, traits,
/// impls) live in a single arena owned by the AST. Everything else refers to
/// them by `DeclId`, which breaks the ownership cycle between nominal types
/// and the declarations that introduce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for DeclId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
