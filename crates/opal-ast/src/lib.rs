//! Abstract syntax tree for the Opal compiler.
//!
//! The parser (out of scope here) produces a [`Module`]: a top-level
//! sequence of items, a [`DeclArena`] holding every declaration, and a
//! [`SymbolTable`] mapping source names to declarations. Name resolution has
//! already happened: variable references carry `DeclId`s, not strings.
//!
//! Every expression, pattern, and declaration carries a mutable `ty` slot,
//! `None` straight out of the parser. The type checker fills the slots in
//! its annotation pass and rewrites them in its substitution pass; it never
//! re-shapes the tree.

pub mod decl;
pub mod expr;

pub use decl::{DataDef, Decl, DeclArena, DeclKind, TraitDef, VariantDef};
pub use expr::{BinOp, Expr, ExprKind, MatchArm, PatKind, Pattern};

use opal_common::{DeclId, Span};
use rustc_hash::FxHashMap;

/// A parsed, name-resolved compilation unit.
#[derive(Debug, Default)]
pub struct Module {
    pub decls: DeclArena,
    pub symbols: SymbolTable,
    pub items: Vec<Item>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level binding item for `decl` with the given initializer.
    pub fn push_binding(&mut self, decl: DeclId, value: Expr, recursive: bool, span: Span) {
        self.items.push(Item::Binding(Binding {
            decl,
            value,
            recursive,
            span,
        }));
    }

    /// Add a bare top-level expression item.
    pub fn push_expr(&mut self, expr: Expr) {
        self.items.push(Item::Expr(expr));
    }
}

/// One element of the top-level sequence.
#[derive(Debug)]
pub enum Item {
    /// `let name = expr` / `fn name params = expr` at the top level.
    Binding(Binding),
    /// A bare expression evaluated for its value.
    Expr(Expr),
}

/// A top-level binding. The bound declaration lives in the arena; the
/// initializer expression is owned here so that walking it never needs a
/// second borrow of the arena.
#[derive(Debug)]
pub struct Binding {
    pub decl: DeclId,
    pub value: Expr,
    /// Whether the initializer may reference `decl`. The checker rejects a
    /// self-reference in a binding not marked recursive.
    pub recursive: bool,
    pub span: Span,
}

/// Maps declared names to their declarations.
///
/// Later definitions shadow earlier ones, matching source order; the type
/// checker itself never consults this table (references are resolved), but
/// builtin registration and tests do.
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: FxHashMap<String, DeclId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, decl: DeclId) {
        self.names.insert(name.into(), decl);
    }

    pub fn lookup(&self, name: &str) -> Option<DeclId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_table_shadowing() {
        let mut table = SymbolTable::new();
        table.define("x", DeclId(0));
        table.define("x", DeclId(1));
        assert_eq!(table.lookup("x"), Some(DeclId(1)));
        assert_eq!(table.lookup("y"), None);
    }
}
