//! Declarations and the arena that owns them.
//!
//! All declarations — binding targets, parameters, data types, traits,
//! impls, builtins — live in one [`DeclArena`], addressed by stable
//! [`DeclId`]s. Nominal types refer back to their declaration by id, which
//! keeps the type graph free of ownership cycles.

use opal_common::{DeclId, Span};
use opal_types::{Scheme, TraitConstraint, Ty};

/// A named declaration with its inference slots.
///
/// `ty` is the working annotation filled by the annotator and rewritten by
/// the substitution pass. `scheme` is set once a generalizable binding has
/// been solved; uses in later items instantiate it.
#[derive(Debug)]
pub struct Decl {
    pub name: String,
    pub span: Span,
    pub kind: DeclKind,
    pub ty: Option<Ty>,
    pub scheme: Option<Scheme>,
}

impl Decl {
    pub fn new(name: impl Into<String>, span: Span, kind: DeclKind) -> Self {
        Decl {
            name: name.into(),
            span,
            kind,
            ty: None,
            scheme: None,
        }
    }

    /// Whether residual variables in this declaration's type quantify into a
    /// scheme rather than being reported as ambiguous.
    pub fn is_generalizable(&self) -> bool {
        matches!(self.kind, DeclKind::Global { .. })
    }
}

/// What a declaration declares.
#[derive(Debug)]
pub enum DeclKind {
    /// A top-level binding target (`let x = …`, `fn f a b = …`).
    Global { mutable: bool, comptime: bool },
    /// A local binding target inside an expression.
    Local { mutable: bool },
    /// A function or lambda parameter.
    Param { mutable: bool, comptime: bool },
    /// A compiler-provided value; its `scheme` is preset at registration.
    Builtin,
    /// A struct or tagged-union type declaration.
    Data(DataDef),
    /// A trait declaration.
    Trait(TraitDef),
    /// A trait method; its `scheme` (carrying the trait constraint) is
    /// preset at registration.
    Method { owner: DeclId },
    /// A trait implementation to be registered with the resolver.
    Impl { constraint: TraitConstraint },
}

/// A data type definition: its type parameters (as named type variables
/// shared by the variant field types) and its variants.
#[derive(Debug)]
pub struct DataDef {
    pub params: Vec<Ty>,
    pub variants: Vec<VariantDef>,
    /// Tagged unions unify only with tagged unions; structs only with structs.
    pub is_union: bool,
}

/// One constructor of a data type.
#[derive(Debug, Clone)]
pub struct VariantDef {
    pub name: String,
    pub fields: Vec<Ty>,
}

/// A trait declaration: argument and functional-dependency arity, plus the
/// method declarations it owns.
#[derive(Debug)]
pub struct TraitDef {
    /// The trait's type parameters, as named type variables.
    pub params: Vec<Ty>,
    /// Parameters determined by the others (functional dependencies).
    pub fundeps: Vec<Ty>,
    pub methods: Vec<DeclId>,
}

/// Arena of declarations with stable indices.
#[derive(Debug, Default)]
pub struct DeclArena {
    decls: Vec<Decl>,
}

impl DeclArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn get(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId(i as u32), d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_ids_are_stable() {
        let mut arena = DeclArena::new();
        let a = arena.alloc(Decl::new(
            "x",
            Span::dummy(),
            DeclKind::Local { mutable: false },
        ));
        let b = arena.alloc(Decl::new(
            "y",
            Span::dummy(),
            DeclKind::Local { mutable: true },
        ));
        assert_ne!(a, b);
        assert_eq!(arena.get(a).name, "x");
        assert_eq!(arena.get(b).name, "y");

        arena.get_mut(a).name.push('2');
        assert_eq!(arena.get(a).name, "x2");
    }

    #[test]
    fn only_globals_generalize() {
        let global = Decl::new(
            "f",
            Span::dummy(),
            DeclKind::Global {
                mutable: false,
                comptime: false,
            },
        );
        let param = Decl::new(
            "x",
            Span::dummy(),
            DeclKind::Param {
                mutable: false,
                comptime: false,
            },
        );
        assert!(global.is_generalizable());
        assert!(!param.is_generalizable());
    }
}
