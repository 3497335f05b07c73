//! Type representation for the Opal type system.
//!
//! Defines the interned [`Ty`] handle and its closed [`TyKind`] set, type
//! variables ([`TyVar`]), trait constraints ([`TraitConstraint`]), and
//! polymorphic type schemes ([`Scheme`]). Handles are produced exclusively by
//! [`TypeCtx`](crate::ctx::TypeCtx), which hash-conses them: structurally
//! equal types built by one context share a pointer, so equality checks hit
//! the pointer comparison first and non-generic types never need a deep walk.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use opal_common::DeclId;

/// Primitive type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimTy {
    I8,
    I16,
    I32,
    I64,
    /// Pointer-sized signed integer.
    Isz,
    U8,
    U16,
    U32,
    U64,
    /// Pointer-sized unsigned integer.
    Usz,
    /// 8-bit character.
    C8,
    /// 32-bit character (a Unicode scalar).
    C32,
    F16,
    F32,
    F64,
    Bool,
    Unit,
}

impl fmt::Display for PrimTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimTy::I8 => "I8",
            PrimTy::I16 => "I16",
            PrimTy::I32 => "I32",
            PrimTy::I64 => "I64",
            PrimTy::Isz => "Isz",
            PrimTy::U8 => "U8",
            PrimTy::U16 => "U16",
            PrimTy::U32 => "U32",
            PrimTy::U64 => "U64",
            PrimTy::Usz => "Usz",
            PrimTy::C8 => "C8",
            PrimTy::C32 => "C32",
            PrimTy::F16 => "F16",
            PrimTy::F32 => "F32",
            PrimTy::F64 => "F64",
            PrimTy::Bool => "Bool",
            PrimTy::Unit => "Unit",
        };
        write!(f, "{name}")
    }
}

/// A type metavariable, identified by a strictly monotone `u32` from the
/// context's fresh supply.
///
/// The `row` flag marks row variables, which stand for an unspecified set of
/// trailing record fields and may only appear as the last field of a tuple.
///
/// The `name` field carries a user-facing name (from a source-level type
/// variable such as `'a`) and is used ONLY for display. It is intentionally
/// excluded from `PartialEq` and `Hash`: variable identity is the id alone.
#[derive(Debug, Clone)]
pub struct TyVar {
    pub id: u32,
    pub row: bool,
    /// Display name, if the variable came from source. Excluded from identity.
    pub name: Option<Box<str>>,
}

impl PartialEq for TyVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id // name intentionally excluded
    }
}

impl Eq for TyVar {}

impl Hash for TyVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state); // name intentionally excluded
    }
}

impl fmt::Display for TyVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "'{name}"),
            None => write!(f, "'{}", self.id),
        }
    }
}

/// Orthogonal modifiers carried by [`TyKind::Modified`].
///
/// Modifiers are carrier-only wrappers: they never change the shape of the
/// inner type, unification descends through them, and substitution preserves
/// them on the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Mut,
    /// A compile-time-only value: erased from lowered signatures.
    Comptime,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Mut => write!(f, "mut"),
            Modifier::Comptime => write!(f, "comptime"),
        }
    }
}

/// A positional tuple or anonymous record.
///
/// When `names` is present it names the non-row fields in order. A row
/// variable, if any, is the last element of `fields` (enforced by the
/// constructors on `TypeCtx`) and subsumes any further fields during
/// unification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleTy {
    pub fields: Vec<Ty>,
    pub names: Option<Vec<String>>,
}

impl TupleTy {
    /// The trailing row variable, if this tuple has one.
    pub fn row_var(&self) -> Option<&Ty> {
        self.fields.last().filter(|t| t.is_row_var())
    }

    /// Field count excluding a trailing row variable.
    pub fn width(&self) -> usize {
        self.fields.len() - usize::from(self.row_var().is_some())
    }

    /// The non-row fields, paired with their names when this is a record.
    pub fn named_fields(&self) -> Option<impl Iterator<Item = (&str, &Ty)>> {
        let names = self.names.as_ref()?;
        Some(
            names
                .iter()
                .map(String::as_str)
                .zip(self.fields.iter().take(self.width())),
        )
    }
}

/// A nominal type constructor applied to zero or more arguments.
///
/// `decl` is a stable index into the declaration arena; the declaration in
/// turn owns the constructor signatures. Indices rather than owned references
/// keep the type graph acyclic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataTy {
    pub name: String,
    pub args: Vec<Ty>,
    pub decl: DeclId,
}

/// A function type: ordered parameters, return type, and the deduplicated
/// trait constraints the function carries.
///
/// Constraints ride along on the type but never unify: unification of two
/// function types propagates both sides' constraints untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncTy {
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub constraints: Vec<TraitConstraint>,
}

/// A required trait implementation: the trait's declaration, the argument
/// types it is applied to, and its functional-dependency witnesses.
///
/// Structural equality compares `decl`, `args`, and `fundeps` component-wise.
/// The `name` field is the trait's name for display and is excluded from
/// equality and hashing.
#[derive(Debug, Clone)]
pub struct TraitConstraint {
    pub decl: DeclId,
    /// Trait name for display only. Excluded from identity.
    pub name: String,
    pub args: Vec<Ty>,
    pub fundeps: Vec<Ty>,
}

impl PartialEq for TraitConstraint {
    fn eq(&self, other: &Self) -> bool {
        // name intentionally excluded
        self.decl == other.decl && self.args == other.args && self.fundeps == other.fundeps
    }
}

impl Eq for TraitConstraint {}

impl Hash for TraitConstraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.decl.hash(state);
        self.args.hash(state);
        self.fundeps.hash(state);
    }
}

impl fmt::Display for TraitConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", DisplayArg(arg))?;
        }
        if !self.fundeps.is_empty() {
            write!(f, " ->")?;
            for dep in &self.fundeps {
                write!(f, " {}", DisplayArg(dep))?;
            }
        }
        Ok(())
    }
}

/// The closed set of type shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TyKind {
    Prim(PrimTy),
    /// Single-indirection pointer.
    Ptr(Ty),
    /// Fixed-length (`Some`) or length-polymorphic (`None`) array.
    Array(Ty, Option<u64>),
    Tuple(TupleTy),
    /// A struct-like nominal type application.
    Data(DataTy),
    /// A tagged-union nominal type application.
    Union(DataTy),
    Func(FuncTy),
    Var(TyVar),
    /// Carrier-only wrapper; never nests the same flag twice.
    Modified(Modifier, Ty),
    /// A compile-time function, evaluated by the interpreter rather than
    /// emitted. Terminal for unification.
    MetaFunc(FuncTy),
    /// An unresolved overload set. Terminal for unification.
    FuncList(Vec<Ty>),
    /// The type given to a type used as a compile-time value. Terminal.
    Kind(Ty),
    /// The type of declarations that produce no value. Terminal.
    Void,
}

/// Head-constructor tag, used for the cheap first comparison in unification.
///
/// `Modified` is transparent: a modified type reports its inner type's tag,
/// since modifiers never change the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TyTag {
    Prim(PrimTy),
    Ptr,
    Array,
    Tuple,
    Data,
    Union,
    Func,
    Var,
    MetaFunc,
    FuncList,
    Kind,
    Void,
}

/// Interned payload behind a [`Ty`] handle.
#[derive(Debug)]
pub struct TyInfo {
    pub kind: TyKind,
    /// Whether the type transitively contains a `Var`. Memoized at
    /// construction so non-generic types short-circuit substitution and
    /// containment checks.
    pub generic: bool,
}

/// An interned type handle.
///
/// Cloning is a reference-count bump. Equality is pointer identity first,
/// structural second; since the context hash-conses, structurally equal
/// types from one context always take the pointer path.
#[derive(Clone)]
pub struct Ty(Rc<TyInfo>);

impl Ty {
    pub(crate) fn new(info: TyInfo) -> Self {
        Ty(Rc::new(info))
    }

    pub fn kind(&self) -> &TyKind {
        &self.0.kind
    }

    /// Whether this type transitively contains a type variable.
    pub fn is_generic(&self) -> bool {
        self.0.generic
    }

    /// Pointer identity.
    pub fn ptr_eq(&self, other: &Ty) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The head-constructor tag, looking through modifiers.
    pub fn tag(&self) -> TyTag {
        match self.kind() {
            TyKind::Prim(p) => TyTag::Prim(*p),
            TyKind::Ptr(_) => TyTag::Ptr,
            TyKind::Array(..) => TyTag::Array,
            TyKind::Tuple(_) => TyTag::Tuple,
            TyKind::Data(_) => TyTag::Data,
            TyKind::Union(_) => TyTag::Union,
            TyKind::Func(_) => TyTag::Func,
            TyKind::Var(_) => TyTag::Var,
            TyKind::Modified(_, inner) => inner.tag(),
            TyKind::MetaFunc(_) => TyTag::MetaFunc,
            TyKind::FuncList(_) => TyTag::FuncList,
            TyKind::Kind(_) => TyTag::Kind,
            TyKind::Void => TyTag::Void,
        }
    }

    /// Strip all modifier wrappers, returning the carried type.
    pub fn strip_modifiers(&self) -> &Ty {
        match self.kind() {
            TyKind::Modified(_, inner) => inner.strip_modifiers(),
            _ => self,
        }
    }

    /// Whether any modifier layer carries `flag`.
    pub fn has_modifier(&self, flag: Modifier) -> bool {
        match self.kind() {
            TyKind::Modified(m, inner) => *m == flag || inner.has_modifier(flag),
            _ => false,
        }
    }

    /// The variable at the head of this type, if it is one (not looking
    /// through modifiers).
    pub fn as_var(&self) -> Option<&TyVar> {
        match self.kind() {
            TyKind::Var(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this is a row variable.
    pub fn is_row_var(&self) -> bool {
        matches!(self.kind(), TyKind::Var(v) if v.row)
    }

    /// Whether `var` occurs anywhere inside this type.
    ///
    /// Comparing a variable against itself returns `false` (the pointer
    /// short-circuit): binding a variable to itself is a no-op, not a cycle.
    /// Only generic subterms are walked.
    pub fn contains_var(&self, var: &TyVar) -> bool {
        if let TyKind::Var(v) = self.kind() {
            if v == var {
                return false;
            }
        }
        self.contains_var_inner(var)
    }

    fn contains_var_inner(&self, var: &TyVar) -> bool {
        if !self.is_generic() {
            return false;
        }
        match self.kind() {
            TyKind::Var(v) => v == var,
            TyKind::Prim(_) | TyKind::Void => false,
            TyKind::Ptr(inner) | TyKind::Modified(_, inner) | TyKind::Kind(inner) => {
                inner.contains_var_inner(var)
            }
            TyKind::Array(elem, _) => elem.contains_var_inner(var),
            TyKind::Tuple(tup) => tup.fields.iter().any(|t| t.contains_var_inner(var)),
            TyKind::Data(d) | TyKind::Union(d) => {
                d.args.iter().any(|t| t.contains_var_inner(var))
            }
            TyKind::Func(func) | TyKind::MetaFunc(func) => {
                func.params.iter().any(|t| t.contains_var_inner(var))
                    || func.ret.contains_var_inner(var)
                    || func.constraints.iter().any(|c| {
                        c.args.iter().any(|t| t.contains_var_inner(var))
                    })
            }
            TyKind::FuncList(fns) => fns.iter().any(|t| t.contains_var_inner(var)),
        }
    }

    /// Collect every distinct variable contained in this type, in order of
    /// first appearance. Constraint arguments on function types count.
    pub fn contained_vars(&self) -> Vec<TyVar> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<TyVar>) {
        if !self.is_generic() {
            return;
        }
        match self.kind() {
            TyKind::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            TyKind::Prim(_) | TyKind::Void => {}
            TyKind::Ptr(inner) | TyKind::Modified(_, inner) | TyKind::Kind(inner) => {
                inner.collect_vars(out);
            }
            TyKind::Array(elem, _) => elem.collect_vars(out),
            TyKind::Tuple(tup) => {
                for field in &tup.fields {
                    field.collect_vars(out);
                }
            }
            TyKind::Data(d) | TyKind::Union(d) => {
                for arg in &d.args {
                    arg.collect_vars(out);
                }
            }
            TyKind::Func(func) | TyKind::MetaFunc(func) => {
                for param in &func.params {
                    param.collect_vars(out);
                }
                func.ret.collect_vars(out);
                for constraint in &func.constraints {
                    for arg in &constraint.args {
                        arg.collect_vars(out);
                    }
                }
            }
            TyKind::FuncList(fns) => {
                for f in fns {
                    f.collect_vars(out);
                }
            }
        }
    }

    /// Whether this type contains a variable whose id is not in `known`.
    pub fn has_var_not_in(&self, known: &[TyVar]) -> bool {
        self.contained_vars().iter().any(|v| !known.contains(v))
    }

    /// Structural comparison modulo modifier flags: tags and shapes must
    /// match, but `mut I32` and `I32` compare equal. This is the equality
    /// used for non-generic types in unification.
    pub fn approx_eq(&self, other: &Ty) -> bool {
        let a = self.strip_modifiers();
        let b = other.strip_modifiers();
        if a.ptr_eq(b) {
            return true;
        }
        match (a.kind(), b.kind()) {
            (TyKind::Prim(p1), TyKind::Prim(p2)) => p1 == p2,
            (TyKind::Ptr(t1), TyKind::Ptr(t2)) => t1.approx_eq(t2),
            (TyKind::Array(t1, l1), TyKind::Array(t2, l2)) => {
                // A missing length is length-polymorphic and matches any.
                t1.approx_eq(t2)
                    && match (l1, l2) {
                        (Some(a), Some(b)) => a == b,
                        _ => true,
                    }
            }
            (TyKind::Tuple(t1), TyKind::Tuple(t2)) => {
                t1.names == t2.names
                    && t1.fields.len() == t2.fields.len()
                    && t1
                        .fields
                        .iter()
                        .zip(&t2.fields)
                        .all(|(a, b)| a.approx_eq(b))
            }
            (TyKind::Data(d1), TyKind::Data(d2)) | (TyKind::Union(d1), TyKind::Union(d2)) => {
                d1.decl == d2.decl
                    && d1.args.len() == d2.args.len()
                    && d1.args.iter().zip(&d2.args).all(|(a, b)| a.approx_eq(b))
            }
            (TyKind::Func(f1), TyKind::Func(f2))
            | (TyKind::MetaFunc(f1), TyKind::MetaFunc(f2)) => {
                f1.params.len() == f2.params.len()
                    && f1
                        .params
                        .iter()
                        .zip(&f2.params)
                        .all(|(a, b)| a.approx_eq(b))
                    && f1.ret.approx_eq(&f2.ret)
            }
            (TyKind::Var(v1), TyKind::Var(v2)) => v1 == v2,
            (TyKind::FuncList(a1), TyKind::FuncList(a2)) => {
                a1.len() == a2.len() && a1.iter().zip(a2).all(|(a, b)| a.approx_eq(b))
            }
            (TyKind::Kind(t1), TyKind::Kind(t2)) => t1.approx_eq(t2),
            (TyKind::Void, TyKind::Void) => true,
            _ => false,
        }
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0.kind == other.0.kind
    }
}

impl Eq for Ty {}

impl Hash for Ty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.kind.hash(state);
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({self})")
    }
}

/// Wraps a type that appears in argument position, parenthesizing compound
/// shapes so `Maybe (*I32)` does not print as `Maybe *I32`.
struct DisplayArg<'a>(&'a Ty);

impl fmt::Display for DisplayArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let needs_parens = match self.0.kind() {
            TyKind::Func(_) | TyKind::MetaFunc(_) | TyKind::Modified(..) | TyKind::Kind(_) => true,
            TyKind::Data(d) | TyKind::Union(d) => !d.args.is_empty(),
            TyKind::Ptr(_) => true,
            _ => false,
        };
        if needs_parens {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TyKind::Prim(p) => write!(f, "{p}"),
            TyKind::Ptr(inner) => write!(f, "*{}", DisplayArg(inner)),
            TyKind::Array(elem, Some(len)) => write!(f, "[{len} {}]", DisplayArg(elem)),
            TyKind::Array(elem, None) => write!(f, "[{}]", DisplayArg(elem)),
            TyKind::Tuple(tup) => fmt_tuple(tup, f),
            TyKind::Data(d) | TyKind::Union(d) => {
                write!(f, "{}", d.name)?;
                for arg in &d.args {
                    write!(f, " {}", DisplayArg(arg))?;
                }
                Ok(())
            }
            TyKind::Func(func) => fmt_func(func, f),
            TyKind::Var(v) => write!(f, "{v}"),
            TyKind::Modified(m, inner) => write!(f, "{m} {inner}"),
            TyKind::MetaFunc(func) => {
                write!(f, "meta ")?;
                fmt_func(func, f)
            }
            TyKind::FuncList(fns) => {
                for (i, func) in fns.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{func}")?;
                }
                Ok(())
            }
            TyKind::Kind(inner) => write!(f, "type {}", DisplayArg(inner)),
            TyKind::Void => write!(f, "Void"),
        }
    }
}

fn fmt_tuple(tup: &TupleTy, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let width = tup.width();
    match &tup.names {
        Some(names) => {
            write!(f, "{{")?;
            for (i, (name, field)) in names.iter().zip(&tup.fields).enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{name}: {field}")?;
            }
            if let Some(row) = tup.row_var() {
                if width > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "..{row}")?;
            }
            write!(f, "}}")
        }
        None => {
            write!(f, "(")?;
            for (i, field) in tup.fields.iter().take(width).enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{field}")?;
            }
            if let Some(row) = tup.row_var() {
                if width > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "..{row}")?;
            }
            write!(f, ")")
        }
    }
}

fn fmt_func(func: &FuncTy, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (i, param) in func.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{param}")?;
    }
    write!(f, ") -> {}", func.ret)?;
    if !func.constraints.is_empty() {
        write!(f, " given ")?;
        for (i, constraint) in func.constraints.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{constraint}")?;
        }
    }
    Ok(())
}

/// A polymorphic type scheme: quantified variables, the trait constraints
/// the binding carries, and the body type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheme {
    pub vars: Vec<TyVar>,
    pub constraints: Vec<TraitConstraint>,
    pub ty: Ty,
}

impl Scheme {
    /// A monomorphic scheme (nothing quantified).
    pub fn mono(ty: Ty) -> Self {
        Scheme {
            vars: Vec::new(),
            constraints: Vec::new(),
            ty,
        }
    }

    pub fn is_mono(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.vars.is_empty() {
            write!(f, "forall")?;
            for var in &self.vars {
                write!(f, " {var}")?;
            }
            write!(f, ". ")?;
        }
        write!(f, "{}", self.ty)?;
        if !self.constraints.is_empty() {
            write!(f, " given ")?;
            for (i, constraint) in self.constraints.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{constraint}")?;
            }
        }
        Ok(())
    }
}
