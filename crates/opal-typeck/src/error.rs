//! Type error types with provenance tracking.
//!
//! Every equality constraint carries a [`ConstraintOrigin`] recording where
//! in the source the constraint came from. When unification fails, the
//! origin turns a bare "these two types differ" into a located, contextual
//! diagnostic.

use std::fmt;

use opal_common::Span;
use opal_types::{TraitConstraint, Ty};

/// Where a constraint was generated -- which source construct decided that
/// two types must be equal, or that a trait must be implemented.
#[derive(Clone, Debug)]
pub enum ConstraintOrigin {
    /// An unsuffixed integer literal defaulting to `I32`.
    IntLiteral { span: Span },
    /// An unsuffixed float literal defaulting to `F64`.
    FloatLiteral { span: Span },
    /// A use of a bound name.
    VarUse { span: Span },
    /// A call expression. `arg_span` covers the argument list, which is
    /// where a parameter mismatch is reported.
    Call { span: Span, arg_span: Span },
    /// A binding's declared slot meeting its initializer.
    Binding { span: Span },
    /// An if condition, which must be `Bool`.
    IfCond { span: Span },
    /// Both arms of an if must agree.
    IfBranches {
        span: Span,
        then_span: Span,
        else_span: Span,
    },
    /// A match pattern meeting the scrutinee.
    MatchPattern { span: Span, scrutinee_span: Span },
    /// A match arm's body meeting the match expression's type.
    MatchArms { span: Span, arm_span: Span },
    /// A field access `base.field`.
    FieldAccess { span: Span, field: String },
    /// An assignment target meeting the assigned value.
    Assignment { span: Span },
    /// An explicit type ascription.
    Ascription { span: Span },
    /// A binary operator's operand rules.
    BinOp { span: Span },
    /// The shape of an expression (tuple/record/constructor literal, lambda,
    /// block result).
    Shape { span: Span },
    /// A synthesized constraint with no useful source location.
    Builtin,
}

impl ConstraintOrigin {
    /// The primary source span, if the origin has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            ConstraintOrigin::IntLiteral { span }
            | ConstraintOrigin::FloatLiteral { span }
            | ConstraintOrigin::VarUse { span }
            | ConstraintOrigin::Call { span, .. }
            | ConstraintOrigin::Binding { span }
            | ConstraintOrigin::IfCond { span }
            | ConstraintOrigin::IfBranches { span, .. }
            | ConstraintOrigin::MatchPattern { span, .. }
            | ConstraintOrigin::MatchArms { span, .. }
            | ConstraintOrigin::FieldAccess { span, .. }
            | ConstraintOrigin::Assignment { span }
            | ConstraintOrigin::Ascription { span }
            | ConstraintOrigin::BinOp { span }
            | ConstraintOrigin::Shape { span } => Some(*span),
            ConstraintOrigin::Builtin => None,
        }
    }
}

/// A type error found during inference.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// Two types that should be equal are not.
    Mismatch {
        expected: Ty,
        found: Ty,
        origin: ConstraintOrigin,
    },
    /// A type variable occurs inside the type it would be bound to.
    ///
    /// `var_on_left` records which side the variable was on, for the
    /// "occurs inside" note.
    InfiniteType {
        var: Ty,
        ty: Ty,
        var_on_left: bool,
        origin: ConstraintOrigin,
    },
    /// Function or type-constructor argument count differs.
    ArityMismatch {
        expected: usize,
        found: usize,
        origin: ConstraintOrigin,
    },
    /// Tuple or record widths differ with no row variable to absorb the
    /// difference.
    TupleWidth {
        expected: usize,
        found: usize,
        origin: ConstraintOrigin,
    },
    /// No implementation matches a required trait constraint.
    TraitUnsatisfied {
        constraint: TraitConstraint,
        origin: ConstraintOrigin,
    },
    /// More than one implementation matches a ground trait constraint.
    OverlappingImpls {
        constraint: TraitConstraint,
        candidates: Vec<TraitConstraint>,
        origin: ConstraintOrigin,
    },
    /// A type variable survived solving in a position that cannot be
    /// generalized.
    AmbiguousType { ty: Ty, span: Span },
    /// A binding not marked recursive mentions itself in its initializer.
    SelfReference { name: String, span: Span },
}

impl TypeError {
    /// The origin this error points at, if any.
    pub fn origin(&self) -> Option<&ConstraintOrigin> {
        match self {
            TypeError::Mismatch { origin, .. }
            | TypeError::InfiniteType { origin, .. }
            | TypeError::ArityMismatch { origin, .. }
            | TypeError::TupleWidth { origin, .. }
            | TypeError::TraitUnsatisfied { origin, .. }
            | TypeError::OverlappingImpls { origin, .. } => Some(origin),
            TypeError::AmbiguousType { .. } | TypeError::SelfReference { .. } => None,
        }
    }

    /// The primary source span of the error.
    pub fn span(&self) -> Option<Span> {
        match self {
            TypeError::AmbiguousType { span, .. } | TypeError::SelfReference { span, .. } => {
                Some(*span)
            }
            other => other.origin().and_then(ConstraintOrigin::span),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch {
                expected, found, ..
            } => {
                write!(f, "expected `{expected}`, found `{found}`")
            }
            TypeError::InfiniteType { var, ty, .. } => {
                write!(f, "infinite type: `{var}` occurs in `{ty}`")
            }
            TypeError::ArityMismatch {
                expected, found, ..
            } => {
                write!(
                    f,
                    "arity mismatch: expected {expected} argument(s), found {found}"
                )
            }
            TypeError::TupleWidth {
                expected, found, ..
            } => {
                write!(
                    f,
                    "field count mismatch: expected {expected} field(s), found {found}"
                )
            }
            TypeError::TraitUnsatisfied { constraint, .. } => {
                write!(f, "no implementation of `{constraint}`")
            }
            TypeError::OverlappingImpls {
                constraint,
                candidates,
                ..
            } => {
                write!(
                    f,
                    "multiple implementations match `{constraint}`: {}",
                    candidates
                        .iter()
                        .map(|c| format!("`{c}`"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            TypeError::AmbiguousType { ty, .. } => {
                write!(f, "ambiguous type: `{ty}` was never resolved")
            }
            TypeError::SelfReference { name, .. } => {
                write!(f, "`{name}` is used in its own initializer")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use opal_types::TypeCtx;

    use super::*;

    #[test]
    fn mismatch_display() {
        let mut ctx = TypeCtx::new();
        let err = TypeError::Mismatch {
            expected: ctx.i32(),
            found: ctx.bool(),
            origin: ConstraintOrigin::Builtin,
        };
        assert_eq!(err.to_string(), "expected `I32`, found `Bool`");
        assert_eq!(err.span(), None);
    }

    #[test]
    fn origin_span_extraction() {
        let mut ctx = TypeCtx::new();
        let err = TypeError::Mismatch {
            expected: ctx.i32(),
            found: ctx.bool(),
            origin: ConstraintOrigin::Call {
                span: Span::new(0, 10),
                arg_span: Span::new(5, 10),
            },
        };
        assert_eq!(err.span(), Some(Span::new(0, 10)));
    }
}
