//! Second inference pass: emit constraints against the annotations.
//!
//! Walks the annotated AST read-only and produces a [`ConstraintList`] of
//! equality and trait-implementation obligations, in emission order. Each
//! node's own constraints are emitted before its children's, so the solver
//! (which works right-to-left) sees leaf constraints first and the error for
//! a conflict lands on the outermost construct that required it.

use opal_ast::{Binding, DeclArena, DeclKind, Expr, ExprKind, Item, MatchArm, PatKind, Pattern};
use opal_common::Span;
use opal_types::{PrimTy, TraitConstraint, Ty, TypeCtx};

use crate::error::ConstraintOrigin;

/// One obligation produced by the generator.
#[derive(Clone, Debug)]
pub enum Constraint {
    /// The two types must unify.
    Eq {
        lhs: Ty,
        rhs: Ty,
        origin: ConstraintOrigin,
    },
    /// The trait constraint must be satisfiable against the impl table.
    Impl {
        constraint: TraitConstraint,
        origin: ConstraintOrigin,
    },
}

/// Constraints in emission order.
#[derive(Debug, Default)]
pub struct ConstraintList {
    constraints: Vec<Constraint>,
}

impl ConstraintList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }
}

/// The constraint generation pass.
pub struct Generator<'a> {
    ctx: &'a mut TypeCtx,
    decls: &'a DeclArena,
    list: ConstraintList,
}

impl<'a> Generator<'a> {
    pub fn new(ctx: &'a mut TypeCtx, decls: &'a DeclArena) -> Self {
        Generator {
            ctx,
            decls,
            list: ConstraintList::new(),
        }
    }

    /// Generate the constraint list for one top-level item.
    pub fn generate(mut self, item: &Item) -> ConstraintList {
        match item {
            Item::Binding(binding) => self.gen_binding(binding),
            Item::Expr(expr) => self.gen_expr(expr),
        }
        self.list
    }

    fn eq(&mut self, lhs: Ty, rhs: Ty, origin: ConstraintOrigin) {
        self.list.push(Constraint::Eq { lhs, rhs, origin });
    }

    fn ty_of(&self, expr: &Expr) -> Ty {
        expr.ty.clone().expect("expression not annotated")
    }

    fn decl_ty(&self, id: opal_common::DeclId) -> Ty {
        self.decls
            .get(id)
            .ty
            .clone()
            .expect("declaration not annotated")
    }

    fn gen_binding(&mut self, binding: &Binding) {
        let declared = self.decl_ty(binding.decl);
        let value_ty = self.ty_of(&binding.value);
        self.eq(
            declared,
            value_ty,
            ConstraintOrigin::Binding { span: binding.span },
        );
        self.gen_expr(&binding.value);
    }

    fn gen_expr(&mut self, expr: &Expr) {
        let span = expr.span;
        match &expr.kind {
            // Determined literals need nothing; unsuffixed ones default.
            ExprKind::Int { suffix: None, .. } => {
                let lhs = self.ty_of(expr);
                let rhs = self.ctx.prim(PrimTy::I32);
                self.eq(lhs, rhs, ConstraintOrigin::IntLiteral { span });
            }
            ExprKind::Float { suffix: None, .. } => {
                let lhs = self.ty_of(expr);
                let rhs = self.ctx.prim(PrimTy::F64);
                self.eq(lhs, rhs, ConstraintOrigin::FloatLiteral { span });
            }
            ExprKind::Int { .. }
            | ExprKind::Float { .. }
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Unit => {}

            ExprKind::Var(id) => {
                let decl = self.decls.get(*id);
                match &decl.scheme {
                    // A generalized binding: each use gets its own copy of
                    // the scheme, and the scheme's constraints become
                    // obligations at this use site.
                    Some(scheme) => {
                        let (instantiated, constraints) = self.ctx.instantiate(scheme);
                        let use_ty = self.ty_of(expr);
                        self.eq(use_ty, instantiated, ConstraintOrigin::VarUse { span });
                        for constraint in constraints {
                            self.list.push(Constraint::Impl {
                                constraint,
                                origin: ConstraintOrigin::VarUse { span },
                            });
                        }
                    }
                    // Monomorphic: parameters, locals, recursive self-use.
                    None => {
                        let use_ty = self.ty_of(expr);
                        let decl_ty = self.decl_ty(*id);
                        self.eq(use_ty, decl_ty, ConstraintOrigin::VarUse { span });
                    }
                }
            }

            ExprKind::Call { callee, args } => {
                let arg_tys: Vec<Ty> = args.iter().map(|a| self.ty_of(a)).collect();
                let ret = self.ty_of(expr);
                let expected = self.ctx.func_of(arg_tys, ret, vec![]);
                let callee_ty = self.ty_of(callee);
                let arg_span = args
                    .iter()
                    .map(|a| a.span)
                    .reduce(Span::merge)
                    .unwrap_or(span);
                self.eq(
                    callee_ty,
                    expected,
                    ConstraintOrigin::Call { span, arg_span },
                );
                self.gen_expr(callee);
                for arg in args {
                    self.gen_expr(arg);
                }
            }

            ExprKind::Lambda { params, body } => {
                let param_tys: Vec<Ty> = params.iter().map(|p| self.decl_ty(*p)).collect();
                let body_ty = self.ty_of(body);
                let func = self.ctx.func_of(param_tys, body_ty, vec![]);
                let lambda_ty = self.ty_of(expr);
                self.eq(lambda_ty, func, ConstraintOrigin::Shape { span });
                self.gen_expr(body);
            }

            ExprKind::Let { decl, value } => {
                let declared = self.decl_ty(*decl);
                let value_ty = self.ty_of(value);
                self.eq(declared, value_ty, ConstraintOrigin::Binding { span });
                self.gen_expr(value);
            }

            ExprKind::Assign { target, value } => {
                let target_ty = self.ty_of(target);
                let value_ty = self.ty_of(value);
                self.eq(target_ty, value_ty, ConstraintOrigin::Assignment { span });
                self.gen_expr(target);
                self.gen_expr(value);
            }

            ExprKind::Block(exprs) => {
                if let Some(last) = exprs.last() {
                    let block_ty = self.ty_of(expr);
                    let last_ty = self.ty_of(last);
                    self.eq(block_ty, last_ty, ConstraintOrigin::Shape { span });
                } else {
                    let block_ty = self.ty_of(expr);
                    let unit = self.ctx.unit();
                    self.eq(block_ty, unit, ConstraintOrigin::Shape { span });
                }
                for e in exprs {
                    self.gen_expr(e);
                }
            }

            ExprKind::If { cond, then, els } => {
                let cond_ty = self.ty_of(cond);
                let boolean = self.ctx.bool();
                self.eq(cond_ty, boolean, ConstraintOrigin::IfCond { span: cond.span });

                let if_ty = self.ty_of(expr);
                match els {
                    Some(els) => {
                        let origin = ConstraintOrigin::IfBranches {
                            span,
                            then_span: then.span,
                            else_span: els.span,
                        };
                        let then_ty = self.ty_of(then);
                        let else_ty = self.ty_of(els);
                        self.eq(then_ty, if_ty.clone(), origin.clone());
                        self.eq(else_ty, if_ty, origin);
                    }
                    None => {
                        // No else: the whole expression is unit.
                        let unit = self.ctx.unit();
                        let then_ty = self.ty_of(then);
                        self.eq(if_ty, unit.clone(), ConstraintOrigin::Shape { span });
                        self.eq(then_ty, unit, ConstraintOrigin::Shape { span });
                    }
                }

                self.gen_expr(cond);
                self.gen_expr(then);
                if let Some(els) = els {
                    self.gen_expr(els);
                }
            }

            ExprKind::Match { scrutinee, arms } => {
                let scrutinee_ty = self.ty_of(scrutinee);
                let match_ty = self.ty_of(expr);
                for MatchArm { pattern, body } in arms {
                    let pat_ty = pattern.ty.clone().expect("pattern not annotated");
                    self.eq(
                        pat_ty,
                        scrutinee_ty.clone(),
                        ConstraintOrigin::MatchPattern {
                            span: pattern.span,
                            scrutinee_span: scrutinee.span,
                        },
                    );
                    let body_ty = self.ty_of(body);
                    self.eq(
                        body_ty,
                        match_ty.clone(),
                        ConstraintOrigin::MatchArms {
                            span,
                            arm_span: body.span,
                        },
                    );
                }
                self.gen_expr(scrutinee);
                for MatchArm { pattern, body } in arms {
                    self.gen_pattern(pattern);
                    self.gen_expr(body);
                }
            }

            ExprKind::Field { base, field } => {
                // base must be a record with this field; a fresh row variable
                // subsumes whatever other fields it has.
                let field_ty = self.ty_of(expr);
                let row = self.ctx.fresh_row_var();
                let record = self
                    .ctx
                    .record_of(vec![(field.clone(), field_ty)], Some(row));
                let base_ty = self.ty_of(base);
                self.eq(
                    base_ty,
                    record,
                    ConstraintOrigin::FieldAccess {
                        span,
                        field: field.clone(),
                    },
                );
                self.gen_expr(base);
            }

            ExprKind::Tuple { fields, names } => {
                let field_tys: Vec<Ty> = fields.iter().map(|f| self.ty_of(f)).collect();
                let tuple_ty = match names {
                    Some(names) => {
                        let named = names.iter().cloned().zip(field_tys).collect();
                        self.ctx.record_of(named, None)
                    }
                    None => self.ctx.tuple_of(field_tys),
                };
                let node_ty = self.ty_of(expr);
                self.eq(node_ty, tuple_ty, ConstraintOrigin::Shape { span });
                for field in fields {
                    self.gen_expr(field);
                }
            }

            ExprKind::Ascribe { expr: inner, .. } => {
                // The node's type IS the ascription; the inner expression
                // must conform.
                let ascribed = self.ty_of(expr);
                let inner_ty = self.ty_of(inner);
                self.eq(inner_ty, ascribed, ConstraintOrigin::Ascription { span });
                self.gen_expr(inner);
            }

            ExprKind::Ctor {
                data,
                variant,
                args,
            } => {
                let (applied, field_tys) = self.instantiate_variant(*data, *variant);
                let node_ty = self.ty_of(expr);
                self.eq(node_ty, applied, ConstraintOrigin::Shape { span });
                // Packing both sides as tuples makes an argument-count
                // mismatch surface as a width error.
                let arg_tys: Vec<Ty> = args.iter().map(|a| self.ty_of(a)).collect();
                let lhs = self.ctx.tuple_of(arg_tys);
                let rhs = self.ctx.tuple_of(field_tys);
                self.eq(lhs, rhs, ConstraintOrigin::Shape { span });
                for arg in args {
                    self.gen_expr(arg);
                }
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let origin = ConstraintOrigin::BinOp { span };
                let node_ty = self.ty_of(expr);
                let lhs_ty = self.ty_of(lhs);
                let rhs_ty = self.ty_of(rhs);
                if op.is_arithmetic() {
                    self.eq(lhs_ty.clone(), rhs_ty, origin.clone());
                    self.eq(node_ty, lhs_ty, origin);
                } else if op.is_comparison() {
                    let boolean = self.ctx.bool();
                    self.eq(lhs_ty, rhs_ty, origin.clone());
                    self.eq(node_ty, boolean, origin);
                } else {
                    debug_assert!(op.is_logical());
                    let boolean = self.ctx.bool();
                    self.eq(lhs_ty, boolean.clone(), origin.clone());
                    self.eq(rhs_ty, boolean.clone(), origin.clone());
                    self.eq(node_ty, boolean, origin);
                }
                self.gen_expr(lhs);
                self.gen_expr(rhs);
            }
        }
    }

    fn gen_pattern(&mut self, pattern: &Pattern) {
        let span = pattern.span;
        match &pattern.kind {
            PatKind::Bind(_)
            | PatKind::Wildcard
            | PatKind::Bool(_)
            | PatKind::Str(_)
            | PatKind::Unit => {}
            PatKind::Int(_) => {
                let lhs = pattern.ty.clone().expect("pattern not annotated");
                let rhs = self.ctx.prim(PrimTy::I32);
                self.eq(lhs, rhs, ConstraintOrigin::IntLiteral { span });
            }
            PatKind::Tuple(subpatterns) => {
                let sub_tys: Vec<Ty> = subpatterns
                    .iter()
                    .map(|p| p.ty.clone().expect("pattern not annotated"))
                    .collect();
                let tuple = self.ctx.tuple_of(sub_tys);
                let pat_ty = pattern.ty.clone().expect("pattern not annotated");
                self.eq(pat_ty, tuple, ConstraintOrigin::Shape { span });
                for sub in subpatterns {
                    self.gen_pattern(sub);
                }
            }
            PatKind::Ctor {
                data,
                variant,
                args,
            } => {
                let (applied, field_tys) = self.instantiate_variant(*data, *variant);
                let pat_ty = pattern.ty.clone().expect("pattern not annotated");
                self.eq(pat_ty, applied, ConstraintOrigin::Shape { span });
                let arg_tys: Vec<Ty> = args
                    .iter()
                    .map(|p| p.ty.clone().expect("pattern not annotated"))
                    .collect();
                let lhs = self.ctx.tuple_of(arg_tys);
                let rhs = self.ctx.tuple_of(field_tys);
                self.eq(lhs, rhs, ConstraintOrigin::Shape { span });
                for arg in args {
                    self.gen_pattern(arg);
                }
            }
        }
    }

    /// Instantiate a data type's applied form together with one variant's
    /// field types, sharing one fresh-variable mapping so the type
    /// parameters line up between them.
    fn instantiate_variant(
        &mut self,
        data: opal_common::DeclId,
        variant: usize,
    ) -> (Ty, Vec<Ty>) {
        let decl = self.decls.get(data);
        let def = match &decl.kind {
            DeclKind::Data(def) => def,
            _ => panic!("constructor refers to a non-data declaration"),
        };
        let applied = if def.is_union {
            self.ctx
                .union_of(decl.name.clone(), def.params.clone(), data)
        } else {
            self.ctx
                .data_of(decl.name.clone(), def.params.clone(), data)
        };
        let fields = def.variants[variant].fields.clone();
        // Run both through one copy by packing them into a carrier function
        // type: params = fields, return = applied.
        let carrier = self.ctx.func_of(fields, applied, vec![]);
        let fresh = self.ctx.copy_with_fresh_vars(&carrier);
        match fresh.kind() {
            opal_types::TyKind::Func(func) => (func.ret.clone(), func.params.clone()),
            _ => unreachable!("carrier copied to a non-function"),
        }
    }
}
