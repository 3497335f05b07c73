//! Integration tests for trait constraints and resolution.
//!
//! These set up trait declarations with method schemes (the form name
//! resolution hands over), register impls, and check that constraint
//! resolution, overlap detection, functional dependencies, and polymorphic
//! constraint propagation all behave.

mod common;

use common::*;
use opal_ast::{Decl, DeclKind, Module, TraitDef};
use opal_common::{DeclId, Span};
use opal_types::{Scheme, TraitConstraint, Ty, TypeCtx};
use opal_typeck::error::TypeError;

/// Declare a single-parameter trait with one method `(a) -> ret given T a`.
/// Returns the trait and method declarations.
fn declare_trait_with_method(
    ctx: &mut TypeCtx,
    module: &mut Module,
    trait_name: &str,
    method_name: &str,
    ret: Ty,
) -> (DeclId, DeclId) {
    let a = ctx.named_var("a");
    let trait_decl = module.decls.alloc(Decl::new(
        trait_name,
        Span::dummy(),
        DeclKind::Trait(TraitDef {
            params: vec![a.clone()],
            fundeps: vec![],
            methods: vec![],
        }),
    ));
    module.symbols.define(trait_name, trait_decl);

    let constraint = TraitConstraint {
        decl: trait_decl,
        name: trait_name.into(),
        args: vec![a.clone()],
        fundeps: vec![],
    };
    let method_ty = ctx.func_of(vec![a.clone()], ret, vec![constraint.clone()]);
    let mut method = Decl::new(method_name, Span::dummy(), DeclKind::Method { owner: trait_decl });
    method.ty = Some(method_ty.clone());
    method.scheme = Some(Scheme {
        vars: vec![a.as_var().expect("named var").clone()],
        constraints: vec![constraint],
        ty: method_ty,
    });
    let method_decl = module.decls.alloc(method);
    module.symbols.define(method_name, method_decl);

    if let DeclKind::Trait(def) = &mut module.decls.get_mut(trait_decl).kind {
        def.methods.push(method_decl);
    }

    (trait_decl, method_decl)
}

/// Declare a trait `T a -> b` whose method is `(a) -> b given T a -> b`.
fn declare_fundep_trait(
    ctx: &mut TypeCtx,
    module: &mut Module,
    trait_name: &str,
    method_name: &str,
) -> (DeclId, DeclId) {
    let a = ctx.named_var("a");
    let b = ctx.named_var("b");
    let trait_decl = module.decls.alloc(Decl::new(
        trait_name,
        Span::dummy(),
        DeclKind::Trait(TraitDef {
            params: vec![a.clone()],
            fundeps: vec![b.clone()],
            methods: vec![],
        }),
    ));
    module.symbols.define(trait_name, trait_decl);

    let constraint = TraitConstraint {
        decl: trait_decl,
        name: trait_name.into(),
        args: vec![a.clone()],
        fundeps: vec![b.clone()],
    };
    let method_ty = ctx.func_of(vec![a.clone()], b.clone(), vec![constraint.clone()]);
    let mut method = Decl::new(method_name, Span::dummy(), DeclKind::Method { owner: trait_decl });
    method.ty = Some(method_ty.clone());
    method.scheme = Some(Scheme {
        vars: vec![
            a.as_var().expect("named var").clone(),
            b.as_var().expect("named var").clone(),
        ],
        constraints: vec![constraint],
        ty: method_ty,
    });
    let method_decl = module.decls.alloc(method);
    module.symbols.define(method_name, method_decl);

    if let DeclKind::Trait(def) = &mut module.decls.get_mut(trait_decl).kind {
        def.methods.push(method_decl);
    }

    (trait_decl, method_decl)
}

fn register_impl(module: &mut Module, trait_decl: DeclId, name: &str, args: Vec<Ty>, fundeps: Vec<Ty>) {
    module.decls.alloc(Decl::new(
        format!("impl {name}"),
        Span::dummy(),
        DeclKind::Impl {
            constraint: TraitConstraint {
                decl: trait_decl,
                name: name.into(),
                args,
                fundeps,
            },
        },
    ));
}

#[test]
fn method_call_resolves_against_matching_impl() {
    let mut ctx = TypeCtx::new();
    let mut module = Module::new();
    let builtins = opal_typeck::builtins::register(&mut ctx, &mut module);

    let (show_trait, show) =
        declare_trait_with_method(&mut ctx, &mut module, "Show", "show", builtins.str_ty.clone());
    let i32 = ctx.i32();
    register_impl(&mut module, show_trait, "Show", vec![i32], vec![]);

    module.push_expr(call(var(show), vec![int(1)]));

    let result = opal_typeck::check(&mut ctx, &mut module);
    assert_no_errors(&result);
    assert_eq!(result_type_string(&result), "Str");
}

#[test]
fn method_call_on_unimplemented_type_is_unsatisfied() {
    let mut ctx = TypeCtx::new();
    let mut module = Module::new();
    let builtins = opal_typeck::builtins::register(&mut ctx, &mut module);

    let (show_trait, show) =
        declare_trait_with_method(&mut ctx, &mut module, "Show", "show", builtins.str_ty.clone());
    let i32 = ctx.i32();
    register_impl(&mut module, show_trait, "Show", vec![i32], vec![]);

    module.push_expr(call(var(show), vec![boolean(true)]));

    let result = opal_typeck::check(&mut ctx, &mut module);
    assert!(
        result
            .errors
            .iter()
            .any(|e| matches!(e, TypeError::TraitUnsatisfied { .. })),
        "errors: {:?}",
        result.errors
    );
}

#[test]
fn overlapping_impls_are_reported_with_candidates() {
    let mut ctx = TypeCtx::new();
    let mut module = Module::new();
    let builtins = opal_typeck::builtins::register(&mut ctx, &mut module);

    let (show_trait, show) =
        declare_trait_with_method(&mut ctx, &mut module, "Show", "show", builtins.str_ty.clone());
    let i32 = ctx.i32();
    let blanket = ctx.named_var("t");
    register_impl(&mut module, show_trait, "Show", vec![i32], vec![]);
    register_impl(&mut module, show_trait, "Show", vec![blanket], vec![]);

    module.push_expr(call(var(show), vec![int(1)]));

    let result = opal_typeck::check(&mut ctx, &mut module);
    match result
        .errors
        .iter()
        .find(|e| matches!(e, TypeError::OverlappingImpls { .. }))
    {
        Some(TypeError::OverlappingImpls { candidates, .. }) => {
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("expected OverlappingImpls, got {other:?}"),
    }
}

#[test]
fn functional_dependency_determines_the_result_type() {
    let mut ctx = TypeCtx::new();
    let mut module = Module::new();
    let _ = opal_typeck::builtins::register(&mut ctx, &mut module);

    let (cast_trait, cast) = declare_fundep_trait(&mut ctx, &mut module, "Cast", "cast");
    let i32 = ctx.i32();
    let f64 = ctx.f64();
    register_impl(&mut module, cast_trait, "Cast", vec![i32], vec![f64]);

    module.push_expr(call(var(cast), vec![int(1)]));

    let result = opal_typeck::check(&mut ctx, &mut module);
    assert_no_errors(&result);
    assert_eq!(result_type_string(&result), "F64");
}

#[test]
fn open_constraint_rides_on_the_enclosing_binding() {
    let mut ctx = TypeCtx::new();
    let mut module = Module::new();
    let builtins = opal_typeck::builtins::register(&mut ctx, &mut module);

    let (show_trait, show) =
        declare_trait_with_method(&mut ctx, &mut module, "Show", "show", builtins.str_ty.clone());
    let i32 = ctx.i32();
    register_impl(&mut module, show_trait, "Show", vec![i32], vec![]);

    // f x = show x  -- Show stays open, so it becomes part of f's scheme.
    let f = global(&mut module, "f");
    let x = param(&mut module, "x");
    module.push_binding(
        f,
        lambda(vec![x], call(var(show), vec![var(x)])),
        false,
        Span::dummy(),
    );

    let result = opal_typeck::check(&mut ctx, &mut module);
    assert_no_errors(&result);

    let scheme = scheme_of(&module, f);
    assert_eq!(scheme.constraints.len(), 1);
    assert_eq!(scheme.constraints[0].name, "Show");
    assert!(format!("{}", scheme.ty).contains("given Show"));
}

#[test]
fn propagated_constraint_is_checked_at_the_use_site() {
    let mut ctx = TypeCtx::new();
    let mut module = Module::new();
    let builtins = opal_typeck::builtins::register(&mut ctx, &mut module);

    let (show_trait, show) =
        declare_trait_with_method(&mut ctx, &mut module, "Show", "show", builtins.str_ty.clone());
    let i32 = ctx.i32();
    register_impl(&mut module, show_trait, "Show", vec![i32], vec![]);

    let f = global(&mut module, "f");
    let x = param(&mut module, "x");
    module.push_binding(
        f,
        lambda(vec![x], call(var(show), vec![var(x)])),
        false,
        Span::dummy(),
    );
    // f 1 resolves Show I32; f true has nothing to resolve against.
    module.push_expr(call(var(f), vec![int(1)]));
    module.push_expr(call(var(f), vec![boolean(true)]));

    let result = opal_typeck::check(&mut ctx, &mut module);
    assert_eq!(
        result
            .errors
            .iter()
            .filter(|e| matches!(e, TypeError::TraitUnsatisfied { .. }))
            .count(),
        1,
        "errors: {:?}",
        result.errors
    );
    // The first use still typed fine.
    assert_eq!(result_type_string(&result), "Str");
}
