//! Built-in type and value registration.
//!
//! Registers the starting vocabulary of every Opal program into the module's
//! declaration arena and symbol table: the `Str` type, the `Maybe` union,
//! and a handful of pointer and array primitives. Runs once per compilation,
//! before annotation, and hands the driver the handles it needs.

use opal_ast::{DataDef, Decl, DeclKind, Module, VariantDef};
use opal_common::{DeclId, Span};
use opal_types::{Scheme, Ty, TypeCtx};

/// Handles to the builtin declarations the checker itself consults.
pub struct Builtins {
    pub str_decl: DeclId,
    pub str_ty: Ty,
    pub maybe_decl: DeclId,
}

/// Register all builtins into the module. Idempotent: a module that already
/// has a `Str` symbol is left untouched.
pub fn register(ctx: &mut TypeCtx, module: &mut Module) -> Builtins {
    if let (Some(str_decl), Some(maybe_decl)) = (
        module.symbols.lookup("Str"),
        module.symbols.lookup("Maybe"),
    ) {
        let str_ty = ctx.data_of("Str", vec![], str_decl);
        return Builtins {
            str_decl,
            str_ty,
            maybe_decl,
        };
    }

    // ── Str ─────────────────────────────────────────────────────────────

    let str_decl = module.decls.alloc(Decl::new(
        "Str",
        Span::dummy(),
        DeclKind::Data(DataDef {
            params: vec![],
            variants: vec![],
            is_union: false,
        }),
    ));
    module.symbols.define("Str", str_decl);
    let str_ty = ctx.data_of("Str", vec![], str_decl);

    // ── Maybe ───────────────────────────────────────────────────────────

    let elem = ctx.named_var("a");
    let maybe_decl = module.decls.alloc(Decl::new(
        "Maybe",
        Span::dummy(),
        DeclKind::Data(DataDef {
            params: vec![elem.clone()],
            variants: vec![
                VariantDef {
                    name: "Some".into(),
                    fields: vec![elem],
                },
                VariantDef {
                    name: "None".into(),
                    fields: vec![],
                },
            ],
            is_union: true,
        }),
    ));
    module.symbols.define("Maybe", maybe_decl);

    // ── Pointer and array primitives ────────────────────────────────────

    let a = ctx.fresh_var();
    let ptr_a = ctx.ptr_of(a.clone());
    let ref_ty = ctx.func_of(vec![a.clone()], ptr_a.clone(), vec![]);
    define_builtin(module, "ref", ref_ty);

    let a = ctx.fresh_var();
    let ptr_a = ctx.ptr_of(a.clone());
    let deref_ty = ctx.func_of(vec![ptr_a], a, vec![]);
    define_builtin(module, "deref", deref_ty);

    let a = ctx.fresh_var();
    let arr_a = ctx.array_of(a, None);
    let usz = ctx.usz();
    let len_ty = ctx.func_of(vec![arr_a], usz, vec![]);
    define_builtin(module, "len", len_ty);

    let unit = ctx.unit();
    let print_ty = ctx.func_of(vec![str_ty.clone()], unit, vec![]);
    define_builtin(module, "print", print_ty);

    Builtins {
        str_decl,
        str_ty,
        maybe_decl,
    }
}

fn define_builtin(module: &mut Module, name: &str, ty: Ty) {
    let vars = ty.contained_vars();
    let mut decl = Decl::new(name, Span::dummy(), DeclKind::Builtin);
    decl.ty = Some(ty.clone());
    decl.scheme = Some(Scheme {
        vars,
        constraints: Vec::new(),
        ty,
    });
    let id = module.decls.alloc(decl);
    module.symbols.define(name, id);
}
