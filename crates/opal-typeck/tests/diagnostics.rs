//! Tests for rendered type-error diagnostics.
//!
//! Each test triggers a specific error against a small source string whose
//! offsets match the AST spans, renders it through the ariadne pipeline, and
//! asserts on the pieces that matter: the error code, the message, and the
//! notes. Exact layout is ariadne's business, not ours.

mod common;

use common::*;
use opal_ast::{BinOp, Module};
use opal_common::{Severity, Span};

/// Render the first error from a checked module.
fn render_first(module: &mut Module, source: &str) -> String {
    let (_, result) = check(module);
    assert!(
        !result.errors.is_empty(),
        "expected at least one error for: {source:?}"
    );
    result.render_errors(source, "test.opal").remove(0)
}

#[test]
fn mismatch_diagnostic_shows_both_types() {
    let mut module = Module::new();
    let f = global(&mut module, "f");
    let x = param(&mut module, "x");
    module.push_binding(
        f,
        lambda(vec![x], binary(BinOp::Add, var(x), int(1))),
        false,
        Span::dummy(),
    );
    // Source: "f true"
    module.push_expr(call_at(
        var_at(f, sp(0, 1)),
        vec![boolean_at(true, sp(2, 6))],
        sp(0, 6),
    ));

    let rendered = render_first(&mut module, "f true");
    assert!(rendered.contains("E0001"), "{rendered}");
    assert!(
        rendered.contains("expected I32, found Bool"),
        "{rendered}"
    );
}

#[test]
fn infinite_type_diagnostic_carries_occurs_note() {
    let mut module = Module::new();
    let f = global(&mut module, "f");
    let x = param(&mut module, "x");
    // Source: "f x = x x"
    module.push_binding(
        f,
        lambda(
            vec![x],
            call_at(var_at(x, sp(6, 7)), vec![var_at(x, sp(8, 9))], sp(6, 9)),
        ),
        false,
        sp(0, 9),
    );

    let rendered = render_first(&mut module, "f x = x x");
    assert!(rendered.contains("E0002"), "{rendered}");
    assert!(rendered.contains("infinite type"), "{rendered}");
    assert!(rendered.contains("occurs inside"), "{rendered}");
}

#[test]
fn missing_field_diagnostic_names_the_field() {
    let mut module = Module::new();
    let r = global(&mut module, "r");
    module.push_binding(
        r,
        record(vec![("a", int(1)), ("b", boolean(true))]),
        false,
        Span::dummy(),
    );
    // Source: "r.c"
    module.push_expr(field_at(var_at(r, sp(0, 1)), "c", sp(0, 3)));

    let rendered = render_first(&mut module, "r.c");
    assert!(rendered.contains("E0004"), "{rendered}");
    assert!(rendered.contains("no field `c`"), "{rendered}");
}

#[test]
fn sink_collects_structured_records() {
    let mut module = Module::new();
    let f = global(&mut module, "f");
    let x = param(&mut module, "x");
    module.push_binding(
        f,
        lambda(vec![x], call(var(x), vec![var(x)])),
        false,
        Span::dummy(),
    );

    let (_, result) = check(&mut module);
    let records = result.diagnostics.records();
    assert!(!records.is_empty());
    assert_eq!(records[0].severity, Severity::Error);
    assert!(records[0].message.contains("infinite type"));
    // The occurs note rides along as a separate record.
    assert!(
        records
            .iter()
            .any(|r| r.severity == Severity::Note && r.message.contains("occurs inside")),
        "records: {records:?}"
    );
}

#[test]
fn errors_mark_the_compilation_failed() {
    let mut module = Module::new();
    module.push_expr(binary(BinOp::Add, int(1), boolean(true)));

    let (_, result) = check(&mut module);
    assert!(!result.success());
    assert!(result.diagnostics.has_errors());
}
