//! Ariadne-based diagnostic rendering for type errors.
//!
//! Renders [`TypeError`] values into formatted, labeled messages. Output is
//! colorless so tests can assert on it; each diagnostic carries an error
//! code, a primary labeled span from the constraint's origin, and notes or
//! help where they earn their place (infinite types get an "occurs inside"
//! note, unsatisfied traits a hint to add an impl).

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use opal_common::Span;

use crate::error::{ConstraintOrigin, TypeError};

// ── Error Codes ────────────────────────────────────────────────────────

/// Assign a stable error code to each TypeError variant.
fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::InfiniteType { .. } => "E0002",
        TypeError::ArityMismatch { .. } => "E0003",
        TypeError::TupleWidth { .. } => "E0004",
        TypeError::TraitUnsatisfied { .. } => "E0005",
        TypeError::OverlappingImpls { .. } => "E0006",
        TypeError::AmbiguousType { .. } => "E0007",
        TypeError::SelfReference { .. } => "E0008",
    }
}

// ── Span Helpers ───────────────────────────────────────────────────────

fn span_to_range(span: Span) -> Range<usize> {
    span.range()
}

/// Extract a primary span from a ConstraintOrigin.
fn origin_span(origin: &ConstraintOrigin) -> Option<Range<usize>> {
    origin.span().map(span_to_range)
}

// ── Main Rendering Function ────────────────────────────────────────────

/// Render a type error into a formatted diagnostic string.
pub fn render_diagnostic(error: &TypeError, source: &str, _filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp a range to the source, widening empty spans to one character so
    // ariadne has something to point at.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };
    let whole_file = || clamp(0..source_len.max(1).min(source_len));

    let code = error_code(error);

    let report = match error {
        TypeError::Mismatch {
            expected,
            found,
            origin,
        } => {
            let msg = format!("expected {expected}, found {found}");
            let span = clamp(origin_span(origin).unwrap_or_else(|| whole_file()));

            let mut builder = Report::build(ReportKind::Error, span.clone())
                .with_code(code)
                .with_message(&msg)
                .with_config(config);

            match origin {
                ConstraintOrigin::IfBranches {
                    then_span,
                    else_span,
                    ..
                } => {
                    builder.add_label(
                        Label::new(clamp(span_to_range(*then_span)))
                            .with_message(format!("this branch is {expected}"))
                            .with_color(Color::Red),
                    );
                    builder.add_label(
                        Label::new(clamp(span_to_range(*else_span)))
                            .with_message(format!("but this branch is {found}"))
                            .with_color(Color::Blue),
                    );
                }
                ConstraintOrigin::Call { arg_span, .. } => {
                    builder.add_label(
                        Label::new(clamp(span_to_range(*arg_span)))
                            .with_message(format!("expected {expected}, found {found}"))
                            .with_color(Color::Red),
                    );
                }
                ConstraintOrigin::FieldAccess { field, .. } => {
                    builder.add_label(
                        Label::new(span.clone())
                            .with_message(format!("no field `{field}` of type {expected}"))
                            .with_color(Color::Red),
                    );
                }
                _ => {
                    builder.add_label(
                        Label::new(span.clone())
                            .with_message(format!("expected {expected}, found {found}"))
                            .with_color(Color::Red),
                    );
                }
            }

            builder.finish()
        }

        TypeError::InfiniteType { var, ty, origin, .. } => {
            let msg = format!("infinite type: {var} occurs in {ty}");
            let span = clamp(origin_span(origin).unwrap_or_else(|| whole_file()));

            Report::build(ReportKind::Error, span.clone())
                .with_code(code)
                .with_message(&msg)
                .with_config(config)
                .with_label(
                    Label::new(span)
                        .with_message("recursive type arises here")
                        .with_color(Color::Red),
                )
                .with_note(format!("{var} occurs inside {ty}"))
                .finish()
        }

        TypeError::ArityMismatch {
            expected,
            found,
            origin,
        } => {
            let msg = format!("expected {expected} argument(s), found {found}");
            let span = clamp(origin_span(origin).unwrap_or_else(|| whole_file()));

            let mut builder = Report::build(ReportKind::Error, span.clone())
                .with_code(code)
                .with_message(&msg)
                .with_config(config)
                .with_label(
                    Label::new(span)
                        .with_message(format!("expected {expected} argument(s)"))
                        .with_color(Color::Red),
                );

            if expected > found {
                builder.set_help(format!("missing {} argument(s)", expected - found));
            } else {
                builder.set_help(format!("{} extra argument(s)", found - expected));
            }

            builder.finish()
        }

        TypeError::TupleWidth {
            expected,
            found,
            origin,
        } => {
            let msg = format!("expected {expected} field(s), found {found}");
            let span = clamp(origin_span(origin).unwrap_or_else(|| whole_file()));

            let mut builder = Report::build(ReportKind::Error, span.clone())
                .with_code(code)
                .with_message(&msg)
                .with_config(config)
                .with_label(
                    Label::new(span)
                        .with_message("field counts differ")
                        .with_color(Color::Red),
                );

            if let ConstraintOrigin::FieldAccess { field, .. } = origin {
                builder.set_help(format!("the record has no field `{field}`"));
            }

            builder.finish()
        }

        TypeError::TraitUnsatisfied { constraint, origin } => {
            let msg = format!("no implementation of {constraint}");
            let span = clamp(origin_span(origin).unwrap_or_else(|| whole_file()));

            Report::build(ReportKind::Error, span.clone())
                .with_code(code)
                .with_message(&msg)
                .with_config(config)
                .with_label(
                    Label::new(span)
                        .with_message(format!("{constraint} is required here"))
                        .with_color(Color::Red),
                )
                .with_help(format!("implement {} for these types", constraint.name))
                .finish()
        }

        TypeError::OverlappingImpls {
            constraint,
            candidates,
            origin,
        } => {
            let msg = format!("multiple implementations match {constraint}");
            let span = clamp(origin_span(origin).unwrap_or_else(|| whole_file()));

            let listed = candidates
                .iter()
                .map(|c| format!("{c}"))
                .collect::<Vec<_>>()
                .join(", ");

            Report::build(ReportKind::Error, span.clone())
                .with_code(code)
                .with_message(&msg)
                .with_config(config)
                .with_label(
                    Label::new(span)
                        .with_message("ambiguous trait use")
                        .with_color(Color::Red),
                )
                .with_note(format!("candidates: {listed}"))
                .finish()
        }

        TypeError::AmbiguousType { ty, span } => {
            let msg = format!("ambiguous type: {ty} was never resolved");
            let range = clamp(span_to_range(*span));

            Report::build(ReportKind::Error, range.clone())
                .with_code(code)
                .with_message(&msg)
                .with_config(config)
                .with_label(
                    Label::new(range)
                        .with_message("cannot infer a concrete type here")
                        .with_color(Color::Red),
                )
                .with_help("add a type annotation")
                .finish()
        }

        TypeError::SelfReference { name, span } => {
            let msg = format!("`{name}` is used in its own initializer");
            let range = clamp(span_to_range(*span));

            Report::build(ReportKind::Error, range.clone())
                .with_code(code)
                .with_message(&msg)
                .with_config(config)
                .with_label(
                    Label::new(range)
                        .with_message("recursive use here")
                        .with_color(Color::Red),
                )
                .with_help("mark the binding recursive to allow this")
                .finish()
        }
    };

    let mut buf = Vec::new();
    let cache = Source::from(source);
    report
        .write(cache, &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}
