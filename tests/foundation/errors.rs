//! Integration tests for Error types
//!
//! Tests error construction, display, and context.

use aurora_foundation::{Error, ErrorContext, ErrorKind, SemanticLimit};

#[test]
fn field_count_display() {
    let err = Error::field_count("edge", 2, 3);
    assert_eq!(
        err.to_string(),
        "field count mismatch in edge: expected 2, got 3"
    );
}

#[test]
fn context_is_rendered() {
    let err = Error::unknown_action("explode").in_source("my-rule");
    assert_eq!(
        err.to_string(),
        "unsupported clause action: explode (in my-rule)"
    );
}

#[test]
fn in_source_keeps_innermost_context() {
    let err = Error::new(ErrorKind::UnknownTable("t".into()))
        .in_source("inner")
        .in_source("outer");
    assert_eq!(err.context.unwrap().source.as_deref(), Some("inner"));
}

#[test]
fn context_with_line() {
    let err = Error::meta_schema("bad").with_context(
        ErrorContext::new().with_source("program").with_line(4),
    );
    assert!(err.to_string().ends_with("(in program at line 4)"));
}

#[test]
fn limit_display() {
    let err = Error::limit_exceeded(SemanticLimit::MaxSearchSteps { limit: 10 });
    assert_eq!(
        err.to_string(),
        "limit exceeded: max search steps (10) exceeded"
    );
}

#[test]
fn field_mismatch_lists_both_orders() {
    let err = Error::field_mismatch(&["a".into(), "b".into()], &["c".into()]);
    assert!(matches!(err.kind, ErrorKind::FieldMismatch { ref to, .. } if to == &["c"]));
}
