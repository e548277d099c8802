//! Tests for the error module.

use crate::data_structures::KaloTrieError;
use crate::error::{
    report_error, set_error_reporter, ErrorContext, ErrorReporter, ErrorReporting, KaloError,
    MockErrorReporter, TracingErrorReporter,
};
use std::sync::Arc;

/// Test that error context can be created and displayed properly.
#[test]
fn test_error_context_display() {
    let error = KaloError::Custom("test error".to_string());
    let context = ErrorContext::new(error, "test_component").with_details("additional details");

    let display_string = format!("{context}");
    assert!(display_string.contains("test error"));
    assert!(display_string.contains("test_component"));
    assert!(display_string.contains("additional details"));
}

/// Test that component errors convert and keep their message.
#[test]
fn test_nested_errors() {
    let trie_error: KaloError = KaloTrieError::DuplicateKey("foo".to_string()).into();
    assert_eq!(trie_error.to_string(), "Trie error: Key already has a value: foo");

    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let kalo_error = KaloError::from(io_error);
    assert!(kalo_error.to_string().contains("file not found"));

    let input_error = KaloError::InvalidInput {
        line: 3,
        message: "missing key".to_string(),
    };
    assert_eq!(input_error.to_string(), "Invalid input at line 3: missing key");
}

/// Test that an installed reporter receives every report.
#[test]
fn test_reporter_receives_reports() {
    let mut mock = MockErrorReporter::new();
    mock.expect_report()
        .withf(|context| context.component == "trie")
        .times(2)
        .return_const(());

    let mut reporting = ErrorReporting::default();
    reporting.set_reporter(Arc::new(mock));
    for _ in 0..2 {
        reporting.report(ErrorContext::new(KaloTrieError::EmptyKey.into(), "trie"));
    }
}

/// Test that the global reporter can be replaced and used.
#[test]
fn test_global_error_reporter() {
    let mut mock = MockErrorReporter::new();
    mock.expect_report().times(1).return_const(());
    set_error_reporter(Arc::new(mock));

    report_error(ErrorContext::new(KaloError::Custom("global".to_string()), "test"));

    // Put a reporter back that tolerates reports from other tests.
    set_error_reporter(Arc::new(TracingErrorReporter));
}

/// Test that the default tracing error reporter can be used.
#[test]
fn test_tracing_error_reporter() {
    let reporter = TracingErrorReporter;
    let context = ErrorContext::new(KaloError::Custom("test error".to_string()), "test_component");

    // Just make sure this doesn't panic
    reporter.report(context);
}
