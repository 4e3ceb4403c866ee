#![allow(clippy::unwrap_used, clippy::expect_used)]

use germbank_core::errors::{ExError, ExErrorKind, TemplateError};
use germbank_core::logging_facility::test_capture::init_test_capture;
use germbank_core::{log_op_end, log_op_error, log_op_start};
use germbank_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_records_component() {
    let capture = init_test_capture();
    let op_name = "logging_test_start_unique_1";

    log_op_start!(op_name, importer = "compounds");

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[0].field("importer"), Some("compounds"));
    assert!(events[0]
        .component
        .as_deref()
        .unwrap()
        .starts_with("logging_facility_tests"));
}

#[test]
fn test_log_op_end_carries_duration_and_counts() {
    let capture = init_test_capture();
    let op_name = "logging_test_end_unique_2";

    log_op_end!(op_name, duration_ms = 42u64, created = 7u64);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[0].field("duration_ms"), Some("42"));
    assert_eq!(events[0].field("created"), Some("7"));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "logging_test_error_unique_3";

    let err: ExError = TemplateError::MissingSheet {
        sheet: "COMPOUNDS".to_string(),
    }
    .into();
    log_op_error!(op_name, &err, duration_ms = 10u64);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(events[0].field("err_code"), Some("ERR_MISSING_SHEET"));
    assert_eq!(
        events[0].field("err_kind"),
        Some(format!("{:?}", ExErrorKind::MissingSheet).as_str())
    );
}

#[test]
fn test_start_end_pair_per_operation() {
    let capture = init_test_capture();
    let op_name = "logging_test_pair_unique_4";

    log_op_start!(op_name);
    log_op_end!(op_name, duration_ms = 1u64);

    capture.assert_event_exists(op_name, EVENT_START);
    capture.assert_event_exists(op_name, EVENT_END);
    let count = capture.count_events(|e| e.op.as_deref() == Some(op_name));
    assert_eq!(count, 2);
}
