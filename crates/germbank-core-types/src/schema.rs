//! Canonical schema constants for structured logging
//!
//! Importers, the batch writer and the rollback tracker all log through
//! these keys so a run can be followed with a single filter.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Import context
pub const FIELD_IMPORTER: &str = "importer";
pub const FIELD_TABLE: &str = "table";
pub const FIELD_NATURAL_KEY: &str = "natural_key";

// Counters
pub const FIELD_RECORDS: &str = "records";
pub const FIELD_CREATED: &str = "created";
pub const FIELD_SKIPPED: &str = "skipped";
pub const FIELD_FLUSH_SIZE: &str = "flush_size";
pub const FIELD_DELETED: &str = "deleted";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_FLUSH: &str = "flush";
pub const EVENT_ROLLBACK: &str = "rollback";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        let names = [EVENT_START, EVENT_END, EVENT_END_ERROR, EVENT_FLUSH, EVENT_ROLLBACK];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_field_keys_are_snake_case() {
        for key in [FIELD_RUN_ID, FIELD_NATURAL_KEY, FIELD_FLUSH_SIZE, FIELD_ERR_CODE] {
            assert!(key.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
