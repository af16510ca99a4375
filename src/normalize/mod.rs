//! Normalizers turning raw provider payloads into canonical records
//!
//! Each normalizer is a pure function of the payload (plus reference data and
//! the collection timestamp). Optional fields fall back to documented
//! defaults; an item missing a required field is skipped on its own.

pub mod defi;
pub mod market;
pub mod staking;

pub use defi::normalize_defi;
pub use market::normalize_market;
pub use staking::normalize_staking;

use crate::error::RecordError;
use serde_json::Value;

/// Items of an array payload; anything else is treated as an empty batch
pub(crate) fn payload_items<'a>(raw: &'a Value, family: &str) -> &'a [Value] {
    match raw.as_array() {
        Some(items) => items.as_slice(),
        None => {
            tracing::warn!(family = family, "Payload is not an array, ignoring");
            &[]
        }
    }
}

/// Uppercased, trimmed ticker
pub(crate) fn canonical_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub(crate) fn required_str(item: &Value, field: &'static str) -> Result<String, RecordError> {
    item.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(RecordError::PartialRecord { field })
}

pub(crate) fn required_f64(item: &Value, field: &'static str) -> Result<f64, RecordError> {
    optional_f64(item, field).ok_or(RecordError::PartialRecord { field })
}

pub(crate) fn optional_str(item: &Value, field: &str) -> Option<String> {
    item.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn optional_f64(item: &Value, field: &str) -> Option<f64> {
    item.get(field).and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// Logs a skipped item and returns None so callers can `filter_map`
pub(crate) fn skip_partial<T>(family: &str, index: usize, err: RecordError) -> Option<T> {
    tracing::debug!(family = family, index = index, error = %err, "Skipping item");
    None
}
