//! Shared value codec.
//!
//! Every backend that stores values as strings goes through this one pair of
//! functions on both the write and the read path, so what `append_val`
//! writes is exactly what `get_list` decodes.

use serde_json::Value;

use super::error::{StorageError, StorageResult};
use super::types::Entry;

/// Encode a scalar value for storage.
///
/// # Errors
/// Returns `Serialization` if the value cannot be encoded.
pub fn encode_value(value: &Value) -> StorageResult<String> {
    serde_json::to_string(value).map_err(StorageError::from)
}

/// Decode a scalar value written by [`encode_value`].
///
/// # Errors
/// Returns `Serialization` if the stored text is not valid JSON.
pub fn decode_value(raw: &str) -> StorageResult<Value> {
    serde_json::from_str(raw).map_err(StorageError::from)
}

/// Encode an entry as the JSON pair `[vector, extra_data]`.
///
/// # Errors
/// Returns `Serialization` if the entry cannot be encoded (e.g. a NaN
/// component).
pub fn encode_entry(entry: &Entry) -> StorageResult<String> {
    if entry.vector.iter().any(|v| !v.is_finite()) {
        return Err(StorageError::serialization(
            "vector components must be finite",
        ));
    }
    serde_json::to_string(entry).map_err(StorageError::from)
}

/// Decode an entry written by [`encode_entry`].
///
/// # Errors
/// Returns `Serialization` if the stored text is not a `[vector, extra]` pair.
pub fn decode_entry(raw: &str) -> StorageResult<Entry> {
    serde_json::from_str(raw).map_err(|e| StorageError::serialization(format!("bad entry: {e}")))
}

/// Decode a whole bucket in stored order.
///
/// # Errors
/// Fails on the first element that does not decode.
pub fn decode_bucket<I, S>(raw: I) -> StorageResult<Vec<Entry>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter().map(|item| decode_entry(item.as_ref())).collect()
}
