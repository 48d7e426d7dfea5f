//! Extra-data codec: JSON encoding, namespace partitioning and size bounding.
//!
//! Extra data is a string-keyed mapping of arbitrary JSON values. Keys that
//! start with [`INTERNAL_MARKER`] belong to the internal namespace and are
//! never shown to end consumers; every other key is external.

use crate::error::CodecError;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::debug;

/// Extra data attached to a log entry. Sorted keys keep the encoding stable.
pub type ExtraData = BTreeMap<String, Value>;

/// Prefix that marks a key as internal.
pub const INTERNAL_MARKER: &str = "__";

/// Appended to values cut down by [`shorten`].
pub const ELISION: &str = "...";

/// Containers a decodable blob may nest, the outer mapping included.
/// serde_json refuses to read anything deeper.
pub const MAX_NESTING: usize = 127;

const EMPTY_MAPPING: &[u8] = b"{}";

pub fn is_internal_key(key: &str) -> bool {
    key.starts_with(INTERNAL_MARKER)
}

/// Encode a mapping into its byte representation.
///
/// Mappings that [`decode`] could not read back are refused.
pub fn encode(data: &ExtraData) -> Result<Vec<u8>, CodecError> {
    check_nesting(data)?;
    serde_json::to_vec(data).map_err(CodecError::Encode)
}

/// Convert any serializable value into extra data.
///
/// Fails when the value does not serialize to a string-keyed mapping.
pub fn to_extra_data<T: Serialize>(value: &T) -> Result<ExtraData, CodecError> {
    match serde_json::to_value(value).map_err(CodecError::Encode)? {
        Value::Object(map) => {
            let data: ExtraData = map.into_iter().collect();
            check_nesting(&data)?;
            Ok(data)
        }
        Value::Null => Ok(ExtraData::new()),
        _ => Err(CodecError::NotAMapping),
    }
}

fn check_nesting(data: &ExtraData) -> Result<(), CodecError> {
    // The outer mapping is level 1.
    let mut pending: Vec<(&Value, usize)> = data.values().map(|v| (v, 2)).collect();
    while let Some((value, depth)) = pending.pop() {
        let children: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => continue,
        };
        if depth > MAX_NESTING {
            return Err(CodecError::TooDeep { max: MAX_NESTING });
        }
        pending.extend(children.into_iter().map(|v| (v, depth + 1)));
    }
    Ok(())
}

/// Decode bytes produced by [`encode`]. Empty input yields an empty mapping.
pub fn decode(raw: &[u8]) -> Result<ExtraData, CodecError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExtraData::new());
    }
    match serde_json::from_slice::<Value>(raw).map_err(CodecError::Decode)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Null => Ok(ExtraData::new()),
        _ => Err(CodecError::NotAMapping),
    }
}

/// Like [`decode`], but a corrupt blob reads as an empty mapping.
pub fn decode_lossy(raw: &[u8]) -> ExtraData {
    decode(raw).unwrap_or_else(|e| {
        debug!("ignoring undecodable extra data ({} bytes): {e}", raw.len());
        ExtraData::new()
    })
}

/// Keys outside the internal namespace.
pub fn partition_external(data: &ExtraData) -> ExtraData {
    data.iter()
        .filter(|(key, _)| !is_internal_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Keys inside the internal namespace, with the marker stripped.
pub fn partition_internal(data: &ExtraData) -> ExtraData {
    data.iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(INTERNAL_MARKER)
                .map(|stripped| (stripped.to_string(), value.clone()))
        })
        .collect()
}

/// Inverse of [`partition_internal`]: put the marker back on every key.
pub fn restore_internal(internal: &ExtraData) -> ExtraData {
    internal
        .iter()
        .map(|(key, value)| (format!("{INTERNAL_MARKER}{key}"), value.clone()))
        .collect()
}

/// Bound an encoded blob to `max_size` bytes.
///
/// External values are cut first, then dropped; internal values are only cut
/// once the external namespace is gone. The result always decodes and is
/// returned unchanged when it already fits.
pub fn shorten(raw: &[u8], max_size: usize) -> Vec<u8> {
    if raw.len() <= max_size {
        return raw.to_vec();
    }
    let data = match decode(raw) {
        Ok(data) => data,
        Err(e) => {
            debug!("dropping oversized undecodable extra data: {e}");
            return Vec::new();
        }
    };
    let (internal, external): (ExtraData, ExtraData) =
        data.into_iter().partition(|(key, _)| is_internal_key(key));

    if let Some(bytes) = shrink_values(&internal, &external, max_size) {
        return bytes;
    }
    if let Some(bytes) = shrink_values(&ExtraData::new(), &internal, max_size) {
        return bytes;
    }
    if EMPTY_MAPPING.len() <= max_size {
        EMPTY_MAPPING.to_vec()
    } else {
        Vec::new()
    }
}

/// Halve the per-value character budget of `shrinkable` until it fits
/// next to `fixed`. `None` once even fully elided values do not fit.
fn shrink_values(fixed: &ExtraData, shrinkable: &ExtraData, max_size: usize) -> Option<Vec<u8>> {
    let mut budget = shrinkable.values().map(rendered_len).max().unwrap_or(0);
    loop {
        let mut candidate = fixed.clone();
        candidate.extend(
            shrinkable
                .iter()
                .map(|(key, value)| (key.clone(), elide(value, budget))),
        );
        if let Ok(bytes) = encode(&candidate) {
            if bytes.len() <= max_size {
                return Some(bytes);
            }
        }
        if budget == 0 {
            return None;
        }
        budget /= 2;
    }
}

fn rendered(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

fn rendered_len(value: &Value) -> usize {
    rendered(value).chars().count()
}

fn elide(value: &Value, max_chars: usize) -> Value {
    let text = rendered(value);
    if text.chars().count() <= max_chars {
        return value.clone();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str(ELISION);
    Value::String(short)
}
