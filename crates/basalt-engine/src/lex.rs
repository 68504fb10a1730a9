//! Order-preserving encoding of scalar values for index keys.
//!
//! Sorting the encoded bytes reproduces sorting by value within each
//! supported scalar type. Numbers are zero-padded to a fixed width,
//! datetimes use RFC3339 (positional, so byte order follows time order),
//! and strings are percent-escaped so the key separators cannot appear.
//! Compound values (arrays, embedded documents) fall back to their textual
//! form and carry no ordering guarantee.

use bson::Bson;

use crate::key;

/// Sentinel marking a descending-encoded value.
const DESC_MARKER: u8 = b'~';

/// Encode a field value for inclusion in an index key.
///
/// For descending fields every escaped byte is inverted (`b -> 255 - b`)
/// and the result is prefixed with `~`, producing reverse lexicographic
/// order while staying clear of the `/` and `|` separators (inverted
/// bytes are all >= 0x81).
pub fn encode_lex(value: &Bson, descending: bool) -> Vec<u8> {
    let raw = match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => format!("{n:020}"),
        Bson::Int64(n) => format!("{n:020}"),
        Bson::Double(f) => format!("{f:020.6}"),
        Bson::Boolean(b) => String::from(if *b { "1" } else { "0" }),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| format!("{:020}", dt.timestamp_millis())),
        Bson::Binary(bin) => return finish(key::escape(&bin.bytes).into_bytes(), descending),
        other => other.to_string(),
    };

    finish(key::escape(raw.as_bytes()).into_bytes(), descending)
}

fn finish(escaped: Vec<u8>, descending: bool) -> Vec<u8> {
    if !descending {
        return escaped;
    }
    let mut out = Vec::with_capacity(escaped.len() + 1);
    out.push(DESC_MARKER);
    out.extend(escaped.iter().map(|&b| 255 - b));
    out
}
