//! Key codec for the single ordered keyspace.
//!
//! Keys are slash-separated byte strings over four namespaces:
//!
//! ```text
//! meta/dbs/{db}/colls/{coll}                                    collection metadata
//! dbs/{db}/colls/{coll}/docs/{doc_id}                           document
//! dbs/{db}/colls/{coll}/idxs/{index}/{fields}/{values}/{doc_id} index entry
//! dbs/{db}/colls/{coll}                                         collection root (prefix)
//! ```
//!
//! Every variable segment is percent-escaped so `/` and `|` never appear
//! literally inside a segment; segment boundaries therefore cannot create
//! false prefix matches. `{fields}` joins the index field names with `|` in
//! declaration order, `{values}` joins the per-field encoded values.
//! Descending-encoded values contain inverted bytes (all >= 0x81), which
//! also cannot collide with the separators.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode, percent_encode};

/// Escape everything outside the URL-unreserved set, like the path escaping
/// the key layout was designed around.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SEP: u8 = b'/';
const VALUE_SEP: u8 = b'|';

pub fn escape(segment: &[u8]) -> String {
    percent_encode(segment, SEGMENT).to_string()
}

pub fn unescape(segment: &[u8]) -> Vec<u8> {
    percent_decode(segment).collect()
}

// ── Format ──────────────────────────────────────────────────────

pub fn collection_meta(db: &str, coll: &str) -> Vec<u8> {
    format!(
        "meta/dbs/{}/colls/{}",
        escape(db.as_bytes()),
        escape(coll.as_bytes())
    )
    .into_bytes()
}

pub fn collection_root(db: &str, coll: &str) -> Vec<u8> {
    format!(
        "dbs/{}/colls/{}",
        escape(db.as_bytes()),
        escape(coll.as_bytes())
    )
    .into_bytes()
}

pub fn document(db: &str, coll: &str, doc_id: &str) -> Vec<u8> {
    let mut key = document_prefix(db, coll);
    key.extend_from_slice(escape(doc_id.as_bytes()).as_bytes());
    key
}

/// Prefix covering every document of a collection.
pub fn document_prefix(db: &str, coll: &str) -> Vec<u8> {
    let mut key = collection_root(db, coll);
    key.extend_from_slice(b"/docs/");
    key
}

/// The `{fields}` signature segment: escaped field names joined by `|`,
/// in declaration order.
pub fn fields_signature<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|n| escape(n.as_bytes()))
        .collect::<Vec<_>>()
        .join("|")
}

/// Full index entry key: `.../idxs/{index}/{fields}/{values}/{doc_id}`.
pub fn index_entry(
    db: &str,
    coll: &str,
    index_name: &str,
    fields_sig: &str,
    values: &[Vec<u8>],
    doc_id: &str,
) -> Vec<u8> {
    let mut key = index_field_prefix(db, coll, index_name, fields_sig);
    push_values(&mut key, values);
    key.push(SEP);
    key.extend_from_slice(escape(doc_id.as_bytes()).as_bytes());
    key
}

/// Prefix covering every entry of one index: `.../idxs/{index}/{fields}/`.
pub fn index_field_prefix(db: &str, coll: &str, index_name: &str, fields_sig: &str) -> Vec<u8> {
    let mut key = collection_root(db, coll);
    key.extend_from_slice(b"/idxs/");
    key.extend_from_slice(escape(index_name.as_bytes()).as_bytes());
    key.push(SEP);
    key.extend_from_slice(fields_sig.as_bytes());
    key.push(SEP);
    key
}

/// Prefix covering the entries whose value tuple starts with `values`.
///
/// A complete tuple (`exact`) is terminated with `/` so it matches only
/// whole value segments; a partial tuple is terminated with `|`, the
/// in-segment separator that precedes the next encoded value.
pub fn index_values_prefix(
    db: &str,
    coll: &str,
    index_name: &str,
    fields_sig: &str,
    values: &[Vec<u8>],
    exact: bool,
) -> Vec<u8> {
    let mut key = index_field_prefix(db, coll, index_name, fields_sig);
    push_values(&mut key, values);
    key.push(if exact { SEP } else { VALUE_SEP });
    key
}

fn push_values(key: &mut Vec<u8>, values: &[Vec<u8>]) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            key.push(VALUE_SEP);
        }
        key.extend_from_slice(value);
    }
}

// ── Match ───────────────────────────────────────────────────────

/// Parsed document key segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    pub db: String,
    pub collection: String,
    pub doc_id: String,
}

/// Parse `dbs/{db}/colls/{coll}/docs/{doc_id}`.
pub fn parse_document_key(key: &[u8]) -> Option<DocumentKey> {
    let segments: Vec<&[u8]> = key.split(|&b| b == SEP).collect();
    match segments.as_slice() {
        [b"dbs", db, b"colls", coll, b"docs", doc_id] => Some(DocumentKey {
            db: unescape_str(db)?,
            collection: unescape_str(coll)?,
            doc_id: unescape_str(doc_id)?,
        }),
        _ => None,
    }
}

/// Parsed index entry key segments. The value segment is not decoded;
/// index entries are located by prefix, never reconstructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntryKey {
    pub db: String,
    pub collection: String,
    pub index_name: String,
    pub doc_id: String,
}

/// Parse `dbs/{db}/colls/{coll}/idxs/{index}/{fields}/{values}/{doc_id}`.
pub fn parse_index_entry_key(key: &[u8]) -> Option<IndexEntryKey> {
    let segments: Vec<&[u8]> = key.split(|&b| b == SEP).collect();
    match segments.as_slice() {
        [b"dbs", db, b"colls", coll, b"idxs", index_name, _fields, _values, doc_id] => {
            Some(IndexEntryKey {
                db: unescape_str(db)?,
                collection: unescape_str(coll)?,
                index_name: unescape_str(index_name)?,
                doc_id: unescape_str(doc_id)?,
            })
        }
        _ => None,
    }
}

/// Extract the trailing doc-id segment of an index entry key.
pub fn doc_id_from_index_entry(key: &[u8]) -> Option<String> {
    let last = key.rsplit(|&b| b == SEP).next()?;
    unescape_str(last)
}

fn unescape_str(segment: &[u8]) -> Option<String> {
    String::from_utf8(unescape(segment)).ok()
}
