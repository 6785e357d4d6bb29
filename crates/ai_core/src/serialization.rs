//! Artifact encoding and hashing
//!
//! Artifacts are converted to a `serde_json::Value` and pretty-printed with
//! a two-space indent. Struct fields keep declaration order and maps print
//! sorted by key, so saving the same value twice gives the same bytes and
//! the same BLAKE3 hash.

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;
use std::io::Write;

const INDENT: &[u8] = b"  ";

/// Write `value` to `writer` in the artifact encoding.
pub fn write_canonical_json<T, W>(writer: W, value: &T) -> Result<(), serde_json::Error>
where
    T: Serialize + ?Sized,
    W: Write,
{
    let value = serde_json::to_value(value)?;
    let mut serializer = Serializer::with_formatter(writer, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)
}

pub fn canonical_json_string<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut buffer = Vec::new();
    write_canonical_json(&mut buffer, value)?;
    String::from_utf8(buffer).map_err(serde_json::Error::custom)
}

/// BLAKE3 hash of a serialized artifact, hex encoded.
pub fn content_hash_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}
