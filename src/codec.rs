//! Snapshot Codec Module
//!
//! Encoding and decoding of the full entry list to and from the textual
//! snapshot representation written to disk. The codec is a strategy
//! injected at construction; the default encodes the entry list as JSON
//! via serde_json.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// == Snapshot Entry ==
/// A single entry in the on-disk snapshot: key, value and the absolute
/// expiration timestamp it was saved with (Unix milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
}

// == Snapshot Codec Trait ==
/// Strategy for turning the entry list into a restorable string and back.
///
/// Implementations must guarantee `decode(encode(items)) == items` for
/// every value shape they support; the facade relies on nothing else.
pub trait SnapshotCodec: Send + Sync {
    /// Encodes the full entry list into snapshot text.
    fn encode(&self, items: &[SnapshotEntry]) -> Result<String>;

    /// Decodes snapshot text back into the entry list.
    fn decode(&self, text: &str) -> Result<Vec<SnapshotEntry>>;
}

// == JSON Codec ==
/// Default codec: the JSON encoding of the entry array.
///
/// Values are owned `serde_json::Value` trees, so arbitrary nesting
/// round-trips; shared subtrees are duplicated on encode.
#[derive(Debug, Default)]
pub struct JsonCodec;

impl SnapshotCodec for JsonCodec {
    fn encode(&self, items: &[SnapshotEntry]) -> Result<String> {
        Ok(serde_json::to_string(items)?)
    }

    fn decode(&self, text: &str) -> Result<Vec<SnapshotEntry>> {
        Ok(serde_json::from_str(text)?)
    }
}
