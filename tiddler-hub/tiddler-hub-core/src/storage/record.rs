use serde::{Deserialize, Serialize};

/// One versioned tiddler as it sits on disk.
///
/// `meta` is the JSON-encoded metadata envelope, kept as an opaque string at
/// this layer. The field names are part of the file format.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TiddlerRecord {
    #[serde(rename = "Rev", default)]
    pub rev: u64,
    #[serde(rename = "Meta", default)]
    pub meta: String,
    #[serde(rename = "Text", default)]
    pub text: String,
}

impl TiddlerRecord {
    pub fn new(rev: u64, meta: String, text: String) -> Self {
        Self { rev, meta, text }
    }

    /// Deleted tiddlers keep their file but lose their metadata.
    pub fn is_tombstone(&self) -> bool {
        self.meta.is_empty()
    }

    /// The record that replaces this one when the tiddler is deleted.
    pub fn tombstone(&self) -> Self {
        Self {
            rev: self.rev + 1,
            meta: String::new(),
            text: String::new(),
        }
    }
}
