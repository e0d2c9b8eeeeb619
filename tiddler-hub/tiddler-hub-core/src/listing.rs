//! The "skinny" tiddler list.
//!
//! Clients load every tiddler's metadata up front and fetch bodies lazily.
//! Macro tiddlers are the exception: they do nothing until loaded, so their
//! text is inlined here.

use crate::error::Result;
use crate::storage::FileStore;
use crate::tiddler::{is_macro, parse_meta, TEXT_FIELD};
use serde_json::Value;
use tracing::{debug, warn};

/// Metadata for every live tiddler in `store`, in traversal order.
///
/// Entries that fail to load or whose metadata does not parse are skipped
/// and logged rather than failing the whole listing. Tombstones are skipped
/// silently.
pub fn list_skinny(store: &FileStore) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    for key in store.keys()? {
        let record = match store.get(&key) {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %key, error = %e, "skipping unreadable tiddler");
                continue;
            }
        };
        if record.is_tombstone() {
            debug!(key = %key, rev = record.rev, "skipping deleted tiddler");
            continue;
        }
        let mut fields = match parse_meta(&key, &record) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(key = %key, error = %e, "skipping tiddler with bad metadata");
                continue;
            }
        };
        if is_macro(&fields) {
            fields.insert(TEXT_FIELD.to_string(), Value::from(record.text));
        }
        out.push(Value::Object(fields));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::derive_key;
    use crate::storage::TiddlerRecord;
    use crate::tiddler::split;
    use serde_json::json;
    use tempfile::TempDir;

    fn put(store: &FileStore, title: &str, value: Value) {
        let Value::Object(fields) = value else {
            panic!("not an object")
        };
        let key = derive_key(title);
        let rev = store.next_revision(&key);
        store.put(&key, &split(fields, rev)).unwrap();
    }

    fn by_title(list: &[Value], title: &str) -> Option<Value> {
        list.iter().find(|v| v["title"] == title).cloned()
    }

    #[test]
    fn empty_store_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        assert!(list_skinny(&store).unwrap().is_empty());
    }

    #[test]
    fn macro_text_is_inlined_other_text_is_not() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        put(
            &store,
            "MyMacros",
            json!({"title": "MyMacros", "tags": ["$:/tags/Macro"], "text": "\\define hi() hi"}),
        );
        put(&store, "Plain", json!({"title": "Plain", "text": "body"}));

        let list = list_skinny(&store).unwrap();
        assert_eq!(list.len(), 2);

        let macros = by_title(&list, "MyMacros").unwrap();
        assert_eq!(macros["text"], "\\define hi() hi");

        let plain = by_title(&list, "Plain").unwrap();
        assert!(plain.get("text").is_none());
        assert_eq!(plain["bag"], "bag");
        assert_eq!(plain["revision"], 1);
    }

    #[test]
    fn tombstones_are_hidden() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        put(&store, "Gone", json!({"title": "Gone"}));
        put(&store, "Kept", json!({"title": "Kept"}));

        let key = derive_key("Gone");
        let dead = store.get(&key).unwrap().tombstone();
        store.put(&key, &dead).unwrap();

        let list = list_skinny(&store).unwrap();
        assert_eq!(list.len(), 1);
        assert!(by_title(&list, "Kept").is_some());
    }

    #[test]
    fn corrupt_entries_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        put(&store, "Good", json!({"title": "Good"}));
        std::fs::write(temp_dir.path().join("garbage"), "not json").unwrap();
        store
            .put("badmeta", &TiddlerRecord::new(1, "{nope".to_string(), String::new()))
            .unwrap();

        let list = list_skinny(&store).unwrap();
        assert_eq!(list, vec![json!({"title": "Good", "bag": "bag", "revision": 1})]);
    }
}
