//! Title-level operations on the tiddler bag.
//!
//! [`TiddlerBag`] ties key derivation, revisioning and the metadata/text
//! split together on top of a [`FileStore`]. It holds no state besides the
//! store root, so it can be shared freely between requests.

use crate::error::Result;
use crate::key::derive_key;
use crate::listing::list_skinny;
use crate::storage::FileStore;
use crate::tiddler::{merge, parse_fields, split, BAG_NAME};
use md5::{Digest, Md5};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Result of a successful write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOutcome {
    pub revision: u64,
    pub etag: String,
}

pub struct TiddlerBag {
    store: FileStore,
}

impl TiddlerBag {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Full client view of `title`, text included.
    pub fn get(&self, title: &str) -> Result<Map<String, Value>> {
        let key = derive_key(title);
        let record = self.store.get(&key)?;
        merge(&key, &record)
    }

    /// Store `body` (a JSON object) as the next revision of `title`.
    pub fn put(&self, title: &str, body: &[u8]) -> Result<PutOutcome> {
        let fields = parse_fields(body)?;
        let key = derive_key(title);
        let revision = self.store.next_revision(&key);
        self.store.put(&key, &split(fields, revision))?;
        debug!(title, key = %key, revision, "stored tiddler");
        Ok(PutOutcome {
            revision,
            etag: etag(title, revision, body),
        })
    }

    /// Replace `title` with a tombstone and return the tombstone's revision.
    pub fn delete(&self, title: &str) -> Result<u64> {
        let key = derive_key(title);
        let dead = self.store.get(&key)?.tombstone();
        self.store.put(&key, &dead)?;
        debug!(title, key = %key, revision = dead.rev, "deleted tiddler");
        Ok(dead.rev)
    }

    /// Metadata of every live tiddler; see [`list_skinny`].
    pub fn list(&self) -> Result<Vec<Value>> {
        list_skinny(&self.store)
    }
}

/// `"bag/{title}/{revision}:{md5 of body}"`, quotes included.
pub fn etag(title: &str, revision: u64, body: &[u8]) -> String {
    format!(
        "\"{}/{}/{}:{:x}\"",
        BAG_NAME,
        query_escape(title),
        revision,
        Md5::digest(body)
    )
}

/// Form-style escaping: unreserved characters pass through, space becomes
/// `+`, everything else is percent-encoded.
pub fn query_escape(s: &str) -> String {
    urlencoding::encode(s).replace("%20", "+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn bag(dir: &TempDir) -> TiddlerBag {
        TiddlerBag::new(FileStore::new(dir.path()))
    }

    fn md5_hex(body: &[u8]) -> String {
        format!("{:x}", Md5::digest(body))
    }

    #[test]
    fn put_reports_etag() {
        let temp_dir = TempDir::new().unwrap();
        let bag = bag(&temp_dir);
        let body = br#"{"text":"abc","tags":["x"]}"#;

        let outcome = bag.put("Foo", body).unwrap();

        assert_eq!(outcome.revision, 1);
        assert_eq!(outcome.etag, format!("\"bag/Foo/1:{}\"", md5_hex(body)));
    }

    #[test]
    fn put_then_get_merges_text_and_bookkeeping() {
        let temp_dir = TempDir::new().unwrap();
        let bag = bag(&temp_dir);
        bag.put("Foo", br#"{"text":"abc","tags":["x"]}"#).unwrap();

        let got = Value::Object(bag.get("Foo").unwrap());
        assert_eq!(
            got,
            json!({"text": "abc", "tags": ["x"], "bag": "bag", "revision": 1})
        );
    }

    #[test]
    fn revisions_count_up() {
        let temp_dir = TempDir::new().unwrap();
        let bag = bag(&temp_dir);

        let revs: Vec<u64> = (0..3)
            .map(|i| {
                let body = format!(r#"{{"title":"X","text":"v{}"}}"#, i);
                bag.put("X", body.as_bytes()).unwrap().revision
            })
            .collect();

        assert_eq!(revs, vec![1, 2, 3]);
        assert_eq!(bag.get("X").unwrap()["text"], "v2");
    }

    #[test]
    fn delete_tombstones_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let bag = bag(&temp_dir);
        bag.put("Foo", br#"{"title":"Foo","text":"abc"}"#).unwrap();

        assert_eq!(bag.delete("Foo").unwrap(), 2);

        let record = bag.store().get(&derive_key("Foo")).unwrap();
        assert_eq!(record.rev, 2);
        assert!(record.is_tombstone());
        assert!(matches!(
            bag.get("Foo").unwrap_err(),
            StoreError::MalformedStoredData { .. }
        ));
        assert!(bag.list().unwrap().is_empty());
    }

    #[test]
    fn put_after_delete_continues_revisions() {
        let temp_dir = TempDir::new().unwrap();
        let bag = bag(&temp_dir);
        bag.put("Foo", b"{}").unwrap();
        bag.delete("Foo").unwrap();

        assert_eq!(bag.put("Foo", b"{}").unwrap().revision, 3);
        assert_eq!(bag.list().unwrap().len(), 1);
    }

    #[test]
    fn delete_of_unknown_title_fails() {
        let temp_dir = TempDir::new().unwrap();
        let bag = bag(&temp_dir);
        assert!(matches!(
            bag.delete("Nope").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn malformed_body_is_rejected_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let bag = bag(&temp_dir);

        let err = bag.put("Foo", b"not json").unwrap_err();
        assert!(err.is_client_error());
        assert!(bag.store().keys().unwrap().is_empty());
    }

    #[test]
    fn concurrent_puts_are_all_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let bag = Arc::new(bag(&temp_dir));

        let handles: Vec<_> = ["one", "two"]
            .into_iter()
            .map(|text| {
                let bag = bag.clone();
                std::thread::spawn(move || {
                    let body = format!(r#"{{"text":"{}"}}"#, text);
                    bag.put("Race", body.as_bytes())
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }

        // Both writers may have read the same prior revision; the last rename
        // wins either way.
        let got = bag.get("Race").unwrap();
        let rev = got["revision"].as_u64().unwrap();
        assert!(rev == 1 || rev == 2);
        assert!(got["text"] == "one" || got["text"] == "two");
    }

    #[test]
    fn etag_escapes_title() {
        assert_eq!(
            etag("A b/c~", 4, b"{}"),
            format!("\"bag/A+b%2Fc~/4:{}\"", md5_hex(b"{}"))
        );
    }

    #[test]
    fn query_escape_matches_form_encoding() {
        assert_eq!(query_escape("Hello World"), "Hello+World");
        assert_eq!(query_escape("$:/tags/Macro"), "%24%3A%2Ftags%2FMacro");
        assert_eq!(query_escape("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(query_escape("é"), "%C3%A9");
    }
}
