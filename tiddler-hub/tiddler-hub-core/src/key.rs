//! Title to storage key mapping.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Length of every key produced by [`derive_key`].
pub const KEY_LEN: usize = 44;

/// Hash a tiddler title into a filesystem-safe key.
///
/// The key is the SHA-256 digest of the title's bytes in URL-safe base64,
/// padded, so it never contains `/` and never starts with `.`. Looking up a
/// title needs no index: derive the key and open the file.
pub fn derive_key(title: &str) -> String {
    let digest = Sha256::digest(title.as_bytes());
    URL_SAFE.encode(digest)
}
