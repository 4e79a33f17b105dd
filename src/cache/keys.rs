//! Cache key to filename mapping
//!
//! Keys are arbitrary UTF-8 strings. Filenames are the URL-safe base64 of the
//! key bytes, so they never contain a path separator and can be decoded back
//! into the key for listings. The alphabet has no `.`, which keeps the lock
//! and staging suffixes unambiguous.
//!
//! Keys whose encoding would exceed [`MAX_ENCODED_LEN`] are stored under
//! `~` followed by the hex SHA-256 of the key instead. Those names cannot be
//! decoded, so listings show the hashed name in place of the key.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Longest encoded key used verbatim as a filename. With the staging suffix
/// (`.` + 32 hex + `.tmp`) the longest name stays under the common 255-byte
/// filename limit.
pub const MAX_ENCODED_LEN: usize = 160;

/// Leading character of hashed entry names; not in the base64 alphabet
const HASHED_PREFIX: char = '~';

/// Suffix of the lock marker sitting next to an entry file
pub const LOCK_SUFFIX: &str = ".lock";

/// Suffix of staging files written before an entry is committed
pub const STAGING_SUFFIX: &str = ".tmp";

/// Filename of the entry for `key`
pub fn entry_file_name(key: &str) -> String {
    let encoded = URL_SAFE.encode(key.as_bytes());
    if encoded.len() <= MAX_ENCODED_LEN {
        return encoded;
    }
    format!("{}{}", HASHED_PREFIX, hex::encode(Sha256::digest(key.as_bytes())))
}

/// Filename of the lock marker for an entry filename
pub fn lock_file_name(entry_file: &str) -> String {
    format!("{}{}", entry_file, LOCK_SUFFIX)
}

/// Filename of a fresh staging file for an entry filename
pub fn staging_file_name(entry_file: &str) -> String {
    format!("{}.{}{}", entry_file, uuid::Uuid::new_v4().simple(), STAGING_SUFFIX)
}

/// Whether a filename belongs to a transient file rather than an entry
pub fn is_transient(file_name: &str) -> bool {
    file_name.ends_with(LOCK_SUFFIX) || file_name.ends_with(STAGING_SUFFIX)
}

/// Key to show for an entry filename: the decoded key, or the filename
/// itself for hashed keys. `None` for anything that is not an entry.
pub fn listing_key(file_name: &str) -> Option<String> {
    if is_transient(file_name) {
        return None;
    }
    if file_name.starts_with(HASHED_PREFIX) {
        return Some(file_name.to_string());
    }
    let bytes = URL_SAFE.decode(file_name).ok()?;
    String::from_utf8(bytes).ok()
}
