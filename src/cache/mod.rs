//! Disk-backed memoizing cache
//!
//! One file per key holds the committed result bytes; its modification time
//! is the freshness signal. A sibling lock marker exists while a result is
//! being computed, giving at-most-one computation per key across every
//! process that shares the directory.
//!
//! # Directory Layout
//!
//! | File | Meaning |
//! |------|---------|
//! | `{base64(key)}` | Committed entry bytes |
//! | `{base64(key)}.lock` | Computation in flight |
//! | `{base64(key)}.{id}.tmp` | Entry being written, renamed into place on commit |

pub mod keys;
pub mod lock;
pub mod store;

pub use lock::{wait_for_removal, LockMarker, WaitOutcome};
pub use store::{CacheEntryInfo, CacheOptions, CacheStore};
