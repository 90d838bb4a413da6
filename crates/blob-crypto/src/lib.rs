//! Content hashing for the blob service.
//!
//! A blob's content hash is the lowercase hex BLAKE3 digest of its bytes.
//! Clients declare it up front; the server recomputes it incrementally while
//! the payload streams in and rejects the upload on mismatch.

pub mod hasher;

pub use hasher::{ContentHasher, HasherError, HASH_HEX_LEN};
