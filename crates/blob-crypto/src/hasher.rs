/// Length of a hex-encoded content hash (256-bit digest).
pub const HASH_HEX_LEN: usize = 64;

/// Incremental BLAKE3 content hasher.
///
/// Bytes are fed in arrival order with [`update`](Self::update); the digest
/// depends only on the concatenated byte sequence, never on how it was
/// chunked.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: blake3::Hasher,
    bytes_hashed: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next slice of content.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self.bytes_hashed += data.len() as u64;
        self
    }

    /// Total number of bytes fed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Lowercase hex digest of everything fed so far.
    pub fn finalize_hex(&self) -> String {
        hex::encode(self.inner.finalize().as_bytes())
    }

    /// One-shot hex digest of `data`.
    pub fn hash_hex(data: &[u8]) -> String {
        hex::encode(blake3::hash(data).as_bytes())
    }

    /// Compare the digest of everything fed so far with a declared hash.
    ///
    /// Hex case is ignored.
    pub fn verify(&self, declared: &str) -> Result<(), HasherError> {
        let computed = self.finalize_hex();
        if computed.eq_ignore_ascii_case(declared) {
            Ok(())
        } else {
            Err(HasherError::Mismatch {
                expected: declared.to_string(),
                computed,
            })
        }
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher")
            .field("bytes_hashed", &self.bytes_hashed)
            .finish()
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("content hash mismatch, expected: [{expected}], computed: [{computed}]")]
    Mismatch { expected: String, computed: String },
}
