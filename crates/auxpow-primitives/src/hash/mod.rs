//! SHA-256 digests.
//!
//! Header identity, transaction ids and merkle nodes all use double SHA-256.

use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256d::new();
    hasher.update(data);
    hasher.finish()
}

/// SHA-256d of `left || right`.
pub fn sha256d_concat(left: &[u8], right: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256d::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finish()
}

/// Incremental double SHA-256, fed piece by piece.
#[derive(Clone, Default)]
pub struct Sha256d {
    inner: Sha256,
}

impl Sha256d {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finish(self) -> [u8; 32] {
        sha256(&self.inner.finalize())
    }
}
