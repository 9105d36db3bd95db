//! Per-request script nonce.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;

const NONCE_BYTES: usize = 16;

/// 16 random bytes, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wraps an existing token. Used for probing a policy template.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Source expression for a policy, e.g. `'nonce-3f9a...'`.
    pub fn source(&self) -> String {
        format!("'nonce-{}'", self.0)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
