//! Section key derivation.
//!
//! Override maps are keyed by section key: trimmed `id`, else trimmed `role`.
//! A node with neither gets a key synthesized from a SHA-256 of its canonical
//! JSON, so keys are never empty and stay stable across passes.

use crate::model::{non_empty, Node};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix of synthesized keys.
pub const SYNTHETIC_KEY_PREFIX: &str = "section-";

/// Hex characters of the hash kept in a synthesized key.
const SYNTHETIC_HASH_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SectionKey {
    value: String,
    synthesized: bool,
}

impl SectionKey {
    /// Derive the key for `node`.
    pub fn derive(node: &Node) -> Self {
        if let Some(key) = non_empty(node.id.as_deref()).or_else(|| node.role_key()) {
            return Self {
                value: key.to_string(),
                synthesized: false,
            };
        }
        Self {
            value: synthesize(node),
            synthesized: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// True when the node had no usable `id` or `role`.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

fn synthesize(node: &Node) -> String {
    let mut hasher = Sha256::new();
    // serde_json maps are sorted, so this encoding is canonical.
    match serde_json::to_vec(node) {
        Ok(bytes) => hasher.update(&bytes),
        Err(_) => hasher.update(node.node_type.as_bytes()),
    }
    let digest = hex::encode(hasher.finalize());
    format!("{SYNTHETIC_KEY_PREFIX}{}", &digest[..SYNTHETIC_HASH_LEN])
}
