//! Spec hashing for change detection.
//!
//! This module provides deterministic hashing of image specifications. The
//! hash identifies a spec in plans and logs; drift detection itself always
//! compares field by field.

use sha2::{Digest, Sha256};

use super::spec::ImageSpec;

/// Hasher for computing spec hashes.
#[derive(Debug, Default)]
pub struct SpecHasher;

impl SpecHasher {
    /// Creates a new spec hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of an image specification.
    ///
    /// Label insertion order does not affect the result.
    #[must_use]
    pub fn hash_spec(&self, spec: &ImageSpec) -> String {
        let mut hasher = Sha256::new();

        hash_str(&mut hasher, spec.token.expose());
        hash_opt(&mut hasher, spec.image_url.as_deref());
        hash_opt(&mut hasher, spec.compression.as_deref());
        hash_opt(&mut hasher, spec.format.as_deref());
        match spec.image_size {
            Some(size) => {
                hasher.update([1u8]);
                hasher.update(size.to_be_bytes());
            }
            None => hasher.update([0u8]),
        }
        hash_str(&mut hasher, &spec.architecture);
        hash_opt(&mut hasher, spec.server_type.as_deref());
        hash_opt(&mut hasher, spec.description.as_deref());

        // Labels (sorted for determinism)
        hasher.update((spec.labels.len() as u64).to_be_bytes());
        for (key, value) in spec.sorted_labels() {
            hash_str(&mut hasher, key);
            hash_str(&mut hasher, value);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

/// Hashes a length-prefixed string, so adjacent values cannot collide.
fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn hash_opt(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hash_str(hasher, v);
        }
        None => hasher.update([0u8]),
    }
}
