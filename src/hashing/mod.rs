//! Query normalization and BLAKE3 cache keys.

use blake3::Hasher;

use crate::cache::CacheScope;
use crate::geo::Coordinate;

/// Scope-qualified exact cache key (full 256-bit BLAKE3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// First 8 bytes as a little-endian `u64`, for log fields.
    #[inline]
    pub fn short(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Case-folds, trims and collapses internal whitespace.
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Computes a 64-bit hash of the input using BLAKE3, truncated from 256 bits.
///
/// Good enough for log correlation and partitioning; use [`CacheKey`] where a
/// collision would return the wrong result set.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Builds the exact-match key for a request.
///
/// `kind` separates the three entry points, `text` must already be
/// normalized. Every component is length- or tag-prefixed so adjacent fields
/// cannot alias.
pub fn cache_key(
    kind: &str,
    text: Option<&str>,
    center: Option<&Coordinate>,
    scope: &CacheScope,
) -> CacheKey {
    let mut hasher = Hasher::new();
    hasher.update(kind.as_bytes());
    hasher.update(b"|");

    update_opt_str(&mut hasher, text);

    match center {
        Some(c) => {
            let (lat, lon) = c.quantized();
            hasher.update(&[1]);
            hasher.update(&lat.to_le_bytes());
            hasher.update(&lon.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }

    update_opt_str(&mut hasher, scope.city_id.as_deref());
    update_opt_str(&mut hasher, scope.category.as_deref());
    update_opt_u32(&mut hasher, scope.radius_m);
    update_opt_u32(&mut hasher, scope.semantic_weight_milli.map(u32::from));

    CacheKey(*hasher.finalize().as_bytes())
}

fn update_opt_str(hasher: &mut Hasher, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            hasher.update(&(v.len() as u64).to_le_bytes());
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

fn update_opt_u32(hasher: &mut Hasher, value: Option<u32>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            hasher.update(&v.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}
