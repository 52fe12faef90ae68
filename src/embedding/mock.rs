//! Deterministic in-process embedder for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::EmbeddingService;
use super::error::EmbeddingError;
use super::similarity::l2_normalize;
use crate::hashing::normalize_query;

pub const MOCK_EMBEDDING_DIM: usize = 64;

/// Hash-seeded unit vectors; identical normalized text yields identical vectors.
///
/// Specific texts can be pinned to hand-picked vectors with
/// [`MockEmbeddingService::with_vector`] to stage near-duplicate queries.
pub struct MockEmbeddingService {
    dim: usize,
    overrides: RwLock<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl Default for MockEmbeddingService {
    fn default() -> Self {
        Self::new(MOCK_EMBEDDING_DIM)
    }
}

impl MockEmbeddingService {
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            overrides: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
        self.set_vector(text, vector);
        self
    }

    pub fn set_vector(&self, text: &str, vector: Vec<f32>) {
        self.overrides.write().insert(normalize_query(text), vector);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hashed_vector(&self, key: &str) -> Vec<f32> {
        let mut bytes = vec![0u8; self.dim * 4];
        blake3::Hasher::new()
            .update(key.as_bytes())
            .finalize_xof()
            .fill(&mut bytes);

        let mut v: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| {
                let raw = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                (raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect();
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::RequestFailed {
                reason: "mock embedding failure".to_string(),
            });
        }

        let key = normalize_query(text);
        if key.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        if let Some(v) = self.overrides.read().get(&key) {
            return Ok(v.clone());
        }
        Ok(self.hashed_vector(&key))
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let mock = MockEmbeddingService::default();
        let a = mock.embed("Coffee Shops").await.unwrap();
        let b = mock.embed("coffee   shops").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), MOCK_EMBEDDING_DIM);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);

        let other = mock.embed("museums").await.unwrap();
        assert!(cosine_similarity(&a, &other).unwrap() < 0.93);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_overrides_and_failure() {
        let mock = MockEmbeddingService::new(3).with_vector("tacos", vec![1.0, 0.0, 0.0]);
        assert_eq!(mock.embed("TACOS").await.unwrap(), vec![1.0, 0.0, 0.0]);

        mock.set_failing(true);
        assert!(mock.embed("tacos").await.is_err());
    }
}
