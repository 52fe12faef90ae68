//! Text embedding: the service port, an HTTP client and vector math.

mod client;
mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod similarity;

use async_trait::async_trait;

pub use client::{EmbeddingClientConfig, HttpEmbeddingClient};
pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MOCK_EMBEDDING_DIM, MockEmbeddingService};
pub use similarity::{cosine_similarity, l2_normalize};

#[async_trait]
/// Turns text into a dense vector.
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    /// Used as the label on cached vectors.
    fn model_name(&self) -> &str;
}
