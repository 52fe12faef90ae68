pub mod cache;
pub mod config;
pub mod types;


pub use cache::VectorCache;
pub use config::VectorCacheConfig;
pub use types::{SimilarHit, VectorCacheEntry};
