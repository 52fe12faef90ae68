//! Hybrid proximity/semantic ranking.
//!
//! `hybrid = (1 - w) * proximity + w * similarity`, with
//! `proximity = 1 / (1 + distance_km)`. A POI without an embedding scores
//! `(1 - w) * proximity` only. `w` outside `[0, 1]` is rejected, never clamped.

pub mod scorer;


pub use scorer::{HybridScorer, ScoreBreakdown, proximity_score};
