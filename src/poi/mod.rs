//! Point-of-interest records, generated candidates and enrichment.

pub mod candidate;
pub mod enrich;
mod model;

pub use candidate::CandidatePoi;
pub use enrich::{EnrichmentReport, Enricher, repair_coordinate};
pub use model::{Poi, PoiAttributes, PoiSource};
