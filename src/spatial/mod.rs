//! Spatial query port and an in-process store.

mod error;
mod memory;


use async_trait::async_trait;

use crate::geo::Coordinate;
use crate::poi::Poi;

pub use error::{SpatialError, SpatialResult};
pub use memory::InMemorySpatialStore;

#[async_trait]
/// Radius search over stored POIs.
pub trait SpatialQueryPort: Send + Sync {
    /// POIs within `radius_m` of `center`, nearest first.
    ///
    /// An empty list means "no data" and is not an error.
    async fn find_near(
        &self,
        center: Coordinate,
        radius_m: f64,
        category: Option<&str>,
    ) -> SpatialResult<Vec<Poi>>;

    /// Readiness probe for `/ready`.
    async fn is_ready(&self) -> bool {
        true
    }
}
