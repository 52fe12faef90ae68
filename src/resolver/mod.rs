//! Resolution pipeline: the three resolve operations over the cache, spatial
//! store, embedding service and generative fallback.

mod config;
mod error;
mod flight;
mod pipeline;
mod request;


pub use config::ResolverConfig;
pub use error::{ResolveError, ResolverConfigError, Upstream};
pub use flight::{FlightGroup, FlightGuard};
pub use pipeline::Resolver;
pub use request::{
    HybridQuery, LocationQuery, Resolution, ResolutionStage, SemanticQuery,
};
