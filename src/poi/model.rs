use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinate;
use crate::validation::ValidationError;

/// Provenance of a [`Poi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PoiSource {
    #[default]
    SpatialStore,
    Generated,
}

impl PoiSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoiSource::SpatialStore => "spatial-store",
            PoiSource::Generated => "generated",
        }
    }
}

impl std::fmt::Display for PoiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional structured details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Day label → hours text, e.g. `"mon" → "09:00-18:00"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub opening_hours: BTreeMap<String, String>,
}

impl PoiAttributes {
    /// Fills fields that are empty here from `other`.
    pub fn absorb(&mut self, other: PoiAttributes) {
        if self.address.is_none() {
            self.address = other.address;
        }
        if self.price_level.is_none() {
            self.price_level = other.price_level;
        }
        if self.rating.is_none() {
            self.rating = other.rating;
        }
        for tag in other.tags {
            if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                self.tags.push(tag);
            }
        }
        for (day, hours) in other.opening_hours {
            self.opening_hours.entry(day).or_insert(hours);
        }
    }
}

/// A point of interest.
///
/// `rank_score` units depend on the call path: kilometers for location
/// lookups, cosine similarity for semantic hits, and the blended score for
/// hybrid requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: PoiAttributes,
    #[serde(default)]
    pub source: PoiSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Poi {
    pub fn new(name: impl Into<String>, category: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            coordinate,
            description: String::new(),
            attributes: PoiAttributes::default(),
            source: PoiSource::SpatialStore,
            rank_score: None,
            embedding: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source(mut self, source: PoiSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_attributes(mut self, attributes: PoiAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Checks the write invariants: non-empty name and in-range coordinate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.coordinate.check()?;
        Ok(())
    }
}
