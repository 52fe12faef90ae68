use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use super::enrich::repair_coordinate;
use super::model::PoiAttributes;

/// An unvalidated place as returned by the generative model.
///
/// Every field is lenient: missing values default, numeric strings are
/// accepted for coordinates and rating, and a few common key aliases are
/// recognised. Enrichment decides whether a candidate becomes a [`super::Poi`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CandidatePoi {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    #[serde(default, alias = "lat", deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(
        default,
        alias = "lon",
        alias = "lng",
        deserialize_with = "lenient_f64"
    )]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "price_range")]
    pub price_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub opening_hours: BTreeMap<String, String>,
}

impl CandidatePoi {
    /// Whether enrichment would keep this candidate.
    pub fn is_usable(&self) -> bool {
        !self.name.trim().is_empty() && repair_coordinate(self.latitude, self.longitude).is_some()
    }

    pub fn attributes(&self) -> PoiAttributes {
        PoiAttributes {
            address: non_empty(self.address.as_deref()),
            price_level: non_empty(self.price_level.as_deref()),
            rating: self.rating.filter(|r| r.is_finite()).map(|r| r as f32),
            tags: self
                .tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            opening_hours: self.opening_hours.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
