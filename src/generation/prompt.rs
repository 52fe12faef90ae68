//! Prompt construction for the generative fallback.

use serde::Serialize;

use crate::constants::DEFAULT_MAX_GENERATED_RESULTS;
use crate::geo::Coordinate;

const SYSTEM_PROMPT: &str = "You are a travel research assistant. You answer only with \
valid JSON and never invent coordinates you are unsure about. Coordinates use WGS84 \
decimal degrees.";

const RESPONSE_SHAPE: &str = r#"Respond with a JSON object of the form:
{"points_of_interest": [{"name": string, "category": string, "latitude": number,
"longitude": number, "description": string, "address": string | null,
"price_level": string | null, "rating": number | null, "tags": [string],
"opening_hours": {string: string}}]}"#;

/// What the fallback is asked to find.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackSubject {
    Area {
        center: Coordinate,
        radius_km: f64,
        category: Option<String>,
    },
    Query {
        text: String,
        city_id: Option<String>,
    },
    Hybrid {
        center: Coordinate,
        radius_km: f64,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Both messages joined, as recorded on the interaction row.
    pub fn full_text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

pub fn build_prompt(subject: &FallbackSubject) -> Prompt {
    build_prompt_with_limit(subject, DEFAULT_MAX_GENERATED_RESULTS)
}

pub fn build_prompt_with_limit(subject: &FallbackSubject, max_results: usize) -> Prompt {
    let max_results = max_results.max(1);
    let task = match subject {
        FallbackSubject::Area {
            center,
            radius_km,
            category,
        } => {
            let what = match category.as_deref().map(str::trim) {
                Some(c) if !c.is_empty() => format!("points of interest in the category \"{c}\""),
                _ => "notable points of interest".to_string(),
            };
            format!(
                "List up to {max_results} {what} within {radius_km:.2} km of latitude {:.6}, \
                 longitude {:.6}. Order them from nearest to farthest.",
                center.latitude, center.longitude
            )
        }
        FallbackSubject::Query { text, city_id } => match city_id.as_deref() {
            Some(city) if !city.trim().is_empty() => format!(
                "List up to {max_results} points of interest in {} that match the request: \"{}\".",
                city.trim(),
                text.trim()
            ),
            _ => format!(
                "List up to {max_results} points of interest that match the request: \"{}\".",
                text.trim()
            ),
        },
        FallbackSubject::Hybrid {
            center,
            radius_km,
            text,
        } => format!(
            "List up to {max_results} points of interest within {radius_km:.2} km of latitude \
             {:.6}, longitude {:.6} that match the request: \"{}\". Prefer places that fit \
             the request well, then closer places.",
            center.latitude,
            center.longitude,
            text.trim()
        ),
    };

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!("{task}\n\n{RESPONSE_SHAPE}"),
    }
}
