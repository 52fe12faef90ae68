//! Model payload → candidate list.

use serde_json::Value;
use tracing::debug;

use super::error::{GenerationError, GenerationResult};
use crate::poi::CandidatePoi;

const LIST_KEYS: [&str; 4] = ["points_of_interest", "pois", "places", "results"];

/// Parses a completion into candidates.
///
/// Accepts a bare JSON array or an object holding the list under one of a few
/// common keys, optionally wrapped in Markdown code fences or surrounded by
/// prose. Elements that are not objects are skipped. Zero usable candidates is
/// an error.
pub fn parse_candidates(text: &str) -> GenerationResult<Vec<CandidatePoi>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let body = extract_json(strip_code_fence(trimmed));
    let value: Value = serde_json::from_str(body).map_err(|e| GenerationError::InvalidPayload {
        reason: e.to_string(),
    })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => LIST_KEYS
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| GenerationError::InvalidPayload {
                reason: "object has no list of places".to_string(),
            })?,
        other => {
            return Err(GenerationError::InvalidPayload {
                reason: format!("expected array or object, got {}", kind(&other)),
            });
        }
    };

    let total = items.len();
    let candidates: Vec<CandidatePoi> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    debug!(total, parsed = candidates.len(), "Parsed fallback payload");
    if candidates.is_empty() {
        return Err(GenerationError::NoCandidates);
    }
    Ok(candidates)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```json).
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Narrows `text` to the outermost JSON array/object when prose surrounds it.
fn extract_json(text: &str) -> &str {
    let start = text.find(['[', '{']);
    let end = text.rfind([']', '}']);
    match (start, end) {
        (Some(s), Some(e)) if e > s => &text[s..=e],
        _ => text,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_payload() {
        let payload = r#"{"points_of_interest": [
            {"name": "Louvre", "category": "museum", "latitude": 48.8606, "longitude": 2.3376},
            {"name": "Tuileries", "type": "park", "lat": "48.8635", "lng": "2.3275"}
        ]}"#;
        let parsed = parse_candidates(payload).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].category.as_deref(), Some("park"));
        assert_eq!(parsed[1].latitude, Some(48.8635));
        assert_eq!(parsed[1].longitude, Some(2.3275));
    }

    #[test]
    fn test_fenced_array_with_prose() {
        let payload = "Here you go:\n```json\n[{\"name\": \"Louvre\", \"lat\": 48.86, \"lon\": 2.33}]\n```\n";
        assert_eq!(parse_candidates(payload).unwrap()[0].name, "Louvre");

        let fenced = "```json\n[{\"name\": \"Louvre\"}]\n```";
        assert_eq!(parse_candidates(fenced).unwrap().len(), 1);
    }

    #[test]
    fn test_alternate_list_keys() {
        for key in ["pois", "places", "results"] {
            let payload = format!(r#"{{"{key}": [{{"name": "X"}}]}}"#);
            assert_eq!(parse_candidates(&payload).unwrap().len(), 1, "key {key}");
        }
    }

    #[test]
    fn test_empty_and_malformed() {
        assert!(matches!(parse_candidates("   "), Err(GenerationError::EmptyResponse)));
        assert!(matches!(
            parse_candidates("sorry, I can't help with that"),
            Err(GenerationError::InvalidPayload { .. })
        ));
        assert!(matches!(
            parse_candidates(r#"{"points_of_interest": [1, 2"#),
            Err(GenerationError::InvalidPayload { .. })
        ));
        assert!(matches!(
            parse_candidates(r#"{"unrelated": true}"#),
            Err(GenerationError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_zero_candidates_is_an_error() {
        assert!(matches!(parse_candidates("[]"), Err(GenerationError::NoCandidates)));
        assert!(matches!(
            parse_candidates(r#"{"pois": ["a", 3]}"#),
            Err(GenerationError::NoCandidates)
        ));
        assert!(parse_candidates("[]").unwrap_err().is_parse_failure());
    }
}
