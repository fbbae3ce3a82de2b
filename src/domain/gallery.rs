//! Normalization for project gallery URL lists.
//!
//! The `gallery_image_urls` column is JSONB, but historical writers stored
//! either a JSON array of strings or a JSON string containing such an array.
//! Readers must accept both and always produce the same ordered list.

use serde_json::Value;
use tracing::debug;

/// Normalize a raw gallery value into an ordered list of URL strings.
///
/// Accepts a JSON array of strings, a JSON-encoded string of such an array
/// (any encoding depth), or null. Non-string members are skipped. The
/// operation is idempotent: feeding the output back in yields the same list.
pub fn normalize_gallery_urls(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::to_string)
            .collect(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(inner) => normalize_gallery_urls(&inner),
            Err(_) => {
                debug!(
                    target = "atelier::domain::gallery",
                    "gallery value was a non-JSON string; treating as empty"
                );
                Vec::new()
            }
        },
        other => {
            debug!(
                target = "atelier::domain::gallery",
                kind = value_kind(other),
                "unexpected gallery value shape; treating as empty"
            );
            Vec::new()
        }
    }
}

/// Serialize an ordered URL list back into the canonical JSONB shape.
pub fn gallery_urls_to_value(urls: &[String]) -> Value {
    Value::Array(urls.iter().cloned().map(Value::String).collect())
}

fn value_kind(value: &Value) -> &'static str {
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
    use serde_json::json;

    #[test]
    fn array_input_yields_ordered_list() {
        let value = json!(["/u/a.jpg", "/u/b.jpg", "/u/c.jpg"]);
        assert_eq!(
            normalize_gallery_urls(&value),
            vec!["/u/a.jpg", "/u/b.jpg", "/u/c.jpg"]
        );
    }

    #[test]
    fn encoded_string_matches_native_array() {
        let native = json!(["/u/a.jpg", "/u/b.jpg"]);
        let encoded = Value::String(native.to_string());
        assert_eq!(
            normalize_gallery_urls(&encoded),
            normalize_gallery_urls(&native)
        );
    }

    #[test]
    fn doubly_encoded_string_unwraps() {
        let native = json!(["/u/a.jpg"]);
        let once = Value::String(native.to_string());
        let twice = Value::String(serde_json::to_string(&once).expect("encode"));
        assert_eq!(normalize_gallery_urls(&twice), vec!["/u/a.jpg"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let value = Value::String(json!(["/u/a.jpg", "/u/b.jpg"]).to_string());
        let first = normalize_gallery_urls(&value);
        let second = normalize_gallery_urls(&gallery_urls_to_value(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn non_string_members_are_skipped() {
        let value = json!(["/u/a.jpg", 7, null, "/u/b.jpg", {"url": "x"}]);
        assert_eq!(normalize_gallery_urls(&value), vec!["/u/a.jpg", "/u/b.jpg"]);
    }

    #[test]
    fn null_and_garbage_yield_empty() {
        assert!(normalize_gallery_urls(&Value::Null).is_empty());
        assert!(normalize_gallery_urls(&json!(42)).is_empty());
        assert!(normalize_gallery_urls(&Value::String("not json".into())).is_empty());
    }
}
