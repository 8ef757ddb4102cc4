//! Minimal `{{ key }}` substitution from event payloads.
//!
//! Configuration values may be computed per event: `{{ key }}`
//! placeholders are replaced with values read from the incoming event's
//! payload before the option is used. Dotted paths descend into nested
//! objects. Unresolved placeholders render as empty text.

use serde_json::{Map, Value};

/// Whether a config value contains placeholders at all.
pub fn is_templated(value: &str) -> bool {
    value.contains("{{")
}

/// Replace every `{{ key }}` placeholder with the payload value it names.
///
/// String values substitute verbatim; everything else substitutes as its
/// JSON text.
pub fn interpolate(template: &str, payload: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = lookup(payload, key) {
                    out.push_str(&render(value));
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated placeholder: keep the tail as-is.
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup<'a>(payload: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = payload.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Map<String, Value> {
        let Value::Object(map) = json!({
            "topic": "telemetry",
            "count": 3,
            "meta": {"schema": "/schemas/device.proto"},
        }) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn test_plain_values_pass_through() {
        assert_eq!(interpolate("payload", &payload()), "payload");
        assert!(!is_templated("payload"));
    }

    #[test]
    fn test_substitutes_string_and_number() {
        assert_eq!(
            interpolate("{{ topic }}-decoded", &payload()),
            "telemetry-decoded"
        );
        assert_eq!(interpolate("n={{count}}", &payload()), "n=3");
    }

    #[test]
    fn test_dotted_path_descends() {
        assert_eq!(
            interpolate("{{ meta.schema }}", &payload()),
            "/schemas/device.proto"
        );
    }

    #[test]
    fn test_unknown_key_renders_empty() {
        assert_eq!(interpolate("x{{ missing }}y", &payload()), "xy");
    }

    #[test]
    fn test_unterminated_placeholder_is_kept() {
        assert_eq!(interpolate("a{{ topic", &payload()), "a{{ topic");
    }
}
