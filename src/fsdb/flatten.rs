use serde_json::{Map, Value};

/// Collapse newlines and stray escapes so a value stays on one fsdb row.
pub fn sanitize(raw: &str) -> String {
    raw.replace('\r', "")
        .replace('\n', " ")
        .replace("\\n", " ")
        .trim()
        .to_string()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize(s),
        other => sanitize(&other.to_string()),
    }
}

fn flatten_into(prefix: &str, value: &Value, sep: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                let new_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}{sep}{key}")
                };
                flatten_into(&new_key, inner, sep, out);
            }
        }
        other => out.push((prefix.to_string(), value_to_string(other))),
    }
}

/// Turn a document `_source` object into an ordered list of column/value
/// pairs. With `flatten` set, nested objects become `parent_child` columns;
/// otherwise nested values are stringified in place. A field selection, when
/// given, keeps only the named columns.
pub fn flatten_source(
    source: &Map<String, Value>,
    flatten: bool,
    fields: Option<&[String]>,
) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in source {
        if flatten && value.is_object() {
            flatten_into(key, value, "_", &mut out);
        } else {
            out.push((key.clone(), value_to_string(value)));
        }
    }

    if let Some(fields) = fields {
        out.retain(|(key, _)| fields.iter().any(|f| f == key));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn nested_objects_flatten_with_underscores() {
        let src = source(json!({ "geoip": { "country": { "iso": "US" }, "asn": 64512 } }));
        let got = flatten_source(&src, true, None);
        assert!(got.contains(&("geoip_country_iso".to_string(), "US".to_string())));
        assert!(got.contains(&("geoip_asn".to_string(), "64512".to_string())));
    }

    #[test]
    fn unflattened_objects_stringify_in_place() {
        let src = source(json!({ "geoip": { "asn": 1 } }));
        let got = flatten_source(&src, false, None);
        assert_eq!(got, vec![("geoip".to_string(), "{\"asn\":1}".to_string())]);
    }

    #[test]
    fn field_selection_drops_other_columns() {
        let src = source(json!({ "a": 1, "b": 2 }));
        let fields = vec!["b".to_string()];
        let got = flatten_source(&src, false, Some(&fields));
        assert_eq!(got, vec![("b".to_string(), "2".to_string())]);
    }

    #[test]
    fn sanitize_strips_newlines() {
        assert_eq!(sanitize(" a\nb\r\\nc "), "a b c");
    }
}
