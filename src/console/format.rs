use crate::db::{ColumnMeta, Value};

use super::resolver::{ClassNameLookup, ReferenceResolver};

/// Content detected while formatting, used later for highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedKind {
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedValue {
    pub text: String,
    pub kind: Option<DetectedKind>,
}

impl FormattedValue {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
        }
    }

    pub fn json(text: String) -> Self {
        Self {
            text,
            kind: Some(DetectedKind::Json),
        }
    }
}

/// Turns raw cells into display text.
///
/// Navigation cells are resolved to `"{ClassName} {Id}"` through the session's
/// [`ReferenceResolver`]; formatting never fails.
pub struct ValueFormatter<'a> {
    lookup: &'a dyn ClassNameLookup,
    resolver: &'a mut ReferenceResolver,
}

impl<'a> ValueFormatter<'a> {
    pub fn new(lookup: &'a dyn ClassNameLookup, resolver: &'a mut ReferenceResolver) -> Self {
        Self { lookup, resolver }
    }

    pub fn format(&mut self, value: &Value, column: &ColumnMeta) -> FormattedValue {
        match value {
            Value::Null => FormattedValue::plain(""),
            Value::Text(s) => {
                if column.may_hold_json() && s.starts_with('{') {
                    if let Some(pretty) = pretty_json(s) {
                        return FormattedValue::json(pretty);
                    }
                }
                FormattedValue::plain(s.as_str())
            }
            Value::Integer(i) => FormattedValue::plain(i.to_string()),
            Value::Float(f) => FormattedValue::plain(f.to_string()),
            Value::Boolean(b) => FormattedValue::plain(b.to_string()),
            Value::Navigation { id, rel_class_id } => {
                match (non_empty(id.as_deref()), non_empty(rel_class_id.as_deref())) {
                    (Some(id), Some(class_id)) => {
                        let name = self.resolver.resolve(self.lookup, class_id);
                        FormattedValue::plain(format!("{} {}", name, id))
                    }
                    _ => FormattedValue::plain(""),
                }
            }
            _ if column.is_navigation() => FormattedValue::plain(""),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| self.format(item, column).text)
                    .collect();
                FormattedValue::plain(format!("[{}]", parts.join(", ")))
            }
            Value::Blob(bytes) => {
                FormattedValue::plain(serde_json::Value::from(bytes.clone()).to_string())
            }
            Value::Json(json) => FormattedValue::plain(json.to_string()),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Re-serializes a JSON object with two-space indentation.
pub fn pretty_json(text: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(text).ok()?;
    if !json.is_object() {
        return None;
    }
    serde_json::to_string_pretty(&json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::resolver::tests::FakeLookup;
    use crate::console::resolver::UNKNOWN_CLASS;

    fn format(value: Value, column: &ColumnMeta) -> FormattedValue {
        let lookup = FakeLookup::new(vec![("0x2a", "ModelContainsElements")]);
        let mut resolver = ReferenceResolver::new();
        ValueFormatter::new(&lookup, &mut resolver).format(&value, column)
    }

    fn nav(id: Option<&str>, class_id: Option<&str>) -> Value {
        Value::Navigation {
            id: id.map(String::from),
            rel_class_id: class_id.map(String::from),
        }
    }

    #[test]
    fn test_null_is_empty_for_any_column() {
        for type_name in ["string", "long", "double", "navigation", "binary", "array"] {
            let col = ColumnMeta::new("c", type_name);
            assert_eq!(format(Value::Null, &col).text, "");
        }
    }

    #[test]
    fn test_json_object_is_pretty_printed() {
        let col = ColumnMeta::new("props", "string");
        let out = format(Value::Text(r#"{"b":1,"a":[true,null]}"#.to_string()), &col);
        assert_eq!(out.kind, Some(DetectedKind::Json));
        assert_eq!(out.text, "{\n  \"b\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}");
    }

    #[test]
    fn test_json_round_trips_structurally() {
        let col = ColumnMeta::new("props", "binary").with_extended_type("json");
        let raw = r#"{"name":"wall","size":{"w":1.5,"h":3},"tags":["a","b"]}"#;
        let out = format(Value::Text(raw.to_string()), &col);
        assert_eq!(out.kind, Some(DetectedKind::Json));
        let reparsed: serde_json::Value = serde_json::from_str(&out.text).unwrap();
        let original: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_malformed_json_is_returned_verbatim() {
        let col = ColumnMeta::new("props", "string");
        let out = format(Value::Text("{not json".to_string()), &col);
        assert_eq!(out.text, "{not json");
        assert_eq!(out.kind, None);
    }

    #[test]
    fn test_json_ignored_for_non_string_columns() {
        let col = ColumnMeta::new("code", "dateTime");
        let out = format(Value::Text(r#"{"a":1}"#.to_string()), &col);
        assert_eq!(out.text, r#"{"a":1}"#);
        assert_eq!(out.kind, None);
    }

    #[test]
    fn test_scalars() {
        let col = ColumnMeta::new("n", "long");
        assert_eq!(format(Value::Integer(-7), &col).text, "-7");
        assert_eq!(format(Value::Float(2.5), &col).text, "2.5");
        assert_eq!(format(Value::Float(3.0), &col).text, "3");
        assert_eq!(format(Value::Boolean(false), &col).text, "false");
        assert_eq!(format(Value::Text("plain".to_string()), &col).text, "plain");
    }

    #[test]
    fn test_navigation_resolves_class_name() {
        let col = ColumnMeta::new("Model", "navigation");
        let out = format(nav(Some("0x1"), Some("0x2a")), &col);
        assert_eq!(out.text, "ModelContainsElements 0x1");
    }

    #[test]
    fn test_navigation_with_unknown_class() {
        let col = ColumnMeta::new("Model", "navigation");
        let out = format(nav(Some("0x1"), Some("0x77")), &col);
        assert_eq!(out.text, format!("{} 0x1", UNKNOWN_CLASS));
    }

    #[test]
    fn test_navigation_missing_member_is_empty() {
        let col = ColumnMeta::new("Model", "navigation");
        assert_eq!(format(nav(Some("0x1"), None), &col).text, "");
        assert_eq!(format(nav(None, Some("0x2a")), &col).text, "");
        assert_eq!(format(nav(Some(""), Some("0x2a")), &col).text, "");
        assert_eq!(format(Value::Json(serde_json::json!({"x": 1})), &col).text, "");
    }

    #[test]
    fn test_arrays_format_each_element() {
        let col = ColumnMeta::new("tags", "array");
        let value = Value::Array(vec![
            Value::Text("a".to_string()),
            Value::Integer(2),
            Value::Null,
            Value::Array(vec![Value::Boolean(true)]),
        ]);
        assert_eq!(format(value, &col).text, "[a, 2, , [true]]");
    }

    #[test]
    fn test_fallback_serializes_structure() {
        let col = ColumnMeta::new("geom", "binary");
        assert_eq!(format(Value::Blob(vec![1, 2]), &col).text, "[1,2]");
        assert_eq!(
            format(Value::Json(serde_json::json!({"bytes": 12})), &col).text,
            r#"{"bytes":12}"#
        );
    }
}
