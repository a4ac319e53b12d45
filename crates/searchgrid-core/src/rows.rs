//! Field access on table rows.
//!
//! The filter engine reads cell values through [`FieldLookup`], by the field
//! path a column's filter binding resolves to (see
//! [`resolve_field`](crate::filter::resolve_field)).

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// Read a field of a row as text.
pub trait FieldLookup {
    /// The value at `path` (dot separated), or `None` when it is absent or
    /// null.
    fn field(&self, path: &str) -> Option<String>;
}

impl FieldLookup for Value {
    fn field(&self, path: &str) -> Option<String> {
        let mut current = self;
        for part in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match current {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl FieldLookup for HashMap<String, String> {
    fn field(&self, path: &str) -> Option<String> {
        self.get(path).cloned()
    }
}

impl FieldLookup for BTreeMap<String, String> {
    fn field(&self, path: &str) -> Option<String> {
        self.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_nested_paths() {
        let row = json!({
            "model": "Golf",
            "year": 2014,
            "sold": false,
            "owner": {"name": "Ada", "tags": ["x", "y"]},
            "color": null
        });
        assert_eq!(row.field("model").as_deref(), Some("Golf"));
        assert_eq!(row.field("year").as_deref(), Some("2014"));
        assert_eq!(row.field("sold").as_deref(), Some("false"));
        assert_eq!(row.field("owner.name").as_deref(), Some("Ada"));
        assert_eq!(row.field("owner.tags.1").as_deref(), Some("y"));
        assert_eq!(row.field("color"), None);
        assert_eq!(row.field("missing"), None);
        assert_eq!(row.field("model.length"), None);
    }

    #[test]
    fn test_string_maps() {
        let mut hash = HashMap::new();
        hash.insert("status".to_string(), "A".to_string());
        assert_eq!(hash.field("status").as_deref(), Some("A"));
        assert_eq!(hash.field("other"), None);

        let tree: BTreeMap<String, String> = hash.into_iter().collect();
        assert_eq!(tree.field("status").as_deref(), Some("A"));
    }
}
