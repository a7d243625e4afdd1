//! Collection filters
//!
//! The batch importers are filter-syntax-agnostic; filters are carried as
//! opaque triples and serialized to the API's JSON filter syntax only here.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One collection filter: `field operator values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(field: &str, operator: &str, values: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Equality filter, the common case.
    pub fn eq(field: &str, value: &str) -> Self {
        Self::new(field, "=", &[value])
    }

    fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert(
            self.field.clone(),
            json!({
                "operator": self.operator,
                "values": self.values,
            }),
        );
        Value::Object(object)
    }
}

/// Serialize filters to the query-parameter form the API expects:
/// `[{"active":{"operator":"=","values":["t"]}}]`.
pub fn filters_query(filters: &[Filter]) -> String {
    let list: Vec<Value> = filters.iter().map(Filter::to_json).collect();
    Value::Array(list).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_query_serialization() {
        let filters = vec![Filter::eq("active", "t")];
        assert_eq!(
            filters_query(&filters),
            r#"[{"active":{"operator":"=","values":["t"]}}]"#
        );
    }

    #[test]
    fn test_empty_filters_serialize_to_empty_array() {
        assert_eq!(filters_query(&[]), "[]");
    }

    #[test]
    fn test_multi_value_filter() {
        let filters = vec![Filter::new("status", "=", &["1", "2"])];
        assert_eq!(
            filters_query(&filters),
            r#"[{"status":{"operator":"=","values":["1","2"]}}]"#
        );
    }
}
