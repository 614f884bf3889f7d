//! Context data normalization
//!
//! Engines return supporting evidence alongside an answer: plain text,
//! tables of entities/relationships/reports, or nested mappings of those.
//! Everything leaving the gateway must be plain JSON, so tables are
//! flattened to row records here.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::dataset::Table;

/// Context payload as produced by a search engine
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Text(String),
    Table(Table),
    List(Vec<ContextValue>),
    Map(BTreeMap<String, ContextValue>),
    /// JSON scalar (number, bool, null)
    Scalar(Value),
    /// Something the gateway cannot represent; carries a type hint for logs
    Unsupported(String),
}

impl ContextValue {
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ContextValue)>,
        K: Into<String>,
    {
        ContextValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ContextValue::Text(text),
            Value::Array(items) => ContextValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(fields) => {
                ContextValue::Map(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            scalar => ContextValue::Scalar(scalar),
        }
    }
}

impl From<Table> for ContextValue {
    fn from(table: Table) -> Self {
        ContextValue::Table(table)
    }
}

impl From<String> for ContextValue {
    fn from(text: String) -> Self {
        ContextValue::Text(text)
    }
}

/// Convert engine context into JSON.
///
/// Strings pass through, tables become arrays of row objects, and lists and
/// maps are converted element by element. Any other top-level value becomes
/// `null`; scalars nested inside lists and maps are kept.
pub fn normalize(context: ContextValue) -> Value {
    match context {
        ContextValue::Text(text) => Value::String(text),
        ContextValue::Table(table) => Value::Array(table.to_records()),
        list @ ContextValue::List(_) => convert(list),
        map @ ContextValue::Map(_) => convert(map),
        ContextValue::Scalar(_) => Value::Null,
        ContextValue::Unsupported(kind) => {
            tracing::debug!(kind = %kind, "Dropping unsupported context value");
            Value::Null
        }
    }
}

fn convert(value: ContextValue) -> Value {
    match value {
        ContextValue::Text(text) => Value::String(text),
        ContextValue::Table(table) => Value::Array(table.to_records()),
        ContextValue::List(items) => Value::Array(items.into_iter().map(convert).collect()),
        ContextValue::Map(entries) => {
            let fields: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key, convert(value)))
                .collect();
            Value::Object(fields)
        }
        ContextValue::Scalar(scalar) => scalar,
        ContextValue::Unsupported(kind) => {
            tracing::debug!(kind = %kind, "Dropping unsupported context value");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entities() -> Table {
        Table::from_rows(
            "entities",
            &["id", "entity", "rank"],
            vec![
                vec![json!("0"), json!("ALICE"), json!(4)],
                vec![json!("1"), json!("BOB"), json!(2)],
            ],
        )
    }

    #[test]
    fn test_string_unchanged() {
        let text = "-----Reports-----\nid|title".to_string();
        assert_eq!(normalize(ContextValue::Text(text.clone())), Value::String(text));
    }

    #[test]
    fn test_table_becomes_records() {
        assert_eq!(
            normalize(entities().into()),
            json!([
                {"id": "0", "entity": "ALICE", "rank": 4},
                {"id": "1", "entity": "BOB", "rank": 2}
            ])
        );
    }

    #[test]
    fn test_nested_table_in_map() {
        let context = ContextValue::map([
            ("entities", ContextValue::Table(entities())),
            ("sources", ContextValue::List(vec![ContextValue::Text("chunk 1".into())])),
            ("budget", ContextValue::Scalar(json!(8000))),
        ]);

        assert_eq!(
            normalize(context),
            json!({
                "entities": [
                    {"id": "0", "entity": "ALICE", "rank": 4},
                    {"id": "1", "entity": "BOB", "rank": 2}
                ],
                "sources": ["chunk 1"],
                "budget": 8000
            })
        );
    }

    #[test]
    fn test_list_preserves_order() {
        let context = ContextValue::List(vec![
            ContextValue::Text("b".into()),
            ContextValue::Text("a".into()),
            ContextValue::Table(Table::new("empty", vec!["id".into()])),
        ]);
        assert_eq!(normalize(context), json!(["b", "a", []]));
    }

    #[test]
    fn test_other_top_level_values_become_null() {
        assert_eq!(normalize(ContextValue::Scalar(json!(42))), Value::Null);
        assert_eq!(normalize(ContextValue::Unsupported("Figure".into())), Value::Null);
    }

    #[test]
    fn test_unsupported_nested_value_becomes_null() {
        let context = ContextValue::map([("plot", ContextValue::Unsupported("Figure".into()))]);
        assert_eq!(normalize(context), json!({"plot": null}));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = vec![
            ContextValue::Text("plain".into()),
            ContextValue::Table(entities()),
            ContextValue::map([
                ("reports", ContextValue::Table(entities())),
                ("nested", ContextValue::map([("deep", ContextValue::List(vec![]))])),
                ("flag", ContextValue::Scalar(json!(true))),
            ]),
            ContextValue::Scalar(json!(1.5)),
        ];

        for input in inputs {
            let once = normalize(input);
            let twice = normalize(ContextValue::from(once.clone()));
            assert_eq!(once, twice);
        }
    }
}
