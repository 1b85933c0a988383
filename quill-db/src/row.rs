//! Ordered row records materialized from query results.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

/// Column layout shared by every row of one result set.
///
/// Column names are unique: when the driver reports the same name twice the
/// first position is kept and the value of the last occurrence wins.
#[derive(Debug, Clone)]
pub struct RowSchema {
    names: Arc<[String]>,
    source: Arc<[usize]>,
}

impl RowSchema {
    pub fn from_columns(columns: &[String]) -> Self {
        let mut names: Vec<String> = Vec::with_capacity(columns.len());
        let mut source: Vec<usize> = Vec::with_capacity(columns.len());

        for (idx, name) in columns.iter().enumerate() {
            match names.iter().position(|existing| existing == name) {
                Some(pos) => source[pos] = idx,
                None => {
                    names.push(name.clone());
                    source.push(idx);
                }
            }
        }

        Self {
            names: names.into(),
            source: source.into(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Build a record from raw driver values in driver column order.
    pub fn materialize(&self, mut raw: Vec<Value>) -> Row {
        let values = self
            .source
            .iter()
            .map(|&idx| raw.get_mut(idx).map(std::mem::take).unwrap_or(Value::Null))
            .collect();

        Row {
            names: Arc::clone(&self.names),
            values,
        }
    }
}

/// One result row: column name to value, in the column order of the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    names: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|name| name == column)
            .map(|idx| &self.values[idx])
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn preserves_column_order() {
        let schema = RowSchema::from_columns(&columns(&["name", "id", "admin"]));
        let row = schema.materialize(vec!["Alice".into(), "u1".into(), Value::Integer(0)]);

        let order: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["name", "id", "admin"]);
        assert_eq!(row.get_str("name"), Some("Alice"));
        assert_eq!(row.get_i64("admin"), Some(0));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn duplicate_columns_keep_last_value() {
        let schema = RowSchema::from_columns(&columns(&["id", "name", "id"]));
        assert_eq!(schema.names(), &["id".to_string(), "name".to_string()]);

        let row = schema.materialize(vec!["b1".into(), "post".into(), "u1".into()]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get_str("id"), Some("u1"));
    }

    #[test]
    fn serializes_as_ordered_object() {
        let schema = RowSchema::from_columns(&columns(&["z", "a"]));
        let row = schema.materialize(vec![Value::Integer(1), Value::Null]);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"z":1,"a":null}"#);
    }
}
