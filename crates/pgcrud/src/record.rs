//! Dynamic rows and payloads.

use crate::case::snake_to_camel;
use crate::error::{CrudError, CrudResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust value.
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> CrudResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning CrudError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> CrudResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> CrudResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| CrudError::decode(column, e.to_string()))
    }
}

/// A field-name to value map: an incoming payload or a returned row.
///
/// Keys are kept in lexical order so generated column lists are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a record from a JSON object.
    pub fn from_json(json: serde_json::Value) -> CrudResult<Self> {
        match json {
            serde_json::Value::Object(map) => {
                Ok(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            other => Err(CrudError::validation(format!(
                "Expected a JSON object, got {other}"
            ))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().into()))
                .collect(),
        )
    }

    /// Rename every key to camelCase, descending into nested JSON objects and arrays.
    pub fn into_camel_case(self) -> Self {
        self.0
            .into_iter()
            .map(|(k, v)| (snake_to_camel(&k), camelize_value(v)))
            .collect()
    }
}

fn camelize_value(value: Value) -> Value {
    match value {
        Value::Json(json) => Value::Json(crate::case::camelize_json(json)),
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_value).collect()),
        other => other,
    }
}

impl FromRow for Record {
    fn from_row(row: &Row) -> CrudResult<Self> {
        row.columns()
            .iter()
            .map(|col| {
                let value = row.try_get_column::<Value>(col.name())?;
                Ok::<_, CrudError>((col.name().to_owned(), value))
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`Record`] from `key => value` pairs.
///
/// ```ignore
/// let payload = pgcrud::record! { "fullName" => "Aisha", "totalTripCount" => 2 };
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.insert($key, $value); )+
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_requires_an_object() {
        let r = Record::from_json(json!({"fullName": "Aisha", "age": 31})).unwrap();
        assert_eq!(r.get("age"), Some(&Value::Int(31)));
        assert!(Record::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn camel_case_conversion_reaches_nested_json() {
        let row = crate::record! {
            "trip_package_id" => "p1",
            "meta" => Value::Json(json!({"room_type": "quad", "extra_beds": [{"bed_size": 1}]})),
        };
        let out = row.into_camel_case().to_json();
        assert_eq!(
            out,
            json!({
                "tripPackageId": "p1",
                "meta": {"roomType": "quad", "extraBeds": [{"bedSize": 1}]}
            })
        );
    }

    #[test]
    fn serializes_as_a_plain_object() {
        let r = crate::record! { "a" => 1, "b" => Value::Null };
        assert_eq!(serde_json::to_value(&r).unwrap(), json!({"a": 1, "b": null}));
        let back: Record = serde_json::from_value(json!({"a": 1, "b": null})).unwrap();
        assert_eq!(back, r);
    }
}
