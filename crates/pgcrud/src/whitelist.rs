//! Payload allow-lists.

use crate::case::camel_to_snake;
use crate::error::{CrudError, CrudResult};
use crate::record::Record;
use crate::schema::Table;

/// The external (camelCase) field names a write may touch on one table.
///
/// Fields are validated when the whitelist is built: each must map, through
/// `camel_to_snake`, onto a declared column. [`Whitelist::pick`] then projects
/// any incoming payload down to those fields and renames them to columns, so
/// the column list of an INSERT or UPDATE can only ever come from here.
#[derive(Debug, Clone)]
pub struct Whitelist<'a> {
    table: &'a Table,
    fields: Vec<(String, String)>,
}

impl<'a> Whitelist<'a> {
    pub fn new<I, S>(table: &'a Table, fields: I) -> CrudResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for field in fields {
            let field = field.as_ref();
            let column = camel_to_snake(field);
            if !table.has_column(&column) {
                return Err(CrudError::validation(format!(
                    "Field '{field}' does not map to a column of table '{}'",
                    table.name()
                )));
            }
            if !pairs.iter().any(|(f, _)| f == field) {
                pairs.push((field.to_owned(), column));
            }
        }
        Ok(Self {
            table,
            fields: pairs,
        })
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Allowed external field names, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(f, _)| f.as_str())
    }

    /// Keep only allowed fields present in `input`, keyed by column name.
    ///
    /// Absent fields are dropped; explicit NULLs are kept so callers can clear
    /// a column.
    pub fn pick(&self, input: &Record) -> Record {
        self.fields
            .iter()
            .filter_map(|(field, column)| {
                input.get(field).map(|value| (column.clone(), value.clone()))
            })
            .collect()
    }
}

/// Keep only the keys of `input` listed in `allowed`; no renaming, no table check.
pub fn pick_allowed_fields(input: &Record, allowed: &[&str]) -> Record {
    allowed
        .iter()
        .filter_map(|key| input.get(key).map(|value| (*key, value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn packages() -> Table {
        Table::new("trip_package", ["id", "title", "slug", "is_publish", "price"]).unwrap()
    }

    #[test]
    fn pick_drops_unlisted_and_absent_fields() {
        let t = packages();
        let w = Whitelist::new(&t, ["title", "isPublish", "price"]).unwrap();
        let input = crate::record! {
            "title" => "Umrah Plus",
            "isPublish" => Value::Null,
            "role" => "admin",
        };
        let out = w.pick(&input);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("title"), Some(&Value::from("Umrah Plus")));
        assert_eq!(out.get("is_publish"), Some(&Value::Null));
        assert!(!out.contains_key("role"));
        assert!(!out.contains_key("price"));
    }

    #[test]
    fn rejects_fields_without_a_column() {
        let t = packages();
        let err = Whitelist::new(&t, ["title", "passwordHash"]).unwrap_err();
        assert!(err.to_string().contains("passwordHash"));
    }

    #[test]
    fn free_function_keeps_keys_verbatim() {
        let input = crate::record! { "a" => 1, "b" => 2, "c" => Value::Null };
        let out = pick_allowed_fields(&input, &["a", "c", "z"]);
        assert_eq!(out, crate::record! { "a" => 1, "c" => Value::Null });
        assert!(out.keys().all(|k| ["a", "c", "z"].contains(&k)));
    }
}
