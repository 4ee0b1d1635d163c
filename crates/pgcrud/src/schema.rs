//! Per-table column allow-lists.
//!
//! A [`Table`] is the unit every descriptor is validated against: filters,
//! select lists, join conditions, payload whitelists and cascade relations can
//! only name columns the table declares. Tables own no connection state and are
//! typically built once at startup and shared.

use crate::error::{CrudError, CrudResult};
use crate::ident::Ident;
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_KEY: &str = "id";
const DEFAULT_KEY_CAST: &str = "uuid";
const FALLBACK_CAST: &str = "text";

/// Column allow-list and metadata for one relational table.
///
/// # Example
/// ```ignore
/// use pgcrud::Table;
///
/// let travelers = Table::new("trip_traveler", ["id", "trip_transaction_id", "full_name",
///         "total_trip_count", "deleted_at", "deleted_by"])?
///     .with_cast("total_trip_count", "int")?;
/// # Ok::<(), pgcrud::CrudError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    name: Ident,
    columns: BTreeSet<String>,
    key: String,
    casts: BTreeMap<String, String>,
    deleted_at: String,
    deleted_by: String,
}

impl Table {
    /// Declare a table and its columns (snake_case, as stored).
    ///
    /// The primary key defaults to `id` and is cast as `uuid` in bulk updates.
    pub fn new<I, S>(name: &str, columns: I) -> CrudResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = Ident::parse(name)?;
        let columns = columns
            .into_iter()
            .map(|c| Ident::simple(c.as_ref()).map(|_| c.as_ref().to_owned()))
            .collect::<CrudResult<BTreeSet<_>>>()?;
        if columns.is_empty() {
            return Err(CrudError::validation(format!(
                "Table '{name}' must declare at least one column"
            )));
        }

        let mut casts = BTreeMap::new();
        casts.insert(DEFAULT_KEY.to_owned(), DEFAULT_KEY_CAST.to_owned());

        Ok(Self {
            name,
            columns,
            key: DEFAULT_KEY.to_owned(),
            casts,
            deleted_at: "deleted_at".to_owned(),
            deleted_by: "deleted_by".to_owned(),
        })
    }

    /// Use a different primary key column.
    pub fn with_key(mut self, key: &str) -> CrudResult<Self> {
        self.require_column(key)?;
        self.key = key.to_owned();
        Ok(self)
    }

    /// Declare the SQL type a column is cast to inside `bulk_update`'s VALUES list.
    ///
    /// Columns without a declared cast are sent as `text`.
    pub fn with_cast(mut self, column: &str, pg_type: &str) -> CrudResult<Self> {
        self.require_column(column)?;
        validate_type_name(pg_type)?;
        self.casts.insert(column.to_owned(), pg_type.to_owned());
        Ok(self)
    }

    /// Override the soft-delete timestamp and actor columns.
    pub fn with_soft_delete_columns(mut self, deleted_at: &str, deleted_by: &str) -> CrudResult<Self> {
        self.require_column(deleted_at)?;
        self.require_column(deleted_by)?;
        self.deleted_at = deleted_at.to_owned();
        self.deleted_by = deleted_by.to_owned();
        Ok(self)
    }

    /// Table name as written in SQL.
    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub(crate) fn ident(&self) -> &Ident {
        &self.name
    }

    /// Primary key column.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the table declares `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Declared columns in lexical order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// SQL type used when `column` travels through a VALUES list.
    pub fn cast_for(&self, column: &str) -> &str {
        self.casts
            .get(column)
            .map(String::as_str)
            .unwrap_or(FALLBACK_CAST)
    }

    /// Resolve a declared column into an identifier, or fail with a validation error.
    pub(crate) fn column(&self, column: &str) -> CrudResult<Ident> {
        self.require_column(column)?;
        Ident::simple(column)
    }

    pub(crate) fn key_ident(&self) -> CrudResult<Ident> {
        self.column(&self.key)
    }

    /// `(deleted_at, deleted_by)` identifiers, validated against the column list.
    pub(crate) fn soft_delete_columns(&self) -> CrudResult<(Ident, Ident)> {
        let missing = [&self.deleted_at, &self.deleted_by]
            .into_iter()
            .find(|c| !self.has_column(c));
        if let Some(column) = missing {
            return Err(CrudError::validation(format!(
                "Table '{}' has no soft-delete column '{column}'",
                self.name
            )));
        }
        Ok((Ident::simple(&self.deleted_at)?, Ident::simple(&self.deleted_by)?))
    }

    fn require_column(&self, column: &str) -> CrudResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(CrudError::validation(format!(
                "Unknown column '{column}' for table '{}'",
                self.name
            )))
        }
    }
}

// `double precision`, `timestamp with time zone`, `text[]`, `numeric(12,2)`
fn validate_type_name(pg_type: &str) -> CrudResult<()> {
    let valid = !pg_type.is_empty()
        && pg_type.starts_with(|c: char| c.is_ascii_alphabetic())
        && pg_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '[' | ']' | '(' | ')' | ','));
    if valid {
        Ok(())
    } else {
        Err(CrudError::validation(format!("Invalid SQL type name '{pg_type}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn travelers() -> Table {
        Table::new(
            "trip_traveler",
            ["id", "trip_transaction_id", "full_name", "total_trip_count", "deleted_at", "deleted_by"],
        )
        .unwrap()
    }

    #[test]
    fn defaults_follow_the_uuid_keyed_schema() {
        let t = travelers();
        assert_eq!(t.name(), "trip_traveler");
        assert_eq!(t.key(), "id");
        assert_eq!(t.cast_for("id"), "uuid");
        assert_eq!(t.cast_for("full_name"), "text");
        assert!(t.soft_delete_columns().is_ok());
    }

    #[test]
    fn casts_and_keys_must_name_declared_columns() {
        let t = travelers().with_cast("total_trip_count", "int").unwrap();
        assert_eq!(t.cast_for("total_trip_count"), "int");

        assert!(travelers().with_cast("nope", "int").is_err());
        assert!(travelers().with_key("nope").is_err());
        assert!(travelers().with_cast("full_name", "text; drop table x").is_err());
        assert!(travelers().with_cast("full_name", "double precision").is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(Table::new("trip traveler", ["id"]).is_err());
        assert!(Table::new("trips", ["id", "a.b"]).is_err());
        assert!(Table::new("trips", Vec::<&str>::new()).is_err());
    }

    #[test]
    fn soft_delete_columns_must_exist() {
        let t = Table::new("categories", ["id", "label"]).unwrap();
        let err = t.soft_delete_columns().unwrap_err();
        assert!(err.to_string().contains("deleted_at"));
    }
}
