//! Write executors: `insert_one`, `update_one`, `bulk_insert`, `bulk_update`.
//!
//! Payload columns always come from a [`Whitelist`]; values are always bound.
//! One-to-many children are described with [`Child`] and written after the
//! parent on the same connection. None of these functions opens a transaction:
//! pass one in (see [`transaction!`](crate::transaction)) when the parent and
//! its children must commit together.

use crate::case::{camel_to_snake, snake_to_camel};
use crate::client::GenericClient;
use crate::error::{CrudError, CrudResult, refuse};
use crate::filter::Filters;
use crate::ident::Ident;
use crate::record::Record;
use crate::schema::Table;
use crate::sql::Sql;
use crate::value::Value;
use crate::whitelist::Whitelist;

/// PostgreSQL's limit on bind parameters per statement.
const MAX_BIND_PARAMS: usize = 65_535;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildMode {
    /// Attach the foreign key and insert (insert) or replace (update) the rows.
    Insert,
    /// Update existing rows matched by their own key.
    BulkUpdate,
}

/// A one-to-many relation written together with its parent.
#[derive(Debug, Clone)]
pub struct Child<'a> {
    whitelist: Whitelist<'a>,
    foreign_key: String,
    source_key: Option<String>,
    rows: Option<Vec<Record>>,
    mode: ChildMode,
}

impl<'a> Child<'a> {
    /// `foreign_key` is the child column (camelCase or snake_case) that points at the parent.
    ///
    /// The foreign key is always written, whether or not the whitelist lists it.
    pub fn new(whitelist: Whitelist<'a>, foreign_key: &str) -> CrudResult<Self> {
        let column = camel_to_snake(foreign_key);
        whitelist.table().column(&column)?;
        Ok(Self {
            whitelist,
            foreign_key: column,
            source_key: None,
            rows: None,
            mode: ChildMode::Insert,
        })
    }

    /// Parent column whose value fills the foreign key; the parent's key by default.
    pub fn source_key(mut self, column: &str) -> Self {
        self.source_key = Some(camel_to_snake(column));
        self
    }

    /// Rows to write. On update, `Some(vec![])` deletes every existing child,
    /// while never calling this leaves the children untouched.
    pub fn rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Update existing child rows by their key instead of inserting them,
    /// e.g. bumping counters on rows the parent refers to.
    pub fn bulk_update(mut self) -> Self {
        self.mode = ChildMode::BulkUpdate;
        self
    }

    fn table(&self) -> &'a Table {
        self.whitelist.table()
    }

    /// The parent value that fills the foreign key.
    fn parent_value(&self, parent: &Table, parent_row: &Record) -> CrudResult<Value> {
        let source = self.source_key.as_deref().unwrap_or(parent.key());
        parent_row.get(source).cloned().ok_or_else(|| {
            CrudError::validation(format!(
                "Parent row of '{}' has no column '{source}' to fill '{}.{}'",
                parent.name(),
                self.table().name(),
                self.foreign_key
            ))
        })
    }

    /// Whitelisted rows, keyed by column, with the foreign key attached.
    fn rows_with_foreign_key(&self, rows: &[Record], parent_value: &Value) -> Vec<Record> {
        rows.iter()
            .map(|row| {
                let mut picked = self.whitelist.pick(row);
                picked.insert(self.foreign_key.clone(), parent_value.clone());
                picked
            })
            .collect()
    }
}

/// Columns to return from a write, `*` unless narrowed.
fn push_returning(sql: &mut Sql, table: &Table, returning: &[String]) -> CrudResult<()> {
    sql.push(" RETURNING ");
    if returning.is_empty() {
        sql.push("*");
        return Ok(());
    }
    for (i, column) in returning.iter().enumerate() {
        if i > 0 {
            sql.push(", ");
        }
        sql.push_ident(&table.column(column)?);
    }
    Ok(())
}

/// An insert descriptor.
#[derive(Debug, Clone)]
pub struct Insert<'a> {
    whitelist: Whitelist<'a>,
    data: Record,
    children: Vec<Child<'a>>,
    returning: Vec<String>,
}

impl<'a> Insert<'a> {
    pub fn new(whitelist: Whitelist<'a>, data: Record) -> Self {
        Self {
            whitelist,
            data,
            children: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn child(mut self, child: Child<'a>) -> Self {
        self.children.push(child);
        self
    }

    /// Narrow the returned columns (snake_case). The parent key and any child
    /// source keys must stay included when children are written.
    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.returning = columns.into_iter().map(|c| c.as_ref().to_owned()).collect();
        self
    }

    pub fn build_sql(&self) -> CrudResult<Sql> {
        let table = self.whitelist.table();
        let row = self.whitelist.pick(&self.data);

        let mut sql = Sql::new("INSERT INTO ");
        sql.push_ident(table.ident());
        if row.is_empty() {
            sql.push(" DEFAULT VALUES");
        } else {
            sql.push(" (");
            push_column_list(&mut sql, table, row.keys())?;
            sql.push(") VALUES (");
            for (i, (_, value)) in row.into_iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                sql.push_bind(value);
            }
            sql.push(")");
        }
        push_returning(&mut sql, table, &self.returning)?;
        Ok(sql)
    }
}

/// An update descriptor.
#[derive(Debug, Clone)]
pub struct Update<'a> {
    whitelist: Whitelist<'a>,
    data: Record,
    filters: Filters<'a>,
    children: Vec<Child<'a>>,
    returning: Vec<String>,
}

impl<'a> Update<'a> {
    pub fn new(whitelist: Whitelist<'a>, data: Record, filters: Filters<'a>) -> Self {
        Self {
            whitelist,
            data,
            filters,
            children: Vec::new(),
            returning: Vec::new(),
        }
    }

    /// Children given rows are replace-synced after the update; see [`Child::rows`].
    pub fn child(mut self, child: Child<'a>) -> Self {
        self.children.push(child);
        self
    }

    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.returning = columns.into_iter().map(|c| c.as_ref().to_owned()).collect();
        self
    }

    /// `UPDATE t SET a = $1, b = $2 WHERE <filters from $3> RETURNING ...`
    pub fn build_sql(&self) -> CrudResult<Sql> {
        let table = self.whitelist.table();
        if self.filters.table().ident() != table.ident() {
            return Err(CrudError::validation(format!(
                "Filters for '{}' cannot be applied to '{}'",
                self.filters.table().name(),
                table.name()
            )));
        }
        self.filters.check()?;
        if self.filters.is_empty() {
            return Err(refuse("update_one", table.name(), "Update requires a non-empty filter"));
        }
        let row = self.whitelist.pick(&self.data);
        if row.is_empty() {
            return Err(refuse("update_one", table.name(), "Update has no allowed fields to set"));
        }

        let mut sql = Sql::new("UPDATE ");
        sql.push_ident(table.ident()).push(" SET ");
        for (i, (column, value)) in row.into_iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            sql.push_ident(&table.column(&column)?).push(" = ").push_bind(value);
        }
        sql.push(" WHERE ").push_sql(self.filters.to_sql(None)?);
        push_returning(&mut sql, table, &self.returning)?;
        Ok(sql)
    }
}

fn push_column_list<'k>(
    sql: &mut Sql,
    table: &Table,
    columns: impl Iterator<Item = &'k str>,
) -> CrudResult<()> {
    for (i, column) in columns.enumerate() {
        if i > 0 {
            sql.push(", ");
        }
        sql.push_ident(&table.column(column)?);
    }
    Ok(())
}

/// Insert one row and its children; returns the inserted row in camelCase.
pub async fn insert_one(conn: &impl GenericClient, insert: &Insert<'_>) -> CrudResult<Record> {
    let table = insert.whitelist.table();
    let inserted = insert.build_sql()?.tag("insert_one").fetch_one_record(conn).await?;

    for child in &insert.children {
        let Some(rows) = child.rows.as_deref().filter(|rows| !rows.is_empty()) else {
            continue;
        };
        match child.mode {
            ChildMode::Insert => {
                let value = child.parent_value(table, &inserted)?;
                let rows = child.rows_with_foreign_key(rows, &value);
                insert_rows(conn, child.table(), &rows).await?;
            }
            ChildMode::BulkUpdate => {
                bulk_update(conn, &child.whitelist, rows).await?;
            }
        }
    }

    tracing::debug!(target: "pgcrud", table = table.name(), children = insert.children.len(), "insert_one");
    Ok(inserted.into_camel_case())
}

/// Update the rows matching the filters and replace-sync children.
///
/// Returns the first updated row in camelCase, or [`CrudError::NotFound`] when
/// nothing matched. Children are synced against that first row: existing child
/// rows are deleted by foreign key, then the given rows are inserted.
pub async fn update_one(conn: &impl GenericClient, update: &Update<'_>) -> CrudResult<Record> {
    let table = update.whitelist.table();
    let rows = update.build_sql()?.tag("update_one").fetch_records(conn).await?;
    let Some(updated) = rows.into_iter().next() else {
        return Err(CrudError::not_found("Data with specified filters does not exist"));
    };

    for child in &update.children {
        let Some(rows) = child.rows.as_deref() else {
            continue;
        };
        match child.mode {
            ChildMode::Insert => {
                let value = child.parent_value(table, &updated)?;
                let mut delete = Sql::new("DELETE FROM ");
                delete
                    .push_ident(child.table().ident())
                    .push(" WHERE ")
                    .push_ident(&Ident::simple(&child.foreign_key)?)
                    .push(" = ")
                    .push_bind(value.clone());
                let removed = delete.tag("update_one.sync").execute(conn).await?;
                let rows = child.rows_with_foreign_key(rows, &value);
                let inserted = insert_rows(conn, child.table(), &rows).await?;
                tracing::debug!(
                    target: "pgcrud",
                    table = child.table().name(),
                    removed,
                    inserted,
                    "replace-sync"
                );
            }
            ChildMode::BulkUpdate => {
                bulk_update(conn, &child.whitelist, rows).await?;
            }
        }
    }

    tracing::debug!(target: "pgcrud", table = table.name(), "update_one");
    Ok(updated.into_camel_case())
}

/// Insert many rows with one multi-row `VALUES` statement.
///
/// Every row must carry the same whitelisted fields as the first; a mismatch
/// is refused before anything is written. Statements that would exceed the
/// bind parameter limit are split into consecutive chunks. Returns the number
/// of inserted rows.
pub async fn bulk_insert(
    conn: &impl GenericClient,
    whitelist: &Whitelist<'_>,
    rows: &[Record],
) -> CrudResult<u64> {
    let rows: Vec<Record> = rows.iter().map(|row| whitelist.pick(row)).collect();
    insert_rows(conn, whitelist.table(), &rows).await
}

/// `rows` are keyed by column already.
async fn insert_rows(conn: &impl GenericClient, table: &Table, rows: &[Record]) -> CrudResult<u64> {
    let mut inserted = 0;
    for sql in bulk_insert_sql(table, rows)? {
        inserted += sql.tag("bulk_insert").execute(conn).await?;
    }
    Ok(inserted)
}

fn require_same_fields(operation: &'static str, table: &Table, rows: &[Record]) -> CrudResult<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    for (i, row) in rows.iter().enumerate().skip(1) {
        if !row.keys().eq(first.keys()) {
            return Err(refuse(
                operation,
                table.name(),
                format!(
                    "Row {i} fields [{}] differ from row 0 fields [{}]",
                    row.keys().collect::<Vec<_>>().join(", "),
                    first.keys().collect::<Vec<_>>().join(", ")
                ),
            ));
        }
    }
    Ok(())
}

fn bulk_insert_sql(table: &Table, rows: &[Record]) -> CrudResult<Vec<Sql>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    require_same_fields("bulk_insert", table, rows)?;
    if first.is_empty() {
        return Err(refuse("bulk_insert", table.name(), "Rows have no allowed fields to insert"));
    }

    let per_row = first.len();
    let rows_per_statement = (MAX_BIND_PARAMS / per_row).max(1);
    rows.chunks(rows_per_statement)
        .map(|chunk| {
            let mut sql = Sql::new("INSERT INTO ");
            sql.push_ident(table.ident()).push(" (");
            push_column_list(&mut sql, table, first.keys())?;
            sql.push(") VALUES ");
            for (r, row) in chunk.iter().enumerate() {
                if r > 0 {
                    sql.push(", ");
                }
                sql.push("(");
                for (i, (_, value)) in row.iter().enumerate() {
                    if i > 0 {
                        sql.push(", ");
                    }
                    sql.push_bind(value.clone());
                }
                sql.push(")");
            }
            Ok(sql)
        })
        .collect()
}

/// Update many rows by key with one correlated statement:
///
/// ```sql
/// UPDATE traveler AS t SET total_trip_count = v.total_trip_count
/// FROM (VALUES ($1::uuid, $2::int), ($3::uuid, $4::int)) AS v(id, total_trip_count)
/// WHERE t.id = v.id
/// ```
///
/// Each row must carry the table key (as `id` or its camelCase form) and the
/// same whitelisted fields as the first row. Values are cast with the table's
/// declared casts (see [`Table::with_cast`]). Returns the number of updated rows.
pub async fn bulk_update(
    conn: &impl GenericClient,
    whitelist: &Whitelist<'_>,
    rows: &[Record],
) -> CrudResult<u64> {
    let mut updated = 0;
    for sql in bulk_update_sql(whitelist, rows)? {
        updated += sql.tag("bulk_update").execute(conn).await?;
    }
    tracing::debug!(target: "pgcrud", table = whitelist.table().name(), rows = rows.len(), updated, "bulk_update");
    Ok(updated)
}

fn bulk_update_sql(whitelist: &Whitelist<'_>, rows: &[Record]) -> CrudResult<Vec<Sql>> {
    let table = whitelist.table();
    let key = table.key();
    let key_field = snake_to_camel(key);

    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let value = row
            .get(key)
            .or_else(|| row.get(&key_field))
            .filter(|v| !v.is_blank())
            .ok_or_else(|| refuse("bulk_update", table.name(), format!("Missing primary key: {key}")))?;
        let mut picked = whitelist.pick(row);
        picked.remove(key);
        keyed.push((value.clone(), picked));
    }

    let Some((_, first)) = keyed.first() else {
        return Ok(Vec::new());
    };
    let fields: Vec<Record> = keyed.iter().map(|(_, r)| r.clone()).collect();
    require_same_fields("bulk_update", table, &fields)?;
    if first.is_empty() {
        return Err(refuse("bulk_update", table.name(), "Rows have no allowed fields to update"));
    }

    let key_ident = table.key_ident()?;
    let columns: Vec<Ident> = first
        .keys()
        .map(|c| table.column(c))
        .collect::<CrudResult<_>>()?;
    let target = Ident::simple("t")?;
    let source = Ident::simple("v")?;

    let per_row = columns.len() + 1;
    let rows_per_statement = (MAX_BIND_PARAMS / per_row).max(1);
    keyed
        .chunks(rows_per_statement)
        .map(|chunk| {
            let mut sql = Sql::new("UPDATE ");
            sql.push_ident(table.ident()).push(" AS ").push_ident(&target).push(" SET ");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                sql.push_ident(column)
                    .push(" = ")
                    .push_ident(&column.qualified_by(&source));
            }
            sql.push(" FROM (VALUES ");
            for (r, (key_value, row)) in chunk.iter().enumerate() {
                if r > 0 {
                    sql.push(", ");
                }
                sql.push("(")
                    .push_bind(key_value.clone())
                    .push("::")
                    .push(table.cast_for(key));
                for (column, value) in row.iter() {
                    sql.push(", ").push_bind(value.clone()).push("::").push(table.cast_for(column));
                }
                sql.push(")");
            }
            sql.push(") AS ").push_ident(&source).push("(").push_ident(&key_ident);
            for column in &columns {
                sql.push(", ").push_ident(column);
            }
            sql.push(") WHERE ")
                .push_ident(&key_ident.qualified_by(&target))
                .push(" = ")
                .push_ident(&key_ident.qualified_by(&source));
            Ok(sql)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::testing::RecordingClient;

    fn travelers() -> Table {
        Table::new("traveler", ["id", "full_name", "total_trip_count", "phone"])
            .unwrap()
            .with_cast("total_trip_count", "int")
            .unwrap()
    }

    fn transactions() -> Table {
        Table::new("trip_transaction", ["id", "trip_package_id", "status", "deleted_at", "deleted_by"]).unwrap()
    }

    fn trip_travelers() -> Table {
        Table::new("trip_traveler", ["id", "trip_transaction_id", "traveler_id"]).unwrap()
    }

    #[test]
    fn insert_binds_only_whitelisted_fields() {
        let t = transactions();
        let w = Whitelist::new(&t, ["tripPackageId", "status"]).unwrap();
        let data = record! { "tripPackageId" => "p-1", "status" => "pending", "id" => "forged" };
        let sql = Insert::new(w, data).build_sql().unwrap();
        assert_eq!(
            sql.to_sql(),
            "INSERT INTO trip_transaction (status, trip_package_id) VALUES ($1, $2) RETURNING *"
        );
        assert_eq!(sql.params(), &[Value::from("pending"), Value::from("p-1")]);
    }

    #[test]
    fn insert_without_fields_uses_defaults() {
        let t = transactions();
        let w = Whitelist::new(&t, ["status"]).unwrap();
        let sql = Insert::new(w, Record::new()).returning(["id"]).build_sql().unwrap();
        assert_eq!(sql.to_sql(), "INSERT INTO trip_transaction DEFAULT VALUES RETURNING id");
    }

    #[test]
    fn update_numbers_filters_after_set_list() {
        let t = transactions();
        let w = Whitelist::new(&t, ["status"]).unwrap();
        let update = Update::new(
            w,
            record! { "status" => "paid" },
            Filters::new(&t).eq("id", "67e55044-10b1-426f-9247-bb680e5fe0c8").is_null("deleted_at"),
        );
        assert_eq!(
            update.build_sql().unwrap().to_sql(),
            "UPDATE trip_transaction SET status = $1 WHERE id = $2 AND deleted_at IS NULL RETURNING *"
        );
    }

    #[tokio::test]
    async fn update_refuses_empty_filters_and_empty_payloads() {
        let t = transactions();
        let client = RecordingClient::default();

        let unfiltered = Update::new(
            Whitelist::new(&t, ["status"]).unwrap(),
            record! { "status" => "paid" },
            Filters::new(&t),
        );
        assert!(update_one(&client, &unfiltered).await.unwrap_err().is_precondition());

        let nothing_to_set = Update::new(
            Whitelist::new(&t, ["status"]).unwrap(),
            record! { "role" => "admin" },
            Filters::new(&t).eq("id", 1),
        );
        assert!(update_one(&client, &nothing_to_set).await.unwrap_err().is_precondition());
        assert!(client.statements().is_empty());
    }

    #[tokio::test]
    async fn update_reports_not_found_when_nothing_matched() {
        let t = transactions();
        let tt = trip_travelers();
        let client = RecordingClient::default();
        let update = Update::new(
            Whitelist::new(&t, ["status"]).unwrap(),
            record! { "status" => "paid" },
            Filters::new(&t).eq("id", "x"),
        )
        .child(
            Child::new(Whitelist::new(&tt, ["travelerId"]).unwrap(), "tripTransactionId")
                .unwrap()
                .rows(vec![record! { "travelerId" => "a" }]),
        );
        let err = update_one(&client, &update).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: Data with specified filters does not exist");
        // Only the UPDATE ran; no child sync without a matched parent.
        assert_eq!(client.statements().len(), 1);
    }

    #[test]
    fn child_rows_always_carry_the_foreign_key() {
        let tt = trip_travelers();
        let child = Child::new(Whitelist::new(&tt, ["travelerId"]).unwrap(), "tripTransactionId").unwrap();
        let rows = child.rows_with_foreign_key(
            &[record! { "travelerId" => "a", "tripTransactionId" => "forged" }],
            &Value::from("parent"),
        );
        assert_eq!(
            rows[0],
            record! { "traveler_id" => "a", "trip_transaction_id" => "parent" }
        );
        assert!(Child::new(Whitelist::new(&tt, ["travelerId"]).unwrap(), "parentId").is_err());
    }

    #[test]
    fn bulk_insert_builds_one_multi_row_statement() {
        let tt = trip_travelers();
        let rows = vec![
            record! { "traveler_id" => "a", "trip_transaction_id" => "t" },
            record! { "traveler_id" => "b", "trip_transaction_id" => "t" },
        ];
        let sql = bulk_insert_sql(&tt, &rows).unwrap();
        assert_eq!(sql.len(), 1);
        assert_eq!(
            sql[0].to_sql(),
            "INSERT INTO trip_traveler (traveler_id, trip_transaction_id) VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn bulk_insert_splits_at_the_bind_limit() {
        let tt = trip_travelers();
        let row = record! { "traveler_id" => "a", "trip_transaction_id" => "t" };
        let rows = vec![row; 40_000];
        let sql = bulk_insert_sql(&tt, &rows).unwrap();
        assert_eq!(sql.len(), 2);
        assert_eq!(sql[0].params().len(), 65_534);
        assert_eq!(sql[1].params().len(), 80_000 - 65_534);
    }

    #[tokio::test]
    async fn bulk_insert_refuses_mismatched_rows() {
        let tt = trip_travelers();
        let w = Whitelist::new(&tt, ["travelerId", "tripTransactionId"]).unwrap();
        let client = RecordingClient::default();
        let rows = vec![
            record! { "travelerId" => "a", "tripTransactionId" => "t" },
            record! { "travelerId" => "b" },
        ];
        let err = bulk_insert(&client, &w, &rows).await.unwrap_err();
        assert!(err.is_precondition());
        assert!(client.statements().is_empty());

        assert_eq!(bulk_insert(&client, &w, &[]).await.unwrap(), 0);
        assert!(client.statements().is_empty());
    }

    #[test]
    fn bulk_update_casts_values_and_correlates_on_key() {
        let t = travelers();
        let w = Whitelist::new(&t, ["totalTripCount"]).unwrap();
        let rows = vec![
            record! { "id" => "67e55044-10b1-426f-9247-bb680e5fe0c8", "totalTripCount" => 2 },
            record! { "id" => "9a1d8a4e-3f4e-4a55-9d3b-08b1a1c4d2e7", "totalTripCount" => 5 },
        ];
        let sql = bulk_update_sql(&w, &rows).unwrap();
        assert_eq!(
            sql[0].to_sql(),
            "UPDATE traveler AS t SET total_trip_count = v.total_trip_count \
             FROM (VALUES ($1::uuid, $2::int), ($3::uuid, $4::int)) AS v(id, total_trip_count) \
             WHERE t.id = v.id"
        );
        assert_eq!(sql[0].params().len(), 4);
    }

    #[tokio::test]
    async fn bulk_update_requires_a_key_on_every_row() {
        let t = travelers();
        let w = Whitelist::new(&t, ["totalTripCount"]).unwrap();
        let client = RecordingClient::default();
        let rows = vec![
            record! { "id" => "67e55044-10b1-426f-9247-bb680e5fe0c8", "totalTripCount" => 2 },
            record! { "id" => "", "totalTripCount" => 3 },
        ];
        let err = bulk_update(&client, &w, &rows).await.unwrap_err();
        assert_eq!(err.to_string(), "Precondition failed: Missing primary key: id");
        assert!(client.statements().is_empty());
    }

    #[tokio::test]
    async fn bulk_update_executes_once_per_chunk() {
        let t = travelers();
        let w = Whitelist::new(&t, ["fullName", "phone"]).unwrap();
        let client = RecordingClient::affecting(2);
        let rows = vec![
            record! { "id" => "a", "fullName" => "Aisha", "phone" => Value::Null },
            record! { "id" => "b", "fullName" => "Umar", "phone" => "0812" },
        ];
        assert_eq!(bulk_update(&client, &w, &rows).await.unwrap(), 2);
        let statements = client.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].0.contains("($1::uuid, $2::text, $3::text)"));
        assert_eq!(statements[0].1, 6);
    }
}
