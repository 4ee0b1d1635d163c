//! Removal executors: `delete_one`, `delete_cascade`, `soft_delete`,
//! `soft_delete_cascade`.
//!
//! All four refuse filters that compile to nothing, so an empty filter can
//! never remove or hide a whole table. Cascades follow [`Cascade`] relations
//! at most two levels deep (parent, children, grandchildren) and address
//! related rows in batches with `foreign_key = ANY($n)`.
//!
//! Like the write executors, these issue several statements without opening a
//! transaction; pass one in when a partial cascade must not be observable.

use crate::case::camel_to_snake;
use crate::client::GenericClient;
use crate::error::{CrudError, CrudResult, refuse};
use crate::filter::Filters;
use crate::ident::Ident;
use crate::record::Record;
use crate::schema::Table;
use crate::sql::{Sql, sql};
use crate::value::Value;

/// A dependent table reached through a foreign key.
#[derive(Debug, Clone)]
pub struct Cascade<'a> {
    table: &'a Table,
    foreign_key: String,
    source_key: Option<String>,
    children: Vec<Cascade<'a>>,
}

impl<'a> Cascade<'a> {
    /// Rows of `table` whose `foreign_key` (camelCase or snake_case) points at the parent.
    pub fn new(table: &'a Table, foreign_key: &str) -> CrudResult<Self> {
        let column = camel_to_snake(foreign_key);
        table.column(&column)?;
        Ok(Self {
            table,
            foreign_key: column,
            source_key: None,
            children: Vec::new(),
        })
    }

    /// Parent column the foreign key refers to; the parent's key by default.
    pub fn source_key(mut self, column: &str) -> Self {
        self.source_key = Some(camel_to_snake(column));
        self
    }

    /// A relation one level further down (grandchildren of the root).
    pub fn child(mut self, child: Cascade<'a>) -> Self {
        self.children.push(child);
        self
    }

    fn foreign_key(&self) -> CrudResult<Ident> {
        self.table.column(&self.foreign_key)
    }

    /// Parent values the foreign key must match, NULLs dropped.
    fn parent_values(&self, parent: &Table, parent_rows: &[Record]) -> CrudResult<Vec<Value>> {
        let source = self.source_key.as_deref().unwrap_or(parent.key());
        if !parent.has_column(source) {
            return Err(CrudError::validation(format!(
                "Cascade to '{}' refers to unknown column '{source}' of '{}'",
                self.table.name(),
                parent.name()
            )));
        }
        Ok(parent_rows
            .iter()
            .filter_map(|row| row.get(source))
            .filter(|v| !v.is_null())
            .cloned()
            .collect())
    }
}

fn check_depth(operation: &'static str, table: &Table, cascades: &[Cascade<'_>]) -> CrudResult<()> {
    let too_deep = cascades
        .iter()
        .flat_map(|c| &c.children)
        .any(|grandchild| !grandchild.children.is_empty());
    if too_deep {
        return Err(refuse(
            operation,
            table.name(),
            "Cascades deeper than two levels are not supported",
        ));
    }
    Ok(())
}

fn where_clause(
    operation: &'static str,
    table: &Table,
    filters: &Filters<'_>,
) -> CrudResult<Sql> {
    if filters.table().ident() != table.ident() {
        return Err(CrudError::validation(format!(
            "Filters for '{}' cannot be applied to '{}'",
            filters.table().name(),
            table.name()
        )));
    }
    filters.check()?;
    if filters.is_empty() {
        return Err(refuse(
            operation,
            table.name(),
            format!("{operation} requires a non-empty filter"),
        ));
    }
    filters.to_sql(None)
}

/// `<column> = ANY($n)`
fn push_any(sql: &mut Sql, column: &Ident, values: Vec<Value>) {
    sql.push_ident(column).push(" = ANY(").push_bind(Value::Array(values)).push(")");
}

/// Hard-delete the rows matching `filters`; returns how many were removed.
pub async fn delete_one(conn: &impl GenericClient, filters: &Filters<'_>) -> CrudResult<u64> {
    let table = filters.table();
    let mut sql = Sql::new("DELETE FROM ");
    sql.push_ident(table.ident())
        .push(" WHERE ")
        .push_sql(where_clause("delete_one", table, filters)?);

    let removed = sql.tag("delete_one").execute(conn).await?;
    if removed == 0 {
        return Err(CrudError::not_found(format!("No matching row in '{}'", table.name())));
    }
    tracing::debug!(target: "pgcrud", table = table.name(), removed, "delete_one");
    Ok(removed)
}

/// Hard-delete the matching rows after their children and grandchildren.
///
/// Order: locate parents, then per relation delete grandchildren, then
/// children, and finally the parents themselves by key. Returns the number of
/// parent rows removed.
pub async fn delete_cascade(
    conn: &impl GenericClient,
    filters: &Filters<'_>,
    cascades: &[Cascade<'_>],
) -> CrudResult<u64> {
    let table = filters.table();
    let condition = where_clause("delete_cascade", table, filters)?;
    check_depth("delete_cascade", table, cascades)?;

    let mut locate = Sql::new("SELECT * FROM ");
    locate.push_ident(table.ident()).push(" WHERE ").push_sql(condition);
    let parents = locate.tag("delete_cascade.locate").fetch_records(conn).await?;
    if parents.is_empty() {
        return Err(CrudError::not_found(format!("No matching row in '{}'", table.name())));
    }

    for relation in cascades {
        let values = relation.parent_values(table, &parents)?;
        if values.is_empty() {
            continue;
        }

        if !relation.children.is_empty() {
            let mut locate = sql("SELECT * FROM ");
            locate.push_ident(relation.table.ident()).push(" WHERE ");
            push_any(&mut locate, &relation.foreign_key()?, values.clone());
            let children = locate.tag("delete_cascade.locate").fetch_records(conn).await?;

            for nested in &relation.children {
                let nested_values = nested.parent_values(relation.table, &children)?;
                if nested_values.is_empty() {
                    continue;
                }
                let mut delete = sql("DELETE FROM ");
                delete.push_ident(nested.table.ident()).push(" WHERE ");
                push_any(&mut delete, &nested.foreign_key()?, nested_values);
                let removed = delete.tag("delete_cascade.level2").execute(conn).await?;
                tracing::debug!(target: "pgcrud", table = nested.table.name(), removed, "cascade delete");
            }
        }

        let mut delete = sql("DELETE FROM ");
        delete.push_ident(relation.table.ident()).push(" WHERE ");
        push_any(&mut delete, &relation.foreign_key()?, values);
        let removed = delete.tag("delete_cascade.level1").execute(conn).await?;
        tracing::debug!(target: "pgcrud", table = relation.table.name(), removed, "cascade delete");
    }

    let keys = parents
        .iter()
        .filter_map(|row| row.get(table.key()).cloned())
        .collect();
    let mut delete = Sql::new("DELETE FROM ");
    delete.push_ident(table.ident()).push(" WHERE ");
    push_any(&mut delete, &table.key_ident()?, keys);
    let removed = delete.tag("delete_cascade").execute(conn).await?;
    tracing::debug!(target: "pgcrud", table = table.name(), removed, "delete_cascade");
    Ok(removed)
}

/// `UPDATE <table> SET deleted_at = now(), deleted_by = $1 WHERE `
fn soft_delete_head(table: &Table, deleted_by: &Value) -> CrudResult<Sql> {
    let (deleted_at, deleted_by_column) = table.soft_delete_columns()?;
    let mut sql = Sql::new("UPDATE ");
    sql.push_ident(table.ident())
        .push(" SET ")
        .push_ident(&deleted_at)
        .push(" = now(), ")
        .push_ident(&deleted_by_column)
        .push(" = ")
        .push_bind(deleted_by.clone())
        .push(" WHERE ");
    Ok(sql)
}

/// Mark the matching rows deleted; returns how many were marked.
pub async fn soft_delete(
    conn: &impl GenericClient,
    filters: &Filters<'_>,
    deleted_by: impl Into<Value>,
) -> CrudResult<u64> {
    let table = filters.table();
    let condition = where_clause("soft_delete", table, filters)?;
    let mut sql = soft_delete_head(table, &deleted_by.into())?;
    sql.push_sql(condition);

    let marked = sql.tag("soft_delete").execute(conn).await?;
    if marked == 0 {
        return Err(CrudError::not_found(format!("No matching row in '{}'", table.name())));
    }
    tracing::debug!(target: "pgcrud", table = table.name(), marked, "soft_delete");
    Ok(marked)
}

/// Mark the matching rows deleted, then their children and grandchildren.
///
/// Returns the marked parent rows in camelCase. Refuses an empty filter before
/// issuing any statement.
pub async fn soft_delete_cascade(
    conn: &impl GenericClient,
    filters: &Filters<'_>,
    cascades: &[Cascade<'_>],
    deleted_by: impl Into<Value>,
) -> CrudResult<Vec<Record>> {
    let table = filters.table();
    let condition = where_clause("soft_delete_cascade", table, filters)?;
    check_depth("soft_delete_cascade", table, cascades)?;
    let deleted_by = deleted_by.into();

    let mut sql = soft_delete_head(table, &deleted_by)?;
    sql.push_sql(condition).push(" RETURNING *");
    let parents = sql.tag("soft_delete_cascade").fetch_records(conn).await?;
    if parents.is_empty() {
        return Err(CrudError::not_found(format!("No matching row in '{}'", table.name())));
    }

    for relation in cascades {
        let values = relation.parent_values(table, &parents)?;
        if values.is_empty() {
            continue;
        }
        let mut update = soft_delete_head(relation.table, &deleted_by)?;
        push_any(&mut update, &relation.foreign_key()?, values);

        if relation.children.is_empty() {
            let marked = update.tag("soft_delete_cascade.level1").execute(conn).await?;
            tracing::debug!(target: "pgcrud", table = relation.table.name(), marked, "cascade soft delete");
            continue;
        }

        update.push(" RETURNING *");
        let children = update.tag("soft_delete_cascade.level1").fetch_records(conn).await?;
        for nested in &relation.children {
            let nested_values = nested.parent_values(relation.table, &children)?;
            if nested_values.is_empty() {
                continue;
            }
            let mut update = soft_delete_head(nested.table, &deleted_by)?;
            push_any(&mut update, &nested.foreign_key()?, nested_values);
            let marked = update.tag("soft_delete_cascade.level2").execute(conn).await?;
            tracing::debug!(target: "pgcrud", table = nested.table.name(), marked, "cascade soft delete");
        }
    }

    tracing::debug!(target: "pgcrud", table = table.name(), marked = parents.len(), "soft_delete_cascade");
    Ok(parents.into_iter().map(Record::into_camel_case).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingClient;

    fn transactions() -> Table {
        Table::new("trip_transaction", ["id", "status", "deleted_at", "deleted_by"]).unwrap()
    }

    fn travelers() -> Table {
        Table::new("trip_traveler", ["id", "trip_transaction_id", "deleted_at", "deleted_by"]).unwrap()
    }

    fn documents() -> Table {
        Table::new("trip_traveler_document", ["id", "trip_traveler_id", "note"]).unwrap()
    }

    #[tokio::test]
    async fn every_removal_refuses_an_empty_filter() {
        let t = transactions();
        let client = RecordingClient::affecting(3);
        let none = Filters::new(&t);

        assert!(delete_one(&client, &none).await.unwrap_err().is_precondition());
        assert!(delete_cascade(&client, &none, &[]).await.unwrap_err().is_precondition());
        assert!(soft_delete(&client, &none, "admin").await.unwrap_err().is_precondition());
        assert!(
            soft_delete_cascade(&client, &none, &[], "admin")
                .await
                .unwrap_err()
                .is_precondition()
        );
        assert!(client.statements().is_empty());
    }

    #[tokio::test]
    async fn soft_delete_binds_actor_then_filters() {
        let t = transactions();
        let client = RecordingClient::affecting(1);
        let filters = Filters::new(&t).eq("id", "abc").is_null("deleted_at");
        assert_eq!(soft_delete(&client, &filters, "user-7").await.unwrap(), 1);
        let statements = client.statements();
        assert_eq!(
            statements[0],
            (
                "UPDATE trip_transaction SET deleted_at = now(), deleted_by = $1 \
                 WHERE id = $2 AND deleted_at IS NULL"
                    .to_owned(),
                2
            )
        );
    }

    #[tokio::test]
    async fn zero_affected_rows_is_not_found() {
        let t = transactions();
        let client = RecordingClient::affecting(0);
        let filters = Filters::new(&t).eq("id", "missing");
        assert!(delete_one(&client, &filters).await.unwrap_err().is_not_found());
        assert!(soft_delete(&client, &filters, Value::Null).await.unwrap_err().is_not_found());
        assert!(delete_cascade(&client, &filters, &[]).await.unwrap_err().is_not_found());
        assert!(
            soft_delete_cascade(&client, &filters, &[], Value::Null)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn cascades_are_limited_to_two_levels() {
        let (t, tt, d) = (transactions(), travelers(), documents());
        let client = RecordingClient::default();
        let too_deep = Cascade::new(&tt, "tripTransactionId").unwrap().child(
            Cascade::new(&d, "trip_traveler_id")
                .unwrap()
                .child(Cascade::new(&d, "trip_traveler_id").unwrap()),
        );
        let filters = Filters::new(&t).eq("id", "abc");
        let err = delete_cascade(&client, &filters, &[too_deep]).await.unwrap_err();
        assert!(err.is_precondition());
        assert!(client.statements().is_empty());
    }

    #[test]
    fn cascade_foreign_keys_are_validated() {
        let tt = travelers();
        assert!(Cascade::new(&tt, "tripTransactionId").is_ok());
        assert!(Cascade::new(&tt, "tripId").is_err());
    }

    #[test]
    fn parent_values_follow_the_source_key() {
        let (t, tt) = (transactions(), travelers());
        let parents = vec![
            crate::record! { "id" => "a", "status" => "paid" },
            crate::record! { "id" => Value::Null, "status" => "void" },
        ];
        let cascade = Cascade::new(&tt, "trip_transaction_id").unwrap();
        assert_eq!(cascade.parent_values(&t, &parents).unwrap(), vec![Value::from("a")]);

        let by_status = cascade.clone().source_key("status");
        assert_eq!(by_status.parent_values(&t, &parents).unwrap().len(), 2);
        assert!(cascade.source_key("missing").parent_values(&t, &parents).is_err());
    }

    #[test]
    fn soft_delete_needs_the_marker_columns() {
        let d = documents();
        assert!(matches!(
            soft_delete_head(&d, &Value::Null).unwrap_err(),
            CrudError::Validation(_)
        ));
    }
}
