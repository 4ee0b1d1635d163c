//! Parameter-safe SQL assembly.
//!
//! Every statement the executors issue is composed through [`Sql`]: raw text
//! and bound [`Value`]s are stored separately and `$1, $2, ...` placeholders are
//! generated when the statement is rendered, so placeholder numbering is always
//! contiguous and always matches the parameter list.
//!
//! ```ignore
//! use pgcrud::{Sql, Value};
//!
//! let mut q = Sql::new("SELECT id FROM trip_package WHERE status = ");
//! q.push_bind("published");
//! q.push(" AND price < ").push_bind(5000);
//! assert_eq!(q.to_sql(), "SELECT id FROM trip_package WHERE status = $1 AND price < $2");
//! ```

use crate::client::GenericClient;
use crate::error::{CrudError, CrudResult};
use crate::ident::Ident;
use crate::record::{FromRow, Record};
use crate::value::Value;
use std::fmt::Write;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Longest SQL text (in bytes) written to the debug log.
const MAX_LOGGED_SQL: usize = 200;

/// Start a new [`Sql`] builder with an initial fragment.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A SQL fragment or statement with its bound values.
#[derive(Debug, Clone)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
    tag: &'static str,
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
            tag: "-",
        }
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self {
            parts: Vec::new(),
            params: Vec::new(),
            tag: "-",
        }
    }

    /// Label the statement in the SQL debug log (e.g. `paginate.count`).
    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_owned())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value.into());
        self
    }

    /// Append a validated identifier.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        self.push(&ident.to_sql())
    }

    /// Append another fragment, consuming it.
    pub fn push_sql(&mut self, mut other: Sql) -> &mut Self {
        for part in other.parts.drain(..) {
            match part {
                SqlPart::Raw(s) => {
                    self.push(&s);
                }
                SqlPart::Param => self.parts.push(SqlPart::Param),
            }
        }
        self.params.append(&mut other.params);
        self
    }

    /// Whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, SqlPart::Raw(s) if s.is_empty()))
    }

    /// Bound values in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        self.render(1)
    }

    /// Render SQL numbering placeholders from `start` (`$start, $start+1, ...`).
    pub fn render(&self, start: usize) -> String {
        let mut out = String::new();
        let mut idx = start;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    let _ = write!(&mut out, "${idx}");
                    idx += 1;
                }
            }
        }
        out
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }

    fn validate(&self) -> CrudResult<()> {
        let placeholder_count = self
            .parts
            .iter()
            .filter(|p| matches!(p, SqlPart::Param))
            .count();
        if placeholder_count != self.params.len() {
            return Err(CrudError::validation(format!(
                "Sql: placeholders({placeholder_count}) != params({})",
                self.params.len()
            )));
        }
        Ok(())
    }

    fn prepare(&self) -> CrudResult<String> {
        self.validate()?;
        let sql = self.to_sql();
        log_sql(self.tag, &sql, self.params.len());
        Ok(sql)
    }

    /// Execute the built SQL and return all rows.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> CrudResult<Vec<Row>> {
        let sql = self.prepare()?;
        conn.query(&sql, &self.params_ref()).await
    }

    /// Execute the built SQL and return all rows as records.
    pub async fn fetch_records(&self, conn: &impl GenericClient) -> CrudResult<Vec<Record>> {
        let rows = self.fetch_all(conn).await?;
        rows.iter().map(Record::from_row).collect()
    }

    /// Execute the built SQL and return the first row; `NotFound` when there is none.
    pub async fn fetch_one(&self, conn: &impl GenericClient) -> CrudResult<Row> {
        let sql = self.prepare()?;
        conn.query_one(&sql, &self.params_ref()).await
    }

    /// Execute the built SQL and return the first row as a record.
    pub async fn fetch_one_record(&self, conn: &impl GenericClient) -> CrudResult<Record> {
        let row = self.fetch_one(conn).await?;
        Record::from_row(&row)
    }

    /// Execute the built SQL and return the first row, if any.
    pub async fn fetch_opt(&self, conn: &impl GenericClient) -> CrudResult<Option<Row>> {
        let sql = self.prepare()?;
        conn.query_opt(&sql, &self.params_ref()).await
    }

    /// Execute the built SQL and return the first row as a record, if any.
    pub async fn fetch_opt_record(&self, conn: &impl GenericClient) -> CrudResult<Option<Record>> {
        let row = self.fetch_opt(conn).await?;
        row.as_ref().map(Record::from_row).transpose()
    }

    /// Execute the built SQL and return affected row count.
    pub async fn execute(&self, conn: &impl GenericClient) -> CrudResult<u64> {
        let sql = self.prepare()?;
        conn.execute(&sql, &self.params_ref()).await
    }
}

fn log_sql(tag: &str, sql: &str, param_count: usize) {
    if sql.len() > MAX_LOGGED_SQL {
        tracing::debug!(
            target: "pgcrud.sql",
            tag,
            param_count,
            sql = %format_args!("{}...", truncate_sql_bytes(sql, MAX_LOGGED_SQL)),
        );
    } else {
        tracing::debug!(target: "pgcrud.sql", tag, param_count, sql = %sql);
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
