//! Read executors: `select_all`, `paginate`, `find_one`.
//!
//! A [`Select`] describes one base table (optionally aliased), the columns to
//! return, any number of joined tables, a [`Filters`] conjunction on the base
//! table and an ordering. Every column reference is resolved against the
//! [`Table`] it names, so the generated statement can only mention declared
//! columns. Results are returned with camelCase keys.
//!
//! ```ignore
//! let select = Select::from(&blog)
//!     .alias("b")
//!     .columns(["title", "slug", "created_at"])
//!     .join(Join::new(&categories, "c").on("id", "b.category_id").column_as("label", "category"))
//!     .filter(Filters::new(&blog).is_null("deleted_at"))
//!     .order_by("created_at", Direction::Desc);
//! let page = paginate(&pool, &select, PageRequest::from_query(page, limit)).await?;
//! ```

use crate::client::GenericClient;
use crate::error::{CrudError, CrudResult};
use crate::filter::Filters;
use crate::ident::Ident;
use crate::pagination::{PageRequest, Pagination, PaginationResult};
use crate::record::{Record, RowExt};
use crate::schema::Table;
use crate::sql::Sql;

/// Join flavour; LEFT unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq)]
enum SelectExpr {
    /// `<qualifier>.*`
    All,
    /// A column reference, as written by the caller (`title`, `tp.title`).
    Column(String),
    /// `<column> AS <alias>`
    Aliased { column: String, alias: String },
    /// Trusted SQL text, emitted verbatim.
    Raw(String),
}

#[derive(Debug, Clone)]
struct JoinOn {
    column: String,
    other: String,
}

/// A joined table for reads.
#[derive(Debug, Clone)]
pub struct Join<'a> {
    kind: JoinKind,
    table: &'a Table,
    alias: String,
    on: Option<JoinOn>,
    columns: Vec<SelectExpr>,
}

impl<'a> Join<'a> {
    /// Join `table` under `alias`.
    pub fn new(table: &'a Table, alias: &str) -> Self {
        Self {
            kind: JoinKind::default(),
            table,
            alias: alias.to_owned(),
            on: None,
            columns: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// `ON <alias>.<column> = <other>`, where `other` is `alias.column` of the
    /// base table or of a join added earlier.
    pub fn on(mut self, column: &str, other: &str) -> Self {
        self.on = Some(JoinOn {
            column: column.to_owned(),
            other: other.to_owned(),
        });
        self
    }

    /// Select a column of the joined table.
    pub fn column(mut self, column: &str) -> Self {
        self.columns.push(SelectExpr::Column(column.to_owned()));
        self
    }

    /// Select a column of the joined table under another name.
    pub fn column_as(mut self, column: &str, alias: &str) -> Self {
        self.columns.push(SelectExpr::Aliased {
            column: column.to_owned(),
            alias: alias.to_owned(),
        });
        self
    }
}

/// A read descriptor.
#[derive(Debug, Clone)]
pub struct Select<'a> {
    table: &'a Table,
    alias: Option<String>,
    columns: Vec<SelectExpr>,
    joins: Vec<Join<'a>>,
    filters: Option<Filters<'a>>,
    order: Vec<(String, Direction)>,
}

impl<'a> Select<'a> {
    pub fn from(table: &'a Table) -> Self {
        Self {
            table,
            alias: None,
            columns: Vec::new(),
            joins: Vec::new(),
            filters: None,
            order: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_owned());
        self
    }

    /// Select a column. Unqualified names refer to the base table; `alias.column`
    /// may name a joined table.
    pub fn column(mut self, column: &str) -> Self {
        self.columns.push(SelectExpr::Column(column.to_owned()));
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns.extend(
            columns
                .into_iter()
                .map(|c| SelectExpr::Column(c.as_ref().to_owned())),
        );
        self
    }

    pub fn column_as(mut self, column: &str, alias: &str) -> Self {
        self.columns.push(SelectExpr::Aliased {
            column: column.to_owned(),
            alias: alias.to_owned(),
        });
        self
    }

    /// Every column of the base table. This is also the default when no column is chosen.
    pub fn all_columns(mut self) -> Self {
        self.columns.push(SelectExpr::All);
        self
    }

    /// Append an expression verbatim, e.g. a `json_agg` subquery or `CONCAT(...) AS name`.
    ///
    /// The text is not validated. Never build it from request input.
    pub fn raw_column(mut self, expr: impl Into<String>) -> Self {
        self.columns.push(SelectExpr::Raw(expr.into()));
        self
    }

    pub fn join(mut self, join: Join<'a>) -> Self {
        self.joins.push(join);
        self
    }

    /// Filter the base table. Replaces filters set earlier.
    pub fn filter(mut self, filters: Filters<'a>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Add an ORDER BY term. Without any, rows are ordered by the key descending.
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_owned(), direction));
        self
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// The data statement, without LIMIT/OFFSET.
    pub fn build_sql(&self) -> CrudResult<Sql> {
        let scope = Scope::new(self)?;

        let mut sql = Sql::new("SELECT ");
        let mut first = true;
        let mut push_item = |sql: &mut Sql, item: String| {
            if !first {
                sql.push(", ");
            }
            first = false;
            sql.push(&item);
        };

        if self.columns.is_empty() {
            push_item(&mut sql, format!("{}.*", scope.base_qualifier()));
        }
        for expr in &self.columns {
            push_item(&mut sql, scope.render_expr(expr, None)?);
        }
        for (join, alias) in self.joins.iter().zip(&scope.join_aliases) {
            for expr in &join.columns {
                push_item(&mut sql, scope.render_expr(expr, Some((join.table, alias)))?);
            }
        }

        sql.push(" FROM ");
        self.push_from(&mut sql, &scope);
        for (i, join) in self.joins.iter().enumerate() {
            let alias = &scope.join_aliases[i];
            sql.push(" ")
                .push(join.kind.as_sql())
                .push(" ")
                .push_ident(join.table.ident())
                .push(" ")
                .push_ident(alias);
            if let Some(on) = &join.on {
                let column = join.table.column(&on.column)?.qualified_by(alias);
                let other = scope.resolve_visible(&on.other, i)?;
                sql.push(" ON ")
                    .push_ident(&column)
                    .push(" = ")
                    .push_ident(&other);
            } else {
                return Err(CrudError::validation(format!(
                    "Join on '{}' needs an ON condition",
                    join.table.name()
                )));
            }
        }
        self.push_where(&mut sql, &scope)?;

        sql.push(" ORDER BY ");
        if self.order.is_empty() {
            let key = match &scope.qualifier {
                Some(q) => self.table.key_ident()?.qualified_by(q),
                None => self.table.key_ident()?,
            };
            sql.push_ident(&key).push(" DESC");
        } else {
            for (i, (column, direction)) in self.order.iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                sql.push_ident(&scope.resolve(column)?)
                    .push(" ")
                    .push(direction.as_sql());
            }
        }
        Ok(sql)
    }

    /// The row count statement: same base table and filters, no joins.
    pub fn count_sql(&self) -> CrudResult<Sql> {
        let scope = Scope::new(self)?;
        let mut sql = Sql::new("SELECT COUNT(*) AS total FROM ");
        self.push_from(&mut sql, &scope);
        self.push_where(&mut sql, &scope)?;
        Ok(sql)
    }

    fn push_from(&self, sql: &mut Sql, scope: &Scope<'_>) {
        sql.push_ident(self.table.ident());
        if let Some(alias) = &scope.alias {
            sql.push(" ").push_ident(alias);
        }
    }

    fn push_where(&self, sql: &mut Sql, scope: &Scope<'_>) -> CrudResult<()> {
        if let Some(filters) = &self.filters {
            if filters.table().ident() != self.table.ident() {
                return Err(CrudError::validation(format!(
                    "Filters for '{}' cannot be applied to '{}'",
                    filters.table().name(),
                    self.table.name()
                )));
            }
            if !filters.is_empty() {
                sql.push(" WHERE ").push_sql(filters.to_sql(scope.qualifier.as_ref())?);
            } else {
                filters.check()?;
            }
        }
        Ok(())
    }
}

/// Validated aliases of one [`Select`], used to resolve column references.
struct Scope<'s> {
    select: &'s Select<'s>,
    alias: Option<Ident>,
    /// Prefix for base-table columns: the alias, or the table name once joins
    /// bring other columns into view.
    qualifier: Option<Ident>,
    join_aliases: Vec<Ident>,
}

impl<'s> Scope<'s> {
    fn new(select: &'s Select<'s>) -> CrudResult<Self> {
        let alias = select.alias.as_deref().map(Ident::simple).transpose()?;
        let join_aliases = select
            .joins
            .iter()
            .map(|j| Ident::simple(&j.alias))
            .collect::<CrudResult<Vec<_>>>()?;

        let base = alias.clone().unwrap_or_else(|| select.table.ident().clone());
        let mut seen = vec![base.to_sql()];
        for a in &join_aliases {
            let name = a.to_sql();
            if seen.contains(&name) {
                return Err(CrudError::validation(format!("Duplicate table alias '{name}'")));
            }
            seen.push(name);
        }
        let qualifier = alias
            .clone()
            .or_else(|| (!select.joins.is_empty()).then(|| select.table.ident().clone()));
        Ok(Self {
            select,
            alias,
            qualifier,
            join_aliases,
        })
    }

    fn base_qualifier(&self) -> String {
        match &self.alias {
            Some(a) => a.to_sql(),
            None => self.select.table.ident().to_sql(),
        }
    }

    fn render_expr(&self, expr: &SelectExpr, join: Option<(&Table, &Ident)>) -> CrudResult<String> {
        let column = |c: &str| -> CrudResult<Ident> {
            match join {
                Some((table, alias)) => Ok(table.column(c)?.qualified_by(alias)),
                None => self.resolve(c),
            }
        };
        Ok(match expr {
            SelectExpr::All => format!("{}.*", self.base_qualifier()),
            SelectExpr::Column(c) => column(c)?.to_sql(),
            SelectExpr::Aliased { column: c, alias } => {
                format!("{} AS {}", column(c)?, Ident::simple(alias)?)
            }
            SelectExpr::Raw(text) => text.clone(),
        })
    }

    /// Resolve against the base table and every join.
    fn resolve(&self, reference: &str) -> CrudResult<Ident> {
        self.resolve_visible(reference, self.join_aliases.len())
    }

    /// Resolve against the base table and the first `visible_joins` joins.
    fn resolve_visible(&self, reference: &str, visible_joins: usize) -> CrudResult<Ident> {
        let ident = Ident::parse(reference)?;
        let (qualifier, name) = ident.split_last();
        let Some(qualifier) = qualifier else {
            let column = self.select.table.column(name)?;
            return Ok(match &self.qualifier {
                Some(q) => column.qualified_by(q),
                None => column,
            });
        };

        let base = self.alias.as_ref().unwrap_or(self.select.table.ident());
        if &qualifier == base {
            return Ok(self.select.table.column(name)?.qualified_by(&qualifier));
        }
        self.select
            .joins
            .iter()
            .zip(&self.join_aliases)
            .take(visible_joins)
            .find(|(_, alias)| **alias == qualifier)
            .map(|(join, _)| join.table.column(name).map(|c| c.qualified_by(&qualifier)))
            .unwrap_or_else(|| {
                Err(CrudError::validation(format!(
                    "Unknown table alias '{qualifier}' in '{reference}'"
                )))
            })
    }
}

/// Every matching row, unbounded.
pub async fn select_all(conn: &impl GenericClient, select: &Select<'_>) -> CrudResult<Vec<Record>> {
    let sql = select.build_sql()?.tag("select_all");
    let rows = sql.fetch_records(conn).await?;
    tracing::debug!(target: "pgcrud", table = select.table.name(), rows = rows.len(), "select_all");
    Ok(rows.into_iter().map(Record::into_camel_case).collect())
}

/// The first matching row, or [`CrudError::NotFound`].
pub async fn find_one(conn: &impl GenericClient, select: &Select<'_>) -> CrudResult<Record> {
    let mut sql = select.build_sql()?.tag("find_one");
    sql.push(" LIMIT 1");
    sql.fetch_opt_record(conn)
        .await?
        .map(Record::into_camel_case)
        .ok_or_else(|| {
            CrudError::not_found(format!("No matching row in '{}'", select.table.name()))
        })
}

/// One page of rows plus pagination metadata.
///
/// Issues two statements: a COUNT over the base table and filters (joins are
/// not applied), then the data query with `LIMIT`/`OFFSET` bound after the
/// filter parameters. `page` and `limit` are used as given; clamp them with
/// [`PageRequest::from_query`] first.
pub async fn paginate(
    conn: &impl GenericClient,
    select: &Select<'_>,
    page: PageRequest,
) -> CrudResult<PaginationResult> {
    page.validate()?;

    let count = select.count_sql()?.tag("paginate.count");
    let total: i64 = match count.fetch_opt(conn).await? {
        Some(row) => row.try_get_column("total")?,
        None => 0,
    };

    let mut data = select.build_sql()?.tag("paginate.data");
    data.push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = data.fetch_records(conn).await?;

    tracing::debug!(
        target: "pgcrud",
        table = select.table.name(),
        page = page.page,
        limit = page.limit,
        total,
        "paginate"
    );
    Ok(PaginationResult {
        rows: rows.into_iter().map(Record::into_camel_case).collect(),
        pagination: Pagination::new(page, total),
    })
}
