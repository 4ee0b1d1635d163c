//! Filter compilation.
//!
//! [`Filters`] is a flat conjunction of conditions on the columns of one
//! [`Table`]. Column names are checked against the table when a condition is
//! added and operators come from the closed [`Op`] set, so only values ever
//! travel as parameters and nothing caller-supplied is spliced into SQL text.
//!
//! Compilation rules, per condition in insertion order:
//!
//! | condition | SQL | params |
//! |---|---|---|
//! | `eq(col, NULL)` / `is_null(col)` | `col IS NULL` | none |
//! | `eq(col, v)` | `col = $n` | `v` |
//! | `op(col, _, NULL)` | *(skipped)* | none |
//! | `op(col, In, [a, b])` | `col = ANY($n)` | `[a, b]` as one array |
//! | `op(col, Like, v)` | `col ILIKE $n` | `%v%` |
//! | `op(col, Gt, v)` | `col > $n` | `v` |

use crate::error::{CrudError, CrudResult};
use crate::ident::Ident;
use crate::schema::Table;
use crate::sql::Sql;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Set membership, compiled to `= ANY($n)` with a single array parameter.
    In,
    /// Case-insensitive substring match, compiled to `ILIKE '%v%'`.
    Like,
}

impl Op {
    /// SQL operator text.
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::In => "IN",
            Op::Like => "LIKE",
        }
    }
}

impl FromStr for Op {
    type Err = CrudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            "IN" => Op::In,
            "LIKE" | "ILIKE" => Op::Like,
            _ => {
                return Err(CrudError::validation(format!(
                    "Unsupported filter operator '{s}'"
                )));
            }
        };
        Ok(op)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone)]
enum Condition {
    IsNull(Ident),
    Compare { column: Ident, op: Op, value: Value },
}

/// Flat AND-conjunction of conditions on one table.
///
/// Builder methods never fail; the first invalid column or operator is
/// remembered and reported when the filters are compiled.
///
/// ```ignore
/// let filters = Filters::new(&trips)
///     .any("status", vec!["paid", "pending"])
///     .is_null("deleted_at");
/// let w = build_where(&filters, 1)?;
/// assert_eq!(w.text, "status = ANY($1) AND deleted_at IS NULL");
/// ```
#[derive(Debug, Clone)]
pub struct Filters<'a> {
    table: &'a Table,
    conditions: Vec<Condition>,
    build_error: Option<String>,
}

impl<'a> Filters<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            conditions: Vec::new(),
            build_error: None,
        }
    }

    /// Compile the declarative JSON form
    /// `{"status": {"operator": "IN", "value": [...]}, "b.deleted_at": null, "slug": "x"}`.
    ///
    /// A missing `operator` means `=`; a missing or null `value` skips the entry.
    /// Conditions keep the key order of the object.
    pub fn from_json(table: &'a Table, json: &serde_json::Value) -> CrudResult<Self> {
        let serde_json::Value::Object(map) = json else {
            return Err(CrudError::validation(format!(
                "Filters must be a JSON object, got {json}"
            )));
        };

        let mut filters = Self::new(table);
        for (column, config) in map {
            filters = match config {
                serde_json::Value::Null => filters.is_null(column),
                serde_json::Value::Object(spec) => {
                    let op = match spec.get("operator") {
                        None => Op::Eq,
                        Some(serde_json::Value::String(s)) => s.parse()?,
                        Some(other) => {
                            return Err(CrudError::validation(format!(
                                "Filter operator for '{column}' must be a string, got {other}"
                            )));
                        }
                    };
                    let value = spec.get("value").cloned().map(Value::from).unwrap_or_default();
                    filters.op(column, op, value)
                }
                serde_json::Value::Array(_) => {
                    return Err(CrudError::validation(format!(
                        "Filter '{column}' has an array literal; use the IN operator"
                    )));
                }
                literal => filters.eq(column, Value::from(literal.clone())),
            };
        }
        filters.check()?;
        Ok(filters)
    }

    /// `column = value`, or `column IS NULL` when `value` is NULL.
    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            return self.is_null(column);
        }
        self.push(column, |column| Condition::Compare {
            column,
            op: Op::Eq,
            value,
        })
    }

    /// `column IS NULL`.
    pub fn is_null(self, column: &str) -> Self {
        self.push(column, Condition::IsNull)
    }

    /// `column <op> value`; skipped entirely when `value` is NULL.
    pub fn op(self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            return self.validate_only(column);
        }
        let value = match op {
            Op::In => match value {
                array @ Value::Array(_) => array,
                scalar => Value::Array(vec![scalar]),
            },
            Op::Like => Value::Text(format!("%{}%", value.to_text())),
            _ => value,
        };
        self.push(column, |column| Condition::Compare { column, op, value })
    }

    pub fn ne(self, column: &str, value: impl Into<Value>) -> Self {
        self.op(column, Op::Ne, value)
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.op(column, Op::Gt, value)
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.op(column, Op::Gte, value)
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.op(column, Op::Lt, value)
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.op(column, Op::Lte, value)
    }

    /// Case-insensitive substring match.
    pub fn like(self, column: &str, value: impl Into<Value>) -> Self {
        self.op(column, Op::Like, value)
    }

    /// `column = ANY($n)` with `values` bound as one array.
    pub fn any(self, column: &str, values: impl Into<Value>) -> Self {
        self.op(column, Op::In, values)
    }

    /// Number of conditions that will be emitted.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True when the filters compile to nothing (no WHERE clause).
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub(crate) fn check(&self) -> CrudResult<()> {
        match &self.build_error {
            Some(message) => Err(CrudError::validation(message.clone())),
            None => Ok(()),
        }
    }

    /// Conditions joined by ` AND `, columns qualified with `qualifier` when given.
    pub(crate) fn to_sql(&self, qualifier: Option<&Ident>) -> CrudResult<Sql> {
        self.check()?;
        let mut sql = Sql::empty();
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                sql.push(" AND ");
            }
            let column = |c: &Ident| match qualifier {
                Some(q) => c.qualified_by(q),
                None => c.clone(),
            };
            match condition {
                Condition::IsNull(c) => {
                    sql.push_ident(&column(c)).push(" IS NULL");
                }
                Condition::Compare { column: c, op, value } => {
                    sql.push_ident(&column(c));
                    match op {
                        Op::In => sql.push(" = ANY(").push_bind(value.clone()).push(")"),
                        Op::Like => sql.push(" ILIKE ").push_bind(value.clone()),
                        other => sql
                            .push(" ")
                            .push(other.as_sql())
                            .push(" ")
                            .push_bind(value.clone()),
                    };
                }
            }
        }
        Ok(sql)
    }

    /// Resolve `column` or `alias.column` to a column of this table.
    fn resolve(&self, column: &str) -> CrudResult<Ident> {
        let ident = Ident::parse(column)?;
        let (qualifier, name) = ident.split_last();
        if qualifier.as_ref().is_some_and(|q| q.to_sql().contains('.')) {
            return Err(CrudError::validation(format!(
                "Filter column '{column}' has more than one qualifier"
            )));
        }
        self.table.column(name)
    }

    fn push(mut self, column: &str, make: impl FnOnce(Ident) -> Condition) -> Self {
        match self.resolve(column) {
            Ok(ident) => self.conditions.push(make(ident)),
            Err(err) => self.remember(err),
        }
        self
    }

    fn validate_only(mut self, column: &str) -> Self {
        if let Err(err) = self.resolve(column) {
            self.remember(err);
        }
        self
    }

    fn remember(&mut self, err: CrudError) {
        if self.build_error.is_none() {
            self.build_error = Some(match err {
                CrudError::Validation(message) => message,
                other => other.to_string(),
            });
        }
    }
}

/// A compiled WHERE fragment (without the `WHERE` keyword).
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    /// Conditions joined by ` AND `; empty when there are none.
    pub text: String,
    /// Bound values, one per placeholder, in placeholder order.
    pub values: Vec<Value>,
    /// The placeholder index following the last one used.
    pub next_index: usize,
}

/// Compile `filters`, numbering placeholders from `start_index`.
///
/// Starting above 1 lets the fragment follow already-bound parameters, such
/// as the SET list of an UPDATE.
pub fn build_where(filters: &Filters<'_>, start_index: usize) -> CrudResult<WhereClause> {
    let sql = filters.to_sql(None)?;
    let text = sql.render(start_index);
    let values = sql.into_params();
    Ok(WhereClause {
        text,
        next_index: start_index + values.len(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transactions() -> Table {
        Table::new(
            "trip_transaction",
            ["id", "status", "total_price", "customer_name", "deleted_at", "deleted_by"],
        )
        .unwrap()
    }

    #[test]
    fn in_and_is_null_scenario() {
        let t = transactions();
        let f = Filters::from_json(
            &t,
            &json!({"status": {"operator": "IN", "value": ["paid", "pending"]}, "deleted_at": null}),
        )
        .unwrap();
        let w = build_where(&f, 1).unwrap();
        assert_eq!(w.text, "status = ANY($1) AND deleted_at IS NULL");
        assert_eq!(w.values, vec![Value::from(vec!["paid", "pending"])]);
        assert_eq!(w.next_index, 2);
    }

    #[test]
    fn builder_preserves_insertion_order() {
        let t = transactions();
        let f = Filters::new(&t)
            .any("status", vec!["paid", "pending"])
            .eq("deleted_at", Value::Null);
        let w = build_where(&f, 1).unwrap();
        assert_eq!(w.text, "status = ANY($1) AND deleted_at IS NULL");
        assert_eq!(w.values.len(), 1);
    }

    #[test]
    fn placeholders_match_values_and_honor_start_index() {
        let t = transactions();
        let f = Filters::new(&t)
            .eq("customer_name", "Aisha")
            .gt("total_price", 3000)
            .like("status", "PEND")
            .is_null("deleted_at");
        let w = build_where(&f, 4).unwrap();
        assert_eq!(
            w.text,
            "customer_name = $4 AND total_price > $5 AND status ILIKE $6 AND deleted_at IS NULL"
        );
        assert_eq!(
            w.values,
            vec![Value::from("Aisha"), Value::Int(3000), Value::from("%PEND%")]
        );
        assert_eq!(w.next_index, 7);
    }

    #[test]
    fn null_operator_values_are_skipped() {
        let t = transactions();
        let f = Filters::from_json(
            &t,
            &json!({"total_price": {"operator": ">", "value": null}, "status": {"operator": "LIKE"}}),
        )
        .unwrap();
        assert!(f.is_empty());
        let w = build_where(&f, 1).unwrap();
        assert_eq!(w.text, "");
        assert!(w.values.is_empty());
        assert_eq!(w.next_index, 1);
    }

    #[test]
    fn scalar_in_becomes_single_element_array() {
        let t = transactions();
        let w = build_where(&Filters::new(&t).any("status", "paid"), 1).unwrap();
        assert_eq!(w.text, "status = ANY($1)");
        assert_eq!(w.values, vec![Value::Array(vec![Value::from("paid")])]);
    }

    #[test]
    fn unknown_columns_and_operators_are_rejected() {
        let t = transactions();
        let err = build_where(&Filters::new(&t).eq("password", "x"), 1).unwrap_err();
        assert!(matches!(err, CrudError::Validation(_)));

        let err = Filters::from_json(
            &t,
            &json!({"status": {"operator": "= 1 OR 1 =", "value": "x"}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported filter operator"));

        let err = build_where(&Filters::new(&t).eq("status; drop", "x"), 1).unwrap_err();
        assert!(matches!(err, CrudError::Validation(_)));
    }

    #[test]
    fn qualified_columns_are_accepted_and_requalified() {
        let t = transactions();
        let f = Filters::new(&t).is_null("tt.deleted_at").eq("tt.status", "paid");
        let alias = Ident::simple("x").unwrap();
        assert_eq!(
            f.to_sql(Some(&alias)).unwrap().to_sql(),
            "x.deleted_at IS NULL AND x.status = $1"
        );
        assert_eq!(
            build_where(&f, 1).unwrap().text,
            "deleted_at IS NULL AND status = $1"
        );
    }

    #[test]
    fn operator_parsing() {
        assert_eq!("in".parse::<Op>().unwrap(), Op::In);
        assert_eq!("!=".parse::<Op>().unwrap(), Op::Ne);
        assert_eq!(" >= ".parse::<Op>().unwrap(), Op::Gte);
        assert!("BETWEEN".parse::<Op>().is_err());
    }
}
