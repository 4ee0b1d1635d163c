//! In-crate test doubles.

use crate::client::GenericClient;
use crate::error::CrudResult;
use std::sync::Mutex;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Records every statement; queries return no rows, executes report `affected`.
#[derive(Default)]
pub(crate) struct RecordingClient {
    pub(crate) affected: u64,
    statements: Mutex<Vec<(String, usize)>>,
}

impl RecordingClient {
    pub(crate) fn affecting(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    /// `(sql, param_count)` in issue order.
    pub(crate) fn statements(&self) -> Vec<(String, usize)> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        self.statements.lock().unwrap().push((sql.to_owned(), params.len()));
    }
}

impl GenericClient for RecordingClient {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CrudResult<Vec<Row>> {
        self.record(sql, params);
        Ok(vec![])
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> CrudResult<u64> {
        self.record(sql, params);
        Ok(self.affected)
    }
}
