//! Pool configuration.

use crate::error::{CrudError, CrudResult};
use deadpool_postgres::RecyclingMethod;

const DEFAULT_MAX_SIZE: usize = 16;

/// Settings for the process-wide connection pool.
///
/// # Example
/// ```ignore
/// let config = PoolConfig::from_env()?.max_size(32);
/// let pool = pgcrud::create_pool(&config)?;
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub database_url: String,
    pub max_size: usize,
    pub recycling: RecyclingMethod,
}

impl PoolConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: DEFAULT_MAX_SIZE,
            recycling: RecyclingMethod::Fast,
        }
    }

    /// Read `DATABASE_URL` and optional `DATABASE_POOL_MAX_SIZE`, loading `.env` first if present.
    pub fn from_env() -> CrudResult<Self> {
        let _ = dotenvy::dotenv();
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| CrudError::Connection("DATABASE_URL is not set".to_owned()))?;

        let mut config = Self::new(database_url);
        if let Ok(raw) = std::env::var("DATABASE_POOL_MAX_SIZE") {
            let max_size = raw.trim().parse::<usize>().map_err(|e| {
                CrudError::validation(format!("DATABASE_POOL_MAX_SIZE '{raw}': {e}"))
            })?;
            config = config.max_size(max_size);
        }
        Ok(config)
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    pub fn recycling(mut self, recycling: RecyclingMethod) -> Self {
        self.recycling = recycling;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PoolConfig::new("postgres://localhost/umrah");
        assert_eq!(c.max_size, 16);
        assert!(matches!(c.recycling, RecyclingMethod::Fast));
        assert_eq!(c.max_size(0).max_size, 1);
    }
}
