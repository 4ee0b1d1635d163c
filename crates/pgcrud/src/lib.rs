//! # pgcrud
//!
//! Declarative CRUD executors for PostgreSQL.
//!
//! ## Features
//!
//! - **Whitelisted writes**: payload fields are projected onto an allow-list before any SQL is built
//! - **Flat filters**: equality, comparisons, `IN` as `= ANY($n)`, `LIKE` as case-insensitive substring
//! - **Parameter-safe**: identifiers are validated against a [`Table`] descriptor, values are always bound
//! - **Relation sync**: one-to-many children inserted or replaced alongside their parent
//! - **Cascades**: hard and soft deletes down to two levels of children
//! - **camelCase out, snake_case in**: rows leave the crate with camelCase keys
//!
//! ```ignore
//! use pgcrud::{Filters, PageRequest, Select, Table, paginate};
//!
//! let trips = Table::new("trip_package", ["id", "title", "status", "deleted_at"])?;
//! let filters = Filters::new(&trips).eq("status", "published").is_null("deleted_at");
//! let page = paginate(&pool, &Select::from(&trips).filter(filters), PageRequest::new(1, 10)).await?;
//! ```

pub mod case;
pub mod client;
pub mod config;
pub mod delete;
pub mod error;
pub mod filter;
pub mod ident;
pub mod pagination;
pub mod pool;
pub mod read;
pub mod record;
pub mod response;
pub mod schema;
pub mod sql;
pub mod transaction;
pub mod value;
pub mod whitelist;
pub mod write;

#[cfg(test)]
mod testing;

pub use case::{camel_to_snake, camelize_json, snake_to_camel};
pub use client::GenericClient;
pub use config::PoolConfig;
pub use delete::{Cascade, delete_cascade, delete_one, soft_delete, soft_delete_cascade};
pub use error::{CrudError, CrudResult};
pub use filter::{Filters, Op, WhereClause, build_where};
pub use ident::Ident;
pub use pagination::{PageRequest, Pagination, PaginationResult};
pub use pool::create_pool;
pub use read::{Direction, Join, JoinKind, Select, find_one, paginate, select_all};
pub use record::{FromRow, Record, RowExt};
pub use response::ApiResponse;
pub use schema::Table;
pub use sql::{Sql, sql};
pub use value::Value;
pub use whitelist::{Whitelist, pick_allowed_fields};
pub use write::{Child, Insert, Update, bulk_insert, bulk_update, insert_one, update_one};

pub use deadpool_postgres;
pub use tokio_postgres;
