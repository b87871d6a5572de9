//! SQLite backend for the tuition centre directory.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Faceted filters are compiled into a
//! single `EXISTS` sub-query over the offerings table (see [`query`]).

mod encode;
mod schema;
mod store;

pub mod error;
pub mod query;

pub use error::{Error, Result};
pub use store::SqliteStore;
