//! Execution of pipelines against a backend query engine.
//!
//! The backend is abstracted by [`QueryEngine`]: it runs one SQL query and
//! keeps the result as a named table until asked to drop it. On top of that,
//! [`PipelineExecutor`] fingerprints pipelines and keeps a [`ResultCache`] so
//! an identical pipeline is only ever executed once per session.
//!
//! ```text
//! Pipeline ──fingerprint──▶ ResultCache ──hit──▶ TableHandle
//!                               │
//!                              miss
//!                               ▼
//!                        QueryEngine::submit ──▶ TableHandle (cached)
//! ```

mod cache;
mod datafusion_engine;
mod executor;

pub use cache::{CacheStats, ResultCache};
pub use datafusion_engine::DataFusionEngine;
pub use executor::{ExecutorConfig, PipelineExecutor, TableHandle};

use crate::dialect::Dialect;
use crate::error::Result;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::fmt::Debug;

/// Row and column shape of a table materialized by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    /// Number of rows
    pub num_rows: usize,
    /// Column names in order
    pub columns: Vec<String>,
}

/// A backend able to materialize query results as named tables.
///
/// Implementations own the storage behind every table they create. A table
/// lives until [`drop_table`](QueryEngine::drop_table) is called for it.
///
/// # Examples
///
/// ```rust,ignore
/// use term_link::engine::{QueryEngine, TableShape};
///
/// #[async_trait]
/// impl QueryEngine for MyEngine {
///     fn dialect(&self) -> Dialect {
///         Dialect::DuckDb
///     }
///
///     async fn submit(&self, sql: &str, physical_name: &str) -> Result<TableShape> {
///         self.conn.execute(&format!("CREATE TABLE {physical_name} AS {sql}"))?;
///         self.shape_of(physical_name)
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait QueryEngine: Send + Sync + Debug {
    /// Dialect the engine expects generated SQL to be written in.
    fn dialect(&self) -> Dialect;

    /// Runs `sql` and stores its result under `physical_name`.
    async fn submit(&self, sql: &str, physical_name: &str) -> Result<TableShape>;

    /// Frees the storage of a previously submitted table.
    async fn drop_table(&self, physical_name: &str) -> Result<()>;

    /// Copies a stored table into local memory.
    async fn to_local_frame(&self, physical_name: &str) -> Result<Vec<RecordBatch>>;
}
