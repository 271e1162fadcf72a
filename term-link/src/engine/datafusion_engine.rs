//! In-process backend built on DataFusion.

use super::{QueryEngine, TableShape};
use crate::dialect::Dialect;
use crate::error::{LinkError, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::execution::context::SessionConfig;
use datafusion::prelude::*;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// [`QueryEngine`] that materializes results as in-memory DataFusion tables.
///
/// Input data is registered on the engine's [`SessionContext`], either with
/// [`register_batch`](Self::register_batch) or directly through
/// [`context`](Self::context). Submitted queries are collected eagerly and
/// registered as a `MemTable` under their physical name.
///
/// # Example
///
/// ```rust,no_run
/// use term_link::engine::{DataFusionEngine, QueryEngine};
///
/// # async fn example() -> term_link::error::Result<()> {
/// let engine = DataFusionEngine::new();
/// let shape = engine.submit("SELECT 1 AS one", "__link__one").await?;
/// assert_eq!(shape.num_rows, 1);
/// let batches = engine.to_local_frame("__link__one").await?;
/// engine.drop_table("__link__one").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DataFusionEngine {
    ctx: SessionContext,
}

impl DataFusionEngine {
    /// Creates an engine with a fresh session.
    pub fn new() -> Self {
        let config = SessionConfig::new()
            .with_information_schema(true)
            .with_default_catalog_and_schema("term", "link");
        Self {
            ctx: SessionContext::new_with_config(config),
        }
    }

    /// Wraps an existing session, sharing its registered tables.
    pub fn with_context(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// The underlying session.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Registers a single batch as an input table.
    pub fn register_batch(&self, name: &str, batch: RecordBatch) -> Result<()> {
        self.ctx.register_batch(name, batch)?;
        Ok(())
    }
}

impl Default for DataFusionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataFusionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFusionEngine")
            .field("session_id", &self.ctx.session_id())
            .finish()
    }
}

#[async_trait]
impl QueryEngine for DataFusionEngine {
    fn dialect(&self) -> Dialect {
        Dialect::DataFusion
    }

    #[instrument(skip(self, sql))]
    async fn submit(&self, sql: &str, physical_name: &str) -> Result<TableShape> {
        let df = self.ctx.sql(sql).await?;
        let logical_schema: SchemaRef = df.schema().inner().clone();
        let batches = df.collect().await?;

        // Batch schemas can be stricter than the planned one (nullability), and
        // MemTable requires every batch to match the table schema.
        let schema = batches
            .first()
            .map(RecordBatch::schema)
            .unwrap_or(logical_schema);

        let shape = TableShape {
            num_rows: batches.iter().map(RecordBatch::num_rows).sum(),
            columns: schema.fields().iter().map(|f| f.name().clone()).collect(),
        };

        let table = MemTable::try_new(schema, vec![batches])?;
        self.ctx.register_table(physical_name, Arc::new(table))?;

        debug!(
            table = physical_name,
            rows = shape.num_rows,
            columns = shape.columns.len(),
            "Registered result table"
        );
        Ok(shape)
    }

    #[instrument(skip(self))]
    async fn drop_table(&self, physical_name: &str) -> Result<()> {
        match self.ctx.deregister_table(physical_name)? {
            Some(_) => Ok(()),
            None => Err(LinkError::invalid_argument(format!(
                "no table named '{physical_name}' is registered"
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn to_local_frame(&self, physical_name: &str) -> Result<Vec<RecordBatch>> {
        let batches = self.ctx.table(physical_name).await?.collect().await?;
        Ok(batches)
    }
}
