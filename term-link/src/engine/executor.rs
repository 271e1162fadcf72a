//! Cached pipeline execution.

use super::{CacheStats, QueryEngine, ResultCache};
use crate::dialect::Dialect;
use crate::error::{LinkError, Result};
use crate::logging::LogConfig;
use crate::pipeline::{Fingerprint, Pipeline};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Distinguishes executors sharing one engine.
static NEXT_EXECUTOR_ID: AtomicU64 = AtomicU64::new(0);

/// Reference to a pipeline result stored by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHandle {
    /// Output name of the pipeline that produced the table
    pub templated_name: String,
    /// Name the backend stores the table under
    pub physical_name: String,
    /// Dialect of the engine holding the table
    pub dialect: Dialect,
    /// Number of rows
    pub num_rows: usize,
    /// Column names in order
    pub columns: Vec<String>,
    /// Fingerprint of the pipeline that produced the table
    pub fingerprint: Fingerprint,
    /// When the table was materialized
    pub created_at: DateTime<Utc>,
}

/// Configuration for a [`PipelineExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Prefix of every physical table name
    pub table_prefix: String,
    /// Logging behaviour
    pub log: LogConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            table_prefix: "__link__".to_string(),
            log: LogConfig::default(),
        }
    }
}

impl ExecutorConfig {
    /// Sets the physical table prefix.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// Runs pipelines on a [`QueryEngine`], executing each distinct pipeline once.
///
/// The cache lock is held from lookup until the new handle is inserted, so
/// concurrent callers submitting the same pipeline wait for the first
/// execution and then share its result.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use term_link::engine::{DataFusionEngine, PipelineExecutor};
/// use term_link::pipeline::PipelineBuilder;
///
/// # async fn example() -> term_link::error::Result<()> {
/// let executor = PipelineExecutor::new(Arc::new(DataFusionEngine::new()));
///
/// let mut builder = PipelineBuilder::new();
/// builder.enqueue("__link__df_one", "SELECT 1 AS one")?;
/// let pipeline = builder.finalize()?;
///
/// let first = executor.execute(&pipeline, true).await?;
/// let second = executor.execute(&pipeline, true).await?;
/// assert_eq!(first.physical_name, second.physical_name);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PipelineExecutor {
    engine: Arc<dyn QueryEngine>,
    cache: Mutex<ResultCache>,
    id: u64,
    sequence: AtomicU64,
    config: ExecutorConfig,
}

impl PipelineExecutor {
    /// Creates an executor with the default configuration.
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self::with_config(engine, ExecutorConfig::default())
    }

    /// Creates an executor with a custom configuration.
    pub fn with_config(engine: Arc<dyn QueryEngine>, config: ExecutorConfig) -> Self {
        Self {
            engine,
            cache: Mutex::new(ResultCache::new()),
            id: NEXT_EXECUTOR_ID.fetch_add(1, Ordering::Relaxed),
            sequence: AtomicU64::new(0),
            config,
        }
    }

    /// The backend engine.
    pub fn engine(&self) -> &Arc<dyn QueryEngine> {
        &self.engine
    }

    /// Dialect of the backend engine.
    pub fn dialect(&self) -> Dialect {
        self.engine.dialect()
    }

    /// The executor's configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes a pipeline, or returns the cached result of an identical one.
    ///
    /// With `use_cache` false the cache is not consulted, but the new result
    /// is still registered so later cached calls can reuse it.
    ///
    /// # Errors
    ///
    /// Backend failures are returned as [`LinkError::PipelineExecution`]
    /// naming the pipeline output; the cache is left as it was.
    #[instrument(skip(self, pipeline), fields(output = %pipeline.output_name()))]
    pub async fn execute(&self, pipeline: &Pipeline, use_cache: bool) -> Result<TableHandle> {
        let dialect = self.engine.dialect();
        let fingerprint = pipeline.fingerprint(dialect);
        let output_name = pipeline.output_name();

        let mut cache = self.cache.lock().await;

        if use_cache {
            if let Some(handle) = cache.get(&fingerprint) {
                crate::log_cache_event!(
                    self.config.log,
                    fingerprint = %fingerprint.short(),
                    table = %handle.physical_name,
                    "Pipeline result served from cache"
                );
                return Ok(handle);
            }
        }

        let physical_name = self.physical_name(output_name, &fingerprint);
        let sql = pipeline.generate_sql();
        crate::log_sql!(
            self.config.log,
            &sql,
            output = %output_name,
            table = %physical_name,
            "Submitting pipeline"
        );

        let shape = self
            .engine
            .submit(&sql, &physical_name)
            .await
            .map_err(|e| {
                warn!(output = %output_name, error = %e, "Pipeline execution failed");
                LinkError::pipeline_execution_with_source(output_name, Box::new(e))
            })?;

        let handle = TableHandle {
            templated_name: output_name.to_string(),
            physical_name,
            dialect,
            num_rows: shape.num_rows,
            columns: shape.columns,
            fingerprint,
            created_at: Utc::now(),
        };

        if let Some(evicted) = cache.insert(handle.clone()) {
            crate::log_cache_event!(
                self.config.log,
                table = %evicted.physical_name,
                "Replaced cached result for identical pipeline"
            );
        }

        info!(
            output = %output_name,
            table = %handle.physical_name,
            rows = handle.num_rows,
            statements = pipeline.statements().len(),
            "Pipeline executed"
        );
        Ok(handle)
    }

    /// Copies a result table into local memory.
    #[instrument(skip(self, handle), fields(table = %handle.physical_name))]
    pub async fn to_local_frame(&self, handle: &TableHandle) -> Result<Vec<RecordBatch>> {
        self.engine.to_local_frame(&handle.physical_name).await
    }

    /// Drops a result table from the backend and forgets it in the cache.
    #[instrument(skip(self, handle), fields(table = %handle.physical_name))]
    pub async fn drop_table_and_remove_from_cache(&self, handle: &TableHandle) -> Result<()> {
        let removed = self
            .cache
            .lock()
            .await
            .remove_physical(&handle.physical_name);
        if removed.is_some() {
            crate::log_cache_event!(
                self.config.log,
                table = %handle.physical_name,
                "Removed result from cache"
            );
        }
        self.engine.drop_table(&handle.physical_name).await
    }

    /// Forgets every cached result.
    ///
    /// Backend tables are not dropped; they remain owned by the handles
    /// already returned to callers. Returns the number of entries removed.
    pub async fn invalidate_cache(&self) -> usize {
        let cleared = self.cache.lock().await.clear();
        debug!(entries = cleared.len(), "Invalidated result cache");
        cleared.len()
    }

    /// Gets cache statistics.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    /// Names are unique per process: executors sharing an engine never
    /// reuse each other's tables.
    fn physical_name(&self, output_name: &str, fingerprint: &Fingerprint) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let prefix = if output_name.starts_with(&self.config.table_prefix) {
            ""
        } else {
            self.config.table_prefix.as_str()
        };
        format!(
            "{prefix}{output_name}_{}_{}_{sequence}",
            fingerprint.short(),
            self.id
        )
    }
}
