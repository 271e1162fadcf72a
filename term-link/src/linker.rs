//! Caller-facing linkage session.

use crate::comparison::CompiledComparison;
use crate::engine::{PipelineExecutor, QueryEngine, TableHandle};
use crate::error::{ErrorContext, LinkError, Result};
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::security::SqlSecurity;
use crate::settings::{compile_comparisons, LinkType, ModelSettings};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

/// How [`Linker::run_sql`] returns its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Keep the result in the backend and return its handle
    Handle,
    /// Copy the result into local memory and drop the backend table
    LocalFrame,
}

impl OutputMode {
    /// Every accepted mode name.
    pub const NAMES: [&'static str; 2] = ["handle", "local_frame"];

    /// Name accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            OutputMode::Handle => "handle",
            OutputMode::LocalFrame => "local_frame",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputMode {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "handle" => Ok(OutputMode::Handle),
            "local_frame" => Ok(OutputMode::LocalFrame),
            other => Err(LinkError::invalid_argument(format!(
                "output mode '{other}' is not supported; expected one of: {}",
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Result of [`Linker::run_sql`].
#[derive(Debug, Clone)]
pub enum QueryOutput {
    /// Result kept in the backend
    Handle(TableHandle),
    /// Result copied into memory
    LocalFrame(Vec<RecordBatch>),
}

impl QueryOutput {
    /// The handle, if the result was kept in the backend.
    pub fn into_handle(self) -> Option<TableHandle> {
        match self {
            QueryOutput::Handle(handle) => Some(handle),
            QueryOutput::LocalFrame(_) => None,
        }
    }

    /// The batches, if the result was copied into memory.
    pub fn into_batches(self) -> Option<Vec<RecordBatch>> {
        match self {
            QueryOutput::Handle(_) => None,
            QueryOutput::LocalFrame(batches) => Some(batches),
        }
    }
}

/// A linkage session: model settings plus a caching executor.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use term_link::prelude::*;
///
/// # async fn example(engine: DataFusionEngine) -> Result<()> {
/// let settings = ModelSettings::new()
///     .with_blocking_rule("l.city = r.city")
///     .with_comparison(ComparisonRuleList::new(
///         "name",
///         vec![
///             ComparisonLevel::null("name"),
///             ComparisonLevel::exact("name"),
///             ComparisonLevel::levenshtein("name", 2),
///             ComparisonLevel::Else,
///         ],
///     )?);
///
/// let linker = Linker::new(settings, Arc::new(engine))?;
/// let vectors = linker.compute_comparison_vectors("people").await?;
/// let preview = linker
///     .run_sql(&format!("SELECT * FROM {} LIMIT 10", vectors.physical_name), "local_frame")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Linker {
    settings: ModelSettings,
    executor: Arc<PipelineExecutor>,
}

impl Linker {
    /// Creates a session over `engine` with a default executor.
    ///
    /// Every comparison is compiled for the engine's dialect up front, so an
    /// unsupported level fails here rather than at execution.
    pub fn new(settings: ModelSettings, engine: Arc<dyn QueryEngine>) -> Result<Self> {
        Self::with_executor(settings, Arc::new(PipelineExecutor::new(engine)))
    }

    /// Creates a session sharing an existing executor and its cache.
    pub fn with_executor(settings: ModelSettings, executor: Arc<PipelineExecutor>) -> Result<Self> {
        settings.validate()?;
        compile_comparisons(&settings, executor.dialect())?;
        Ok(Self { settings, executor })
    }

    /// Current settings.
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// The executor running this session's pipelines.
    pub fn executor(&self) -> &Arc<PipelineExecutor> {
        &self.executor
    }

    /// Replaces the settings and invalidates cached results.
    pub async fn update_settings(&mut self, settings: ModelSettings) -> Result<()> {
        settings.validate()?;
        compile_comparisons(&settings, self.executor.dialect())?;
        self.settings = settings;
        let cleared = self.executor.invalidate_cache().await;
        info!(cleared, "Settings updated");
        Ok(())
    }

    /// Writes the settings to `path` (if given) and returns their dictionary form.
    pub fn save_model_to_json(&self, path: Option<&Path>, overwrite: bool) -> Result<Value> {
        self.settings.save_to_json(path, overwrite)
    }

    /// Builds the pipeline computing one gamma column per comparison.
    ///
    /// The first statement pairs the records of `input_table` according to
    /// the link type and blocking rules; the second evaluates the compiled
    /// comparisons over those pairs.
    pub fn comparison_vectors_pipeline(&self, input_table: &str) -> Result<Pipeline> {
        SqlSecurity::validate_identifier(input_table)?;

        if self.settings.comparisons.is_empty() {
            return Err(LinkError::invalid_argument(
                "settings define no comparisons",
            ));
        }

        let dialect = self.executor.dialect();
        let compiled = compile_comparisons(&self.settings, dialect)?;
        let q = |name: &str| dialect.quote_identifier(name);
        let prefix = &self.executor.config().table_prefix;
        let blocked_name = format!("{prefix}df_blocked");
        let vectors_name = format!("{prefix}df_comparison_vectors");

        let uid = &self.settings.unique_id_column_name;
        let source = &self.settings.source_dataset_column_name;
        let links_datasets = self.settings.link_type != LinkType::DedupeOnly;

        let mut paired = vec![uid.as_str()];
        if links_datasets {
            paired.push(source.as_str());
        }
        let compared = self.compared_columns();
        paired.extend(compared.iter().map(String::as_str).filter(|c| *c != uid && *c != source));

        let blocked_columns: Vec<String> = paired
            .iter()
            .flat_map(|column| {
                [
                    format!("l.{} AS {}", q(column), q(&format!("{column}_l"))),
                    format!("r.{} AS {}", q(column), q(&format!("{column}_r"))),
                ]
            })
            .collect();

        let mut conditions = vec![self.pair_filter()];
        if !self.settings.blocking_rules.is_empty() {
            let rules: Vec<String> = self
                .settings
                .blocking_rules
                .iter()
                .map(|rule| format!("({rule})"))
                .collect();
            conditions.push(format!("({})", rules.join(" OR ")));
        }

        let blocked_sql = format!(
            "SELECT {}\nFROM {input_table} AS l CROSS JOIN {input_table} AS r\nWHERE {}",
            blocked_columns.join(", "),
            conditions.join(" AND ")
        );

        let mut vector_columns = vec![q(&format!("{uid}_l")), q(&format!("{uid}_r"))];
        vector_columns.extend(compiled.iter().map(CompiledComparison::select_expression));
        if self.settings.retain_intermediate_calculation_columns {
            vector_columns.extend(paired.iter().skip(1).flat_map(|column| {
                [q(&format!("{column}_l")), q(&format!("{column}_r"))]
            }));
        }

        let vectors_sql = format!(
            "SELECT {}\nFROM {blocked_name}",
            vector_columns.join(", ")
        );

        let mut builder = PipelineBuilder::new();
        builder.enqueue(blocked_name, blocked_sql)?;
        builder.enqueue(vectors_name, vectors_sql)?;
        builder.finalize()
    }

    /// Executes the comparison vector pipeline, reusing a cached result.
    #[instrument(skip(self))]
    pub async fn compute_comparison_vectors(&self, input_table: &str) -> Result<TableHandle> {
        let pipeline = self.comparison_vectors_pipeline(input_table)?;
        self.executor
            .execute(&pipeline, true)
            .await
            .with_context(|| format!("computing comparison vectors for '{input_table}'"))
    }

    /// Runs a query, returning it in the named output mode.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidArgument`] for an unknown `output_mode`,
    /// before anything is executed.
    pub async fn run_sql(&self, sql: &str, output_mode: &str) -> Result<QueryOutput> {
        let mode = output_mode.parse::<OutputMode>()?;
        self.run_sql_with_mode(sql, mode).await
    }

    /// Runs a query without consulting the cache.
    ///
    /// In [`OutputMode::LocalFrame`] the backend table is dropped after it is
    /// read, whether or not reading succeeded.
    #[instrument(skip(self, sql))]
    pub async fn run_sql_with_mode(&self, sql: &str, mode: OutputMode) -> Result<QueryOutput> {
        let mut builder = PipelineBuilder::new();
        builder.enqueue(
            format!("{}df_sql_query", self.executor.config().table_prefix),
            sql,
        )?;
        let handle = self.executor.execute(&builder.finalize()?, false).await?;

        match mode {
            OutputMode::Handle => Ok(QueryOutput::Handle(handle)),
            OutputMode::LocalFrame => {
                let frame = self.executor.to_local_frame(&handle).await;
                self.executor.drop_table_and_remove_from_cache(&handle).await?;
                Ok(QueryOutput::LocalFrame(frame?))
            }
        }
    }

    fn compared_columns(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.settings
            .comparisons
            .iter()
            .flat_map(|comparison| comparison.levels())
            .flat_map(|level| level.columns())
            .map(|column| column.name().to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    fn pair_filter(&self) -> String {
        let dialect = self.executor.dialect();
        let uid = dialect.quote_identifier(&self.settings.unique_id_column_name);
        let source = dialect.quote_identifier(&self.settings.source_dataset_column_name);
        match self.settings.link_type {
            LinkType::DedupeOnly => format!("l.{uid} < r.{uid}"),
            LinkType::LinkOnly => format!("l.{source} < r.{source}"),
            LinkType::LinkAndDedupe => format!(
                "(l.{source} < r.{source} OR (l.{source} = r.{source} AND l.{uid} < r.{uid}))"
            ),
        }
    }
}
