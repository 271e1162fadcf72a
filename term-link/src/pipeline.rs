//! Multi-statement SQL pipelines.
//!
//! A [`PipelineBuilder`] collects named statements in order. Later statements
//! may select from the output of earlier ones by name. The finished
//! [`Pipeline`] renders as a single `WITH` query, so one submission to the
//! backend runs the whole chain.
//!
//! ```rust
//! use term_link::pipeline::PipelineBuilder;
//! use term_link::dialect::Dialect;
//!
//! # fn example() -> term_link::error::Result<()> {
//! let mut builder = PipelineBuilder::new();
//! builder.enqueue("__link__df_blocked", "SELECT * FROM input WHERE city_l = city_r")?;
//! builder.enqueue("__link__df_named", "SELECT * FROM __link__df_blocked WHERE name_l IS NOT NULL")?;
//! let pipeline = builder.finalize()?;
//!
//! assert_eq!(pipeline.output_name(), "__link__df_named");
//! assert!(pipeline.generate_sql().starts_with("WITH __link__df_blocked AS ("));
//! let fingerprint = pipeline.fingerprint(Dialect::DataFusion);
//! assert_eq!(fingerprint, builder.finalize()?.fingerprint(Dialect::DataFusion));
//! # Ok(())
//! # }
//! ```

use crate::dialect::Dialect;
use crate::error::{LinkError, Result};
use crate::security::SqlSecurity;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Identifier-shaped words in SQL text.
static WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\b[a-zA-Z_][a-zA-Z0-9_]*").expect("Hard-coded regex pattern should be valid")
});

/// One named statement of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatement {
    output_name: String,
    sql: String,
    dependencies: BTreeSet<String>,
}

impl PipelineStatement {
    /// Name later statements use to refer to this statement's output.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// The statement's SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Output names of earlier statements referenced by this one.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }
}

/// Accumulates statements for a [`Pipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    statements: Vec<PipelineStatement>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement.
    ///
    /// The SQL is not parsed. Earlier outputs mentioned in it as whole words
    /// are recorded as dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidArgument`] if `output_name` is not a valid
    /// identifier or is already used in this pipeline.
    pub fn enqueue(&mut self, output_name: impl Into<String>, sql: impl Into<String>) -> Result<()> {
        let output_name = output_name.into();
        let sql = sql.into();

        SqlSecurity::validate_identifier(&output_name)
            .map_err(|e| LinkError::invalid_argument(format!("pipeline output name: {e}")))?;

        if self
            .statements
            .iter()
            .any(|statement| statement.output_name == output_name)
        {
            return Err(LinkError::invalid_argument(format!(
                "output name '{output_name}' is already used in this pipeline"
            )));
        }

        let words: BTreeSet<&str> = WORD_REGEX.find_iter(&sql).map(|m| m.as_str()).collect();
        let dependencies = self
            .statements
            .iter()
            .filter(|statement| words.contains(statement.output_name.as_str()))
            .map(|statement| statement.output_name.clone())
            .collect();

        self.statements.push(PipelineStatement {
            output_name,
            sql,
            dependencies,
        });
        Ok(())
    }

    /// Number of statements enqueued so far.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns true if nothing has been enqueued.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Produces an immutable pipeline from the statements enqueued so far.
    ///
    /// Calling this repeatedly yields equal pipelines and leaves the builder
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidArgument`] if no statement was enqueued.
    pub fn finalize(&self) -> Result<Pipeline> {
        if self.statements.is_empty() {
            return Err(LinkError::invalid_argument(
                "cannot finalize a pipeline with no statements",
            ));
        }
        Ok(Pipeline {
            statements: self.statements.clone().into(),
        })
    }
}

/// An immutable, ordered chain of statements ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    statements: Arc<[PipelineStatement]>,
}

impl Pipeline {
    /// Statements in execution order.
    pub fn statements(&self) -> &[PipelineStatement] {
        &self.statements
    }

    /// Output name of the final statement, which names the pipeline result.
    pub fn output_name(&self) -> &str {
        // finalize() guarantees at least one statement
        self.statements
            .last()
            .map(PipelineStatement::output_name)
            .unwrap_or_default()
    }

    /// Renders the pipeline as one query.
    ///
    /// Every statement but the last becomes a common table expression; the
    /// last statement is the body.
    pub fn generate_sql(&self) -> String {
        let Some((last, earlier)) = self.statements.split_last() else {
            return String::new();
        };

        if earlier.is_empty() {
            return last.sql.clone();
        }

        let ctes: Vec<String> = earlier
            .iter()
            .map(|statement| format!("{} AS (\n{}\n)", statement.output_name, statement.sql))
            .collect();

        format!("WITH {}\n{}", ctes.join(",\n"), last.sql)
    }

    /// Deterministic cache key for this pipeline on `dialect`.
    pub fn fingerprint(&self, dialect: Dialect) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(dialect.name().as_bytes());
        hasher.update([0x1du8]);
        for statement in self.statements.iter() {
            hasher.update(statement.output_name.as_bytes());
            hasher.update([0x1fu8]);
            hasher.update(statement.sql.as_bytes());
            hasher.update([0x1eu8]);
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

/// Hex-encoded SHA-256 of a pipeline's dialect and statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Full hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex characters, used in physical table names.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
