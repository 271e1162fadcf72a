//! # Term Link - Record Linkage SQL Pipelines for Rust
//!
//! Term Link compiles declarative comparison rules into portable SQL, chains
//! the resulting statements into a single pipeline, and executes each distinct
//! pipeline exactly once against a pluggable backend. Results are cached by
//! pipeline fingerprint, so repeated requests are served without recomputation.
//!
//! ## Overview
//!
//! Record linkage compares pairs of records attribute by attribute. Each
//! comparison classifies a pair into an ordinal rank (the "gamma" value):
//! higher ranks mean stronger evidence that the two records describe the same
//! entity, `0` means nothing matched and `-1` means a value was missing.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use term_link::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let engine = DataFusionEngine::new();
//! // ... register an input table named "people" on engine.context() ...
//!
//! let settings = ModelSettings::new()
//!     .with_blocking_rule("l.city = r.city")
//!     .with_comparison(ComparisonRuleList::new(
//!         "amount",
//!         vec![
//!             ComparisonLevel::null("amount"),
//!             ComparisonLevel::percentage_difference("amount", 0.0),
//!             ComparisonLevel::percentage_difference("amount", 0.1),
//!             ComparisonLevel::percentage_difference("amount", 0.25),
//!             ComparisonLevel::Else,
//!         ],
//!     )?);
//!
//! let linker = Linker::new(settings, Arc::new(engine))?;
//! let vectors = linker.compute_comparison_vectors("people").await?;
//! println!("{} pairs in {}", vectors.num_rows, vectors.physical_name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! ### Comparison Levels
//!
//! - **Null**: either value missing, always ranked `-1`
//! - **Exact**: values equal
//! - **Edit distance**: Levenshtein and Damerau-Levenshtein within `k`
//! - **Similarity**: Jaro-Winkler at least `t`
//! - **Numeric**: percentage and absolute difference thresholds
//! - **Reversed columns**: e.g. forename and surname swapped
//! - **Custom SQL**: any boolean expression over `_l`/`_r` columns
//!
//! Column operands can be wrapped in `lower`, `upper` and `trim`.
//!
//! ### Dialects
//!
//! Every level renders for the dialects in [`dialect::Dialect`]. Function
//! names live in one table per dialect; a level needing a function that a
//! dialect lacks fails when the rule list is compiled, before any query runs.
//!
//! ### Cached Execution
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use term_link::engine::{DataFusionEngine, PipelineExecutor};
//! use term_link::pipeline::PipelineBuilder;
//!
//! # async fn example() -> term_link::error::Result<()> {
//! let executor = PipelineExecutor::new(Arc::new(DataFusionEngine::new()));
//!
//! let mut builder = PipelineBuilder::new();
//! builder.enqueue("__link__df_numbers", "SELECT 1 AS n UNION ALL SELECT 2")?;
//! builder.enqueue("__link__df_total", "SELECT SUM(n) AS total FROM __link__df_numbers")?;
//! let pipeline = builder.finalize()?;
//!
//! let first = executor.execute(&pipeline, true).await?;
//! let second = executor.execute(&pipeline, true).await?; // served from cache
//! assert_eq!(first.physical_name, second.physical_name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`comparison`**: comparison levels, rule lists and their compiler
//! - **`dialect`**: dialect identifiers and per-dialect function tables
//! - **`pipeline`**: multi-statement pipelines and their fingerprints
//! - **`engine`**: backend trait, DataFusion backend, result cache, executor
//! - **`settings`**: model configuration and JSON persistence
//! - **`linker`**: the caller-facing session
//! - **`logging`**: log configuration and subscriber setup

pub mod comparison;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod linker;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod security;
pub mod settings;
