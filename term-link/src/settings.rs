//! Model configuration.
//!
//! [`ModelSettings`] holds everything needed to build comparison vectors: how
//! records are paired, which column identifies a record, and the ordered
//! comparisons. It converts to and from a JSON dictionary, which is also the
//! persisted form.

use crate::comparison::{ComparisonRuleList, CompiledComparison};
use crate::dialect::Dialect;
use crate::error::{LinkError, Result};
use crate::security::SqlSecurity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Anything that can present itself as a settings dictionary.
pub trait AsDict {
    /// Returns the dictionary form.
    fn as_dict(&self) -> Result<Value>;
}

impl AsDict for Value {
    fn as_dict(&self) -> Result<Value> {
        Ok(self.clone())
    }
}

/// Which record pairs are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Pairs within one dataset
    #[default]
    DedupeOnly,
    /// Pairs across datasets only
    LinkOnly,
    /// Pairs within and across datasets
    LinkAndDedupe,
}

fn default_unique_id() -> String {
    "unique_id".to_string()
}

fn default_source_dataset() -> String {
    "source_dataset".to_string()
}

/// Linkage model configuration.
///
/// # Examples
///
/// ```rust
/// use term_link::comparison::{ComparisonLevel, ComparisonRuleList};
/// use term_link::settings::{AsDict, ModelSettings};
///
/// # fn example() -> term_link::error::Result<()> {
/// let settings = ModelSettings::new()
///     .with_blocking_rule("l.city = r.city")
///     .with_comparison(ComparisonRuleList::new(
///         "name",
///         vec![ComparisonLevel::exact("name"), ComparisonLevel::Else],
///     )?);
///
/// let dict = settings.as_dict()?;
/// assert_eq!(dict["unique_id_column_name"], "unique_id");
/// assert_eq!(ModelSettings::from_dict(dict)?, settings);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// How records are paired
    #[serde(default)]
    pub link_type: LinkType,
    /// Column identifying a record
    #[serde(default = "default_unique_id")]
    pub unique_id_column_name: String,
    /// Column naming the dataset a record came from, for linking
    #[serde(default = "default_source_dataset")]
    pub source_dataset_column_name: String,
    /// Predicates over `l` and `r`; a pair is generated if any holds
    #[serde(default)]
    pub blocking_rules: Vec<String>,
    /// Comparisons, in output column order
    #[serde(default)]
    pub comparisons: Vec<ComparisonRuleList>,
    /// Keep the `_l`/`_r` input columns next to the gamma columns
    #[serde(default)]
    pub retain_intermediate_calculation_columns: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            link_type: LinkType::default(),
            unique_id_column_name: default_unique_id(),
            source_dataset_column_name: default_source_dataset(),
            blocking_rules: Vec::new(),
            comparisons: Vec::new(),
            retain_intermediate_calculation_columns: false,
        }
    }
}

impl ModelSettings {
    /// Creates settings with defaults and no comparisons.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the link type.
    pub fn with_link_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    /// Sets the unique id column.
    pub fn with_unique_id_column_name(mut self, name: impl Into<String>) -> Self {
        self.unique_id_column_name = name.into();
        self
    }

    /// Adds a blocking rule.
    pub fn with_blocking_rule(mut self, rule: impl Into<String>) -> Self {
        self.blocking_rules.push(rule.into());
        self
    }

    /// Appends a comparison.
    pub fn with_comparison(mut self, comparison: ComparisonRuleList) -> Self {
        self.comparisons.push(comparison);
        self
    }

    /// Sets whether input columns are kept in the comparison vectors.
    pub fn with_retain_intermediate_calculation_columns(mut self, retain: bool) -> Self {
        self.retain_intermediate_calculation_columns = retain;
        self
    }

    /// Checks column names, blocking rules and comparison name uniqueness.
    ///
    /// Rule lists validate themselves when they are built.
    pub fn validate(&self) -> Result<()> {
        SqlSecurity::validate_identifier(&self.unique_id_column_name)?;
        SqlSecurity::validate_identifier(&self.source_dataset_column_name)?;

        for rule in &self.blocking_rules {
            SqlSecurity::validate_sql_expression(rule)?;
        }

        let mut seen = HashSet::new();
        for comparison in &self.comparisons {
            if !seen.insert(comparison.output_column_name()) {
                return Err(LinkError::invalid_argument(format!(
                    "comparison '{}' is defined more than once",
                    comparison.output_column_name()
                )));
            }
        }
        Ok(())
    }

    /// Rebuilds settings from a dictionary, re-validating every rule list.
    pub fn from_dict(dict: Value) -> Result<Self> {
        let settings: Self = serde_json::from_value(dict)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings previously written by [`save_to_json`](Self::save_to_json).
    pub fn load_from_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_dict(serde_json::from_str(&text)?)
    }

    /// Returns the dictionary form, writing it to `path` as pretty JSON if given.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidArgument`] if `path` exists and `overwrite`
    /// is false.
    pub fn save_to_json(&self, path: Option<&Path>, overwrite: bool) -> Result<Value> {
        let dict = self.as_dict()?;

        if let Some(path) = path {
            if path.is_file() && !overwrite {
                return Err(LinkError::invalid_argument(format!(
                    "the path {} already exists; provide a different path or set overwrite",
                    path.display()
                )));
            }
            fs::write(path, serde_json::to_string_pretty(&dict)?)?;
            info!(path = %path.display(), "Saved model settings");
        }

        Ok(dict)
    }
}

impl AsDict for ModelSettings {
    fn as_dict(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Compiles every comparison of a configuration for `dialect`.
///
/// Only the `comparisons` entry of the dictionary is read, so any
/// configuration object exposing [`AsDict`] is accepted.
pub fn compile_comparisons(config: &impl AsDict, dialect: Dialect) -> Result<Vec<CompiledComparison>> {
    let mut dict = config.as_dict()?;
    let comparisons = match dict.get_mut("comparisons") {
        Some(value) => value.take(),
        None => {
            return Err(LinkError::invalid_argument(
                "configuration has no 'comparisons' entry",
            ))
        }
    };

    let rule_lists: Vec<ComparisonRuleList> = serde_json::from_value(comparisons)?;
    rule_lists
        .iter()
        .map(|rule_list| rule_list.compile(dialect))
        .collect()
}
