//! Ordered comparison levels compiled into a single ranked `CASE` expression.

use super::ComparisonLevel;
use crate::dialect::Dialect;
use crate::error::{LinkError, Result};
use crate::security::SqlSecurity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Rank produced when a null-check level matches.
pub const NULL_RANK: i32 = -1;

/// Rank produced by the catch-all level.
pub const ELSE_RANK: i32 = 0;

/// An ordered list of comparison levels ending in a catch-all.
///
/// The first level whose predicate holds decides the rank ("gamma") of a
/// record pair. Null-check levels come first and yield [`NULL_RANK`]; the
/// catch-all yields [`ELSE_RANK`]; every other level is ranked by its
/// distance from the end, so earlier (stricter) levels score higher.
///
/// The shape is checked when the list is built, so a list that exists is
/// always compilable apart from dialect support.
///
/// # Examples
///
/// ```rust
/// use term_link::comparison::{ComparisonLevel, ComparisonRuleList};
/// use term_link::dialect::Dialect;
///
/// # fn example() -> term_link::error::Result<()> {
/// let name = ComparisonRuleList::new(
///     "name",
///     vec![
///         ComparisonLevel::null("name"),
///         ComparisonLevel::exact("name"),
///         ComparisonLevel::levenshtein("name", 2),
///         ComparisonLevel::Else,
///     ],
/// )?;
///
/// assert_eq!(name.ranks(), vec![-1, 2, 1, 0]);
/// let compiled = name.compile(Dialect::DataFusion)?;
/// assert!(compiled.case_expression.starts_with("CASE WHEN"));
/// assert_eq!(compiled.labels[&2], "Exact match on name");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleListRepr", into = "RuleListRepr")]
pub struct ComparisonRuleList {
    output_column_name: String,
    description: Option<String>,
    levels: Vec<ComparisonLevel>,
}

/// A rule list rendered for one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledComparison {
    /// Name of the comparison
    pub output_column_name: String,
    /// Name of the rank column, `gamma_<name>`
    pub gamma_column_name: String,
    /// Dialect the expression was rendered for
    pub dialect: Dialect,
    /// `CASE WHEN ... THEN rank ... ELSE 0 END`
    pub case_expression: String,
    /// Label for every rank the expression can produce
    pub labels: BTreeMap<i32, String>,
}

impl CompiledComparison {
    /// The case expression aliased to the gamma column, ready for a `SELECT`.
    pub fn select_expression(&self) -> String {
        format!(
            "{} AS {}",
            self.case_expression,
            self.dialect.quote_identifier(&self.gamma_column_name)
        )
    }
}

impl ComparisonRuleList {
    /// Builds a rule list, checking its shape.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidRuleList`] when the list is empty, lacks a
    /// terminal catch-all, has more than one catch-all, places a null-check
    /// after another kind of level, or holds an invalid level.
    pub fn new(output_column_name: impl Into<String>, levels: Vec<ComparisonLevel>) -> Result<Self> {
        let output_column_name = output_column_name.into();
        Self::check_shape(&output_column_name, &levels)?;
        Ok(Self {
            output_column_name,
            description: None,
            levels,
        })
    }

    /// Sets a free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name of the comparison.
    pub fn output_column_name(&self) -> &str {
        &self.output_column_name
    }

    /// Name of the rank column produced by the compiled expression.
    pub fn gamma_column_name(&self) -> String {
        format!("gamma_{}", self.output_column_name)
    }

    /// Optional description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Levels in evaluation order.
    pub fn levels(&self) -> &[ComparisonLevel] {
        &self.levels
    }

    /// Rank of every level, in declaration order.
    pub fn ranks(&self) -> Vec<i32> {
        let mut remaining = self
            .levels
            .iter()
            .filter(|level| !level.is_null_level() && !level.is_else_level())
            .count() as i32;

        self.levels
            .iter()
            .map(|level| {
                if level.is_null_level() {
                    NULL_RANK
                } else if level.is_else_level() {
                    ELSE_RANK
                } else {
                    let rank = remaining;
                    remaining -= 1;
                    rank
                }
            })
            .collect()
    }

    /// Compiles the levels into a cascading `CASE` expression.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::UnsupportedDialect`] if any level cannot be
    /// rendered for `dialect`.
    pub fn compile(&self, dialect: Dialect) -> Result<CompiledComparison> {
        let mut case_expression = String::from("CASE");
        let mut labels = BTreeMap::new();

        for (level, rank) in self.levels.iter().zip(self.ranks()) {
            if level.is_else_level() {
                case_expression.push_str(&format!(" ELSE {rank}"));
            } else {
                let predicate = level.render(dialect)?;
                case_expression.push_str(&format!(" WHEN {predicate} THEN {rank}"));
            }
            labels.entry(rank).or_insert_with(|| level.label());
        }
        case_expression.push_str(" END");

        debug!(
            comparison = %self.output_column_name,
            dialect = %dialect,
            levels = self.levels.len(),
            "Compiled comparison"
        );

        Ok(CompiledComparison {
            output_column_name: self.output_column_name.clone(),
            gamma_column_name: self.gamma_column_name(),
            dialect,
            case_expression,
            labels,
        })
    }

    fn check_shape(name: &str, levels: &[ComparisonLevel]) -> Result<()> {
        let invalid = |message: String| LinkError::invalid_rule_list(name, message);

        SqlSecurity::validate_identifier(name).map_err(|e| invalid(e.to_string()))?;

        let Some(last) = levels.last() else {
            return Err(invalid("rule list has no levels".to_string()));
        };

        if !last.is_else_level() {
            return Err(invalid(
                "the last level must be the catch-all (else) level".to_string(),
            ));
        }

        if let Some(position) = levels[..levels.len() - 1]
            .iter()
            .position(ComparisonLevel::is_else_level)
        {
            return Err(invalid(format!(
                "catch-all level found at position {position}; it must appear exactly once, last"
            )));
        }

        let mut seen_other = false;
        for level in levels {
            if level.is_null_level() {
                if seen_other {
                    return Err(invalid(format!(
                        "null-check level '{}' must precede all other levels",
                        level.label()
                    )));
                }
            } else {
                seen_other = true;
            }

            level
                .validate()
                .map_err(|e| invalid(format!("level '{}': {e}", level.label())))?;
        }

        if !levels
            .iter()
            .any(|level| !level.is_null_level() && !level.is_else_level())
        {
            return Err(invalid(
                "rule list needs a comparing level besides null checks and the catch-all"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Serialized form, matching the keys of a linkage settings document.
#[derive(Serialize, Deserialize)]
struct RuleListRepr {
    output_column_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comparison_description: Option<String>,
    comparison_levels: Vec<ComparisonLevel>,
}

impl TryFrom<RuleListRepr> for ComparisonRuleList {
    type Error = LinkError;

    fn try_from(repr: RuleListRepr) -> Result<Self> {
        let list = Self::new(repr.output_column_name, repr.comparison_levels)?;
        Ok(match repr.comparison_description {
            Some(description) => list.with_description(description),
            None => list,
        })
    }
}

impl From<ComparisonRuleList> for RuleListRepr {
    fn from(list: ComparisonRuleList) -> Self {
        Self {
            output_column_name: list.output_column_name,
            comparison_description: list.description,
            comparison_levels: list.levels,
        }
    }
}
