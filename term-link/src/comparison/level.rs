//! A single comparison predicate over a record pair.

use super::ColumnExpression;
use crate::dialect::Dialect;
use crate::error::{LinkError, Result};
use crate::security::{InputValidator, SqlSecurity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One rung of a comparison: a boolean predicate plus a label.
///
/// Levels are immutable once built and render to the same SQL every time
/// for a given dialect. A level that needs a function the dialect lacks
/// fails with [`LinkError::UnsupportedDialect`].
///
/// # Examples
///
/// ```rust
/// use term_link::comparison::ComparisonLevel;
/// use term_link::dialect::Dialect;
///
/// let level = ComparisonLevel::levenshtein("name", 2);
/// assert_eq!(
///     level.render(Dialect::DuckDb).unwrap(),
///     "levenshtein(\"name_l\", \"name_r\") <= 2"
/// );
/// assert_eq!(level.label(), "Levenshtein distance of name <= 2");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonLevel {
    /// Either side is null
    Null { column: ColumnExpression },
    /// Both sides are equal
    Exact { column: ColumnExpression },
    /// Edit distance at most `distance`
    Levenshtein {
        column: ColumnExpression,
        distance: u32,
    },
    /// Edit distance with transpositions at most `distance`
    DamerauLevenshtein {
        column: ColumnExpression,
        distance: u32,
    },
    /// Jaro-Winkler similarity at least `threshold`
    JaroWinkler {
        column: ColumnExpression,
        threshold: f64,
    },
    /// `|a - b| / max(|a|, |b|) <= threshold`, false on a zero denominator
    PercentageDifference {
        column: ColumnExpression,
        threshold: f64,
    },
    /// `|a - b| <= threshold`
    AbsoluteDifference {
        column: ColumnExpression,
        threshold: f64,
    },
    /// `first` on the left equals `second` on the right; when `symmetrical`,
    /// `second` on the left must also equal `first` on the right
    ColumnsReversed {
        first: ColumnExpression,
        second: ColumnExpression,
        #[serde(default)]
        symmetrical: bool,
    },
    /// A caller-supplied predicate used verbatim over `columns`
    Custom {
        sql: String,
        label: String,
        #[serde(default)]
        columns: Vec<ColumnExpression>,
    },
    /// Catch-all; must be the last level of a rule list
    Else,
}

impl ComparisonLevel {
    /// Either side of `column` is null.
    pub fn null(column: impl Into<ColumnExpression>) -> Self {
        Self::Null {
            column: column.into(),
        }
    }

    /// Exact match on `column`.
    pub fn exact(column: impl Into<ColumnExpression>) -> Self {
        Self::Exact {
            column: column.into(),
        }
    }

    /// Levenshtein distance of `column` at most `distance`.
    pub fn levenshtein(column: impl Into<ColumnExpression>, distance: u32) -> Self {
        Self::Levenshtein {
            column: column.into(),
            distance,
        }
    }

    /// Damerau-Levenshtein distance of `column` at most `distance`.
    pub fn damerau_levenshtein(column: impl Into<ColumnExpression>, distance: u32) -> Self {
        Self::DamerauLevenshtein {
            column: column.into(),
            distance,
        }
    }

    /// Jaro-Winkler similarity of `column` at least `threshold`.
    pub fn jaro_winkler(column: impl Into<ColumnExpression>, threshold: f64) -> Self {
        Self::JaroWinkler {
            column: column.into(),
            threshold,
        }
    }

    /// Percentage difference of `column` within `threshold` (a fraction).
    pub fn percentage_difference(column: impl Into<ColumnExpression>, threshold: f64) -> Self {
        Self::PercentageDifference {
            column: column.into(),
            threshold,
        }
    }

    /// Absolute difference of `column` at most `threshold`.
    pub fn absolute_difference(column: impl Into<ColumnExpression>, threshold: f64) -> Self {
        Self::AbsoluteDifference {
            column: column.into(),
            threshold,
        }
    }

    /// Values of `first` and `second` swapped between the two records.
    pub fn columns_reversed(
        first: impl Into<ColumnExpression>,
        second: impl Into<ColumnExpression>,
        symmetrical: bool,
    ) -> Self {
        Self::ColumnsReversed {
            first: first.into(),
            second: second.into(),
            symmetrical,
        }
    }

    /// A verbatim predicate with its own label.
    ///
    /// `columns` names the inputs the predicate reads as `<column>_l` and
    /// `<column>_r`, so they are carried into the compared pairs.
    pub fn custom<C: Into<ColumnExpression>>(
        columns: impl IntoIterator<Item = C>,
        sql: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self::Custom {
            sql: sql.into(),
            label: label.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true for the null-check kind.
    pub fn is_null_level(&self) -> bool {
        matches!(self, ComparisonLevel::Null { .. })
    }

    /// Returns true for the catch-all kind.
    pub fn is_else_level(&self) -> bool {
        matches!(self, ComparisonLevel::Else)
    }

    /// Short name of the level kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ComparisonLevel::Null { .. } => "null",
            ComparisonLevel::Exact { .. } => "exact",
            ComparisonLevel::Levenshtein { .. } => "levenshtein",
            ComparisonLevel::DamerauLevenshtein { .. } => "damerau_levenshtein",
            ComparisonLevel::JaroWinkler { .. } => "jaro_winkler",
            ComparisonLevel::PercentageDifference { .. } => "percentage_difference",
            ComparisonLevel::AbsoluteDifference { .. } => "absolute_difference",
            ComparisonLevel::ColumnsReversed { .. } => "columns_reversed",
            ComparisonLevel::Custom { .. } => "custom",
            ComparisonLevel::Else => "else",
        }
    }

    /// Columns referenced by this level.
    pub fn columns(&self) -> Vec<&ColumnExpression> {
        match self {
            ComparisonLevel::Null { column }
            | ComparisonLevel::Exact { column }
            | ComparisonLevel::Levenshtein { column, .. }
            | ComparisonLevel::DamerauLevenshtein { column, .. }
            | ComparisonLevel::JaroWinkler { column, .. }
            | ComparisonLevel::PercentageDifference { column, .. }
            | ComparisonLevel::AbsoluteDifference { column, .. } => vec![column],
            ComparisonLevel::ColumnsReversed { first, second, .. } => vec![first, second],
            ComparisonLevel::Custom { columns, .. } => columns.iter().collect(),
            ComparisonLevel::Else => Vec::new(),
        }
    }

    /// Checks column names and parameters.
    pub fn validate(&self) -> Result<()> {
        for column in self.columns() {
            SqlSecurity::validate_identifier(column.name())?;
        }

        match self {
            ComparisonLevel::JaroWinkler { threshold, .. } => {
                InputValidator::validate_similarity(*threshold, "similarity threshold")
            }
            ComparisonLevel::PercentageDifference { threshold, .. } => {
                InputValidator::validate_non_negative(*threshold, "percentage threshold")
            }
            ComparisonLevel::AbsoluteDifference { threshold, .. } => {
                InputValidator::validate_non_negative(*threshold, "difference threshold")
            }
            ComparisonLevel::Custom { sql, .. } => SqlSecurity::validate_sql_expression(sql),
            _ => Ok(()),
        }
    }

    /// Renders the level as a boolean SQL expression.
    pub fn render(&self, dialect: Dialect) -> Result<String> {
        let functions = dialect.functions();
        let sql = match self {
            ComparisonLevel::Null { column } => format!(
                "{} IS NULL OR {} IS NULL",
                column.name_l(dialect),
                column.name_r(dialect)
            ),
            ComparisonLevel::Exact { column } => {
                format!("{} = {}", column.name_l(dialect), column.name_r(dialect))
            }
            ComparisonLevel::Levenshtein { column, distance } => {
                let function = self.require(dialect, functions.levenshtein)?;
                format!(
                    "{function}({}, {}) <= {distance}",
                    column.name_l(dialect),
                    column.name_r(dialect)
                )
            }
            ComparisonLevel::DamerauLevenshtein { column, distance } => {
                let function = self.require(dialect, functions.damerau_levenshtein)?;
                format!(
                    "{function}({}, {}) <= {distance}",
                    column.name_l(dialect),
                    column.name_r(dialect)
                )
            }
            ComparisonLevel::JaroWinkler { column, threshold } => {
                let function = self.require(dialect, functions.jaro_winkler)?;
                format!(
                    "{function}({}, {}) >= {threshold}",
                    column.name_l(dialect),
                    column.name_r(dialect)
                )
            }
            ComparisonLevel::PercentageDifference { column, threshold } => {
                let (l, r) = (column.name_l(dialect), column.name_r(dialect));
                format!(
                    "COALESCE(CAST(ABS({l} - {r}) AS {float}) / NULLIF({greatest}(ABS({l}), ABS({r})), 0) <= {threshold}, FALSE)",
                    float = functions.float_type,
                    greatest = functions.greatest,
                )
            }
            ComparisonLevel::AbsoluteDifference { column, threshold } => format!(
                "ABS({} - {}) <= {threshold}",
                column.name_l(dialect),
                column.name_r(dialect)
            ),
            ComparisonLevel::ColumnsReversed {
                first,
                second,
                symmetrical,
            } => {
                let forward = format!("{} = {}", first.name_l(dialect), second.name_r(dialect));
                if *symmetrical {
                    format!(
                        "{forward} AND {} = {}",
                        first.name_r(dialect),
                        second.name_l(dialect)
                    )
                } else {
                    forward
                }
            }
            ComparisonLevel::Custom { sql, .. } => sql.clone(),
            ComparisonLevel::Else => "TRUE".to_string(),
        };
        Ok(sql)
    }

    /// Human-readable description of the level.
    pub fn label(&self) -> String {
        match self {
            ComparisonLevel::Null { column } => format!("{} is NULL", column.label()),
            ComparisonLevel::Exact { column } => format!("Exact match on {}", column.label()),
            ComparisonLevel::Levenshtein { column, distance } => {
                format!("Levenshtein distance of {} <= {distance}", column.label())
            }
            ComparisonLevel::DamerauLevenshtein { column, distance } => format!(
                "Damerau-Levenshtein distance of {} <= {distance}",
                column.label()
            ),
            ComparisonLevel::JaroWinkler { column, threshold } => format!(
                "Jaro-Winkler similarity of {} >= {threshold}",
                column.label()
            ),
            ComparisonLevel::PercentageDifference { column, threshold } => format!(
                "Percentage difference of '{}' within {:.2}%",
                column.label(),
                threshold * 100.0
            ),
            ComparisonLevel::AbsoluteDifference { column, threshold } => format!(
                "Absolute difference of '{}' <= {threshold}",
                column.label()
            ),
            ComparisonLevel::ColumnsReversed {
                first,
                second,
                symmetrical,
            } => {
                let label = format!(
                    "Match on reversed cols: {} and {}",
                    first.label(),
                    second.label()
                );
                if *symmetrical {
                    format!("{label} (both directions)")
                } else {
                    label
                }
            }
            ComparisonLevel::Custom { label, .. } => label.clone(),
            ComparisonLevel::Else => "All other comparisons".to_string(),
        }
    }

    fn require(&self, dialect: Dialect, function: Option<&'static str>) -> Result<&'static str> {
        function.ok_or_else(|| LinkError::unsupported_dialect(dialect.name(), self.label()))
    }
}

impl fmt::Display for ComparisonLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
