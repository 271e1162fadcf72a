//! Column references with optional transforms.

use crate::dialect::Dialect;
use serde::{Deserialize, Serialize};

/// A transform applied to both sides of a comparison before it is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnTransform {
    /// Case-fold to lower case
    Lower,
    /// Case-fold to upper case
    Upper,
    /// Strip leading and trailing whitespace
    Trim,
}

impl ColumnTransform {
    fn function_name(&self) -> &'static str {
        match self {
            ColumnTransform::Lower => "lower",
            ColumnTransform::Upper => "upper",
            ColumnTransform::Trim => "trim",
        }
    }
}

/// A logical column reference as used by comparison levels.
///
/// Record pairs carry every input column twice, suffixed `_l` and `_r`. A
/// `ColumnExpression` renders either side, applying its transforms in the
/// order they were added.
///
/// # Examples
///
/// ```rust
/// use term_link::comparison::ColumnExpression;
/// use term_link::dialect::Dialect;
///
/// let forename = ColumnExpression::new("forename").lower();
/// assert_eq!(forename.name_l(Dialect::DataFusion), "lower(\"forename_l\")");
/// assert_eq!(forename.label(), "lower(forename)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnRepr", into = "ColumnRepr")]
pub struct ColumnExpression {
    name: String,
    transforms: Vec<ColumnTransform>,
}

impl ColumnExpression {
    /// Creates a reference to `name` with no transforms.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transforms: Vec::new(),
        }
    }

    /// Adds a transform.
    pub fn with_transform(mut self, transform: ColumnTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Case-folds both sides to lower case.
    pub fn lower(self) -> Self {
        self.with_transform(ColumnTransform::Lower)
    }

    /// Case-folds both sides to upper case.
    pub fn upper(self) -> Self {
        self.with_transform(ColumnTransform::Upper)
    }

    /// Trims whitespace on both sides.
    pub fn trim(self) -> Self {
        self.with_transform(ColumnTransform::Trim)
    }

    /// The underlying input column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transforms in application order.
    pub fn transforms(&self) -> &[ColumnTransform] {
        &self.transforms
    }

    /// Renders the left-record side.
    pub fn name_l(&self, dialect: Dialect) -> String {
        self.render_side("l", dialect)
    }

    /// Renders the right-record side.
    pub fn name_r(&self, dialect: Dialect) -> String {
        self.render_side("r", dialect)
    }

    /// Human-readable form used in level labels.
    pub fn label(&self) -> String {
        self.wrap(self.name.clone())
    }

    fn render_side(&self, suffix: &str, dialect: Dialect) -> String {
        let column = dialect.quote_identifier(&format!("{}_{suffix}", self.name));
        self.wrap(column)
    }

    fn wrap(&self, inner: String) -> String {
        self.transforms.iter().fold(inner, |expr, transform| {
            format!("{}({expr})", transform.function_name())
        })
    }
}

impl From<&str> for ColumnExpression {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ColumnExpression {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Serialized form: a bare column name, or a name with transforms.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ColumnRepr {
    Name(String),
    Expression {
        name: String,
        transforms: Vec<ColumnTransform>,
    },
}

impl From<ColumnRepr> for ColumnExpression {
    fn from(repr: ColumnRepr) -> Self {
        match repr {
            ColumnRepr::Name(name) => Self::new(name),
            ColumnRepr::Expression { name, transforms } => Self { name, transforms },
        }
    }
}

impl From<ColumnExpression> for ColumnRepr {
    fn from(column: ColumnExpression) -> Self {
        if column.transforms.is_empty() {
            ColumnRepr::Name(column.name)
        } else {
            ColumnRepr::Expression {
                name: column.name,
                transforms: column.transforms,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_column() {
        let column = ColumnExpression::new("surname");
        assert_eq!(column.name_l(Dialect::Generic), "\"surname_l\"");
        assert_eq!(column.name_r(Dialect::Spark), "`surname_r`");
        assert_eq!(column.label(), "surname");
    }

    #[test]
    fn test_transforms_apply_in_order() {
        let column = ColumnExpression::new("city").trim().upper();
        assert_eq!(column.name_r(Dialect::DuckDb), "upper(trim(\"city_r\"))");
        assert_eq!(column.label(), "upper(trim(city))");
    }

    #[test]
    fn test_serde_bare_name() {
        let column: ColumnExpression = serde_json::from_str("\"dob\"").unwrap();
        assert_eq!(column, ColumnExpression::new("dob"));
        assert_eq!(serde_json::to_string(&column).unwrap(), "\"dob\"");
    }

    #[test]
    fn test_serde_with_transforms() {
        let column = ColumnExpression::new("forename").lower();
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "forename", "transforms": ["lower"]})
        );
        let back: ColumnExpression = serde_json::from_value(json).unwrap();
        assert_eq!(back, column);
    }
}
