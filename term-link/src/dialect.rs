//! SQL dialects and their function tables.
//!
//! Every backend-specific name used when rendering comparison levels lives in
//! a single [`DialectFunctions`] row per [`Dialect`]. Supporting a new backend
//! means adding an enum member and its row; the levels themselves never match
//! on the dialect.

use crate::error::{LinkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The SQL dialect expressions are rendered against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Backend-neutral rendering using the most common function names.
    #[default]
    Generic,
    /// Apache DataFusion (the bundled engine).
    DataFusion,
    /// DuckDB
    DuckDb,
    /// PostgreSQL with the `fuzzystrmatch` extension.
    Postgres,
    /// Spark SQL with the string-similarity UDFs registered.
    Spark,
    /// SQLite with the string-similarity UDFs registered.
    Sqlite,
}

/// Function names and syntax for one dialect.
///
/// A `None` entry means the dialect has no equivalent and any level that
/// needs it fails to render with [`LinkError::UnsupportedDialect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectFunctions {
    /// Character used to quote identifiers
    pub quote: char,
    /// Type name for casting numerics to floating point
    pub float_type: &'static str,
    /// Scalar maximum of two values
    pub greatest: &'static str,
    /// Edit distance
    pub levenshtein: Option<&'static str>,
    /// Edit distance with transpositions
    pub damerau_levenshtein: Option<&'static str>,
    /// Jaro-Winkler similarity in `[0, 1]`
    pub jaro_winkler: Option<&'static str>,
}

const GENERIC: DialectFunctions = DialectFunctions {
    quote: '"',
    float_type: "DOUBLE",
    greatest: "GREATEST",
    levenshtein: Some("levenshtein"),
    damerau_levenshtein: Some("damerau_levenshtein"),
    jaro_winkler: Some("jaro_winkler"),
};

const DATAFUSION: DialectFunctions = DialectFunctions {
    quote: '"',
    float_type: "DOUBLE",
    greatest: "greatest",
    levenshtein: Some("levenshtein"),
    damerau_levenshtein: None,
    jaro_winkler: None,
};

const DUCKDB: DialectFunctions = DialectFunctions {
    quote: '"',
    float_type: "DOUBLE",
    greatest: "greatest",
    levenshtein: Some("levenshtein"),
    damerau_levenshtein: Some("damerau_levenshtein"),
    jaro_winkler: Some("jaro_winkler_similarity"),
};

const POSTGRES: DialectFunctions = DialectFunctions {
    quote: '"',
    float_type: "DOUBLE PRECISION",
    greatest: "GREATEST",
    levenshtein: Some("levenshtein"),
    damerau_levenshtein: None,
    jaro_winkler: None,
};

const SPARK: DialectFunctions = DialectFunctions {
    quote: '`',
    float_type: "DOUBLE",
    greatest: "greatest",
    levenshtein: Some("levenshtein"),
    damerau_levenshtein: Some("damerau_levenshtein"),
    jaro_winkler: Some("jaro_winkler"),
};

const SQLITE: DialectFunctions = DialectFunctions {
    quote: '"',
    float_type: "REAL",
    greatest: "max",
    levenshtein: Some("levenshtein"),
    damerau_levenshtein: Some("damerau_levenshtein"),
    jaro_winkler: Some("jaro_winkler"),
};

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 6] = [
        Dialect::Generic,
        Dialect::DataFusion,
        Dialect::DuckDb,
        Dialect::Postgres,
        Dialect::Spark,
        Dialect::Sqlite,
    ];

    /// Returns the function table for this dialect.
    pub fn functions(&self) -> &'static DialectFunctions {
        match self {
            Dialect::Generic => &GENERIC,
            Dialect::DataFusion => &DATAFUSION,
            Dialect::DuckDb => &DUCKDB,
            Dialect::Postgres => &POSTGRES,
            Dialect::Spark => &SPARK,
            Dialect::Sqlite => &SQLITE,
        }
    }

    /// Returns the lowercase name used in configuration and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::DataFusion => "datafusion",
            Dialect::DuckDb => "duckdb",
            Dialect::Postgres => "postgres",
            Dialect::Spark => "spark",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Quotes an identifier, doubling any embedded quote characters.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        let quote = self.functions().quote;
        let escaped = identifier.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self> {
        Dialect::ALL
            .iter()
            .copied()
            .find(|d| d.name() == s.to_lowercase())
            .ok_or_else(|| {
                let supported: Vec<&str> = Dialect::ALL.iter().map(|d| d.name()).collect();
                LinkError::invalid_argument(format!(
                    "unknown dialect '{s}', expected one of: {}",
                    supported.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::DataFusion.quote_identifier("name_l"), "\"name_l\"");
        assert_eq!(Dialect::Spark.quote_identifier("name_l"), "`name_l`");
        assert_eq!(Dialect::Generic.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_parse_round_trip() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.name().parse::<Dialect>().unwrap(), dialect);
        }
        assert_eq!("DuckDB".parse::<Dialect>().unwrap(), Dialect::DuckDb);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "oracle".parse::<Dialect>().unwrap_err();
        assert!(matches!(err, LinkError::InvalidArgument(_)));
        assert!(err.to_string().contains("oracle"));
        assert!(err.to_string().contains("datafusion"));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Dialect::DuckDb).unwrap();
        assert_eq!(json, "\"duckdb\"");
        let parsed: Dialect = serde_json::from_str("\"datafusion\"").unwrap();
        assert_eq!(parsed, Dialect::DataFusion);
    }

    #[test]
    fn test_missing_functions() {
        assert!(Dialect::Postgres.functions().jaro_winkler.is_none());
        assert!(Dialect::DataFusion.functions().damerau_levenshtein.is_none());
        assert!(Dialect::Sqlite.functions().levenshtein.is_some());
    }
}
