//! Comparison levels and rule lists.
//!
//! A comparison classifies a pair of records on one attribute into an ordinal
//! rank ("gamma"). It is declared as an ordered list of
//! [`ComparisonLevel`]s ending in a catch-all, and compiled once per dialect
//! into a `CASE` expression that a pipeline statement can select.
//!
//! ```text
//! ComparisonRuleList "amount"
//!     ├── Null                      -> -1
//!     ├── PercentageDifference 0%   ->  3
//!     ├── PercentageDifference 10%  ->  2
//!     ├── PercentageDifference 25%  ->  1
//!     └── Else                      ->  0
//! ```

mod column;
mod level;
mod rule_list;

pub use column::{ColumnExpression, ColumnTransform};
pub use level::ComparisonLevel;
pub use rule_list::{ComparisonRuleList, CompiledComparison, ELSE_RANK, NULL_RANK};
