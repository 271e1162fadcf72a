//! Prelude for commonly used types and traits in term-link.

pub use crate::comparison::{ColumnExpression, ComparisonLevel, ComparisonRuleList};
pub use crate::dialect::Dialect;
pub use crate::engine::{DataFusionEngine, PipelineExecutor, QueryEngine, TableHandle};
pub use crate::error::{ErrorContext, LinkError, Result};
pub use crate::linker::{Linker, OutputMode, QueryOutput};
pub use crate::logging::LogConfig;
pub use crate::pipeline::{Pipeline, PipelineBuilder};
pub use crate::settings::{AsDict, LinkType, ModelSettings};
