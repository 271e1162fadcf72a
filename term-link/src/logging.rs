//! Logging utilities and configuration for Term linkage.
//!
//! The library itself only emits `tracing` events. [`LogConfig`] decides how
//! much of the generated SQL and cache activity those events carry, and
//! [`setup`] installs a subscriber for applications that want one.

use tracing::Level;

/// Logging configuration for pipeline execution.
///
/// Generated SQL can be large, so it is only attached to log events when
/// `log_sql` is set, and then truncated to `max_field_length`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Most verbose level the SQL and cache macros emit at
    pub base_level: Level,
    /// Whether to attach rendered pipeline SQL to log events
    pub log_sql: bool,
    /// Whether to log cache hits, misses and evictions
    pub log_cache_events: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_sql: false,
            log_cache_events: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_sql: true,
            log_cache_events: true,
            max_field_length: 4096,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_sql: false,
            log_cache_events: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Returns true if events at `level` pass `base_level`.
    pub fn enables(&self, level: Level) -> bool {
        level <= self.base_level
    }
}

/// Macro for logging generated SQL, gated on [`LogConfig::log_sql`].
#[macro_export]
macro_rules! log_sql {
    ($config:expr, $sql:expr, $($arg:tt)*) => {
        if $config.log_sql && $config.enables(tracing::Level::DEBUG) {
            tracing::debug!(
                sql = %$crate::logging::truncate_field($sql, $config.max_field_length),
                $($arg)*
            );
        }
    };
}

/// Macro for conditional cache event logging.
#[macro_export]
macro_rules! log_cache_event {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_cache_events && $config.enables(tracing::Level::DEBUG) {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    match value.char_indices().nth(max_length) {
        None => value.to_string(),
        Some((cut, _)) => format!("{}...(truncated)", &value[..cut]),
    }
}

/// Utilities for setting up structured logging.
pub mod setup {
    use tracing::Level;

    /// Configuration for the logging subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for Term components specifically
        pub term_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                term_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                term_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                term_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the log level for the application.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for Term components.
        pub fn with_term_level(mut self, level: Level) -> Self {
            self.term_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_link={}",
                    self.level.as_str().to_lowercase(),
                    self.term_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Initializes a global subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_link::logging::setup::{LoggingConfig, init_logging};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.base_level, Level::DEBUG);
        assert!(!config.log_sql);
        assert!(config.log_cache_events);
        assert_eq!(config.max_field_length, 256);
    }

    #[test]
    fn test_log_config_presets() {
        let verbose = LogConfig::verbose();
        assert_eq!(verbose.base_level, Level::DEBUG);
        assert!(verbose.log_sql);

        let production = LogConfig::production();
        assert_eq!(production.base_level, Level::WARN);
        assert!(!production.log_sql);
        assert!(!production.log_cache_events);
    }

    #[test]
    fn test_base_level_gates_debug_events() {
        assert!(LogConfig::default().enables(Level::DEBUG));
        assert!(LogConfig::default().enables(Level::WARN));
        assert!(!LogConfig::default().enables(Level::TRACE));

        let quiet = LogConfig {
            base_level: Level::INFO,
            log_sql: true,
            ..LogConfig::verbose()
        };
        assert!(quiet.enables(Level::INFO));
        assert!(!quiet.enables(Level::DEBUG));

    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
        // Multi-byte characters are never split
        assert_eq!(truncate_field("héllo wörld", 2), "hé...(truncated)");
    }

    #[test]
    fn test_env_filter() {
        assert_eq!(LoggingConfig::default().env_filter(), "info,term_link=debug");
        assert_eq!(
            LoggingConfig::production().env_filter(),
            "warn,term_link=info"
        );
        assert_eq!(
            LoggingConfig::default()
                .with_env_filter("term_link=trace")
                .env_filter(),
            "term_link=trace"
        );
    }
}
