//! Tracing subscriber setup driven by [`crate::config::Logger`].

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config;

// Crates whose events are shown at the configured level; everything else stays at `warn`.
const MODULE_WHITELIST: &[&str] = &["skos_rs", "sea_orm_migration"];

#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(level)
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum Format {
    #[serde(rename = "compact")]
    #[default]
    Compact,
    #[serde(rename = "pretty")]
    Pretty,
    #[serde(rename = "json")]
    Json,
}

/// Builds the filter directive for the configured level.
#[must_use]
pub fn filter_directive(config: &config::Logger) -> String {
    if let Some(directive) = &config.override_filter {
        return directive.clone();
    }
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        MODULE_WHITELIST
            .iter()
            .map(|module| format!("{module}={}", config.level)),
    );
    directives.join(",")
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configuration when set. Calling this twice is
/// harmless: the second installation attempt is ignored.
pub fn init(config: &config::Logger) {
    if !config.enable {
        return;
    }
    if config.pretty_backtrace && std::env::var_os("RUST_BACKTRACE").is_none() {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(config)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = match config.format {
        Format::Compact => fmt::layer()
            .compact()
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed(),
        Format::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed(),
        Format::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
    {
        eprintln!("tracing subscriber already installed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::{filter_directive, LogLevel};
    use crate::config;

    #[test]
    fn directive_whitelists_crate_modules() {
        let logger = config::Logger {
            level: LogLevel::Debug,
            ..config::Logger::default()
        };
        assert_eq!(
            filter_directive(&logger),
            "warn,skos_rs=debug,sea_orm_migration=debug"
        );
    }

    #[test]
    fn override_filter_wins() {
        let logger = config::Logger {
            override_filter: Some("trace".into()),
            ..config::Logger::default()
        };
        assert_eq!(filter_directive(&logger), "trace");
    }
}
