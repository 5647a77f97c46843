// Logging setup, powered by tracing-subscriber.
//
// Everything goes to stderr so `select` output on stdout stays parseable.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Compact text: timestamp LEVEL target: message fields
    #[default]
    Compact,
    /// JSON lines for structured logging
    Json,
}

/// Build the filter from `rust_log` when set, otherwise from `level` plus
/// the noisy-dependency overrides.
fn build_env_filter(level: &str, rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
    if let Some(directives) = rust_log {
        return EnvFilter::try_new(directives).map_err(|e| {
            anyhow::anyhow!("Invalid {} filter '{}': {}", EnvFilter::DEFAULT_ENV, directives, e)
        });
    }

    let mut directives = vec![level.to_string()];

    // Database and HTTP plumbing is chatty at debug.
    let noisy: &[(&str, &str)] = &[
        ("tokio_postgres", "warn"),
        ("postgres_protocol", "warn"),
        ("hyper", "warn"),
        ("hyper_util", "warn"),
        ("reqwest", "warn"),
        ("rustls", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Install the global subscriber.
pub fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_env_filter(level, rust_log.as_deref())?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_levels() {
        for level in ["error", "warn", "info", "debug", "trace"] {
            let filter = build_env_filter(level, None).unwrap();
            let rendered = filter.to_string();
            assert!(rendered.contains("tokio_postgres=warn"));
        }
    }

    #[test]
    fn test_filter_rejects_garbage() {
        assert!(build_env_filter("geoseed=loud", None).is_err());
        assert!(build_env_filter("info", Some("geoseed=shouting")).is_err());
    }

    #[test]
    fn test_rust_log_wins() {
        let filter = build_env_filter("info", Some("geoseed_core=trace")).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("geoseed_core=trace"));
        assert!(!rendered.contains("tokio_postgres"));
    }
}
