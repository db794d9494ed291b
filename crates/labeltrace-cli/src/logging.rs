//! Tracing subscriber bootstrap

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "labeltrace=info";

/// Console logging options
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    pub verbose: bool,
    pub json: bool,
}

/// Filter directive for the given options.
///
/// `RUST_LOG` wins when set; `--verbose` raises the default to debug.
pub fn filter_directive(config: LogConfig, env: Option<&str>) -> String {
    match env {
        Some(directive) if !directive.trim().is_empty() => directive.to_string(),
        _ if config.verbose => "labeltrace=debug,labeltrace_core=debug,labeltrace_http=debug".to_string(),
        _ => format!("{DEFAULT_LOG_FILTER},labeltrace_core=info,labeltrace_http=info"),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays parseable.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env = std::env::var("RUST_LOG").ok();
    let filter = EnvFilter::try_new(filter_directive(config, env.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}
