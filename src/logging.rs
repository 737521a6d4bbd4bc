//! Tracing subscriber setup.
//!
//! Logs go to stdout, interleaved with the report, so a warning about a failed
//! lookup appears under the question it belongs to.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// `verbose` forces `debug`; otherwise `RUST_LOG` applies, defaulting to `info`.
/// ANSI colours are disabled when `NO_COLOR` is set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = build_filter(verbose, std::env::var("RUST_LOG").ok().as_deref())?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(use_color());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn build_filter(verbose: bool, rust_log: Option<&str>) -> Result<EnvFilter> {
    let directives = match (verbose, rust_log) {
        (true, _) => "debug",
        (false, Some(directives)) if !directives.trim().is_empty() => directives,
        _ => "info",
    };
    EnvFilter::try_new(directives).map_err(|e| anyhow!("Invalid log filter '{directives}': {e}"))
}

fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn default_filter_is_info() {
        for rust_log in [None, Some("  ")] {
            let filter = build_filter(false, rust_log).unwrap();
            assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
        }
    }

    #[test]
    fn verbose_overrides_rust_log() {
        let filter = build_filter(true, Some("warn")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn rust_log_directives_are_used() {
        let filter = build_filter(false, Some("warn")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn invalid_directives_are_rejected() {
        assert!(build_filter(false, Some("qafact=notalevel")).is_err());
    }
}
