//! Tracing subscriber setup.

use crate::config::LoggerSettings;
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FALLBACK_LEVEL: &str = "info";

/// The configured level, if it names a real one.
fn configured_level(logger: &LoggerSettings) -> Option<String> {
    let level = logger.level.trim().to_lowercase();
    level.parse::<LevelFilter>().ok().map(|_| level)
}

/// Filter directive for the configured level, raised by `-v` flags.
///
/// `RUST_LOG` wins when set. An unknown level falls back to `info`.
pub fn directive(logger: &LoggerSettings, verbose: u8) -> String {
    if let Ok(directive) = std::env::var("RUST_LOG") {
        if !directive.trim().is_empty() {
            return directive;
        }
    }

    let level = match verbose {
        0 => configured_level(logger).unwrap_or_else(|| FALLBACK_LEVEL.to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    format!("marquee={}", level)
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for answers.
pub fn init(logger: &LoggerSettings, verbose: u8) {
    let directive = directive(logger, verbose);
    let (filter, rejected) = match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, None),
        Err(e) => (
            EnvFilter::new(format!("marquee={}", FALLBACK_LEVEL)),
            Some(format!("invalid log filter '{}': {}", directive, e)),
        ),
    };

    // A second init (tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();

    if configured_level(logger).is_none() {
        warn!(
            "Unknown logger.level '{}', using '{}'",
            logger.level, FALLBACK_LEVEL
        );
    }
    if let Some(message) = rejected {
        warn!("{}, using 'marquee={}'", message, FALLBACK_LEVEL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(level: &str) -> LoggerSettings {
        LoggerSettings {
            name: "Mastra".to_string(),
            level: level.to_string(),
        }
    }

    #[test]
    fn test_directive_from_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let logger = logger("INFO");
        assert_eq!(directive(&logger, 0), "marquee=info");
        assert_eq!(directive(&logger, 1), "marquee=debug");
        assert_eq!(directive(&logger, 3), "marquee=trace");
    }

    #[test]
    fn test_unknown_level_falls_back() {
        assert_eq!(configured_level(&logger("verbose")), None);
        assert_eq!(configured_level(&logger(" Warn ")).as_deref(), Some("warn"));

        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(directive(&logger("verbose"), 0), "marquee=info");
        }
    }
}
