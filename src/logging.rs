//! Diagnostics setup
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the embedding program. [`init`] is a convenience for programs and tests
//! that want the configured level printed to stderr.

use crate::Settings;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse a configured level name, falling back to `warn`.
pub fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::WARN)
}

/// Install a stderr subscriber at the configured level.
///
/// Returns false if a global subscriber was already installed, in which
/// case the existing one stays in place.
pub fn init(settings: &Settings) -> bool {
    FmtSubscriber::builder()
        .with_max_level(parse_level(settings.log_level()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" TRACE "), Level::TRACE);
        assert_eq!(parse_level("loud"), Level::WARN);
    }

    #[test]
    fn test_init_is_idempotent() {
        let settings = Settings::default();
        init(&settings);
        // the second call must not panic or replace the first subscriber
        assert!(!init(&settings));
    }
}
