//! Tracing setup.

use nacos_a2a_core::env::{env_var, NACOS_LOG_LEVEL};
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber.
///
/// The filter comes from `RUST_LOG`, or from `NACOS_LOG_LEVEL` (default
/// `info`). Returns `false` when a global subscriber is already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(env_var(NACOS_LOG_LEVEL).as_deref())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Map a log level name to a filter directive.
fn level_directive(level: Option<&str>) -> &'static str {
    match level.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") | Some("critical") | Some("fatal") => "error",
        Some("off") => "off",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "info")]
    #[case(Some("INFO"), "info")]
    #[case(Some("WARNING"), "warn")]
    #[case(Some("Critical"), "error")]
    #[case(Some("debug"), "debug")]
    #[case(Some("nonsense"), "info")]
    fn test_level_directive(#[case] level: Option<&str>, #[case] expected: &str) {
        assert_eq!(level_directive(level), expected);
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        assert!(!init_tracing());
    }
}
