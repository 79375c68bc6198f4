//! Tracing subscriber setup for binaries and tests embedding the runner.

use tracing::Level;

/// Install a formatted subscriber at `level`.
///
/// Returns `false` when a global subscriber is already set (a second call,
/// or a host application that installed its own).
pub fn init(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Parse a level name (`error`, `warn`, `info`, `debug`, `trace`), falling
/// back to `info`.
pub fn level_from_str(name: &str) -> Level {
    name.trim().parse().unwrap_or(Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        init(Level::WARN);
        assert!(!init(Level::DEBUG));
    }

    #[test]
    fn level_names() {
        assert_eq!(level_from_str("debug"), Level::DEBUG);
        assert_eq!(level_from_str(" WARN "), Level::WARN);
        assert_eq!(level_from_str("loud"), Level::INFO);
    }
}
