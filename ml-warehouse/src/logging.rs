//! Log subscriber setup

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Install a formatted log subscriber filtered by `level`
///
/// `level` is a filter directive such as `info` or
/// `ml_warehouse=debug,warn`. Returns `false` when a global subscriber was
/// already installed, in which case nothing changes.
pub fn init(level: &str) -> Result<bool> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| Error::Config(format!("invalid log level '{level}': {e}")))?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let first = init("debug").unwrap();
        let second = init("info").unwrap();
        assert!(!(first && second));
    }
}
