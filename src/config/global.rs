//! Process-wide resolved configuration.
//!
//! Installed once by the entry point after resolution and never replaced.
//! Prefer passing the `Arc<ServerConfig>` returned by [`install`] to
//! consumers; [`get`] is for collaborators that cannot be wired explicitly.

use super::types::ServerConfig;
use crate::error::{ConfigError, ConfigResult};
use std::sync::{Arc, OnceLock};

static CONFIG: OnceLock<Arc<ServerConfig>> = OnceLock::new();

/// Install the resolved configuration. Fails if one is already installed.
pub fn install(config: ServerConfig) -> ConfigResult<Arc<ServerConfig>> {
    let config = Arc::new(config);
    CONFIG
        .set(Arc::clone(&config))
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    Ok(config)
}

/// The installed configuration, if any.
pub fn get() -> Option<Arc<ServerConfig>> {
    CONFIG.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    // Single test: the cell is process-wide.
    #[test]
    fn test_install_once() {
        let mut config = ServerConfig::default();
        config.port = 2883;

        let installed = install(config.clone()).unwrap();
        assert_eq!(installed.port, 2883);
        assert!(Arc::ptr_eq(&installed, &get().unwrap()));

        let err = install(ServerConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(get().unwrap().port, 2883);
    }
}
