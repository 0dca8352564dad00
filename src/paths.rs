//! Path resolution for rolesync
//!
//! # Environment Variables
//!
//! - `ROLESYNC_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `ROLESYNC_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/rolesync` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\rolesync`
//!    - elsewhere: `~/.config/rolesync`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "ROLESYNC_CONFIG_DIR";

/// Name of the config file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the rolesync config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("rolesync");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("rolesync");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("rolesync");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Full path of the config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Run `f` with `key` set to `value`, restoring the previous value after.
    ///
    /// Environment changes are serialized through `ENV_LOCK`.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let original = env::var(key).ok();
        // SAFETY: env mutation is serialized by ENV_LOCK
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: still holding ENV_LOCK
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: callers nest this inside with_env_var, which holds ENV_LOCK
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: as above
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/rolesync", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/rolesync"));
            assert_eq!(
                config_file().unwrap(),
                PathBuf::from("/custom/rolesync/config.toml")
            );
        });
    }

    #[test]
    fn test_xdg_config_home() {
        with_env_var("XDG_CONFIG_HOME", "/tmp/xdg-rolesync-test", || {
            without_env_var(ENV_CONFIG_DIR, || {
                assert_eq!(
                    config_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-rolesync-test/rolesync")
                );
            });
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/fleet/ref.json"), home.join("fleet").join("ref.json"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_ROLESYNC_VAR/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_ROLESYNC_VAR/file"));
    }
}
