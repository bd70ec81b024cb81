//! Environment configuration.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup builds one `Config` from the environment and injects it from
//! `main` — nothing reads env vars after boot. Unset or unparsable values
//! fall back to defaults; only the secrets have no default.

use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STATIC_DIR: &str = "./static";

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port (`PORT`).
    pub port: u16,
    /// Root directory for static file serving (`STATIC_DIR`).
    pub static_dir: PathBuf,
    /// Shared secret for the host channel (`HOST_PASS`); unset = ungated.
    pub host_pass: Option<String>,
    /// Shared secret for the user channel (`USER_PASS`); unset = ungated.
    pub user_pass: Option<String>,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_DIR));

        Self {
            port,
            static_dir,
            host_pass: std::env::var("HOST_PASS").ok(),
            user_pass: std::env::var("USER_PASS").ok(),
        }
    }
}
