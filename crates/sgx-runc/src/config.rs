//! Runtime configuration for the wrapper.
//!
//! The wrapper is started by dockerd/containerd with the exact argument vector
//! of a runc invocation, so it has no flags of its own. Everything that can be
//! tuned comes from the environment of the daemon:
//!
//! - `SGX_RUNC_LOG_FILE`: file the diagnostic log is appended to (default `/dev/null`)
//! - `RUST_LOG`: log level filter (default `info`)
//! - `SGX_RUNC_RUNTIME`: runtime executable to delegate to, replacing the
//!   default `docker-runc` then `runc` lookup
//!
//! The host resources that get injected are not configurable, see
//! [`ResourceCatalog::sgx`](crate::catalog::ResourceCatalog::sgx).

use std::env;
use std::path::PathBuf;

pub const LOG_FILE_ENV: &str = "SGX_RUNC_LOG_FILE";
pub const LOG_LEVEL_ENV: &str = "RUST_LOG";
pub const RUNTIME_ENV: &str = "SGX_RUNC_RUNTIME";

pub const DEFAULT_LOG_FILE: &str = "/dev/null";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_RUNTIMES: [&str; 2] = ["docker-runc", "runc"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Where log records are appended
    pub log_file: PathBuf,
    /// Log level filter, e.g. "debug"
    pub log_level: String,
    /// Runtime executables to look for, in order of preference
    pub runtimes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            runtimes: DEFAULT_RUNTIMES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn build_from_env() -> Self {
        let mut config = Self::default();
        if let Some(log_file) = non_empty_var(LOG_FILE_ENV) {
            config.log_file = PathBuf::from(log_file);
        }
        if let Some(log_level) = non_empty_var(LOG_LEVEL_ENV) {
            config.log_level = log_level;
        }
        if let Some(runtime) = non_empty_var(RUNTIME_ENV) {
            config.runtimes = vec![runtime];
        }
        config
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    env::var(var).ok().filter(|val| !val.trim().is_empty())
}
