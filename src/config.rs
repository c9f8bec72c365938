//! Process-wide configuration, consulted once at init.
//!
//! Mirrors the collaborator contract of spec.md §6: `get_env<T>(name,
//! default)` does a typed parse of an environment variable or falls back to
//! a default, raising [`ErrorKind::BadEnvValue`] on malformed input. The
//! lookup itself goes through the [`EnvSource`] trait so tests can supply a
//! fake environment instead of mutating the real process one.

use crate::error::{Error, ErrorKind, Result};
use once_cell::sync::Lazy;
use std::str::FromStr;

/// Collaborator contract for reading named string values out of an
/// environment. `ProcessEnv` is the only implementation used outside tests.
pub trait EnvSource {
    fn read(&self, name: &str) -> Option<String>;
}

/// Reads directly from the process environment via [`std::env::var`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn read(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Parse an environment variable as `T`, falling back to `default` if unset.
///
/// # Errors
///
/// Returns [`ErrorKind::BadEnvValue`] if the variable is set but fails to
/// parse as `T`.
#[track_caller]
pub fn get_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
{
    get_env_from(&ProcessEnv, name, default)
}

/// Same as [`get_env`], but for booleans spelled as `0`/`1`/`true`/`false`
/// (case-insensitive), since Rust's `bool::from_str` only accepts
/// `"true"`/`"false"`.
#[track_caller]
pub fn get_env_bool(name: &str, default: bool) -> Result<bool> {
    get_env_bool_from(&ProcessEnv, name, default)
}

/// Same as [`get_env`], reading through an explicit [`EnvSource`] rather
/// than the process environment.
///
/// # Errors
///
/// Returns [`ErrorKind::BadEnvValue`] if the variable is set but fails to
/// parse as `T`.
#[track_caller]
pub fn get_env_from<T>(source: &impl EnvSource, name: &str, default: T) -> Result<T>
where
    T: FromStr,
{
    match source.read(name) {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|_| {
            Error::new(ErrorKind::BadEnvValue {
                name: name.to_string(),
                value,
            })
        }),
    }
}

/// Same as [`get_env_bool`], reading through an explicit [`EnvSource`].
///
/// # Errors
///
/// Returns [`ErrorKind::BadEnvValue`] if the variable is set but isn't one
/// of the accepted spellings.
#[track_caller]
pub fn get_env_bool_from(source: &impl EnvSource, name: &str, default: bool) -> Result<bool> {
    match source.read(name) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(Error::new(ErrorKind::BadEnvValue {
                name: name.to_string(),
                value,
            })),
        },
    }
}

/// Snapshot of the environment-derived configuration, read once.
#[derive(Debug, Clone, Copy)]
pub struct CoreConfig {
    pub num_threads: usize,
    pub enable_stats: bool,
    pub enable_profiler: bool,
}

impl CoreConfig {
    fn from_env() -> Self {
        let default_threads = num_cpus::get().max(1);
        let num_threads = get_env("TIT_NUM_THREADS", default_threads).unwrap_or_else(|e| {
            log::warn!("{e}, falling back to default thread count");
            default_threads
        });
        let enable_stats = get_env_bool("TIT_ENABLE_STATS", false).unwrap_or_else(|e| {
            log::warn!("{e}, disabling stats");
            false
        });
        let enable_profiler = get_env_bool("TIT_ENABLE_PROFILER", false).unwrap_or_else(|e| {
            log::warn!("{e}, disabling profiler");
            false
        });
        Self {
            num_threads,
            enable_stats,
            enable_profiler,
        }
    }
}

static CONFIG: Lazy<CoreConfig> = Lazy::new(CoreConfig::from_env);

/// The process-wide configuration, computed once on first access.
pub fn config() -> CoreConfig {
    *CONFIG
}
