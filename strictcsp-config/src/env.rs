// Environment variable overrides

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use strictcsp_core::HashAlgorithm;
use tracing::debug;

use crate::config::StrictCspConfig;
use crate::error::{ConfigError, Result};

/// Prefix of every recognised override variable.
pub const ENV_PREFIX: &str = "STRICT_CSP_";

impl StrictCspConfig {
    /// Apply `STRICT_CSP_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_vars(env::vars())
    }

    /// Apply overrides from `(name, value)` pairs. Names without the
    /// [`ENV_PREFIX`] are ignored.
    pub fn apply_env_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();

            match name {
                "HASH_ALGORITHM" => {
                    self.hash_algorithm = parse_var::<HashAlgorithm>(key, value)?;
                }
                "NONCE_BITS" => self.nonce_bits = parse_var(key, value)?,
                "REPORT_ONLY" => self.report_only = parse_bool(key, value)?,
                "MANIFEST_DIR" => self.manifest.dir = PathBuf::from(value),
                "LOCK_TIMEOUT_MS" => self.manifest.lock_timeout_ms = parse_var(key, value)?,
                "DIRECTIVES" => self.directives = value.to_string(),
                _ => {
                    debug!(key = %key, "Ignoring unknown strict CSP environment variable");
                    continue;
                }
            }
            debug!(key = %key, "Applied environment override");
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::EnvError {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::EnvError {
            key: key.to_string(),
            message: format!("expected a boolean, got {:?}", value),
        }),
    }
}
