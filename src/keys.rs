//! API key resolution

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::constants::API_KEY_ENV_VAR;

/// Where to look for the Gemini API key.
#[derive(Clone, Debug)]
pub struct KeyLoader {
    env_var: String,
    key_file: PathBuf,
}

impl KeyLoader {
    /// Reads `GEMINI_API_KEY` first, then `key_file`.
    pub fn new(key_file: impl Into<PathBuf>) -> Self {
        Self {
            env_var: API_KEY_ENV_VAR.to_string(),
            key_file: key_file.into(),
        }
    }

    /// Overrides the environment variable name.
    pub fn with_env_var(mut self, env_var: &str) -> Self {
        self.env_var = env_var.to_string();
        self
    }

    /// Returns the key, or `None` when neither source has one.
    pub fn load(&self) -> Option<String> {
        resolve_api_key(std::env::var(&self.env_var).ok(), &self.key_file)
    }
}

/// Picks the environment value when it is set and non-blank, otherwise the
/// first non-empty line of `key_file`.
pub fn resolve_api_key(env_value: Option<String>, key_file: &Path) -> Option<String> {
    if let Some(value) = env_value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        debug!("Using API key from the environment");
        return Some(value);
    }

    match std::fs::read_to_string(key_file) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            warn!("Failed to read API key file {}: {}", key_file.display(), err);
            None
        }
    }
}
