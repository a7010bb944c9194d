//! INI file configuration adapter with environment fallback.
//!
//! A key missing from the file is looked up in the environment as
//! `<PREFIX>_<SECTION>_<KEY>` (upper-case, default prefix `STOCKDASH`), so
//! secrets such as `STOCKDASH_BACKEND_ACCESS_TOKEN` can stay out of the file.

use crate::domain::error::StockdashError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub const DEFAULT_ENV_PREFIX: &str = "STOCKDASH";

pub struct FileConfigAdapter {
    config: Ini,
    env_prefix: Option<String>,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StockdashError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| StockdashError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self {
            config,
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        })
    }

    /// Parses INI text. No environment fallback is applied.
    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self {
            config,
            env_prefix: None,
        })
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    fn env_key(prefix: &str, section: &str, key: &str) -> String {
        format!("{}_{}_{}", prefix, section, key).to_ascii_uppercase()
    }

    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key).or_else(|| {
            let prefix = self.env_prefix.as_deref()?;
            std::env::var(Self::env_key(prefix, section, key)).ok()
        })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.lookup(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.lookup(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.lookup(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}
