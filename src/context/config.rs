use crate::core::{DbError, Result};
use crate::storage::DurabilityMode;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_FLUSH_MODE: &str = "MEMOPERSIST_FLUSH_MODE";
pub const ENV_DATA_DIR: &str = "MEMOPERSIST_DATA_DIR";
pub const ENV_DURABILITY: &str = "MEMOPERSIST_DURABILITY";

/// When pending changes reach the store without an explicit `flush`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Queries that read the store flush first, so they see pending changes.
    #[default]
    Auto,
    /// Only `flush` and `commit` write.
    Commit,
}

impl FromStr for FlushMode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "commit" => Ok(Self::Commit),
            other => Err(DbError::Config(format!(
                "flush mode must be one of: auto, commit (got '{}')",
                other
            ))),
        }
    }
}

/// Persistence context configuration
#[derive(Debug, Clone, Default)]
pub struct ContextConfig {
    /// Flush behavior for store-reading queries
    pub flush_mode: FlushMode,

    /// Directory for file-backed tables; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,

    /// Checkpoint policy for file-backed tables
    pub durability: DurabilityMode,
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    /// Reads `MEMOPERSIST_FLUSH_MODE`, `MEMOPERSIST_DATA_DIR` and
    /// `MEMOPERSIST_DURABILITY`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_FLUSH_MODE) {
            config.flush_mode = raw.parse()?;
        }

        if let Some(raw) = lookup(ENV_DATA_DIR)
            && !raw.trim().is_empty()
        {
            config.data_dir = Some(PathBuf::from(raw));
        }

        if let Some(raw) = lookup(ENV_DURABILITY) {
            config.durability = raw.parse()?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ContextConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.flush_mode, FlushMode::Auto);
        assert_eq!(config.durability, DurabilityMode::Sync);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = ContextConfig::from_lookup(lookup(&[
            (ENV_FLUSH_MODE, "Commit"),
            (ENV_DATA_DIR, "/var/lib/memopersist"),
            (ENV_DURABILITY, "none"),
        ]))
        .unwrap();
        assert_eq!(config.flush_mode, FlushMode::Commit);
        assert_eq!(config.durability, DurabilityMode::None);
        assert_eq!(
            config.data_dir,
            Some(PathBuf::from("/var/lib/memopersist"))
        );
    }

    #[test]
    fn test_invalid_flush_mode() {
        let err = ContextConfig::from_lookup(lookup(&[(ENV_FLUSH_MODE, "sometimes")])).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_builder() {
        let config = ContextConfig::new()
            .flush_mode(FlushMode::Commit)
            .data_dir("data")
            .durability(DurabilityMode::None);
        assert_eq!(config.flush_mode, FlushMode::Commit);
        assert_eq!(config.data_dir, Some(PathBuf::from("data")));
    }
}
