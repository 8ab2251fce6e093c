use std::time::Duration;

/// Extension appended to note file names unless configured otherwise.
pub const DEFAULT_EXTENSION: &str = ".txt";

/// Seconds between automatic sync passes unless configured otherwise.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;

/// Mount configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Suffix appended to every derived note file name
    pub extension: String,
    /// Time between automatic sync passes
    pub sync_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `SNFS_EXTENSION`: note file extension, e.g. `.md` (may be empty)
    /// - `SNFS_SYNC_INTERVAL_SECS`: seconds between automatic syncs
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(extension) = lookup("SNFS_EXTENSION") {
            if extension.contains('/') {
                return Err(ConfigError::InvalidExtension(extension));
            }
            config.extension = extension;
        }

        if let Some(raw) = lookup("SNFS_SYNC_INTERVAL_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidInterval(raw))?;
            config.sync_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SNFS_EXTENSION must not contain a path separator: {0:?}")]
    InvalidExtension(String),

    #[error("SNFS_SYNC_INTERVAL_SECS must be a positive number of seconds, got {0:?}")]
    InvalidInterval(String),
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
    fn test_defaults_when_unset() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap(), Config::default());
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SNFS_EXTENSION", ".md"),
            ("SNFS_SYNC_INTERVAL_SECS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.extension, ".md");
        assert_eq!(config.sync_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("SNFS_EXTENSION", "a/b")])),
            Err(ConfigError::InvalidExtension(_))
        ));
        for bad in ["0", "-3", "soon"] {
            assert!(matches!(
                Config::from_lookup(lookup(&[("SNFS_SYNC_INTERVAL_SECS", bad)])),
                Err(ConfigError::InvalidInterval(_))
            ));
        }
    }
}
