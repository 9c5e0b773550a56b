use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root configuration file structure. Every field has a default so an
/// empty file (or no file at all) yields a working setup.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DevscopeConfig {
    /// Milliseconds between automatic rescans.
    pub scan_interval_ms: u64,

    /// Ports tried by the fallback dial strategy when the socket listing
    /// facility is unavailable.
    pub candidate_ports: Vec<u16>,

    /// Case-insensitive substrings matched against process command names.
    pub process_keywords: Vec<String>,

    /// Keep only processes whose pid owns a listening socket surfaced by
    /// the port probe. Disable to admit every keyword match.
    pub correlate_ports: bool,

    /// Number of log lines fetched per request.
    pub log_tail: u32,

    /// Rows per page in the database row browser.
    pub page_size: u32,
}

impl Default for DevscopeConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 2_000,
            candidate_ports: vec![
                3000, 3001, 4000, 5000, 5173, 5432, 6379, 8000, 8080, 8443, 9000, 9200, 27017,
            ],
            process_keywords: vec![
                "node".into(),
                "python".into(),
                "ruby".into(),
                "java".into(),
                "go".into(),
                "next".into(),
                "vite".into(),
            ],
            correlate_ports: true,
            log_tail: 100,
            page_size: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("scan_interval_ms must be at least 250")]
    IntervalTooShort,
    #[error("page_size must be non-zero")]
    EmptyPage,
}

impl DevscopeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: DevscopeConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search the working directory for a config file. Absence is not an
    /// error; defaults apply.
    pub fn discover(dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let names = ["devscope.yml", "devscope.yaml", ".devscope.yml", ".devscope.yaml"];
        for name in &names {
            let path = dir.join(name);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok(Some((path, config)));
            }
        }
        Ok(None)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval_ms < 250 {
            return Err(ConfigError::IntervalTooShort);
        }
        if self.page_size == 0 {
            return Err(ConfigError::EmptyPage);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DevscopeConfig::parse("{}").unwrap();
        assert_eq!(config.scan_interval_ms, 2_000);
        assert!(config.correlate_ports);
        assert!(config.candidate_ports.contains(&5432));
        assert!(config.process_keywords.iter().any(|k| k == "node"));
    }

    #[test]
    fn test_partial_override() {
        let config = DevscopeConfig::parse(
            "scan_interval_ms: 5000\ncorrelate_ports: false\nprocess_keywords: [deno]\n",
        )
        .unwrap();

        assert_eq!(config.scan_interval_ms, 5_000);
        assert!(!config.correlate_ports);
        assert_eq!(config.process_keywords, vec!["deno".to_string()]);
        // Untouched fields keep defaults.
        assert_eq!(config.log_tail, 100);
    }

    #[test]
    fn test_interval_floor_rejected() {
        assert!(DevscopeConfig::parse("scan_interval_ms: 100").is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(DevscopeConfig::parse("page_size: 0").is_err());
    }
}
