use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::client::{ClientSettings, DEFAULT_ENDPOINT};
use crate::error::WebmentionError;

pub const DEFAULT_CONFIG_FILE: &str = "webmentions.json";
pub const DEFAULT_STATE_FILE: &str = "./fetch.webmentions.state";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// On-disk configuration. Every field is optional; command-line flags fill in
/// or override whatever is set here.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub destination: Option<Utf8PathBuf>,
    #[serde(default)]
    pub state_file: Option<Utf8PathBuf>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Values set in `overrides` win over values in `self`.
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            domain: overrides.domain.or(self.domain),
            token: overrides.token.or(self.token),
            destination: overrides.destination.or(self.destination),
            state_file: overrides.state_file.or(self.state_file),
            page_size: overrides.page_size.or(self.page_size),
            endpoint: overrides.endpoint.or(self.endpoint),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub domain: String,
    pub token: String,
    pub destination: Utf8PathBuf,
    pub state_file: Utf8PathBuf,
    pub page_size: u32,
    pub endpoint: String,
    pub timeout: Duration,
}

impl ResolvedConfig {
    pub fn client_settings(&self, since_id: u64) -> ClientSettings {
        ClientSettings {
            endpoint: self.endpoint.clone(),
            domain: self.domain.clone(),
            token: self.token.clone(),
            since_id,
            page_size: self.page_size,
            timeout: self.timeout,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file at `path`, or `webmentions.json` if it exists,
    /// and resolves it against the command-line `overrides`.
    pub fn resolve(path: Option<&str>, overrides: Config) -> Result<ResolvedConfig, WebmentionError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let file_config = if path.is_none() && !config_path.as_std_path().exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(config_path.as_std_path())
                .map_err(|_| WebmentionError::ConfigRead(config_path.as_std_path().to_path_buf()))?;
            serde_json::from_str(&content)
                .map_err(|err| WebmentionError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(file_config.merge(overrides))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, WebmentionError> {
        let domain = required(config.domain, "domain")?;
        let token = required(config.token, "token")?;
        let destination = config
            .destination
            .filter(|path| !path.as_str().trim().is_empty())
            .ok_or_else(|| WebmentionError::InvalidConfig("destination is required".to_string()))?;

        let page_size = config.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(WebmentionError::InvalidConfig(
                "page size must be greater than zero".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            domain,
            token,
            destination,
            state_file: config
                .state_file
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_STATE_FILE)),
            page_size,
            endpoint: config
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, WebmentionError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| WebmentionError::InvalidConfig(format!("{name} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_defaults() {
        let config = Config {
            domain: Some("example.com".to_string()),
            token: Some("secret".to_string()),
            destination: Some(Utf8PathBuf::from("data/webmentions")),
            ..Default::default()
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.page_size, 10);
        assert_eq!(resolved.state_file.as_str(), DEFAULT_STATE_FILE);
        assert_eq!(resolved.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(resolved.timeout, Duration::from_secs(30));
    }
}
