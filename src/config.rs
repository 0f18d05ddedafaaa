//! Client configuration and API key resolution.
//!
//! A client is identified by the tuple (api key, cache directory, use_cache,
//! update_cache, api url). [`ClientConfig`] is the caller-facing set of
//! overrides; [`ClientConfig::resolve`] fills in everything the caller left
//! out, reading the `alveo.config` file from the user's home directory when
//! no explicit API key is supplied.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Default location of the Alveo service.
pub const DEFAULT_API_URL: &str = "https://app.alveo.edu.au";

/// Name of the credential file expected in the user's home directory.
pub const CONFIG_FILE_NAME: &str = "alveo.config";

/// Subdirectory of the user cache directory used when no cache path is given.
pub const DEFAULT_CACHE_DIR_NAME: &str = "alveo";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to resolve the user home directory")]
    FailedToFindHomeDirectory,
    #[error(
        "could not find configuration file {}; download your configuration file from {} or create a client with an explicit api key",
        path.display(),
        DEFAULT_API_URL
    )]
    MissingConfigFile { path: PathBuf },
    #[error("failed to read configuration file {}: {cause}", path.display())]
    FailedToLoadData {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },
    #[error("malformed configuration file {}: {cause}", path.display())]
    MalformedConfigFile {
        path: PathBuf,
        #[source]
        cause: serde_json::Error,
    },
    #[error("invalid API base URL {url:?}: {cause}")]
    InvalidApiUrl {
        url: String,
        #[source]
        cause: url::ParseError,
    },
}

/// On-disk representation of `~/alveo.config`, as downloaded from the Alveo
/// web application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "base_url", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(rename = "cacheDir", default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

/// Caller-supplied configuration overrides for [`crate::Client`].
///
/// Any field left unset is resolved from the credential file or from the
/// built-in defaults, so a config with no overrides resolves to exactly the
/// same [`ResolvedConfig`] as one that spells the defaults out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub use_cache: bool,
    pub update_cache: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            cache_dir: None,
            use_cache: true,
            update_cache: true,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn update_cache(mut self, update_cache: bool) -> Self {
        self.update_cache = update_cache;
        self
    }

    /// Resolve against the credential file at its default location.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigurationError> {
        let path = default_config_path()?;
        self.resolve_with_config_path(&path)
    }

    /// Resolve against a credential file at an explicit location.
    ///
    /// The file is only consulted when no explicit API key was supplied;
    /// with an explicit key a missing or unreadable file is not an error.
    pub fn resolve_with_config_path(
        self,
        config_path: &Path,
    ) -> Result<ResolvedConfig, ConfigurationError> {
        let (api_key, file) = match self.api_key {
            Some(key) => (key, None),
            None => {
                debug!("no explicit api key, loading {}", config_path.display());
                let file = load_config_file(config_path)?;
                (file.api_key.clone(), Some(file))
            }
        };

        let api_url = self
            .api_url
            .or_else(|| file.as_ref().and_then(|f| f.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = normalize_api_url(&api_url)?;

        let cache_dir = self
            .cache_dir
            .or_else(|| file.as_ref().and_then(|f| f.cache_dir.clone()))
            .unwrap_or_else(default_cache_dir);

        Ok(ResolvedConfig {
            api_key,
            api_url,
            cache_dir,
            use_cache: self.use_cache,
            update_cache: self.update_cache,
        })
    }
}

/// Fully resolved client configuration.
///
/// Two clients are interchangeable exactly when their resolved
/// configurations are equal; equality is derived over the whole tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub api_key: String,
    pub api_url: String,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
    pub update_cache: bool,
}

/// Path of the credential file in the user's home directory.
pub fn default_config_path() -> Result<PathBuf, ConfigurationError> {
    match dirs::home_dir() {
        Some(home) => Ok(home.join(CONFIG_FILE_NAME)),
        None => Err(ConfigurationError::FailedToFindHomeDirectory),
    }
}

/// Default cache location under the platform cache directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_CACHE_DIR_NAME)
}

/// Load and parse a credential file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigurationError> {
    if !path.exists() {
        return Err(ConfigurationError::MissingConfigFile {
            path: path.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(path).map_err(|cause| {
        ConfigurationError::FailedToLoadData {
            path: path.to_path_buf(),
            cause,
        }
    })?;
    serde_json::from_str(&contents).map_err(|cause| ConfigurationError::MalformedConfigFile {
        path: path.to_path_buf(),
        cause,
    })
}

/// Validate the base URL and strip any trailing slash so endpoint paths can
/// be appended uniformly.
fn normalize_api_url(api_url: &str) -> Result<String, ConfigurationError> {
    Url::parse(api_url).map_err(|cause| ConfigurationError::InvalidApiUrl {
        url: api_url.to_string(),
        cause,
    })?;
    Ok(api_url.trim_end_matches('/').to_string())
}
