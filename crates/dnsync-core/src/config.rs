//! Configuration types for the dnsync system
//!
//! Configuration is always passed in explicitly; nothing in the
//! reconciliation path reads the environment.

use serde::{Deserialize, Serialize};

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote store configuration
    pub provider: ProviderConfig,

    /// History source configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            history: HistoryConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.history.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Remote store configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare API v4
    Cloudflare {
        /// API token with Zone:DNS:Edit permission
        api_token: String,
        /// Zone holding every managed record
        zone_id: String,
    },

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// The token must never reach logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare { zone_id, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, zone_id } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if zone_id.is_empty() {
                    return Err(crate::Error::config("Cloudflare zone ID cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom provider factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom provider config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// History source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryConfig {
    /// Git repository checked out on disk
    Git {
        /// Repository root
        #[serde(default = "default_repo_dir")]
        repo_dir: String,
        /// Directory holding declaration files, relative to the root
        #[serde(default = "default_records_dir")]
        records_dir: String,
        /// Start of the range; unresolvable means "no history"
        #[serde(default = "default_base_ref")]
        base_ref: String,
        /// End of the range
        #[serde(default = "default_head_ref")]
        head_ref: String,
    },

    /// Custom history source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl HistoryConfig {
    /// Validate the history configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            HistoryConfig::Git {
                records_dir,
                base_ref,
                head_ref,
                ..
            } => {
                if records_dir.trim_matches('/').is_empty() {
                    return Err(crate::Error::config("Records directory cannot be empty"));
                }
                if base_ref.is_empty() || head_ref.is_empty() {
                    return Err(crate::Error::config("Git refs cannot be empty"));
                }
                Ok(())
            }
            HistoryConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom history factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the history source type name
    pub fn type_name(&self) -> &str {
        match self {
            HistoryConfig::Git { .. } => "git",
            HistoryConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig::Git {
            repo_dir: default_repo_dir(),
            records_dir: default_records_dir(),
            base_ref: default_base_ref(),
            head_ref: default_head_ref(),
        }
    }
}

fn default_repo_dir() -> String {
    ".".to_string()
}

fn default_records_dir() -> String {
    "records".to_string()
}

fn default_base_ref() -> String {
    "HEAD~1".to_string()
}

fn default_head_ref() -> String {
    "HEAD".to_string()
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name groups applied concurrently; 1 means strictly sequential
    ///
    /// Provider APIs rate-limit and a run rarely holds more than a handful
    /// of ops, so sequential is the default.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Perform lookups but only log mutations
    #[serde(default)]
    pub dry_run: bool,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_workers == 0 {
            return Err(crate::Error::config("max_workers must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            dry_run: false,
        }
    }
}

fn default_max_workers() -> usize {
    1
}
