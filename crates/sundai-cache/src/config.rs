//! Worker configuration.
//!
//! Everything the worker needs is carried by one immutable [`CacheConfig`]
//! value, so several generations or environments can run side by side.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CacheError, CacheResult};
use crate::manifest::{resolve_entry, AssetManifest};
use crate::types::RequestKey;

/// Default cache name prefix.
pub const DEFAULT_CACHE_NAME: &str = "sundai";

/// Default generation tag.
pub const DEFAULT_CACHE_VERSION: &str = "v6";

/// Default navigation fallback document.
pub const DEFAULT_SHELL: &str = "./index.html";

/// Which previous generations survive activation.
///
/// Written as `all`, `current` or a generation count, both in config files
/// and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RetentionRepr", into = "String")]
pub enum RetentionPolicy {
    /// Never delete old generations.
    #[default]
    KeepAll,
    /// Delete every generation except the current one.
    CurrentOnly,
    /// Keep the N most recently created previous generations.
    KeepRecent(usize),
}

impl FromStr for RetentionPolicy {
    type Err = CacheError;

    /// Parses `all`, `current` or a generation count.
    fn from_str(s: &str) -> CacheResult<Self> {
        match s.trim() {
            "all" | "keep-all" => Ok(Self::KeepAll),
            "current" | "current-only" => Ok(Self::CurrentOnly),
            n => n
                .parse::<usize>()
                .map(Self::KeepRecent)
                .map_err(|_| CacheError::Config {
                    message: format!(
                        "invalid retention policy '{}': expected all, current or a number",
                        s
                    ),
                }),
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepAll => f.write_str("all"),
            Self::CurrentOnly => f.write_str("current"),
            Self::KeepRecent(n) => write!(f, "{}", n),
        }
    }
}

impl From<RetentionPolicy> for String {
    fn from(policy: RetentionPolicy) -> Self {
        policy.to_string()
    }
}

/// Serialized form: a bare count (`retention: 2`) or a policy name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RetentionRepr {
    Count(usize),
    Name(String),
}

impl TryFrom<RetentionRepr> for RetentionPolicy {
    type Error = CacheError;

    fn try_from(repr: RetentionRepr) -> CacheResult<Self> {
        match repr {
            RetentionRepr::Count(n) => Ok(Self::KeepRecent(n)),
            RetentionRepr::Name(name) => name.parse(),
        }
    }
}

/// Network settings for the HTTP fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for transport failures.
    #[serde(default)]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    30
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: 0,
        }
    }
}

impl NetworkConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SUNDAI_HTTP_TIMEOUT` | Request timeout in seconds |
    /// | `SUNDAI_HTTP_MAX_RETRIES` | Retries for transport failures |
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    fn apply_env(self) -> Self {
        Self {
            timeout_secs: env_parse("SUNDAI_HTTP_TIMEOUT").unwrap_or(self.timeout_secs),
            max_retries: env_parse("SUNDAI_HTTP_MAX_RETRIES").unwrap_or(self.max_retries),
        }
    }
}

/// Offline cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache name prefix shared by every generation.
    #[serde(default = "default_name")]
    pub name: String,

    /// Generation tag. Bumping it creates a fresh store.
    #[serde(default = "default_version")]
    pub version: String,

    /// Base URL manifest entries resolve against.
    #[serde(default = "default_scope")]
    pub scope: Url,

    /// Assets precached on install.
    #[serde(default)]
    pub manifest: AssetManifest,

    /// App shell served for navigation requests.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Cleanup of previous generations on activation.
    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Activate right after install instead of waiting.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Take control of open clients on activation.
    #[serde(default = "default_true")]
    pub claim_clients: bool,

    #[serde(default)]
    pub network: NetworkConfig,
}

fn default_name() -> String {
    DEFAULT_CACHE_NAME.to_string()
}

fn default_version() -> String {
    DEFAULT_CACHE_VERSION.to_string()
}

fn default_scope() -> Url {
    Url::parse("http://localhost:8080/").expect("static default scope is a valid URL")
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            scope: default_scope(),
            manifest: AssetManifest::default(),
            shell: default_shell(),
            retention: RetentionPolicy::default(),
            skip_waiting: true,
            claim_clients: true,
            network: NetworkConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SUNDAI_CACHE_NAME` | Cache name prefix (default: `sundai`) |
    /// | `SUNDAI_CACHE_VERSION` | Generation tag (default: `v6`) |
    /// | `SUNDAI_SCOPE` | Base URL (default: `http://localhost:8080/`) |
    /// | `SUNDAI_HTTP_TIMEOUT` | Request timeout in seconds (default: 30) |
    /// | `SUNDAI_HTTP_MAX_RETRIES` | Transport retries (default: 0) |
    pub fn from_env() -> CacheResult<Self> {
        Self::default().apply_env()
    }

    /// Parse a YAML config. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> CacheResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| CacheError::Config {
            message: format!("failed to parse config: {}", e),
        })
    }

    /// Load a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Config {
            message: format!("failed to read config {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Override fields from `SUNDAI_*` environment variables.
    pub fn apply_env(mut self) -> CacheResult<Self> {
        if let Ok(name) = std::env::var("SUNDAI_CACHE_NAME") {
            self.name = name;
        }
        if let Ok(version) = std::env::var("SUNDAI_CACHE_VERSION") {
            self.version = version;
        }
        if let Ok(scope) = std::env::var("SUNDAI_SCOPE") {
            self.scope = Url::parse(&scope).map_err(|e| CacheError::Config {
                message: format!("invalid SUNDAI_SCOPE '{}': {}", scope, e),
            })?;
        }
        self.network = self.network.apply_env();
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_scope(mut self, scope: Url) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Identifier of the current generation's store, `{name}-{version}`.
    pub fn store_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Prefix shared by every generation of this cache.
    pub fn store_prefix(&self) -> String {
        format!("{}-", self.name)
    }

    /// Whether `store` is a generation of this cache, current or not.
    ///
    /// Versions never contain `-`, so `sundai-beta-v1` belongs to the cache
    /// named `sundai-beta` and not to `sundai`.
    pub fn owns_store(&self, store: &str) -> bool {
        store
            .strip_prefix(&self.store_prefix())
            .is_some_and(|version| !version.is_empty() && !version.contains('-'))
    }

    /// Scope as a directory URL (always ends with `/`).
    pub fn base_url(&self) -> Url {
        let mut url = self.scope.clone();
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Lookup key of the app shell.
    pub fn shell_key(&self) -> CacheResult<RequestKey> {
        Ok(resolve_entry(&self.base_url(), &self.shell)?.key())
    }

    /// Check name, version, manifest and shell invariants.
    pub fn validate(&self) -> CacheResult<()> {
        validate_segment("name", &self.name)?;
        validate_segment("version", &self.version)?;
        if self.version.contains('-') {
            return Err(CacheError::Config {
                message: format!(
                    "invalid cache version '{}': must not contain '-'",
                    self.version
                ),
            });
        }

        let base = self.base_url();
        self.manifest.resolve(&base)?;

        let shell = self.shell_key()?;
        if !self.manifest.contains(&base, &shell) {
            return Err(CacheError::Config {
                message: format!("shell document {} is not in the asset manifest", self.shell),
            });
        }

        Ok(())
    }
}

fn validate_segment(field: &str, value: &str) -> CacheResult<()> {
    if value.is_empty() || value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(CacheError::Config {
            message: format!("invalid cache {}: '{}'", field, value),
        });
    }
    Ok(())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
