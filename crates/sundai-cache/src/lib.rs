//! Offline asset cache for the SunDAI app shell.
//!
//! This crate implements the cache-first worker that lets the SunDAI vault
//! page run as an installable app shell:
//!
//! - Versioned stores (`{name}-{version}`) populated from a fixed manifest
//! - Cache-first fetch handling with write-through on misses
//! - Navigation fallback to the cached shell, even offline
//! - Eager activation with optional pruning of old generations
//!
//! Network and storage are injected capabilities ([`Fetcher`],
//! [`CacheStorage`]), so the decision logic runs the same against a live
//! origin, a mock server or a disabled network.
//!
//! # Quick Start
//!
//! ```no_run
//! use sundai_cache::{AssetRequest, CacheConfig, DiskStorage, HttpFetcher, OfflineCache};
//!
//! # async fn example() -> Result<(), sundai_cache::CacheError> {
//! let config = CacheConfig::from_env()?;
//! let fetcher = HttpFetcher::new(config.network.clone())?;
//! let cache = OfflineCache::new(config, fetcher, DiskStorage::from_env()?)?;
//!
//! // Precache the manifest and take over immediately
//! cache.start().await?;
//!
//! let request = AssetRequest::resolve(&cache.config().base_url(), "vault-abi.json")?;
//! let outcome = cache.handle_fetch(&request).await?;
//! println!("{} bytes from {}", outcome.response.body.len(), outcome.source);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SUNDAI_CACHE_NAME` | Cache name prefix (default: `sundai`) |
//! | `SUNDAI_CACHE_VERSION` | Generation tag (default: `v6`) |
//! | `SUNDAI_SCOPE` | Base URL manifest paths resolve against |
//! | `SUNDAI_CACHE_DIR` | Disk storage root |
//! | `SUNDAI_HTTP_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `SUNDAI_HTTP_MAX_RETRIES` | Transport retries (default: 0) |

pub mod client;
pub mod clients;
pub mod config;
mod digest;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod policy;
pub mod storage;
pub mod types;
pub mod worker;

// Re-export main types
pub use client::{HttpFetcher, FETCHER_USER_AGENT};
pub use clients::{Client, Clients};
pub use config::{
    CacheConfig, NetworkConfig, RetentionPolicy, DEFAULT_CACHE_NAME, DEFAULT_CACHE_VERSION,
    DEFAULT_SHELL,
};
pub use error::{CacheError, CacheResult};
pub use fetch::{Fetcher, OfflineFetcher};
pub use manifest::{AssetManifest, DEFAULT_MANIFEST};
pub use policy::FetchPlan;
pub use storage::{CacheStorage, DiskStorage, MemoryStorage, StoreInfo};
pub use types::{
    AssetRequest, AssetResponse, FetchOutcome, Method, RequestKey, RequestMode, ResponseSource,
};
pub use worker::{ActivateReport, InstallReport, OfflineCache, StartReport, WorkerState};
