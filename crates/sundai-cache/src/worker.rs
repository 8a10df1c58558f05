//! The offline cache worker: install, activate, fetch interception.

use std::fmt;

use futures::future::try_join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::clients::Clients;
use crate::config::{CacheConfig, RetentionPolicy};
use crate::error::{CacheError, CacheResult};
use crate::fetch::Fetcher;
use crate::policy::{self, FetchPlan};
use crate::storage::{CacheStorage, StoreInfo};
use crate::types::{AssetRequest, AssetResponse, FetchOutcome, RequestKey, ResponseSource};

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the worker will never control pages.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub store: String,
    pub entries: usize,
}

/// Result of activation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivateReport {
    /// Previous generations deleted by the retention policy.
    pub pruned: Vec<String>,
    /// Pages that switched to this generation.
    pub claimed: usize,
}

/// Result of [`OfflineCache::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub install: InstallReport,
    /// `None` when the worker waits instead of activating.
    pub activate: Option<ActivateReport>,
}

/// Cache-first offline worker for one generation of the app shell.
pub struct OfflineCache<F, S> {
    config: CacheConfig,
    store: String,
    base: Url,
    shell: RequestKey,
    fetcher: F,
    storage: S,
    clients: Clients,
    state: RwLock<WorkerState>,
}

impl<F, S> fmt::Debug for OfflineCache<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineCache")
            .field("store", &self.store)
            .field("base", &self.base.as_str())
            .field("shell", &self.shell)
            .finish_non_exhaustive()
    }
}

impl<F: Fetcher, S: CacheStorage> OfflineCache<F, S> {
    /// Create a worker. The configuration is validated up front.
    pub fn new(config: CacheConfig, fetcher: F, storage: S) -> CacheResult<Self> {
        config.validate()?;

        Ok(Self {
            store: config.store_name(),
            base: config.base_url(),
            shell: config.shell_key()?,
            config,
            fetcher,
            storage,
            clients: Clients::new(),
            state: RwLock::new(WorkerState::Parsed),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Name of this generation's store.
    pub fn store_name(&self) -> &str {
        &self.store
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
    }

    /// Open this generation's store and precache the whole manifest.
    ///
    /// Entries are fetched concurrently and written only if every fetch
    /// succeeded with a 2xx status. Any failure aborts the install and
    /// leaves the worker redundant.
    pub async fn install(&self) -> CacheResult<InstallReport> {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, WorkerState::Parsed | WorkerState::Redundant) {
                return Err(CacheError::Lifecycle {
                    message: format!("cannot install a worker that is {}", *state),
                });
            }
            *state = WorkerState::Installing;
        }

        info!(store = %self.store, entries = self.config.manifest.len(), "installing");

        match self.precache().await {
            Ok(report) => {
                self.set_state(WorkerState::Installed).await;
                info!(store = %self.store, entries = report.entries, "installed");
                Ok(report)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                warn!(store = %self.store, error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn precache(&self) -> CacheResult<InstallReport> {
        let requests = self.config.manifest.resolve(&self.base)?;
        self.storage.open(&self.store).await?;

        let fetches = requests.iter().map(|request| async move {
            let response =
                self.fetcher
                    .fetch(request)
                    .await
                    .map_err(|e| CacheError::InstallFailed {
                        url: request.url.to_string(),
                        reason: e.to_string(),
                    })?;

            if !response.is_ok() {
                return Err(CacheError::InstallFailed {
                    url: request.url.to_string(),
                    reason: format!("HTTP {}", response.status),
                });
            }

            Ok::<_, CacheError>((request.key(), response))
        });

        let entries: Vec<(RequestKey, AssetResponse)> = try_join_all(fetches).await?;
        self.storage.put_all(&self.store, &entries).await?;

        Ok(InstallReport {
            store: self.store.clone(),
            entries: entries.len(),
        })
    }

    /// Take over: prune old generations, then claim open pages.
    ///
    /// Activating an already active worker is a no-op.
    pub async fn activate(&self) -> CacheResult<ActivateReport> {
        {
            let mut state = self.state.write().await;
            match *state {
                WorkerState::Installed => *state = WorkerState::Activating,
                WorkerState::Activated => return Ok(ActivateReport::default()),
                other => {
                    return Err(CacheError::Lifecycle {
                        message: format!("cannot activate a worker that is {}", other),
                    })
                }
            }
        }

        let pruned = match self.prune(self.config.retention).await {
            Ok(pruned) => pruned,
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                return Err(e);
            }
        };

        let claimed = if self.config.claim_clients {
            self.clients.claim(&self.store).await
        } else {
            0
        };

        self.set_state(WorkerState::Activated).await;
        info!(
            store = %self.store,
            pruned = pruned.len(),
            claimed,
            "activated"
        );

        Ok(ActivateReport { pruned, claimed })
    }

    /// Install, then activate immediately when `skip_waiting` is set.
    pub async fn start(&self) -> CacheResult<StartReport> {
        let install = self.install().await?;

        let activate = if self.config.skip_waiting {
            Some(self.activate().await?)
        } else {
            debug!(store = %self.store, "waiting for explicit activation");
            None
        };

        Ok(StartReport { install, activate })
    }

    /// Delete previous generations of this cache according to `policy`.
    ///
    /// Only generations of this cache (`{name}-{version}`) are considered;
    /// the current store and other caches are never touched. Returns the
    /// deleted store names.
    pub async fn prune(&self, policy: RetentionPolicy) -> CacheResult<Vec<String>> {
        let previous: Vec<StoreInfo> = self
            .storage
            .stores()
            .await?
            .into_iter()
            .filter(|s| s.name != self.store && self.config.owns_store(&s.name))
            .collect();

        // `stores()` is oldest first.
        let doomed: &[StoreInfo] = match policy {
            RetentionPolicy::KeepAll => &[],
            RetentionPolicy::CurrentOnly => &previous,
            RetentionPolicy::KeepRecent(n) => &previous[..previous.len().saturating_sub(n)],
        };

        let mut pruned = Vec::with_capacity(doomed.len());
        for info in doomed {
            if self.storage.delete_store(&info.name).await? {
                info!(store = %info.name, entries = info.entries, "pruned old generation");
                pruned.push(info.name.clone());
            }
        }

        Ok(pruned)
    }

    /// Answer an intercepted request.
    ///
    /// Navigations get the cached shell, or the network response (never
    /// stored) when the shell is missing. Sub-resource GETs are served from
    /// the store, or fetched and written through on a miss. Network
    /// failures propagate unchanged.
    pub async fn handle_fetch(&self, request: &AssetRequest) -> CacheResult<FetchOutcome> {
        let cached = match policy::lookup_key(request, &self.shell) {
            Some(key) => self.lookup(&key).await?,
            None => None,
        };

        match policy::plan(request, cached) {
            FetchPlan::ServeCached(response) => {
                debug!(url = %request.url, navigate = request.is_navigation(), "cache hit");
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Cache,
                    stored: false,
                })
            }
            FetchPlan::Passthrough => {
                debug!(url = %request.url, method = %request.method, "passthrough");
                let response = self.fetcher.fetch(request).await?;
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                    stored: false,
                })
            }
            FetchPlan::FetchAndStore(key) => {
                debug!(url = %request.url, "cache miss");
                let response = self.fetcher.fetch(request).await?;

                let stored = match self.storage.put(&self.store, &key, &response).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(url = %key, error = %e, "failed to store fetched response");
                        false
                    }
                };

                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                    stored,
                })
            }
        }
    }

    /// Store lookup that evicts unreadable entries and reports them as misses.
    async fn lookup(&self, key: &RequestKey) -> CacheResult<Option<AssetResponse>> {
        match self.storage.match_entry(&self.store, key).await {
            Err(e @ (CacheError::DigestMismatch { .. } | CacheError::Storage { .. })) => {
                warn!(url = %key, error = %e, "evicting unreadable entry");
                if let Err(e) = self.storage.delete_entry(&self.store, key).await {
                    warn!(url = %key, error = %e, "failed to evict unreadable entry");
                }
                Ok(None)
            }
            other => other,
        }
    }
}
