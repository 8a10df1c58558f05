//! Asset manifest: the fixed, ordered list of paths precached on install.
//!
//! Entries are relative to the cache scope:
//! - `./` → the scope itself (the app shell root)
//! - `index.html`, `./index.html` → a file directly under the scope
//!
//! Absolute URLs and root-relative paths (`/x`) are rejected, as is any
//! entry that resolves outside the scope.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CacheError, CacheResult};
use crate::types::{AssetRequest, RequestKey};

/// Assets of the SunDAI mint page.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "./",
    "index.html",
    "manifest.json",
    "sundailogo.png",
    "ethers.umd.min.js",
    "vault-abi.json",
    "token-abi.json",
    "oracle-abi.json",
    "icon-192.png",
    "icon-512.png",
];

/// Ordered list of relative asset paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest(Vec<String>);

impl AssetManifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(Into::into).collect())
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve every entry against `scope`, in manifest order.
    ///
    /// Fails on an empty manifest, a non-relative entry, an entry escaping
    /// the scope, or two entries resolving to the same URL.
    pub fn resolve(&self, scope: &Url) -> CacheResult<Vec<AssetRequest>> {
        if self.0.is_empty() {
            return Err(CacheError::Config {
                message: "asset manifest is empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut requests = Vec::with_capacity(self.0.len());

        for entry in &self.0 {
            let request = resolve_entry(scope, entry)?;
            if !seen.insert(request.key()) {
                return Err(CacheError::Config {
                    message: format!("duplicate manifest entry: {}", entry),
                });
            }
            requests.push(request);
        }

        Ok(requests)
    }

    /// Whether `key` is one of the manifest's resolved entries.
    pub fn contains(&self, scope: &Url, key: &RequestKey) -> bool {
        self.0
            .iter()
            .filter_map(|entry| resolve_entry(scope, entry).ok())
            .any(|request| &request.key() == key)
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST.iter().copied())
    }
}

/// Resolve a single relative path against `scope`.
pub(crate) fn resolve_entry(scope: &Url, entry: &str) -> CacheResult<AssetRequest> {
    let trimmed = entry.trim();

    if trimmed.is_empty() {
        return Err(invalid(entry, "empty path"));
    }
    if trimmed.starts_with('/') {
        return Err(invalid(entry, "path must be relative to the scope"));
    }
    if Url::parse(trimmed).is_ok() {
        return Err(invalid(entry, "absolute URLs are not allowed"));
    }

    let request = AssetRequest::resolve(scope, trimmed)?;
    if !request.url.as_str().starts_with(scope.as_str()) {
        return Err(invalid(entry, "path resolves outside the scope"));
    }

    Ok(request)
}

fn invalid(entry: &str, reason: &str) -> CacheError {
    CacheError::InvalidRequest {
        target: entry.to_string(),
        reason: reason.to_string(),
    }
}
