//! Fetch decision logic, free of I/O.
//!
//! The worker asks [`lookup_key`] which stored entry (if any) to consult,
//! then feeds the lookup result to [`plan`] and executes the returned
//! [`FetchPlan`] with its network and storage capabilities.
//!
//! Policy is cache-first: a stored entry is served as long as it exists.
//! Nothing is refreshed in the background; a new generation is the only
//! way to pick up changed assets.

use crate::types::{AssetRequest, AssetResponse, Method, RequestKey};

/// What to do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// Serve the stored response without touching the network.
    ServeCached(AssetResponse),
    /// Fetch from the network and return the response untouched.
    Passthrough,
    /// Fetch from the network and store a copy under the key.
    FetchAndStore(RequestKey),
}

/// Key to look up for `request`.
///
/// Navigations always look up the app shell. Non-GET requests are never
/// served from or written to a store.
pub fn lookup_key(request: &AssetRequest, shell: &RequestKey) -> Option<RequestKey> {
    if request.is_navigation() {
        Some(shell.clone())
    } else if request.method == Method::Get {
        Some(request.key())
    } else {
        None
    }
}

/// Decide how to answer `request` given the result of its lookup.
pub fn plan(request: &AssetRequest, cached: Option<AssetResponse>) -> FetchPlan {
    if let Some(response) = cached {
        return FetchPlan::ServeCached(response);
    }

    if request.is_navigation() || request.method != Method::Get {
        FetchPlan::Passthrough
    } else {
        FetchPlan::FetchAndStore(request.key())
    }
}
