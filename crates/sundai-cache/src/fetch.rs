//! Network capability.

use async_trait::async_trait;

use crate::error::{CacheError, CacheResult};
use crate::types::{AssetRequest, AssetResponse};

/// Performs a network fetch for an intercepted request.
///
/// Any HTTP status is a response. Only transport failures are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &AssetRequest) -> CacheResult<AssetResponse>;
}

/// Fetcher for a disabled network: every fetch fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(&self, request: &AssetRequest) -> CacheResult<AssetResponse> {
        Err(CacheError::Network {
            message: format!("offline: {} {}", request.method, request.url),
        })
    }
}
