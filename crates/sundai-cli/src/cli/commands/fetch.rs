use std::io::Write;

use anyhow::Context;
use sundai_cache::{
    AssetRequest, CacheStorage, Fetcher, HttpFetcher, OfflineCache, OfflineFetcher, RequestMode,
};
use tracing::info;

use super::{load_config, open_storage};
use crate::cli::args::{FetchArgs, GlobalArgs};
use crate::exit_codes::SUCCESS;

pub async fn run(global: &GlobalArgs, args: FetchArgs) -> anyhow::Result<i32> {
    let config = load_config(global)?;
    let storage = open_storage(global)?;

    if args.offline {
        let cache = OfflineCache::new(config, OfflineFetcher, storage)?;
        route(&cache, &args).await
    } else {
        let fetcher = HttpFetcher::new(config.network.clone())?;
        let cache = OfflineCache::new(config, fetcher, storage)?;
        route(&cache, &args).await
    }
}

async fn route<F: Fetcher, S: CacheStorage>(
    cache: &OfflineCache<F, S>,
    args: &FetchArgs,
) -> anyhow::Result<i32> {
    let mut request = AssetRequest::resolve(&cache.config().base_url(), &args.path)?
        .with_method(args.method);
    if args.navigate {
        request = request.with_mode(RequestMode::Navigate);
    }

    let outcome = cache.handle_fetch(&request).await?;
    info!(
        url = %request.url,
        status = outcome.response.status,
        source = %outcome.source,
        stored = outcome.stored,
        bytes = outcome.response.body.len(),
        "served"
    );

    match &args.output {
        Some(path) => tokio::fs::write(path, &outcome.response.body)
            .await
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&outcome.response.body)?;
            stdout.flush()?;
        }
    }

    Ok(SUCCESS)
}
