use sundai_cache::{OfflineCache, OfflineFetcher};

use super::{load_config, open_storage};
use crate::cli::args::{GlobalArgs, PruneArgs};
use crate::exit_codes::SUCCESS;

pub async fn run(global: &GlobalArgs, args: PruneArgs) -> anyhow::Result<i32> {
    // Pruning never touches the network.
    let cache = OfflineCache::new(load_config(global)?, OfflineFetcher, open_storage(global)?)?;
    let pruned = cache.prune(args.keep).await?;

    if pruned.is_empty() {
        println!("nothing to prune");
    }
    for store in &pruned {
        println!("pruned {}", store);
    }

    Ok(SUCCESS)
}
