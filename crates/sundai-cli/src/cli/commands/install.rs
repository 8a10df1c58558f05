use sundai_cache::{HttpFetcher, OfflineCache};
use tracing::info;

use super::{load_config, open_storage};
use crate::cli::args::{GlobalArgs, InstallArgs};
use crate::exit_codes::SUCCESS;

pub async fn run(global: &GlobalArgs, args: InstallArgs) -> anyhow::Result<i32> {
    let config = load_config(global)?;
    let config = config.with_skip_waiting(!args.no_activate);
    let fetcher = HttpFetcher::new(config.network.clone())?;
    let cache = OfflineCache::new(config, fetcher, open_storage(global)?)?;

    info!(store = cache.store_name(), scope = %cache.config().base_url(), "installing app shell");
    let report = cache.start().await?;

    println!(
        "installed {} ({} entries)",
        report.install.store, report.install.entries
    );
    match report.activate {
        Some(activate) => {
            for store in &activate.pruned {
                println!("pruned {}", store);
            }
            println!("activated {}", report.install.store);
        }
        None => println!("waiting: {} not activated", report.install.store),
    }

    Ok(SUCCESS)
}
