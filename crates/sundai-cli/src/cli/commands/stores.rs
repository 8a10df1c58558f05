use serde_json::json;
use sundai_cache::CacheStorage;

use super::{load_config, open_storage};
use crate::cli::args::{GlobalArgs, StoresArgs};
use crate::exit_codes::SUCCESS;

pub async fn run(global: &GlobalArgs, args: StoresArgs) -> anyhow::Result<i32> {
    let current = load_config(global)?.store_name();
    let stores = open_storage(global)?.stores().await?;

    if args.json {
        let rows: Vec<_> = stores
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "created_at": s.created_at.to_rfc3339(),
                    "entries": s.entries,
                    "current": s.name == current,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(SUCCESS);
    }

    if stores.is_empty() {
        println!("no stores");
        return Ok(SUCCESS);
    }

    for s in &stores {
        let marker = if s.name == current { "*" } else { " " };
        println!(
            "{} {:<24} {:>5} entries  created {}",
            marker,
            s.name,
            s.entries,
            s.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(SUCCESS)
}
