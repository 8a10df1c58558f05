use anyhow::Context;
use sundai_cache::{CacheConfig, DiskStorage};

use super::args::GlobalArgs;

mod dispatch;
pub mod fetch;
pub mod install;
pub mod prune;
pub mod stores;

pub use dispatch::dispatch;

/// Config file (or defaults) with `SUNDAI_*` overrides applied.
pub(crate) fn load_config(global: &GlobalArgs) -> anyhow::Result<CacheConfig> {
    let config = match &global.config {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CacheConfig::default(),
    };
    Ok(config.apply_env()?)
}

pub(crate) fn open_storage(global: &GlobalArgs) -> anyhow::Result<DiskStorage> {
    match &global.cache_dir {
        Some(dir) => Ok(DiskStorage::with_dir(dir)),
        None => Ok(DiskStorage::new()?),
    }
}
