use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use sundai_cache::{Method, RetentionPolicy};

#[derive(Parser)]
#[command(
    name = "sundai",
    version,
    about = "Offline app-shell cache for the SunDAI vault page"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// YAML cache configuration (defaults apply when omitted)
    #[arg(long, global = true, env = "SUNDAI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory of the persistent stores
    #[arg(long, global = true, env = "SUNDAI_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Precache the asset manifest into the current generation's store
    Install(InstallArgs),
    /// Route one request through the cache
    Fetch(FetchArgs),
    /// List stores and their entry counts
    Stores(StoresArgs),
    /// Delete previous generations of this cache
    Prune(PruneArgs),
    Version,
}

#[derive(Args, Clone, Debug)]
pub struct InstallArgs {
    /// Only precache; leave old generations and clients alone
    #[arg(long)]
    pub no_activate: bool,
}

#[derive(Args, Clone, Debug)]
pub struct FetchArgs {
    /// Path relative to the scope (or an absolute URL)
    pub path: String,

    /// Treat the request as a page navigation
    #[arg(long)]
    pub navigate: bool,

    /// Simulate a disabled network
    #[arg(long)]
    pub offline: bool,

    #[arg(long, default_value = "GET")]
    pub method: Method,

    /// Write the body here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct StoresArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct PruneArgs {
    /// Generations to keep: all, current, or a number of previous ones
    #[arg(long, default_value = "current")]
    pub keep: RetentionPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_args_parse() {
        let cli = Cli::parse_from([
            "sundai",
            "fetch",
            "./a.json",
            "--offline",
            "--method",
            "post",
            "--cache-dir",
            "/tmp/sundai",
        ]);
        assert_eq!(cli.global.cache_dir, Some(PathBuf::from("/tmp/sundai")));
        match cli.cmd {
            Command::Fetch(args) => {
                assert_eq!(args.path, "./a.json");
                assert!(args.offline);
                assert!(!args.navigate);
                assert_eq!(args.method, Method::Post);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_prune_keep_parse() {
        let cli = Cli::parse_from(["sundai", "prune", "--keep", "2"]);
        match cli.cmd {
            Command::Prune(args) => assert_eq!(args.keep, RetentionPolicy::KeepRecent(2)),
            _ => panic!("expected prune"),
        }

        let cli = Cli::parse_from(["sundai", "prune"]);
        match cli.cmd {
            Command::Prune(args) => assert_eq!(args.keep, RetentionPolicy::CurrentOnly),
            _ => panic!("expected prune"),
        }

        assert!(Cli::try_parse_from(["sundai", "prune", "--keep", "sometimes"]).is_err());
    }
}
