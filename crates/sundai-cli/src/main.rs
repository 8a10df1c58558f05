use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
pub mod exit_codes;

use cli::args::Cli;
use cli::commands::dispatch;
use sundai_cache::CacheError;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    // Logs go to stderr; stdout carries fetched bodies and listings.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            e.downcast_ref::<CacheError>()
                .map(CacheError::exit_code)
                .unwrap_or(exit_codes::INTERNAL_ERROR)
        }
    };
    std::process::exit(code);
}
