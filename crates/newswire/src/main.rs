use anyhow::Result;
use clap::Parser;

use newswire::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let data_dir = cli::data_dir(args.data_dir)?;

    dispatch(args.command, &data_dir).await
}

async fn dispatch(command: Commands, data_dir: &std::path::Path) -> Result<()> {
    match command {
        Commands::Register { url, interval } => {
            cli::feeds::run_register(data_dir, &url, interval).await
        }
        Commands::Deregister { url } => cli::feeds::run_deregister(data_dir, &url),
        Commands::Pause { url } => cli::feeds::run_set_active(data_dir, &url, false),
        Commands::Resume { url } => cli::feeds::run_set_active(data_dir, &url, true),
        Commands::Feeds => cli::feeds::run_list(data_dir),
        Commands::Search { term, kind } => cli::search::run(data_dir, &term, kind.as_deref()),
        Commands::Ingest { url } => cli::ingest::run(data_dir, &url).await,
        Commands::Run => cli::run::run(data_dir).await,
    }
}
