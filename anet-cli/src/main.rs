//! anet CLI - gated annual net assimilation from daily simulation output.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "anet",
    version,
    about = "Annual net assimilation aggregation toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: anet_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    log::debug!("anet {}", env!("CARGO_PKG_VERSION"));
    anet_cmd::run(cli.command)
}
