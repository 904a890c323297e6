use std::net::SocketAddr;

use anyhow::Context as _;
use clap::Parser as _;
use photos::{Cli, init_tracing, run_command, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    match &cli.command {
        Some(command) => run_command(&cli, command).await,
        None => {
            let addr: SocketAddr = cli
                .bind
                .parse()
                .with_context(|| format!("invalid bind address: {}", cli.bind))?;
            run_server(addr, &cli).await
        }
    }
}
