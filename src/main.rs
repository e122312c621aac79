use anyhow::Result;
use clap::Parser;
use stock_dashboard::cli::{Cli, Command};
use stock_dashboard::{dashboard, screener, server};

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command() {
        Command::Serve(args) => server::run(args).await,
        Command::Screen(args) => screener::run(args),
        Command::Summary(args) => dashboard::run(args),
    }
}
