use clap::{Parser, Subcommand};

use crate::dashboard::SummaryArgs;
use crate::screener::ScreenArgs;
use crate::server::ServeArgs;

#[derive(Debug, Parser)]
#[command(author, version, about = "Mock stock analysis dashboard service")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn command(self) -> Command {
        self.command.unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the API server with the simulated refresh loop
    Serve(ServeArgs),
    /// Run one screener query and print a table or write CSV
    Screen(ScreenArgs),
    /// Print the market summary for a generated universe
    Summary(SummaryArgs),
}
