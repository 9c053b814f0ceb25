mod cli;
mod commands;
mod config;
mod controller;
mod logging;
mod model;
mod state;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let mut args = cli::Cli::parse();
    let command = args
        .command
        .take()
        .unwrap_or(cli::Command::Tui { date: None });
    let session = commands::Session::resolve(&args)?;
    let _log_guard = logging::init(&logging::default_dir()?, &session.config.log)?;
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { date } => commands::list(&session, date),
        cli::Command::Add { text, date } => commands::add(&session, text, date),
        cli::Command::Edit { number, text, date } => {
            commands::edit(&session, number, text, date)
        }
        cli::Command::Delete { number, date } => commands::delete(&session, number, date),
        cli::Command::Days => commands::days(&session),
        cli::Command::Tui { date } => commands::tui(&session, date),
    }
}
