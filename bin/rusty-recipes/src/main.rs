//! # Rusty-Recipes Binary
//!
//! The entry point that loads settings, assembles the plugins behind the
//! service layer, and runs one operator command.

mod cli;
mod commands;
mod state;
mod telemetry;

use clap::Parser;
use rr_config::Settings;

use crate::cli::Cli;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    telemetry::init(&settings.log)?;

    let state = AppState::build(&settings).await?;
    commands::run(&state, cli.command).await
}
