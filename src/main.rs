mod auth;
mod cli;
mod config;
mod dashboard;
mod error;
mod format;
mod models;
mod services;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting Flash - CI build status dashboard");
    cli.execute().await?;

    Ok(())
}
