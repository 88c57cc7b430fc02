use clap::Parser;

use crate::cli::App;

mod cli;
mod commands;
mod config;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let app = App::parse();
    commands::run(app).await
}
