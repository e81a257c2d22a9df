mod args;
mod commands;
mod config;

use services::AppServices;
use tracing::info;

use crate::args::Command;
use crate::config::{Config, init_logging, prepare_sqlite_file};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let (config, rest) = Config::from_env().apply_global_flags(argv)?;
    init_logging(&config.log_filter);

    let command = Command::parse(rest)?;
    let mut stdout = std::io::stdout();
    if command == Command::Help {
        return commands::execute(command, &AppServices::in_memory(config.clock()), &mut stdout)
            .await;
    }

    // Open + migrate SQLite here so the library crates never touch the filesystem.
    prepare_sqlite_file(&config.db_url)?;
    let app = AppServices::new_sqlite(&config.db_url, config.clock()).await?;
    info!(db = %config.db_url, fixed_clock = config.now.is_some(), "storage ready");

    commands::execute(command, &app, &mut stdout).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
