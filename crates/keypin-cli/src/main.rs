//! Keypin - command-line wiring for the keypad PIN manager
//!
//! Loads the keypad configuration, opens the PIN file and either runs one
//! administrative command or drives an interactive keypad session.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod keypad;

use commands::Cli;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries keypad output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keypin=info,keypin_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = commands::run(cli) {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
