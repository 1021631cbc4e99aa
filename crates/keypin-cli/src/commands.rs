//! CLI command implementations

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use keypin_core::{
    EntryMode, EntrySession, FileStorage, KeypadConfig, KeypadObserver, BACKDOOR_POSITION,
};

use crate::keypad::{ConsoleObserver, KeyCommand};

/// Keypin - PIN manager for access-control keypads
#[derive(Parser)]
#[command(name = "keypin")]
#[command(about = "Manage and test keypad PINs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the keypad configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the PIN file location
    #[arg(long)]
    pub pin_file: Option<PathBuf>,

    /// Override the PIN length
    #[arg(long)]
    pub pin_length: Option<usize>,

    /// Override the backdoor PIN (empty disables it)
    #[arg(long)]
    pub backdoor: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List stored PINs
    List {
        /// Show PIN digits instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Check a PIN; exits with status 1 if it does not match
    Check {
        /// PIN to test
        pin: String,

        /// Only accept a match at this position (0 for the backdoor)
        #[arg(short, long)]
        position: Option<u32>,
    },

    /// Set the PIN at a position
    Set {
        /// 1-based position
        position: u32,

        /// New PIN digits
        pin: String,
    },

    /// Delete the PIN at a position
    Delete {
        /// 1-based position
        position: u32,
    },

    /// Replace all PINs from a comma-separated list
    ImportCsv {
        /// PINs in position order, e.g. "1234,5678"
        csv: String,
    },

    /// Report stored PINs that do not match the PIN length
    Sanity,

    /// Run an interactive keypad session on stdin
    Keypad,
}

/// Resolve configuration from file and flag overrides
fn load_config(cli: &Cli) -> Result<KeypadConfig> {
    let mut config = match &cli.config {
        Some(path) => KeypadConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match KeypadConfig::default_path() {
            Some(path) => KeypadConfig::load_or_default(&path)?,
            None => KeypadConfig::default(),
        },
    };

    if let Some(pin_file) = &cli.pin_file {
        config.pin_file = pin_file.clone();
    }
    if let Some(pin_length) = cli.pin_length {
        config.pin_length = pin_length;
    }
    if let Some(backdoor) = &cli.backdoor {
        config.backdoor_code = backdoor.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_session<O: KeypadObserver>(
    config: KeypadConfig,
    observer: O,
) -> Result<EntrySession<O, FileStorage>> {
    let storage = FileStorage::new(config.pin_file.clone());
    let path = config.pin_file.clone();
    EntrySession::open(config, storage, observer)
        .with_context(|| format!("Failed to open PIN file {}", path.display()))
}

fn parse_digits(pin: &str) -> Result<Vec<u16>> {
    pin.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => Ok(d as u16),
            None => bail!("PIN must contain only digits"),
        })
        .collect()
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::List { reveal } => {
            let session = open_session(config, ConsoleObserver::quiet())?;
            let store = session.store();
            if store.is_empty() {
                println!("No PINs configured");
            }
            for entry in store {
                let code = if reveal {
                    entry.code.clone()
                } else {
                    std::iter::repeat(session.config().mask_char)
                        .take(entry.code.chars().count())
                        .collect()
                };
                println!("#{:<3} {}", entry.position, code);
            }
        }

        Commands::Check { pin, position } => {
            let session = open_session(config, ConsoleObserver::quiet())?;
            let valid = match position {
                Some(position) => session.is_valid_at(&pin, position),
                None => session.is_valid(&pin),
            };
            if valid {
                println!("PIN is valid");
            } else {
                println!("PIN is not valid");
                process::exit(1);
            }
        }

        Commands::Set { position, pin } => {
            if position == BACKDOOR_POSITION {
                bail!("Position {} is reserved for the backdoor PIN", position);
            }
            let digits = parse_digits(&pin)?;
            if digits.len() != config.pin_length {
                bail!("PIN must be exactly {} digits", config.pin_length);
            }
            let mut session = open_session(config, ConsoleObserver::quiet())?;
            session.press_change_pin(position);
            if session.mode() != EntryMode::Changing(position) {
                bail!("Cannot edit PIN at position {}", position);
            }
            for digit in digits {
                session.press_digit(digit);
            }
            session.press_save_pin()?;
            if session.mode().is_changing() {
                bail!("{}", session.message());
            }
            println!("PIN at position {} saved", position);
        }

        Commands::Delete { position } => {
            if position == BACKDOOR_POSITION {
                bail!("Position {} is reserved for the backdoor PIN", position);
            }
            let mut session = open_session(config, ConsoleObserver::quiet())?;
            if session.store().get(position).is_none() {
                println!("No PIN at position {}", position);
                return Ok(());
            }
            session.press_change_pin(position);
            session.press_delete_pin()?;
            println!("PIN at position {} deleted", position);
        }

        Commands::ImportCsv { csv } => {
            let mut session = open_session(config, ConsoleObserver::quiet())?;
            session.import_csv(&csv)?;
            println!("Imported {} PINs", session.store().count());
        }

        Commands::Sanity => {
            let mut session = open_session(config, ConsoleObserver::quiet())?;
            session.init();
            if session.message().is_empty() {
                println!("All PINs are valid");
            } else {
                println!("{}", session.message());
            }
        }

        Commands::Keypad => {
            let mut session = open_session(config, ConsoleObserver::new(io::stdout()))?;
            session.init();
            run_keypad(&mut session, io::stdin().lock())?;
        }
    }

    Ok(())
}

/// Feed one key command per input line into the session
fn run_keypad<W: Write, R: BufRead>(
    session: &mut EntrySession<ConsoleObserver<W>, FileStorage>,
    input: R,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        match line.parse::<KeyCommand>() {
            Ok(KeyCommand::Quit) => break,
            Ok(command) => command.apply(session)?,
            Err(e) => tracing::warn!("{}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_digits() {
        assert_eq!(parse_digits("0912").unwrap(), vec![0, 9, 1, 2]);
        assert!(parse_digits("12a4").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("keypin.toml");
        std::fs::write(&config_path, "pin_length = 6\nbackdoor_code = \"111111\"\n").unwrap();

        let cli = Cli::parse_from([
            "keypin",
            "--config",
            config_path.to_str().unwrap(),
            "--pin-length",
            "4",
            "--backdoor",
            "",
            "sanity",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.pin_length, 4);
        assert!(config.backdoor_code.is_empty());
    }

    #[test]
    fn test_set_rejects_backdoor_position() {
        let temp_dir = tempdir().unwrap();
        let pin_file = temp_dir.path().join("pins.json");
        let config_path = temp_dir.path().join("keypin.toml");
        std::fs::write(&config_path, "pin_length = 4\nbackdoor_code = \"\"\n").unwrap();

        for args in [&["set", "0", "4321"][..], &["delete", "0"][..]] {
            let mut argv = vec![
                "keypin",
                "--config",
                config_path.to_str().unwrap(),
                "--pin-file",
                pin_file.to_str().unwrap(),
                "--backdoor",
                "",
            ];
            argv.extend_from_slice(args);

            let err = run(Cli::parse_from(argv)).unwrap_err();
            assert!(err.to_string().contains("reserved"));
        }
        assert!(!pin_file.exists());
    }

    #[test]
    fn test_set_saves_pin() {
        let temp_dir = tempdir().unwrap();
        let pin_file = temp_dir.path().join("pins.json");
        let config_path = temp_dir.path().join("keypin.toml");
        std::fs::write(&config_path, "pin_length = 4\nbackdoor_code = \"\"\n").unwrap();

        run(Cli::parse_from([
            "keypin",
            "--config",
            config_path.to_str().unwrap(),
            "--pin-file",
            pin_file.to_str().unwrap(),
            "set",
            "3",
            "4321",
        ]))
        .unwrap();

        let mut config = KeypadConfig::new(4, "");
        config.pin_file = pin_file;
        let session = open_session(config, ConsoleObserver::quiet()).unwrap();
        assert!(session.is_valid_at("4321", 3));
    }

    #[test]
    fn test_keypad_session_saves_pin() {
        let temp_dir = tempdir().unwrap();
        let mut config = KeypadConfig::new(4, "0000");
        config.pin_file = temp_dir.path().join("pins.json");

        let mut session = open_session(config.clone(), ConsoleObserver::new(Vec::new())).unwrap();
        let input = "change 2\n1\n2\nbogus\n3\n4\nsave\nquit\n9\n";
        run_keypad(&mut session, input.as_bytes()).unwrap();

        let reopened = open_session(config, ConsoleObserver::quiet()).unwrap();
        assert!(reopened.is_valid_at("1234", 2));
        assert_eq!(reopened.store().count(), 1);
    }
}
