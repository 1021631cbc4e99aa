//! Interactive keypad over stdin/stdout
//!
//! Each input line is one key press. Every session notification is printed
//! as one output line.

use std::io::{self, Write};
use std::str::FromStr;

use keypin_core::{EntrySession, KeypadEvent, KeypadObserver, PinPersistence};
use thiserror::Error;

/// One key press from the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Digit(u16),
    Backspace,
    Clear,
    Change(u32),
    Save,
    Delete,
    Reveal(bool),
    Quit,
}

/// Unrecognized console input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown key: {0:?}")]
pub struct UnknownKey(String);

impl FromStr for KeyCommand {
    type Err = UnknownKey;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownKey(line.to_string());
        let mut words = line.split_whitespace();
        let key = words.next().ok_or_else(unknown)?;
        let arg = words.next();
        if words.next().is_some() {
            return Err(unknown());
        }

        let command = match (key, arg) {
            (digit, None) if digit.len() == 1 && digit.chars().all(|c| c.is_ascii_digit()) => {
                KeyCommand::Digit(digit.parse().map_err(|_| unknown())?)
            }
            ("back" | "backspace", None) => KeyCommand::Backspace,
            ("clear", None) => KeyCommand::Clear,
            ("change", Some(position)) => {
                KeyCommand::Change(position.parse().map_err(|_| unknown())?)
            }
            ("save", None) => KeyCommand::Save,
            ("delete", None) => KeyCommand::Delete,
            ("reveal", Some("on")) => KeyCommand::Reveal(true),
            ("reveal", Some("off")) => KeyCommand::Reveal(false),
            ("quit" | "exit", None) => KeyCommand::Quit,
            _ => return Err(unknown()),
        };
        Ok(command)
    }
}

impl KeyCommand {
    /// Press this key on `session`
    pub fn apply<O, P>(self, session: &mut EntrySession<O, P>) -> keypin_core::Result<()>
    where
        O: KeypadObserver,
        P: PinPersistence,
    {
        match self {
            KeyCommand::Digit(digit) => session.press_digit(digit),
            KeyCommand::Backspace => session.press_backspace(),
            KeyCommand::Clear => session.press_clear(),
            KeyCommand::Change(position) => session.press_change_pin(position),
            KeyCommand::Save => session.press_save_pin()?,
            KeyCommand::Delete => session.press_delete_pin()?,
            KeyCommand::Reveal(reveal) => session.set_reveal(reveal),
            KeyCommand::Quit => {}
        }
        Ok(())
    }
}

/// Prints each notification as a line
pub struct ConsoleObserver<W> {
    out: W,
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl ConsoleObserver<io::Sink> {
    /// Observer that discards everything
    pub fn quiet() -> Self {
        Self::new(io::sink())
    }
}

fn on_off(active: bool) -> &'static str {
    if active {
        "on"
    } else {
        "off"
    }
}

/// Text line for one notification
pub fn format_event(event: &KeypadEvent) -> String {
    match event {
        KeypadEvent::Display(text) => format!("display: {}", text),
        KeypadEvent::Message(text) => format!("message: {}", text),
        KeypadEvent::PositionChanging { position, active } => {
            format!("changing #{}: {}", position, on_off(*active))
        }
        KeypadEvent::ChangingActive(active) => format!("changing: {}", on_off(*active)),
        KeypadEvent::ValidPinEntered => "valid pin".to_string(),
        KeypadEvent::ValidPinAt(position) => format!("valid pin #{}", position),
        KeypadEvent::BackdoorPinEntered => "backdoor pin".to_string(),
        KeypadEvent::InvalidPinEntered => "invalid pin".to_string(),
        KeypadEvent::ChangeCancelled => "change cancelled".to_string(),
        KeypadEvent::ChangeSuccessful => "change successful".to_string(),
    }
}

impl<W: Write> KeypadObserver for ConsoleObserver<W> {
    fn notify(&mut self, event: KeypadEvent) {
        if let Err(e) = writeln!(self.out, "{}", format_event(&event)) {
            tracing::warn!("Failed to write keypad output: {}", e);
        }
    }
}
