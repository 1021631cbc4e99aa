//! Keypad entry session
//!
//! Drives one keypad: buffers pressed digits, checks complete entries against
//! the [`PinStore`], and runs the change/delete workflow for a single PIN
//! position. Every output goes to the [`KeypadObserver`].
//!
//! # States
//!
//! - [`EntryMode::Idle`]: digits accumulate as a login attempt and are
//!   checked as soon as `pin_length` digits have been entered.
//! - [`EntryMode::Changing`]: digits accumulate as the replacement code for
//!   one position, capped at `pin_length`, until saved, deleted or cancelled.
//!
//! The buffer is cleared on every mode transition.

use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::config::KeypadConfig;
use crate::error::Result;
use crate::events::{KeypadEvent, KeypadObserver};
use crate::storage::PinPersistence;
use crate::store::PinStore;

/// Shown after an entry matched nothing
pub const INVALID_PIN_MESSAGE: &str = "Invalid PIN Entered. Please try again.";

/// What the digit buffer is currently collecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryMode {
    /// Collecting a login attempt
    #[default]
    Idle,
    /// Collecting a new code for this position
    Changing(u32),
}

impl EntryMode {
    /// Position being edited, if any
    pub fn editing_position(&self) -> Option<u32> {
        match self {
            EntryMode::Idle => None,
            EntryMode::Changing(position) => Some(*position),
        }
    }

    pub fn is_changing(&self) -> bool {
        matches!(self, EntryMode::Changing(_))
    }
}

/// PIN manager for a single keypad
pub struct EntrySession<O, P> {
    /// All PINs, exclusively owned for the session's lifetime
    store: PinStore,
    config: KeypadConfig,
    /// Digits entered so far
    buffer: Zeroizing<String>,
    mode: EntryMode,
    /// Show digits instead of mask characters
    reveal: bool,
    /// Current advisory message
    message: String,
    observer: O,
    persistence: P,
}

impl<O, P> EntrySession<O, P>
where
    O: KeypadObserver,
    P: PinPersistence,
{
    /// Create a session over an already loaded store
    ///
    /// The configured backdoor code replaces whatever the store holds.
    pub fn new(config: KeypadConfig, mut store: PinStore, observer: O, persistence: P) -> Self {
        store.set_backdoor_code(config.backdoor_code.clone());
        Self {
            store,
            config,
            buffer: Zeroizing::new(String::new()),
            mode: EntryMode::Idle,
            reveal: false,
            message: String::new(),
            observer,
            persistence,
        }
    }

    /// Create a session and load the store through `persistence`
    ///
    /// A missing or blank PIN file gives an empty store. Unparsable content
    /// is a configuration error.
    pub fn open(config: KeypadConfig, persistence: P, observer: O) -> Result<Self> {
        let mut session = Self::new(config, PinStore::new(), observer, persistence);
        session.reload()?;
        Ok(session)
    }

    /// Reset to idle and report stored PINs of the wrong length
    ///
    /// The report is advisory only; wrong-length PINs stay stored and can
    /// never match a keypad entry.
    pub fn init(&mut self) {
        self.set_mode(EntryMode::Idle);

        let pin_length = self.config.pin_length;
        let backdoor = self.store.backdoor();
        if !backdoor.code.is_empty() && !backdoor.has_length(pin_length) {
            warn!("Backdoor PIN length does not match pin_length {}", pin_length);
            self.set_message(format!(
                "Backdoor PIN is not correct length. Must be exactly Pin_Length ({} digits).",
                pin_length
            ));
            return;
        }

        let invalid = self.store.length_violations(pin_length);
        if invalid.is_empty() {
            return;
        }

        let positions = invalid
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        warn!("PINs at positions {} do not match pin_length {}", positions, pin_length);
        self.set_message(format!(
            "The following PIN(s) are invalid and will not work: #{}. Must be exactly Pin_Length ({} digits).",
            positions, pin_length
        ));
    }

    /// Append a digit; `digit` is taken modulo 10 so a "10" key yields 0
    pub fn press_digit(&mut self, digit: u16) {
        let digit = char::from_digit(u32::from(digit % 10), 10).unwrap_or('0');
        self.buffer.push(digit);
        self.render();

        let pin_length = self.config.pin_length;
        match self.mode {
            EntryMode::Changing(_) => {
                if self.buffer.len() > pin_length {
                    self.keep_prefix(pin_length);
                    self.render();
                }
            }
            EntryMode::Idle => {
                if self.buffer.len() >= pin_length {
                    self.check_entered_pin();
                }
            }
        }
    }

    /// Remove the last entered digit
    pub fn press_backspace(&mut self) {
        if let Some(last) = self.buffer.len().checked_sub(1) {
            self.keep_prefix(last);
            self.render();
        }
    }

    /// Cancel change mode, or clear the current entry
    pub fn press_clear(&mut self) {
        if self.mode.is_changing() {
            debug!("Change cancelled");
            self.notify(KeypadEvent::ChangeCancelled);
            self.set_mode(EntryMode::Idle);
        } else {
            self.clear();
        }
    }

    /// Start editing the PIN at `position`
    ///
    /// Switching from another position discards the unsaved digits.
    /// Selecting the position already being edited changes nothing.
    pub fn press_change_pin(&mut self, position: u32) {
        if position == 0 {
            warn!("Ignoring change request for reserved position 0");
            return;
        }
        let next = EntryMode::Changing(position);
        if self.mode == next {
            return;
        }

        debug!("Changing PIN at position {}", position);
        self.clear();
        self.set_mode(next);
        self.set_message(format!(
            "Please enter new {}-digit PIN",
            self.config.pin_length
        ));
    }

    /// Save the entered digits as the new PIN for the edited position
    ///
    /// Too few digits leaves the session in change mode with the buffer
    /// intact. The store is persisted before the session returns to idle; a
    /// failed write restores the previous PIN and stays in change mode.
    pub fn press_save_pin(&mut self) -> Result<()> {
        let EntryMode::Changing(position) = self.mode else {
            debug!("Save pressed outside change mode");
            return Ok(());
        };

        let pin_length = self.config.pin_length;
        if self.buffer.len() < pin_length {
            self.set_message(format!(
                "PIN must be {} digits. Please enter more digits.",
                pin_length
            ));
            return Ok(());
        }

        let code: String = self.buffer.chars().take(pin_length).collect();
        let previous = self.store.get(position).map(|entry| entry.code.clone());
        self.store.entry_at(position).code = code;
        if let Err(e) = self.persist() {
            warn!("Failed to save PIN at position {}: {}", position, e);
            match previous {
                Some(code) => self.store.entry_at(position).code = code,
                None => {
                    self.store.delete(position);
                }
            }
            return Err(e);
        }

        self.set_mode(EntryMode::Idle);
        info!("PIN at position {} changed", position);
        self.notify(KeypadEvent::ChangeSuccessful);
        Ok(())
    }

    /// Delete the PIN for the edited position
    ///
    /// Reports [`KeypadEvent::ChangeCancelled`]; there is no separate
    /// deletion signal. A failed write puts the PIN back and stays in
    /// change mode.
    pub fn press_delete_pin(&mut self) -> Result<()> {
        let EntryMode::Changing(position) = self.mode else {
            return Ok(());
        };

        let removed = self.store.delete(position);
        if let Err(e) = self.persist() {
            warn!("Failed to delete PIN at position {}: {}", position, e);
            if let Some(entry) = removed {
                self.store.entry_at(position).code = entry.code;
            }
            return Err(e);
        }

        self.set_mode(EntryMode::Idle);
        info!("PIN at position {} deleted", position);
        self.notify(KeypadEvent::ChangeCancelled);
        Ok(())
    }

    /// Show digits in clear (`true`) or masked (`false`)
    pub fn set_reveal(&mut self, reveal: bool) {
        self.reveal = reveal;
        self.render();
    }

    pub fn reveal(&self) -> bool {
        self.reveal
    }

    /// Whether `code` matches the backdoor or any stored PIN
    pub fn is_valid(&self, code: &str) -> bool {
        self.store.is_valid(code)
    }

    /// Whether `code` matches the PIN at `position` (0 for the backdoor)
    pub fn is_valid_at(&self, code: &str, position: u32) -> bool {
        self.store.is_valid_at(code, position)
    }

    /// Re-read the PIN list through the persistence backend
    pub fn reload(&mut self) -> Result<()> {
        match self.persistence.read()? {
            Some(contents) => self.store.load(&contents)?,
            None => self.store.load("")?,
        }
        info!("Loaded {} PINs", self.store.count());
        Ok(())
    }

    /// Replace stored PINs from a comma-separated list and persist
    pub fn import_csv(&mut self, pins_csv: &str) -> Result<()> {
        self.store.load_csv(pins_csv)?;
        info!("Imported {} PINs", self.store.count());
        self.persist()
    }

    /// Write the current store through the persistence backend
    pub fn persist(&mut self) -> Result<()> {
        let serialized = self.store.serialize()?;
        self.persistence.write(&serialized)
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    /// Position being edited, 0 when idle
    pub fn editing_position(&self) -> u32 {
        self.mode.editing_position().unwrap_or(0)
    }

    /// Digits entered so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Buffer as it should appear on the display
    pub fn display_text(&self) -> String {
        if self.reveal {
            self.buffer.as_str().to_owned()
        } else {
            std::iter::repeat(self.config.mask_char)
                .take(self.buffer.chars().count())
                .collect()
        }
    }

    pub fn config(&self) -> &KeypadConfig {
        &self.config
    }

    pub fn store(&self) -> &PinStore {
        &self.store
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Evaluate a complete entry, then clear it whatever the outcome
    fn check_entered_pin(&mut self) {
        let matched = self
            .store
            .find_match(&self.buffer)
            .map(|entry| (entry.is_backdoor, entry.position));
        self.clear();

        match matched {
            Some((true, _)) => {
                info!("Backdoor PIN entered");
                self.notify(KeypadEvent::ValidPinEntered);
                self.notify(KeypadEvent::BackdoorPinEntered);
            }
            Some((false, position)) => {
                info!("Valid PIN entered for position {}", position);
                self.notify(KeypadEvent::ValidPinEntered);
                self.notify(KeypadEvent::ValidPinAt(position));
            }
            None => {
                warn!("Invalid PIN entered");
                self.set_message(INVALID_PIN_MESSAGE.to_string());
                self.notify(KeypadEvent::InvalidPinEntered);
            }
        }
    }

    /// Move to `next`, updating indicators
    ///
    /// Leaving one position for anything else clears the buffer.
    fn set_mode(&mut self, next: EntryMode) {
        if let EntryMode::Changing(old) = self.mode {
            self.notify(KeypadEvent::PositionChanging {
                position: old,
                active: false,
            });
            if next != self.mode {
                self.clear();
            }
        }
        if let EntryMode::Changing(position) = next {
            self.notify(KeypadEvent::PositionChanging {
                position,
                active: true,
            });
        }
        self.mode = next;
        self.notify(KeypadEvent::ChangingActive(next.is_changing()));
    }

    /// Shorten the buffer to `len` bytes
    ///
    /// The old allocation is wiped on drop, dropped digits included.
    fn keep_prefix(&mut self, len: usize) {
        let kept = Zeroizing::new(self.buffer[..len].to_owned());
        self.buffer = kept;
    }

    fn clear(&mut self) {
        self.buffer.zeroize();
        self.set_message(String::new());
        self.render();
    }

    fn set_message(&mut self, message: String) {
        self.message = message.clone();
        self.notify(KeypadEvent::Message(message));
    }

    fn render(&mut self) {
        let text = self.display_text();
        self.notify(KeypadEvent::Display(text));
    }

    fn notify(&mut self, event: KeypadEvent) {
        self.observer.notify(event);
    }
}
