//! Keypin Core - PIN store and keypad entry state machine
//!
//! This crate holds the logic behind an access-control keypad: buffering the
//! digits a user presses, validating them against a stored set of positional
//! PINs plus a master backdoor PIN, and the administrative workflow for
//! changing or deleting individual PINs.
//!
//! The keypad/display driver and the file backend are external collaborators.
//! They talk to the core through [`KeypadObserver`] and [`PinPersistence`].

pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod store;

pub use config::KeypadConfig;
pub use entry::{PinEntry, BACKDOOR_POSITION};
pub use error::{KeypinError, Result};
pub use events::{EventLog, KeypadEvent, KeypadObserver};
pub use session::{EntryMode, EntrySession};
pub use storage::{FileStorage, MemoryStorage, PinPersistence};
pub use store::PinStore;

/// Default number of digits in a PIN
pub const DEFAULT_PIN_LENGTH: usize = 4;

/// Character shown per buffered digit while the display is masked
pub const DEFAULT_MASK_CHAR: char = '*';
