//! PIN store
//!
//! Source of truth for every positional PIN plus the detached backdoor PIN.
//! Entries are keyed by position, so serialization is ordered by position
//! and a slot that does not exist yet is created on first write.

use std::collections::btree_map::{BTreeMap, Values};

use tracing::{debug, warn};

use crate::entry::{PinEntry, BACKDOOR_POSITION};
use crate::error::{KeypinError, Result};

/// All stored PINs
#[derive(Debug, Clone)]
pub struct PinStore {
    /// Positional entries, never containing position 0
    entries: BTreeMap<u32, PinEntry>,

    /// Master PIN, matched regardless of position
    backdoor: PinEntry,
}

impl Default for PinStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PinStore {
    /// Create an empty store with no backdoor
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            backdoor: PinEntry::backdoor(""),
        }
    }

    /// Create a store from serialized records and a backdoor code
    pub fn from_json(serialized: &str, backdoor_code: impl Into<String>) -> Result<Self> {
        let mut store = Self::new();
        store.set_backdoor_code(backdoor_code);
        store.load(serialized)?;
        Ok(store)
    }

    /// Replace every positional entry with the serialized records
    ///
    /// Blank input leaves the store empty. Anything else must parse as a
    /// record list; on failure the store is still left empty.
    pub fn load(&mut self, serialized: &str) -> Result<()> {
        self.entries.clear();

        if serialized.trim().is_empty() {
            debug!("Blank PIN data, store cleared");
            return Ok(());
        }

        let records: Vec<PinEntry> =
            serde_json::from_str(serialized).map_err(KeypinError::Configuration)?;
        self.insert_all(records);

        debug!("Loaded {} PIN entries", self.entries.len());
        Ok(())
    }

    /// Replace every positional entry from a comma-separated list
    ///
    /// The i-th field becomes position i (1-based). Non-digit characters are
    /// stripped from each field.
    pub fn load_csv(&mut self, pins_csv: &str) -> Result<()> {
        self.entries.clear();

        if pins_csv.trim().is_empty() {
            return Ok(());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(pins_csv.as_bytes());

        let mut fields = Vec::new();
        for record in reader.records() {
            let record = record?;
            fields.extend(record.iter().map(strip_non_digits));
        }

        let records = fields
            .into_iter()
            .zip(1u32..)
            .map(|(code, position)| PinEntry::new(code, position));
        self.insert_all(records);

        debug!("Imported {} PIN entries from CSV", self.entries.len());
        Ok(())
    }

    fn insert_all(&mut self, records: impl IntoIterator<Item = PinEntry>) {
        for mut record in records {
            if record.position == BACKDOOR_POSITION {
                warn!("Ignoring stored PIN at reserved position 0");
                continue;
            }
            record.is_backdoor = false;
            if let Some(previous) = self.entries.insert(record.position, record) {
                warn!("Duplicate PIN position {}, keeping the later record", previous.position);
            }
        }
    }

    /// Serialize positional entries, ordered by position, backdoor excluded
    pub fn serialize(&self) -> Result<String> {
        let records: Vec<&PinEntry> = self.entries.values().collect();
        serde_json::to_string(&records).map_err(KeypinError::Serialization)
    }

    /// Get the entry at `position`, creating an empty one if absent
    pub fn entry_at(&mut self, position: u32) -> &mut PinEntry {
        self.entries
            .entry(position)
            .or_insert_with(|| PinEntry::new("", position))
    }

    /// Look up the entry at `position` without creating it
    pub fn get(&self, position: u32) -> Option<&PinEntry> {
        self.entries.get(&position)
    }

    /// Find the entry accepting `code`, checking the backdoor first
    pub fn find_match(&self, code: &str) -> Option<&PinEntry> {
        if self.backdoor.matches(code) {
            return Some(&self.backdoor);
        }
        self.entries.values().find(|entry| entry.matches(code))
    }

    /// Whether `code` matches the backdoor or any stored PIN
    pub fn is_valid(&self, code: &str) -> bool {
        self.find_match(code).is_some()
    }

    /// Whether `code` matches the PIN at exactly `position`
    ///
    /// Position 0 checks the backdoor.
    pub fn is_valid_at(&self, code: &str, position: u32) -> bool {
        if position == BACKDOOR_POSITION {
            return self.backdoor.matches(code);
        }
        self.entries
            .get(&position)
            .is_some_and(|entry| entry.matches(code))
    }

    /// Remove the entry at `position`, returning it if present
    pub fn delete(&mut self, position: u32) -> Option<PinEntry> {
        self.entries.remove(&position)
    }

    /// Number of positional entries
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current backdoor code, empty when disabled
    pub fn backdoor_code(&self) -> &str {
        &self.backdoor.code
    }

    pub fn set_backdoor_code(&mut self, code: impl Into<String>) {
        self.backdoor.code = code.into();
    }

    /// The detached backdoor entry
    pub fn backdoor(&self) -> &PinEntry {
        &self.backdoor
    }

    /// Iterate positional entries
    pub fn iter(&self) -> Values<'_, u32, PinEntry> {
        self.entries.values()
    }

    /// Positions whose code length differs from `pin_length`
    pub fn length_violations(&self, pin_length: usize) -> Vec<u32> {
        self.iter()
            .filter(|entry| !entry.has_length(pin_length))
            .map(|entry| entry.position)
            .collect()
    }
}

impl<'a> IntoIterator for &'a PinStore {
    type Item = &'a PinEntry;
    type IntoIter = Values<'a, u32, PinEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn strip_non_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PINS: &str = r#"[{"Pin":"5678","Position":2},{"Pin":"1234","Position":1}]"#;

    fn sample_store() -> PinStore {
        PinStore::from_json(TWO_PINS, "0000").unwrap()
    }

    #[test]
    fn test_load_replaces_old_entries() {
        let mut store = sample_store();
        store
            .load(r#"[{"Pin":"6666","Position":1},{"Pin":"7777","Position":2}]"#)
            .unwrap();

        assert!(!store.is_valid("1234"));
        assert!(store.is_valid("6666"));
        assert!(store.is_valid("7777"));
    }

    #[test]
    fn test_load_blank_clears_without_error() {
        let mut store = sample_store();
        store.load("").unwrap();
        assert_eq!(store.count(), 0);

        let mut store = sample_store();
        store.load("  \n\t ").unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_load_malformed_is_configuration_error() {
        let mut store = sample_store();
        let result = store.load("{\"Pin\":");

        assert!(matches!(result, Err(KeypinError::Configuration(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_skips_reserved_position() {
        let mut store = PinStore::new();
        store
            .load(r#"[{"Pin":"1111","Position":0},{"Pin":"2222","Position":1}]"#)
            .unwrap();

        assert_eq!(store.count(), 1);
        assert!(!store.is_valid("1111"));
        assert!(!store.backdoor().matches("1111"));
    }

    #[test]
    fn test_load_large_position() {
        let mut store = PinStore::new();
        store
            .load(r#"[{"Pin":"1234","Position":70000}]"#)
            .unwrap();

        assert!(store.is_valid_at("1234", 70000));
        assert_eq!(
            store.serialize().unwrap(),
            r#"[{"Pin":"1234","Position":70000}]"#
        );
    }

    #[test]
    fn test_load_new_positions_active() {
        let mut store = sample_store();
        store
            .load(r#"[{"Pin":"2222","Position":1},{"Pin":"3333","Position":2},{"Pin":"4444","Position":4}]"#)
            .unwrap();

        assert!(store.is_valid("2222"));
        assert!(store.is_valid("3333"));
        assert!(store.is_valid("4444"));
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn test_empty_code_is_never_valid() {
        let store = PinStore::new();
        assert!(!store.is_valid(""));
        assert!(store.find_match("").is_none());

        let store = sample_store();
        assert!(!store.is_valid(""));
    }

    #[test]
    fn test_find_match_reports_position() {
        let store = sample_store();
        let entry = store.find_match("1234").unwrap();
        assert_eq!(entry.position, 1);
        assert!(!entry.is_backdoor);
    }

    #[test]
    fn test_backdoor_takes_precedence() {
        let store = PinStore::from_json(r#"[{"Pin":"0000","Position":3}]"#, "0000").unwrap();
        let entry = store.find_match("0000").unwrap();
        assert!(entry.is_backdoor);
        assert_eq!(entry.position, BACKDOOR_POSITION);
    }

    #[test]
    fn test_is_valid_at_position() {
        let store = sample_store();
        assert!(store.is_valid_at("5678", 2));
        assert!(!store.is_valid_at("5678", 1));
        assert!(store.is_valid_at("0000", 0));
        assert!(!store.is_valid_at("1234", 0));
        assert!(!store.is_valid_at("1234", 9));
    }

    #[test]
    fn test_entry_at_creates_missing_slot() {
        let mut store = sample_store();
        store.entry_at(5).code = "5555".to_string();

        assert_eq!(store.count(), 3);
        assert!(store.is_valid_at("5555", 5));
    }

    #[test]
    fn test_entry_at_existing_slot() {
        let mut store = sample_store();
        store.entry_at(1).code = "9999".to_string();

        assert_eq!(store.count(), 2);
        assert!(!store.is_valid("1234"));
        assert!(store.is_valid_at("9999", 1));
    }

    #[test]
    fn test_delete() {
        let mut store = sample_store();
        assert!(store.delete(2).is_some());
        assert!(!store.is_valid("5678"));
        assert_eq!(store.count(), 1);

        // Absent position is a no-op
        assert!(store.delete(2).is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_serialize_ordered_without_backdoor() {
        let store = sample_store();
        assert_eq!(
            store.serialize().unwrap(),
            r#"[{"Pin":"1234","Position":1},{"Pin":"5678","Position":2}]"#
        );
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(PinStore::new().serialize().unwrap(), "[]");
    }

    #[test]
    fn test_load_csv_strips_and_numbers() {
        let mut store = sample_store();
        store.load_csv("12-34, 5678 ,x9x0x1x2").unwrap();

        assert_eq!(store.count(), 3);
        assert!(store.is_valid_at("1234", 1));
        assert!(store.is_valid_at("5678", 2));
        assert!(store.is_valid_at("9012", 3));
    }

    #[test]
    fn test_load_csv_blank_clears() {
        let mut store = sample_store();
        store.load_csv("   ").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_length_violations() {
        let store = PinStore::from_json(
            r#"[{"Pin":"123","Position":1},{"Pin":"4567","Position":2},{"Pin":"89012","Position":3}]"#,
            "",
        )
        .unwrap();

        assert_eq!(store.length_violations(4), vec![1, 3]);
        assert!(store.length_violations(5).contains(&2));
    }
}
