//! A single stored PIN and its slot

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Position reserved for the backdoor PIN
pub const BACKDOOR_POSITION: u32 = 0;

/// One PIN code bound to a 1-based position
///
/// Serialized as `{"Pin":"1234","Position":1}`. The code is kept as text so
/// leading zeros survive.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinEntry {
    /// The PIN digits
    #[serde(rename = "Pin", default, deserialize_with = "null_as_empty")]
    pub code: String,

    /// 1-based slot, 0 for the backdoor
    #[serde(rename = "Position")]
    pub position: u32,

    /// Set only on the detached backdoor entry
    #[serde(skip)]
    pub is_backdoor: bool,
}

impl PinEntry {
    /// Create a positional entry
    pub fn new(code: impl Into<String>, position: u32) -> Self {
        Self {
            code: code.into(),
            position,
            is_backdoor: false,
        }
    }

    /// Create the backdoor entry
    pub fn backdoor(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            position: BACKDOOR_POSITION,
            is_backdoor: true,
        }
    }

    /// Whether this entry accepts `code`
    ///
    /// An empty code never matches, even against an empty entry.
    pub fn matches(&self, code: &str) -> bool {
        !code.is_empty() && self.code == code
    }

    /// Whether the code has exactly `pin_length` characters
    pub fn has_length(&self, pin_length: usize) -> bool {
        self.code.chars().count() == pin_length
    }
}

/// Records written by older tools may carry `"Pin": null` for an unset slot
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl fmt::Debug for PinEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinEntry")
            .field("code", &"[REDACTED]")
            .field("position", &self.position)
            .field("is_backdoor", &self.is_backdoor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_code_never_matches() {
        let entry = PinEntry::new("", 3);
        assert!(!entry.matches(""));

        let backdoor = PinEntry::backdoor("");
        assert!(!backdoor.matches(""));
    }

    #[test]
    fn test_matches_exact_code_only() {
        let entry = PinEntry::new("0123", 1);
        assert!(entry.matches("0123"));
        assert!(!entry.matches("123"));
        assert!(!entry.matches("01234"));
    }

    #[test]
    fn test_record_shape() {
        let json = serde_json::to_string(&PinEntry::new("0042", 7)).unwrap();
        assert_eq!(json, r#"{"Pin":"0042","Position":7}"#);

        let parsed: PinEntry = serde_json::from_str(r#"{"Pin":"9999","Position":2}"#).unwrap();
        assert_eq!(parsed, PinEntry::new("9999", 2));
        assert!(!parsed.is_backdoor);
    }

    #[test]
    fn test_null_code_reads_as_empty() {
        let parsed: PinEntry = serde_json::from_str(r#"{"Pin":null,"Position":4}"#).unwrap();
        assert_eq!(parsed.code, "");
        assert_eq!(parsed.position, 4);
    }

    #[test]
    fn test_debug_redacted() {
        let entry = PinEntry::new("8642", 1);
        let debug_str = format!("{:?}", entry);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("8642"));
    }
}
