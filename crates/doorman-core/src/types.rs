use crate::{
    Result,
    constants::{MAX_CODE_LENGTH, MIN_CODE_LENGTH},
    error::Error,
};
use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use subtle::ConstantTimeEq;

/// Day of the week as used in entry schedules.
///
/// Config files spell days out in lowercase (`"monday"`, ...); the enum
/// round-trips through serde in that spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Map from a chrono weekday to the schedule weekday.
    #[must_use]
    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sun => Weekday::Sunday,
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
        }
    }

    /// The lowercase name used in config files and log lines.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Sunday => "sunday",
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Weekday {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sunday" => Ok(Weekday::Sunday),
            "monday" => Ok(Weekday::Monday),
            "tuesday" => Ok(Weekday::Tuesday),
            "wednesday" => Ok(Weekday::Wednesday),
            "thursday" => Ok(Weekday::Thursday),
            "friday" => Ok(Weekday::Friday),
            "saturday" => Ok(Weekday::Saturday),
            _ => Err(Error::UnknownWeekday(s.to_string())),
        }
    }
}

/// Hour-of-day window, inclusive on both ends.
///
/// `HourRange { start: 8, end: 17 }` admits any time from 08:00:00 through
/// 17:59:59 local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
}

impl HourRange {
    /// Create a validated hour range.
    ///
    /// # Errors
    /// Returns `Error::InvalidHourRange` if either bound is past 23 or the
    /// range is inverted.
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start > 23 || end > 23 || start > end {
            return Err(Error::InvalidHourRange { start, end });
        }
        Ok(HourRange { start, end })
    }

    /// Whether the given hour-of-day falls inside the window.
    #[must_use]
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour <= self.end
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.start, self.end)
    }
}

/// Entry code (the digit/letter sequence typed on the keypad).
///
/// # Security
/// This type implements constant-time comparison to prevent timing attacks
/// when matching submitted codes against the registry.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct EntryCode(String);

impl EntryCode {
    /// Create a new entry code with validation.
    ///
    /// The code is normalized (trimmed and uppercased) before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCodeFormat` if:
    /// - The length is not between 1-20 characters
    /// - Any character cannot be typed on the keypad as part of a code
    ///   (digits `0-9` and the letters `A`, `B`, `D`; `C`, `*` and `#` are
    ///   reserved for the shortcut and entry framing)
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim().to_uppercase();

        let len = code.len();
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&len) {
            return Err(Error::InvalidCodeFormat(format!(
                "code must be {MIN_CODE_LENGTH}-{MAX_CODE_LENGTH} chars, got {len}"
            )));
        }

        if let Some(c) = code
            .chars()
            .find(|&c| !matches!(c, '0'..='9' | 'A' | 'B' | 'D'))
        {
            return Err(Error::InvalidCodeFormat(format!(
                "character {c:?} cannot appear in an entry code"
            )));
        }

        Ok(EntryCode(code))
    }

    /// Get the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a submitted code string in constant time.
    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        self.0.as_bytes().ct_eq(submitted.as_bytes()).into()
    }
}

impl fmt::Display for EntryCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntryCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EntryCode::new(s)
    }
}

/// Constant-time comparison implementation for EntryCode
impl PartialEq for EntryCode {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for EntryCode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Identifier of a named alert group (a recipient list held by the
/// notification collaborator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertGroupId(String);

impl AlertGroupId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        AlertGroupId(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertGroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AlertGroupId {
    fn from(s: &str) -> Self {
        AlertGroupId(s.to_string())
    }
}

/// A registry record mapping a code to an authorized identity plus its
/// access schedule.
///
/// Permanent entries come from configuration and live for the process
/// lifetime. Temporary entries are created at runtime with `expires_at`
/// set and are never written back anywhere; they vanish on restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Human-readable identity ("Alice", "Gardener", ...).
    pub name: String,

    /// The code that authorizes this entry.
    pub code: EntryCode,

    /// Alert group notified about this entry's activity, if any.
    #[serde(default)]
    pub alert: Option<AlertGroupId>,

    /// Custom grant notification text; empty or absent means the default
    /// "<name> has opened/closed the door" template is used.
    #[serde(default)]
    pub message: Option<String>,

    /// Days on which the code is honored; absent means every day.
    #[serde(default)]
    pub valid_days: Option<HashSet<Weekday>>,

    /// Hours during which the code is honored; absent means any hour.
    #[serde(default)]
    pub valid_hours: Option<HourRange>,

    /// Whether a denial outside the schedule may mint a temporary code.
    #[serde(default)]
    pub temp_code_allowed: bool,

    /// Whether this code toggles test mode instead of granting access.
    #[serde(default)]
    pub testmode: bool,

    /// Expiry timestamp; set only on runtime-created temporary entries.
    #[serde(skip)]
    pub expires_at: Option<DateTime<Local>>,

    /// When a temporary code was last minted on behalf of this entry.
    #[serde(skip)]
    pub last_temp_code_issued_at: Option<DateTime<Local>>,
}

impl Entry {
    /// Create a permanent entry with no schedule restriction.
    #[must_use]
    pub fn new(name: impl Into<String>, code: EntryCode) -> Self {
        Entry {
            name: name.into(),
            code,
            alert: None,
            message: None,
            valid_days: None,
            valid_hours: None,
            temp_code_allowed: false,
            testmode: false,
            expires_at: None,
            last_temp_code_issued_at: None,
        }
    }

    /// Create a temporary entry on behalf of `parent`.
    ///
    /// The temporary entry inherits the parent's alert group, is named
    /// after the parent, and carries an expiry. It never inherits the
    /// schedule: a temporary code is valid around the clock until it
    /// expires.
    #[must_use]
    pub fn temporary(parent: &Entry, code: EntryCode, expires_at: DateTime<Local>) -> Self {
        Entry {
            name: format!("Temp entry for {}", parent.name),
            code,
            alert: parent.alert.clone(),
            message: None,
            valid_days: None,
            valid_hours: None,
            temp_code_allowed: false,
            testmode: false,
            expires_at: Some(expires_at),
            last_temp_code_issued_at: None,
        }
    }

    /// Whether this is a runtime-created temporary entry.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Whether a temporary entry's expiry has passed. Permanent entries
    /// never expire.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Local>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    /// Whether the entry's day-of-week window admits `now`.
    #[must_use]
    pub fn is_valid_day(&self, now: DateTime<Local>) -> bool {
        match &self.valid_days {
            None => true,
            Some(days) => days.contains(&Weekday::from_chrono(now.weekday())),
        }
    }

    /// Whether the entry's hour-of-day window admits `now`.
    #[must_use]
    pub fn is_valid_hour(&self, now: DateTime<Local>) -> bool {
        match &self.valid_hours {
            None => true,
            Some(range) => range.contains(now.hour()),
        }
    }

    /// Validate load-time consistency (hour range bounds).
    ///
    /// # Errors
    /// Returns `Error::InvalidHourRange` for an out-of-range or inverted
    /// hour window.
    pub fn validate(&self) -> Result<()> {
        if let Some(range) = self.valid_hours {
            // Re-run constructor validation; derived Deserialize does not.
            HourRange::new(range.start, range.end)?;
        }
        Ok(())
    }
}
