//! Daemon configuration.
//!
//! Reads a JSON config file (alert groups, the entry registry, pin maps,
//! and timing thresholds) with a `DOORMAN_`-prefixed environment overlay.
//! Every threshold has a default matching the controller's constants, so
//! a minimal config is just pins and entries.

use anyhow::Context as _;
use doorman_access::ControllerConfig;
use doorman_core::{
    Entry, EntryCode,
    constants::{
        DEFAULT_CLOSE_HELPER_SECS, DEFAULT_INTERKEY_TIMEOUT_MS, DEFAULT_RELAY_PULSE_MS,
        DEFAULT_TEMP_CODE_MIN_INTERVAL_SECS, DEFAULT_TEMP_CODE_TTL_MINUTES, KEYPAD_COLS,
        KEYPAD_ROWS, TESTMODE_TIMEOUT_MS,
    },
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Matrix keypad pin assignment (BCM numbering).
#[derive(Debug, Clone, Deserialize)]
pub struct KeypadPins {
    pub rows: Vec<u8>,
    pub cols: Vec<u8>,
}

/// Full daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Alert group id to recipient list. Delivery itself is the
    /// notification transport's concern; the daemon only logs these at
    /// startup.
    #[serde(default)]
    pub alerts: HashMap<String, Vec<String>>,

    /// Ordered entry registry; lookup is first-match-wins.
    pub entries: Vec<Entry>,

    pub keypad: KeypadPins,
    pub relay_pin: u8,
    pub sensor_pin: u8,

    /// Inter-key timeout in milliseconds.
    #[serde(default = "default_timeout_msec")]
    pub timeout_msec: u64,

    /// Test-mode auto-deactivation delay in milliseconds.
    #[serde(default = "default_testmode_timeout_msec")]
    pub testmode_timeout_msec: u64,

    /// Relay pulse duration in milliseconds.
    #[serde(default = "default_relay_delay_msec")]
    pub relay_delay_msec: u64,

    /// Close-helper window in seconds.
    #[serde(default = "default_close_helper_seconds")]
    pub close_helper_seconds: u64,

    /// Minimum interval between temporary-code issuances, in seconds.
    #[serde(default = "default_temp_code_timeout_seconds")]
    pub temp_code_timeout_seconds: u64,

    /// Temporary-code time-to-live in minutes.
    #[serde(default = "default_temp_code_ttl_minutes")]
    pub temp_code_ttl_minutes: i64,

    /// Optional period for sweeping expired temporary entries, in
    /// seconds. Absent means the registry is never swept (expired
    /// temporaries stay, harmlessly, until restart).
    #[serde(default)]
    pub temp_code_sweep_seconds: Option<u64>,

    /// Alert group that gets the startup notification, if any.
    #[serde(default)]
    pub support_alert: Option<String>,
}

fn default_timeout_msec() -> u64 {
    DEFAULT_INTERKEY_TIMEOUT_MS
}

fn default_testmode_timeout_msec() -> u64 {
    TESTMODE_TIMEOUT_MS
}

fn default_relay_delay_msec() -> u64 {
    DEFAULT_RELAY_PULSE_MS
}

fn default_close_helper_seconds() -> u64 {
    DEFAULT_CLOSE_HELPER_SECS
}

fn default_temp_code_timeout_seconds() -> u64 {
    DEFAULT_TEMP_CODE_MIN_INTERVAL_SECS
}

fn default_temp_code_ttl_minutes() -> i64 {
    DEFAULT_TEMP_CODE_TTL_MINUTES
}

impl Settings {
    /// Load settings from a JSON file plus `DOORMAN_*` environment
    /// overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let loaded = ::config::Config::builder()
            .add_source(::config::File::from(path.to_path_buf()))
            .add_source(::config::Environment::with_prefix("DOORMAN").separator("__"))
            .build()
            .context("failed to read config file")?;

        let settings: Settings = loaded
            .try_deserialize()
            .context("failed to deserialize settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Cross-field validation that derived deserialization cannot do.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.keypad.rows.len() != KEYPAD_ROWS {
            anyhow::bail!(
                "keypad.rows must list {} pins, got {}",
                KEYPAD_ROWS,
                self.keypad.rows.len()
            );
        }
        if self.keypad.cols.len() != KEYPAD_COLS {
            anyhow::bail!(
                "keypad.cols must list {} pins, got {}",
                KEYPAD_COLS,
                self.keypad.cols.len()
            );
        }

        for entry in &self.entries {
            entry
                .validate()
                .with_context(|| format!("invalid entry {:?}", entry.name))?;
            // Derived deserialization accepts any string as a code;
            // re-run the format check here.
            EntryCode::new(entry.code.as_str())
                .with_context(|| format!("invalid code for entry {:?}", entry.name))?;

            if let Some(group) = &entry.alert
                && !self.alerts.contains_key(group.as_str())
            {
                anyhow::bail!(
                    "entry {:?} references unknown alert group {:?}",
                    entry.name,
                    group.as_str()
                );
            }
        }

        if let Some(group) = &self.support_alert
            && !self.alerts.contains_key(group)
        {
            anyhow::bail!("support_alert references unknown alert group {group:?}");
        }

        Ok(())
    }

    /// The controller's timing policy derived from these settings.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            interkey_timeout: Duration::from_millis(self.timeout_msec),
            testmode_timeout: Duration::from_millis(self.testmode_timeout_msec),
            close_helper_window: Duration::from_secs(self.close_helper_seconds),
            temp_code_min_interval: Duration::from_secs(self.temp_code_timeout_seconds),
            temp_code_ttl_minutes: self.temp_code_ttl_minutes,
        }
    }

    /// Relay pulse duration.
    #[must_use]
    pub fn relay_pulse(&self) -> Duration {
        Duration::from_millis(self.relay_delay_msec)
    }
}
