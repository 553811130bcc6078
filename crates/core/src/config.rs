//! Simulator configuration.
//!
//! Tree-structured, matching `spec.md` §6's three top sections: the
//! memory-system implementation, the DRAM device (organization/timing
//! preset plus overrides), and the controller (scheduler choice,
//! write-mode watermarks, buffer capacities). Unknown or missing
//! required fields fail fast: every field that has no sane default is
//! `#[serde(default)]`-free and deserialization itself rejects a missing
//! value, while fields that genuinely have a conventional default use
//! the `#[serde(default = "...")]` pattern below so a minimal config can
//! omit them.
//!
//! ```
//! use aim_core::config::Config;
//!
//! let json = r#"{
//!     "system": { "num_channels": 1 },
//!     "device": { "model": "LPDDR5_AiM", "organization_preset": "LPDDR5_AiM_16Gb" },
//!     "controller": {}
//! }"#;
//! let cfg: Config = serde_json::from_str(json).unwrap();
//! assert_eq!(cfg.system.num_channels, 1);
//! assert_eq!(cfg.controller.high_watermark, 0.8);
//! ```

use std::collections::HashMap;

use serde::Deserialize;

mod defaults {
    pub const NUM_CHANNELS: u32 = 1;
    pub const HIGH_WATERMARK: f64 = 0.8;
    pub const LOW_WATERMARK: f64 = 0.2;
    pub const ACTIVE_BUFFER_CAPACITY: usize = 4;
    pub const PRIORITY_BUFFER_CAPACITY: usize = 512 * 3 + 32;
    pub const READ_BUFFER_CAPACITY: usize = 64;
    pub const WRITE_BUFFER_CAPACITY: usize = 64;
    pub const PIM_BANK_BUFFER_CAPACITY: usize = 64;
    pub const PIM_NO_BANK_BUFFER_CAPACITY: usize = 64;
    pub const BLOCK_WARNING_THRESHOLD: u64 = 1_000;
}

/// Which scheduling policy the controller uses to pick a request from a
/// buffer. Only First-Ready-First-Come-First-Serve is implemented
/// (`spec.md` §4.7); the enum exists so config documents can name the
/// policy explicitly and so a future scheduler has somewhere to land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
    #[default]
    #[serde(alias = "FRFCFS")]
    Frfcfs,
}

/// Which address-mapping scheme the memory system uses.
///
/// The latter two are named in `spec.md` §6 but their exact bit layout
/// is Open Question (ii) in §9 — left as disabled placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapperKind {
    #[default]
    #[serde(alias = "channel-row-bank-row-col")]
    ChannelRowBankRowColLinear,
    #[serde(alias = "row-bank-rank-col-channel")]
    RowBankRankColChannelLinear,
    #[serde(alias = "MOP4CLXOR")]
    Mop4ClXor,
    #[serde(alias = "RoBaRaCoCh")]
    RoBaRaCoCh,
}

fn default_num_channels() -> u32 {
    defaults::NUM_CHANNELS
}
fn default_mapper() -> MapperKind {
    MapperKind::default()
}

/// Memory-system-level configuration: channel count and address mapper.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_num_channels")]
    pub num_channels: u32,
    #[serde(default = "default_mapper")]
    pub mapper: MapperKind,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            num_channels: defaults::NUM_CHANNELS,
            mapper: MapperKind::default(),
        }
    }
}

/// DRAM device configuration: model, organization, and timing.
///
/// `organization_overrides`/`timing_overrides_cycles`/
/// `timing_overrides_ns` are intentionally name-keyed maps rather than
/// fixed struct fields: the set of valid parameter names differs between
/// device models (LPDDR5 carries `nRCDRDMAC`/`nCLGB`/... that GDDR6
/// doesn't), so the device spec builder — not this struct — validates
/// names against its own timing-parameter list and turns an unknown name
/// into [`crate::error::AimError::Configuration`].
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub model: String,
    #[serde(default)]
    pub organization_preset: Option<String>,
    #[serde(default)]
    pub organization_overrides: HashMap<String, u32>,
    #[serde(default)]
    pub timing_preset: Option<String>,
    #[serde(default)]
    pub timing_overrides_cycles: HashMap<String, i64>,
    #[serde(default)]
    pub timing_overrides_ns: HashMap<String, f64>,
    /// Declared density in gigabits, checked against the preset's
    /// derived density at resolution time. `None` skips the check (the
    /// preset's own declared density is taken as ground truth).
    #[serde(default)]
    pub density_gb: Option<f64>,
}

fn default_high_watermark() -> f64 {
    defaults::HIGH_WATERMARK
}
fn default_low_watermark() -> f64 {
    defaults::LOW_WATERMARK
}
fn default_active_buffer_capacity() -> usize {
    defaults::ACTIVE_BUFFER_CAPACITY
}
fn default_priority_buffer_capacity() -> usize {
    defaults::PRIORITY_BUFFER_CAPACITY
}
fn default_read_buffer_capacity() -> usize {
    defaults::READ_BUFFER_CAPACITY
}
fn default_write_buffer_capacity() -> usize {
    defaults::WRITE_BUFFER_CAPACITY
}
fn default_pim_bank_buffer_capacity() -> usize {
    defaults::PIM_BANK_BUFFER_CAPACITY
}
fn default_pim_no_bank_buffer_capacity() -> usize {
    defaults::PIM_NO_BANK_BUFFER_CAPACITY
}
fn default_block_warning_threshold() -> u64 {
    defaults::BLOCK_WARNING_THRESHOLD
}

/// Controller configuration: scheduler choice, watermarks, and buffer
/// capacities (`spec.md` §3's `Queues` and §4.8's watermark step).
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub scheduler: SchedulerKind,
    #[serde(default = "default_high_watermark")]
    pub high_watermark: f64,
    #[serde(default = "default_low_watermark")]
    pub low_watermark: f64,
    #[serde(default = "default_active_buffer_capacity")]
    pub active_buffer_capacity: usize,
    #[serde(default = "default_priority_buffer_capacity")]
    pub priority_buffer_capacity: usize,
    #[serde(default = "default_read_buffer_capacity")]
    pub read_buffer_capacity: usize,
    #[serde(default = "default_write_buffer_capacity")]
    pub write_buffer_capacity: usize,
    #[serde(default = "default_pim_bank_buffer_capacity")]
    pub pim_bank_buffer_capacity: usize,
    #[serde(default = "default_pim_no_bank_buffer_capacity")]
    pub pim_no_bank_buffer_capacity: usize,
    /// Cycles a request may sit between `arrive` and completion before
    /// the controller emits an informational "possible block" warning
    /// (`spec.md` §5). Not fatal, not a timeout.
    #[serde(default = "default_block_warning_threshold")]
    pub block_warning_threshold: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            high_watermark: defaults::HIGH_WATERMARK,
            low_watermark: defaults::LOW_WATERMARK,
            active_buffer_capacity: defaults::ACTIVE_BUFFER_CAPACITY,
            priority_buffer_capacity: defaults::PRIORITY_BUFFER_CAPACITY,
            read_buffer_capacity: defaults::READ_BUFFER_CAPACITY,
            write_buffer_capacity: defaults::WRITE_BUFFER_CAPACITY,
            pim_bank_buffer_capacity: defaults::PIM_BANK_BUFFER_CAPACITY,
            pim_no_bank_buffer_capacity: defaults::PIM_NO_BANK_BUFFER_CAPACITY,
            block_warning_threshold: defaults::BLOCK_WARNING_THRESHOLD,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: "GDDR6_AiM".to_string(),
            organization_preset: None,
            organization_overrides: HashMap::new(),
            timing_preset: None,
            timing_overrides_cycles: HashMap::new(),
            timing_overrides_ns: HashMap::new(),
            density_gb: None,
        }
    }
}

/// Root simulator configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    pub device: DeviceConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl Config {
    /// Deserialize from a JSON document.
    ///
    /// # Errors
    /// Returns [`crate::error::AimError::Configuration`] if `json` is
    /// not valid JSON or does not match the config schema (e.g. a
    /// missing `device.model`).
    pub fn from_json(json: &str) -> Result<Self, crate::error::AimError> {
        serde_json::from_str(json)
            .map_err(|e| crate::error::AimError::configuration(format!("invalid config json: {e}")))
    }

    /// Deserialize from a YAML document.
    ///
    /// # Errors
    /// Returns [`crate::error::AimError::Configuration`] if `yaml` is
    /// not valid YAML or does not match the config schema.
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::error::AimError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| crate::error::AimError::configuration(format!("invalid config yaml: {e}")))
    }
}
