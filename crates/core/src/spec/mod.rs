//! Static, immutable-after-init device specification.
//!
//! A [`DeviceSpec`] is resolved once at device construction from a named
//! model (`"GDDR6_AiM"`, `"LPDDR5_AiM"`), optionally overridden from user
//! configuration, and then never mutated again (`spec.md` §4.1).

mod gddr6;
mod lpddr5;
pub mod table;

use std::collections::HashMap;

use crate::config::DeviceConfig;
use crate::error::AimError;
pub use table::{
    ActionKind, Clock, CommandId, CommandMeta, CommandSpec, LevelId, OrgPreset, PreqKind,
    TimingPreset, TimingRule, WellKnown, UNCONSTRAINED,
};

/// Which concrete device model a [`DeviceSpec`] was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// GDDR6-class AiM device: channel -> bankgroup -> bank, no rank
    /// level, single-phase activate, no `PreOpened` state.
    Gddr6,
    /// LPDDR5-class AiM device: channel -> rank -> bankgroup -> bank,
    /// two-phase activate, `PreOpened` state, CAS re-sync tracking.
    Lpddr5,
}

/// Immutable, fully resolved device specification.
#[derive(Debug, Clone)]
pub struct DeviceSpec {
    pub kind: DeviceKind,
    /// Ordered level names, channel first. Includes the two virtual
    /// levels `row` and `column`, which have no tree nodes of their own.
    pub levels: Vec<&'static str>,
    /// Deepest level that has a tree node (the bank level).
    pub bank_level: LevelId,
    pub commands: Vec<CommandSpec>,
    command_index: HashMap<&'static str, CommandId>,
    pub states: Vec<&'static str>,
    pub org: OrgPreset,
    pub timing: TimingPreset,
    pub timing_rules: Vec<TimingRule>,
    /// Device clock period in picoseconds, taken directly from the
    /// timing preset's own `tCK_ps` entry.
    pub tck_ps: f64,
    pub well_known: WellKnown,
}

impl DeviceSpec {
    /// Look up a command by mnemonic. Panics if the name is not part of
    /// this device's own command table — every call site names a
    /// command drawn from the same table being built, so this is an
    /// internal-consistency invariant rather than user-facing input.
    #[must_use]
    pub fn command_id(&self, name: &str) -> CommandId {
        *self
            .command_index
            .get(name)
            .unwrap_or_else(|| panic!("device spec has no command named `{name}`"))
    }

    /// Look up a command by mnemonic, returning `None` instead of
    /// panicking. Used by request-type resolution, which tries a short
    /// list of device-specific alternative mnemonics (`"RD16"` on
    /// LPDDR5 vs `"RD"` on GDDR6) for the same logical request type.
    #[must_use]
    pub fn command_id_opt(&self, name: &str) -> Option<CommandId> {
        self.command_index.get(name).copied()
    }

    /// Number of commands in this device's table.
    #[must_use]
    pub fn n_commands(&self) -> usize {
        self.commands.len()
    }

    /// The virtual row level (one past `bank_level`).
    #[must_use]
    pub fn row_level(&self) -> LevelId {
        self.bank_level + 1
    }

    /// The virtual column level (two past `bank_level`).
    #[must_use]
    pub fn col_level(&self) -> LevelId {
        self.bank_level + 2
    }

    /// Number of tree levels, channel through bank inclusive.
    #[must_use]
    pub fn tree_level_count(&self) -> usize {
        self.bank_level as usize + 1
    }

    /// Maximum `window` across timing rules at `level` whose preceding
    /// set includes `cmd`; `0` if `cmd` has no history requirement at
    /// that level (`spec.md` §4.2: "Per-node history size for command
    /// `c` equals the maximum `window` across timing rules for `c` at
    /// that level; if zero, no history is retained.").
    #[must_use]
    pub fn history_window(&self, level: LevelId, cmd: CommandId) -> u32 {
        self.timing_rules
            .iter()
            .filter(|r| r.level == level && r.preceding.contains(&cmd))
            .map(|r| r.window)
            .max()
            .unwrap_or(0)
    }

    /// Resolve a named device model, applying `overrides` and verifying
    /// derived density against the declared density.
    pub fn resolve(model: &str, cfg: &DeviceConfig) -> Result<Self, AimError> {
        match model {
            "GDDR6_AiM" => gddr6::build(cfg),
            "LPDDR5_AiM" => lpddr5::build(cfg),
            other => Err(AimError::configuration(format!(
                "unknown device model preset `{other}`"
            ))),
        }
    }
}

/// Shared states list. `PreOpened` only ever appears on devices whose
/// commands carry [`ActionKind::ActivatePhase1`]/`ActivatePhase2`
/// (LPDDR5); GDDR6 devices simply never transition into it.
pub const STATES: [&str; 6] = ["Closed", "PreOpened", "Opened", "Refreshing", "PowerUp", "Na"];

pub(crate) fn build_command_index(commands: &[CommandSpec]) -> HashMap<&'static str, CommandId> {
    commands
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name, i as CommandId))
        .collect()
}

/// Resolve one cycles-or-nanoseconds override into a cycle count.
///
/// `spec.md` §4.1: "optionally overrides parameters from user config (in
/// cycles or nanoseconds via `rounding(ns, tCK_ps)`)".
#[must_use]
pub fn rounding(ns: f64, tck_ps: f64) -> i64 {
    ((ns * 1000.0) / tck_ps).ceil() as i64
}
