//! Device-model-agnostic table types.
//!
//! `spec.md` §9 replaces the original's CRTP base class plus
//! `std::function` lambda tables (`ActionFunc_t`, `PreqFunc_t`,
//! `RowhitFunc_t`, `RowopenFunc_t`) with "a trait-style interface...
//! and per-level closures." In practice the original's own per-command
//! behavior is already a small closed enumeration (see the "Standard
//! actions" and "Concrete resolvers" lists in `spec.md` §4.4/§4.5): every
//! device command falls into one of a handful of action/prerequisite
//! *kinds*. Tagging each command with its kind here and dispatching on
//! that tag in `crate::state`/`crate::preq` gives the same per-device
//! customization the lambda tables gave, without needing trait objects
//! or closures captured over a generic node-pointer type — the kinds
//! themselves are shared across every device model; only the *table*
//! (which command has which kind, and at which level) differs per
//! model. This is recorded as a resolved REDESIGN FLAG in `DESIGN.md`.

use std::collections::HashMap;

/// Index into a device's ordered level list. Level 0 is always the
/// channel (the tree root); deeper indices are more specific.
pub type LevelId = u8;
/// Index into a device's ordered command list.
pub type CommandId = u16;
/// Device cycle counter. `-1` denotes "unconstrained" per the data model
/// (`spec.md` §3, `Node.cmd_ready_clk`).
pub type Clock = i64;

/// Sentinel for "no constraint yet" / "not yet recorded" clock values.
pub const UNCONSTRAINED: Clock = -1;

/// The four boolean command-metadata flags from `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandMeta {
    /// Command opens a row (ACT family).
    pub opens: bool,
    /// Command closes a row (PRE family, or the auto-precharge variants).
    pub closes: bool,
    /// Command transfers data to/from the row buffer or PIM datapath.
    pub accesses: bool,
    /// Command is a refresh command.
    pub refresh: bool,
    /// Accessing command moves data across the DQ bus to/from the host
    /// (RD/WR family, including CAS re-sync), as opposed to a PIM
    /// compute/copy command that only touches the internal datapath.
    /// Distinguishes burst latency (`nCL + nBL`) from the flat one-cycle
    /// compute latency `spec.md` §8's S4 scenario gives for `MACAB`.
    pub dq_burst: bool,
}

/// Which state-engine behavior a command exhibits on issue.
///
/// Closed enumeration of the "Standard actions" list in `spec.md` §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Single-phase activate: `state <- Opened`, `row_state` gains the
    /// addressed row. Applies at the command's `action_scope` level,
    /// fanning out to every descendant bank when scope is shallower
    /// than bank (ACT16 / ACT4_BG-1's single-phase sibling "ACT").
    Activate,
    /// Two-phase activate, phase 1 (`ACT-1` / `ACT16-1` / `ACT4_BG-1`):
    /// `state <- PreOpened`, records the pre-opened row.
    ActivatePhase1,
    /// Two-phase activate, phase 2 (`ACT-2` / `ACT16-2` / `ACT4_BG-2`):
    /// promotes bank state and the pre-opened row to `Opened`.
    ActivatePhase2,
    /// Precharge: `state <- Closed`, `row_state` cleared. Applies at
    /// `action_scope`, fanning out to descendant banks for the
    /// all-bank/per-bankgroup precharge variants (`PREA`, `PRE4_BG`).
    Precharge,
    /// Auto-precharge access: accesses data and precharges in the same
    /// step (`RDA`, `WRA`, `RD16A`, `WR16A`).
    AutoPrechargeAccess,
    /// Refresh: every bank under `action_scope` becomes `Refreshing`;
    /// schedules a deferred `REFab_end`/`REFpb_end` action that restores
    /// `Closed` at `issue_clk + nRFC - 1`.
    Refresh,
    /// A command with no open/close/refresh state effect: ordinary
    /// reads, writes, CAS-only re-accesses, and PIM compute/copy
    /// commands that merely consume the already-open row.
    PlainAccess,
}

/// Which prerequisite-resolver behavior a command uses.
///
/// Closed enumeration of the "Concrete resolvers" list in `spec.md` §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreqKind {
    /// Single-bank read/write family: switches on the addressed bank's
    /// state (`Closed` -> ACT/ACT-1, `PreOpened` -> ACT-2, `Opened`
    /// row-hit -> ready (or a CAS re-sync command), `Opened` row-miss ->
    /// PRE, `Refreshing` -> the command itself, not ready).
    BankSingleRw,
    /// Intra-bankgroup 4-bank PIM. Scaffolded but disabled: Open
    /// Question (i) in `spec.md` §9 — the original leaves this stubbed
    /// and commented out, so this kind always reports "not ready" via
    /// [`crate::error::AimError::Configuration`] if actually selected.
    Bank4Intra,
    /// All-bank PIM at channel/rank scope: scans every bank under the
    /// node, returning `PREA` on any wrong-row bank, the command itself
    /// while any bank is `Refreshing`, and otherwise the appropriate
    /// activate phase or the final command.
    AllBankPim,
    /// All-bank refresh gate (`REFab`/`REFpb`): returns `PREA` if any
    /// bank under scope is open (and not already refreshing).
    AllBankRefresh,
    /// Always ready once the addressing level is reached: used by
    /// commands with no bank-state precondition of their own (no-bank
    /// PIM ops, and bank-scope PIM ops that share a bank's row-buffer
    /// state with ordinary RD/WR and are gated purely by `BankSingleRw`
    /// upstream of them).
    Ready,
}

/// Static description of one device command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Command mnemonic, matching the original device's command table.
    pub name: &'static str,
    /// Deepest level this command's address specifies.
    pub addressing_level: LevelId,
    /// Level at which the command's state effect fans out.
    pub action_scope: LevelId,
    pub meta: CommandMeta,
    pub action_kind: ActionKind,
    pub preq_kind: PreqKind,
    /// Whether this is a write-family access command (`WR`/`WR16`/`WRA`/
    /// ...). Used only to pick between `CASRD`/`CASWR` resync commands
    /// on a desynced LPDDR5 rank; meaningless on commands that aren't
    /// data accesses.
    pub is_write: bool,
    /// For [`ActionKind::Refresh`] only: the timing-parameter name
    /// (`"nRFC"`, `"nRFCpb"`, ...) giving the refresh-end offset used by
    /// the companion deferred `*_end` action (`issue_clk + nRFC - 1`,
    /// `spec.md` §4.4).
    pub refresh_latency_param: Option<&'static str>,
}

/// An organization preset: level sibling counts plus bus-width metadata.
#[derive(Debug, Clone)]
pub struct OrgPreset {
    /// Declared chip density in gigabits, used to validate `counts`.
    pub density_gb: f64,
    /// Per-channel data bus width in bits.
    pub dq_width: u32,
    /// Internal prefetch size in elements per burst.
    pub prefetch_size: u32,
    /// Sibling counts per tree level, channel first, bank last
    /// (length equals the device's `bank_level + 1`).
    pub counts: Vec<u32>,
    /// Rows per bank. Used by [`crate::mapper`]'s linear address scheme
    /// and to validate trace-supplied row indices.
    pub rows: u32,
    /// Columns per row.
    pub cols: u32,
}

/// The handful of commands the generic resolvers in `crate::preq` need
/// to name directly, resolved once per device so the resolvers never
/// match on string literals.
#[derive(Debug, Clone)]
pub struct WellKnown {
    /// Single-bank activate: `ACT` (single-phase) or `ACT-1` (two-phase).
    pub act: CommandId,
    /// `ACT-2`, for two-phase devices only.
    pub act_phase2: Option<CommandId>,
    /// Single-bank precharge: `PRE`.
    pub pre: CommandId,
    /// All-bank precharge: `PREA`.
    pub pre_all: CommandId,
    /// All-bank activate: `ACT16`/`ACTab` (single-phase) or `ACT16-1`
    /// (two-phase).
    pub act_all: CommandId,
    /// `ACT16-2`, for two-phase devices only.
    pub act_all_phase2: Option<CommandId>,
    /// CAS re-sync read command (`CASRD`), LPDDR5 only.
    pub cas_read_resync: Option<CommandId>,
    /// CAS re-sync write command (`CASWR`), LPDDR5 only.
    pub cas_write_resync: Option<CommandId>,
    /// Intra-bankgroup 4-bank precharge: `PRE4_BG`.
    pub pre_4bg: CommandId,
}

/// A resolved (named-parameter -> cycle count) timing preset.
#[derive(Debug, Clone, Default)]
pub struct TimingPreset {
    pub values: HashMap<&'static str, i64>,
}

impl TimingPreset {
    /// Read a required timing parameter, or fail with
    /// [`crate::error::AimError::Configuration`]-shaped context at the
    /// call site (the device builders turn a missing key into that
    /// error; this accessor panics only because it is called exclusively
    /// with names drawn from the device's own declared timing list,
    /// which is an internal-consistency invariant, not user input).
    #[must_use]
    pub fn get(&self, name: &str) -> i64 {
        *self
            .values
            .get(name)
            .unwrap_or_else(|| panic!("device spec references unknown timing parameter `{name}`"))
    }
}

/// A declarative timing rule, resolved against a [`TimingPreset`].
///
/// `spec.md` §3: "after issuing any preceding command at the node, each
/// following command's ready time becomes at least `issue clock of the
/// (window-th oldest) preceding + latency` at the same node; with
/// `is_sibling = true`, the constraint instead applies between distinct
/// sibling nodes at that level."
#[derive(Debug, Clone)]
pub struct TimingRule {
    pub level: LevelId,
    pub preceding: Vec<CommandId>,
    pub following: Vec<CommandId>,
    pub latency: i64,
    pub window: u32,
    pub is_sibling: bool,
}
