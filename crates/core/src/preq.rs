//! Prerequisite resolver: given a request's intended final command, what
//! command must actually issue next.
//!
//! `spec.md` §4.5 lists a small closed set of "Concrete resolvers"; which
//! one a command uses is recorded on its [`PreqKind`] tag (see
//! `crate::spec::table` for why a tag-and-dispatch design stands in for
//! the original's per-device lambda table). Every resolver here returns
//! either the original command (ready to issue as-is), an intermediate
//! command that must issue first (`ACT`, `ACT-2`, `PRE`, `PREA`, a CAS
//! re-sync command), or the original command again to mean "not ready
//! yet, timing will gate it" (the `Refreshing` case, and the "any bank
//! still refreshing" case for the all-bank resolvers).

use crate::spec::{Clock, CommandId, DeviceSpec, PreqKind};
use crate::tree::{NodeState, Tree};

/// Resolve the next command that must issue toward eventually completing
/// `cmd` addressed at `h`.
#[must_use]
pub fn resolve(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, cmd: CommandId, h: &[i32], clk: Clock) -> CommandId {
    let cspec = &spec.commands[cmd as usize];
    match cspec.preq_kind {
        PreqKind::Ready => cmd,
        // Open Question (i): intra-bankgroup 4-bank PIM is scaffolded
        // but left disabled, matching the original's commented-out
        // implementation. There is no bank-state gating to perform, so
        // this always reports the command itself as ready; the request
        // layer is responsible for never actually routing a request to
        // one of these commands.
        PreqKind::Bank4Intra => cmd,
        PreqKind::BankSingleRw => single_bank(tree, spec, channel_idx, cmd, h, clk),
        PreqKind::AllBankPim => all_bank_pim(tree, spec, channel_idx, cmd, h, clk),
        PreqKind::AllBankRefresh => all_bank_refresh(tree, spec, channel_idx, cmd, h),
    }
}

/// Level at which LPDDR5 tracks per-rank CAS re-sync; `None` on devices
/// that never populate `cas_read_resync`/`cas_write_resync` (GDDR6).
pub(crate) fn desync_level(spec: &DeviceSpec) -> Option<u8> {
    spec.well_known.cas_read_resync.map(|_| 1)
}

fn single_bank(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, cmd: CommandId, h: &[i32], clk: Clock) -> CommandId {
    let cspec = &spec.commands[cmd as usize];
    let wk = &spec.well_known;
    let (bank_level, bank_idx) = tree.resolve(channel_idx, h, spec.bank_level);
    let bank = tree.node(bank_level, bank_idx);
    match bank.state {
        NodeState::Closed => wk.act,
        NodeState::PreOpened => wk.act_phase2.unwrap_or_else(|| panic!("PreOpened state only reachable on two-phase devices")),
        // spec.md 4.5: "not ready yet; timing will gate it" -- the
        // original source instead returns `ACT` here, but spec.md's
        // literal text wins (recorded in DESIGN.md).
        NodeState::Refreshing => cmd,
        NodeState::Opened => {
            let row = h[spec.row_level() as usize];
            if !bank.row_state.contains_key(&row) {
                return wk.pre;
            }
            if let Some(rank_level) = desync_level(spec) {
                let (rl, ridx) = tree.resolve(channel_idx, h, rank_level);
                if let Some(final_synced) = tree.node(rl, ridx).final_synced_cycle {
                    if final_synced < clk {
                        return if cspec.is_write {
                            wk.cas_write_resync.unwrap_or_else(|| panic!("two-phase device must declare cas_write_resync"))
                        } else {
                            wk.cas_read_resync.unwrap_or_else(|| panic!("two-phase device must declare cas_read_resync"))
                        };
                    }
                }
            }
            cmd
        }
        NodeState::PowerUp | NodeState::Na => cmd,
    }
}

fn all_bank_pim(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, cmd: CommandId, h: &[i32], clk: Clock) -> CommandId {
    let wk = &spec.well_known;
    let cspec = &spec.commands[cmd as usize];
    let (scope_level, scope_idx) = tree.resolve(channel_idx, h, cspec.action_scope);
    let banks = tree.banks_under(scope_level, scope_idx, spec.bank_level);
    let row = h[spec.row_level() as usize];

    if banks.iter().any(|&(l, i)| tree.node(l, i).state == NodeState::Refreshing) {
        return cmd;
    }
    let any_wrong_row = banks
        .iter()
        .any(|&(l, i)| tree.node(l, i).state == NodeState::Opened && !tree.node(l, i).row_state.contains_key(&row));
    if any_wrong_row {
        return wk.pre_all;
    }
    if banks.iter().any(|&(l, i)| tree.node(l, i).state == NodeState::Closed) {
        return wk.act_all;
    }
    if banks.iter().any(|&(l, i)| tree.node(l, i).state == NodeState::PreOpened) {
        return wk.act_all_phase2.unwrap_or(cmd);
    }
    // All banks under scope are open to the right row: on a two-phase
    // device, a stale rank-wide CAS sync still forces a resync command
    // first (spec.md 4.5, "Channel / rank, all-bank PIM ... CASRD as
    // appropriate").
    if let Some(rank_level) = desync_level(spec) {
        let (rl, ridx) = tree.resolve(channel_idx, h, rank_level);
        if let Some(final_synced) = tree.node(rl, ridx).final_synced_cycle {
            if final_synced < clk {
                return if cspec.is_write {
                    wk.cas_write_resync.unwrap_or_else(|| panic!("two-phase device must declare cas_write_resync"))
                } else {
                    wk.cas_read_resync.unwrap_or_else(|| panic!("two-phase device must declare cas_read_resync"))
                };
            }
        }
    }
    cmd
}

fn all_bank_refresh(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, cmd: CommandId, h: &[i32]) -> CommandId {
    let wk = &spec.well_known;
    let cspec = &spec.commands[cmd as usize];
    let (scope_level, scope_idx) = tree.resolve(channel_idx, h, cspec.action_scope);
    let banks = tree.banks_under(scope_level, scope_idx, spec.bank_level);

    if banks.iter().any(|&(l, i)| tree.node(l, i).state == NodeState::Refreshing) {
        return cmd;
    }
    if banks.iter().any(|&(l, i)| tree.node(l, i).state == NodeState::Opened) {
        return wk.pre_all;
    }
    cmd
}
