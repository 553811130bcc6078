//! Readiness, row-hit, and row-open queries (`spec.md` §4.6).
//!
//! A command is ready to issue at `clk` when every node on its path, from
//! the addressed node up through `action_scope`, has `cmd_ready_clk[cmd]
//! <= clk`. At and below `action_scope`, if `action_scope` is shallower
//! than the command's `addressing_level` (the all-bank/broadcast
//! family), every descendant node down to the deepest tree level must
//! also agree -- an AND fan-out over every child at every remaining
//! level, not just the scope node itself -- matching `spec.md` §4.6
//! verbatim ("At action_scope and scope < addressing_level -> AND over
//! all children (fan-out). Otherwise -> recurse down the single
//! addressed path.") and the original's `check_ready`
//! (`examples/original_source/src/aimulator/src/dram/AiM_node.h`), which
//! likewise keeps recursing into every child at `action_scope` rather
//! than stopping there.

use crate::spec::{Clock, CommandId, DeviceSpec};
use crate::tree::{NodeState, Tree};

/// Whether `cmd` may issue at address hierarchy `h` at clock `clk`.
#[must_use]
pub fn is_ready(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, cmd: CommandId, h: &[i32], clk: Clock) -> bool {
    let cspec = &spec.commands[cmd as usize];
    // Virtual row/column levels have no tree nodes, so fan-out can never
    // go deeper than the device's deepest real level even when
    // `addressing_level` names a virtual one.
    let stop_level = spec.bank_level.min(cspec.addressing_level);
    visit_ready(tree, cmd, 0, channel_idx, h, clk, cspec.action_scope, stop_level)
}

fn visit_ready(tree: &Tree, cmd: CommandId, level: u8, idx: usize, h: &[i32], clk: Clock, scope: u8, stop_level: u8) -> bool {
    let node = tree.node(level, idx);
    if node.cmd_ready_clk[cmd as usize] > clk {
        return false;
    }
    if level >= stop_level {
        return true;
    }
    if level < scope {
        let addressed = h[level as usize + 1];
        if addressed == -1 {
            node.children
                .iter()
                .all(|&child| visit_ready(tree, cmd, level + 1, child, h, clk, scope, stop_level))
        } else {
            let child = tree.child_on_path(level, idx, h);
            visit_ready(tree, cmd, level + 1, child, h, clk, scope, stop_level)
        }
    } else {
        // At or past action_scope: fan out unconditionally, ignoring any
        // further entries in `h` -- every descendant down to `stop_level`
        // must independently agree.
        node.children
            .iter()
            .all(|&child| visit_ready(tree, cmd, level + 1, child, h, clk, scope, stop_level))
    }
}

/// Whether the bank addressed by `h` currently has the target row open.
/// Meaningless (returns `false`) for commands with no row component.
#[must_use]
pub fn row_hit(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, h: &[i32]) -> bool {
    let (bank_level, bank_idx) = tree.resolve(channel_idx, h, spec.bank_level);
    let bank = tree.node(bank_level, bank_idx);
    let row = h[spec.row_level() as usize];
    bank.state == NodeState::Opened && bank.row_state.contains_key(&row)
}

/// Whether the bank addressed by `h` has any row open at all.
#[must_use]
pub fn row_open(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, h: &[i32]) -> bool {
    let (bank_level, bank_idx) = tree.resolve(channel_idx, h, spec.bank_level);
    matches!(tree.node(bank_level, bank_idx).state, NodeState::Opened | NodeState::PreOpened)
}
