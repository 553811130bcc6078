//! Timing engine: updates `cmd_ready_clk` on command issue.
//!
//! `spec.md` §4.3 describes the recursion as three steps keyed off
//! whether the visited node's `node_id` matches `h[level]`. Because the
//! address hierarchy already uses `-1` to mean "not addressed at this
//! level" (`spec.md` §3), visiting *every* child and letting each one's
//! own on-path check decide whether it continues recursing or stops as
//! a sibling reproduces both the fan-out case (every level below
//! `action_scope` carries `-1`, so every child matches) and the
//! single-path case (exactly one child matches a concrete index) with
//! one recursion shape — `action_scope`/`addressing_level` never need
//! an explicit comparison here, because recursion already terminates at
//! the bank level (the deepest real tree node; row/column are virtual).
//! This subsumption is recorded in `DESIGN.md`.

use crate::spec::{Clock, CommandId, DeviceSpec};
use crate::tree::Tree;

/// Apply the timing-engine update for issuing `cmd` at address
/// hierarchy `h` and clock `clk`, starting at the given channel.
pub fn update_timing(tree: &mut Tree, spec: &DeviceSpec, channel_idx: usize, cmd: CommandId, h: &[i32], clk: Clock) {
    visit(tree, spec, 0, channel_idx, cmd, h, clk);
}

fn visit(tree: &mut Tree, spec: &DeviceSpec, level: u8, idx: usize, cmd: CommandId, h: &[i32], clk: Clock) {
    let node_id = tree.node(level, idx).node_id;
    let addressed = h[level as usize];
    let on_path = addressed == -1 || addressed as usize == node_id;

    if !on_path {
        apply_rules(tree, spec, level, idx, cmd, clk, true);
        return;
    }

    let window = spec.history_window(level, cmd);
    tree.node_mut(level, idx).record_issue(cmd, clk, window);
    apply_rules(tree, spec, level, idx, cmd, clk, false);

    let children = tree.node(level, idx).children.clone();
    for child in children {
        visit(tree, spec, level + 1, child, cmd, h, clk);
    }
}

fn apply_rules(tree: &mut Tree, spec: &DeviceSpec, level: u8, idx: usize, cmd: CommandId, clk: Clock, sibling: bool) {
    for rule in spec
        .timing_rules
        .iter()
        .filter(|r| r.level == level && r.is_sibling == sibling && r.preceding.contains(&cmd))
    {
        let base = if sibling {
            Some(clk)
        } else {
            tree.node(level, idx).nth_oldest(cmd, rule.window)
        };
        let Some(base) = base else { continue };
        let candidate = base + rule.latency;
        for &following in &rule.following {
            let slot = &mut tree.node_mut(level, idx).cmd_ready_clk[following as usize];
            if candidate > *slot {
                *slot = candidate;
            }
        }
    }
}
