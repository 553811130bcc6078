//! State engine: applies per-command state transitions on issue.
//!
//! `spec.md` §4.4 frames this as a hierarchy walk that applies a
//! per-level action and then recurses with the same single-path/fan-out
//! rule as the timing engine. Every "Standard action" it lists, though,
//! ultimately mutates bank nodes only — no action in the model ever
//! changes a channel/rank/bankgroup node's own `state` field. So instead
//! of re-deriving the walk, this module computes the concrete set of
//! affected banks directly from `(action_scope, addr_h)` — the scope
//! node's path is resolved via [`Tree::resolve`], and every bank under
//! it via [`Tree::banks_under`] — and applies the action to exactly
//! that set. This is behaviorally identical to the recursive walk for
//! every case `spec.md` enumerates and is recorded as a deliberate
//! simplification in `DESIGN.md`.

use crate::controller::command_latency;
use crate::deferred::DeferredQueue;
use crate::preq::desync_level;
use crate::spec::{ActionKind, Clock, CommandId, DeviceSpec};
use crate::tree::{NodeState, Tree};

/// Apply the state-engine effect of issuing `cmd` at address hierarchy
/// `h` and clock `clk`.
pub fn apply_action(
    tree: &mut Tree,
    spec: &DeviceSpec,
    channel_idx: usize,
    cmd: CommandId,
    h: &[i32],
    clk: Clock,
    deferred: &mut DeferredQueue,
) {
    let cspec = &spec.commands[cmd as usize];
    let (scope_level, scope_idx) = tree.resolve(channel_idx, h, cspec.action_scope);
    let row = h[spec.row_level() as usize];

    match cspec.action_kind {
        ActionKind::Activate => {
            for (l, i) in tree.banks_under(scope_level, scope_idx, spec.bank_level) {
                let node = tree.node_mut(l, i);
                node.state = NodeState::Opened;
                node.row_state.clear();
                let _ = node.row_state.insert(row, NodeState::Opened);
            }
        }
        ActionKind::ActivatePhase1 => {
            for (l, i) in tree.banks_under(scope_level, scope_idx, spec.bank_level) {
                let node = tree.node_mut(l, i);
                node.state = NodeState::PreOpened;
                node.row_state.clear();
                let _ = node.row_state.insert(row, NodeState::PreOpened);
            }
        }
        ActionKind::ActivatePhase2 => {
            for (l, i) in tree.banks_under(scope_level, scope_idx, spec.bank_level) {
                let node = tree.node_mut(l, i);
                node.state = NodeState::Opened;
                if let Some(entry) = node.row_state.get_mut(&row) {
                    *entry = NodeState::Opened;
                }
            }
        }
        ActionKind::Precharge | ActionKind::AutoPrechargeAccess => {
            for (l, i) in tree.banks_under(scope_level, scope_idx, spec.bank_level) {
                let node = tree.node_mut(l, i);
                node.state = NodeState::Closed;
                node.row_state.clear();
            }
        }
        ActionKind::Refresh => {
            for (l, i) in tree.banks_under(scope_level, scope_idx, spec.bank_level) {
                tree.node_mut(l, i).state = NodeState::Refreshing;
            }
            let param = cspec
                .refresh_latency_param
                .unwrap_or_else(|| panic!("Refresh action_kind must carry a refresh_latency_param"));
            let nrfc = spec.timing.get(param);
            deferred.schedule_refresh_end(scope_level, scope_idx, clk + nrfc - 1);
        }
        ActionKind::PlainAccess => {
            // Rank-wide CAS re-sync bookkeeping (LPDDR5 only): every
            // bank/bankgroup/rank-scoped access refreshes the rank's
            // `final_synced_cycle` to the cycle its own data transfer
            // completes; a channel-scope no-bank op (WRGB/WRMAC/...)
            // carries no row/bank state and never touches it.
            if cspec.meta.accesses && cspec.action_scope != 0 {
                if let Some(rank_level) = desync_level(spec) {
                    let (rl, ridx) = tree.resolve(channel_idx, h, rank_level);
                    let wk = &spec.well_known;
                    let is_resync = wk.cas_read_resync == Some(cmd) || wk.cas_write_resync == Some(cmd);
                    let extra = if is_resync { 1 } else { 0 };
                    tree.node_mut(rl, ridx).final_synced_cycle = Some(clk + command_latency(spec, cmd) + extra);
                }
            }
        }
    }
}
