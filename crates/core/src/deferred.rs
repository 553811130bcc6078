//! Deferred-action queue.
//!
//! `spec.md` §4.10: "a small vector of `(command, address_hierarchy,
//! fire_clk)` entries. On each `tick`, entries with `fire_clk == clk`
//! are applied to the state engine and removed. Used today only for
//! `REFab_end`." A linear scan is adequate — the queue's population is
//! bounded by the number of in-flight refreshes per channel, never more
//! than a handful.

use crate::spec::{Clock, LevelId};
use crate::tree::{NodeState, Tree};

/// One entry: "restore every bank under `(level, idx)` to `Closed` at
/// `fire_clk`." This is the only deferred action in the model
/// (`REFab_end`/`REFpb_end`/`REFp2b_end`), so the queue stores the
/// restore target directly rather than a generic command token.
#[derive(Debug, Clone, Copy)]
struct RefreshEnd {
    level: LevelId,
    idx: usize,
    fire_clk: Clock,
}

/// Bounded, linearly-scanned queue of pending refresh-end actions.
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    pending: Vec<RefreshEnd>,
}

impl DeferredQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule every bank under `(level, idx)` to be released back to
    /// `Closed` at `fire_clk`.
    pub fn schedule_refresh_end(&mut self, level: LevelId, idx: usize, fire_clk: Clock) {
        self.pending.push(RefreshEnd { level, idx, fire_clk });
    }

    /// Apply and remove every entry due at `clk`.
    pub fn tick(&mut self, tree: &mut Tree, bank_level: LevelId, clk: Clock) {
        let (due, still_pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|e| e.fire_clk <= clk);
        self.pending = still_pending;
        for entry in due {
            for (l, i) in tree.banks_under(entry.level, entry.idx, bank_level) {
                let node = tree.node_mut(l, i);
                node.state = NodeState::Closed;
                node.row_state.clear();
            }
        }
    }

    /// Number of entries still pending (used by tests and stats).
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
