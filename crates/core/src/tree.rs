//! The mutable node tree mirroring a device's organization hierarchy.
//!
//! `spec.md` §9 replaces the original's parent/child pointer graph with
//! "an arena of nodes owned by the device; identify nodes by `(level,
//! flat_index)` indices; resolve upward via `parent_id` stored in the
//! node." [`Tree`] holds one flat [`Vec<Node>`] per level, spanning
//! every channel (a bank's `flat_index` is unique across the whole
//! device, not just within its own channel) — no `Rc`/`RefCell`, no
//! cycles, no lifetimes to thread through the engines.

use std::collections::{BTreeMap, VecDeque};

use crate::spec::{Clock, CommandId, DeviceSpec, LevelId, UNCONSTRAINED};

/// Node state. The applicable subset depends on level: only bank nodes
/// ever become `Opened`/`PreOpened`/`Refreshing` in this model (every
/// "Standard action" in `spec.md` §4.4 ultimately mutates bank state;
/// channel/rank/bankgroup nodes carry timing state only, and their own
/// `state` field stays `Na`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    Closed,
    PreOpened,
    Opened,
    Refreshing,
    #[allow(dead_code)]
    PowerUp,
    #[default]
    Na,
}

/// One node: an element at some level of the organization hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    pub level: LevelId,
    /// Index among siblings under the same parent.
    pub node_id: usize,
    /// Flat index of the parent node at `level - 1`; `None` at the root
    /// (channel) level.
    pub parent: Option<usize>,
    /// Flat indices of children at `level + 1`; empty for bank nodes.
    pub children: Vec<usize>,
    pub state: NodeState,
    /// Bank-only: row id -> row state. Presence of a key denotes that
    /// row as currently open/pre-open (`spec.md` §3 invariant: `state ==
    /// Opened` iff non-empty).
    pub row_state: BTreeMap<i32, NodeState>,
    /// Earliest clock each command may legally issue at this node.
    /// `UNCONSTRAINED` (`-1`) means "no constraint recorded yet."
    pub cmd_ready_clk: Vec<Clock>,
    /// Bounded ring of the most recent issue clocks for each command,
    /// sized per command by [`DeviceSpec::history_window`].
    pub cmd_history: Vec<VecDeque<Clock>>,
    /// Rank-only (LPDDR5): cycle after which a fresh CAS-resync command
    /// is required before the next RD/WR.
    pub final_synced_cycle: Option<Clock>,
}

impl Node {
    fn new(level: LevelId, node_id: usize, parent: Option<usize>, spec: &DeviceSpec) -> Self {
        let n_cmds = spec.n_commands();
        let cmd_history = (0..n_cmds)
            .map(|c| {
                let window = spec.history_window(level, c as CommandId);
                VecDeque::with_capacity(window as usize)
            })
            .collect();
        Self {
            level,
            node_id,
            parent,
            children: Vec::new(),
            state: NodeState::default(),
            row_state: BTreeMap::new(),
            cmd_ready_clk: vec![UNCONSTRAINED; n_cmds],
            cmd_history,
            final_synced_cycle: None,
        }
    }

    /// Push `clk` into `cmd_history[cmd]`, evicting the oldest entry
    /// once the ring reaches its configured window size.
    pub fn record_issue(&mut self, cmd: CommandId, clk: Clock, window: u32) {
        if window == 0 {
            return;
        }
        let ring = &mut self.cmd_history[cmd as usize];
        if ring.len() as u32 >= window {
            let _ = ring.pop_front();
        }
        ring.push_back(clk);
    }

    /// The `window`-th oldest recorded issue clock for `cmd`, or `None`
    /// if fewer than `window` issues have been recorded.
    #[must_use]
    pub fn nth_oldest(&self, cmd: CommandId, window: u32) -> Option<Clock> {
        if window == 0 {
            return None;
        }
        let ring = &self.cmd_history[cmd as usize];
        if (ring.len() as u32) < window {
            return None;
        }
        // window=1 means "the most recent issue"; window=4 (nFAW) means
        // "four activates ago."
        ring.get(ring.len() - window as usize).copied()
    }
}

/// The full node arena for one device: one flat `Vec<Node>` per tree
/// level (channel through bank, inclusive).
#[derive(Debug, Clone)]
pub struct Tree {
    levels: Vec<Vec<Node>>,
}

impl Tree {
    /// Build the tree from the device's resolved organization counts.
    /// `spec.md` §4.2: "Built recursively from the root channels down to
    /// bank level... The tree layout is fully determined by the
    /// organization count vector."
    #[must_use]
    pub fn build(spec: &DeviceSpec) -> Self {
        let depth = spec.tree_level_count();
        let mut levels: Vec<Vec<Node>> = (0..depth).map(|_| Vec::new()).collect();

        // Level 0 (channel) has no parent and one node per channel.
        let n_channels = spec.org.counts[0] as usize;
        for c in 0..n_channels {
            levels[0].push(Node::new(0, c, None, spec));
        }

        // Each subsequent level replicates `counts[level]` children
        // under every node of the previous level.
        for level in 1..depth {
            let count = spec.org.counts[level] as usize;
            let parent_count = levels[level - 1].len();
            for parent_idx in 0..parent_count {
                let mut child_indices = Vec::with_capacity(count);
                for sibling in 0..count {
                    let flat_idx = levels[level].len();
                    levels[level].push(Node::new(level as LevelId, sibling, Some(parent_idx), spec));
                    child_indices.push(flat_idx);
                }
                levels[level - 1][parent_idx].children = child_indices;
            }
        }

        Self { levels }
    }

    #[must_use]
    pub fn node(&self, level: LevelId, idx: usize) -> &Node {
        &self.levels[level as usize][idx]
    }

    pub fn node_mut(&mut self, level: LevelId, idx: usize) -> &mut Node {
        &mut self.levels[level as usize][idx]
    }

    #[must_use]
    pub fn level_len(&self, level: LevelId) -> usize {
        self.levels[level as usize].len()
    }

    /// Resolve the concrete descendant of `(level, idx)` at `level + 1`
    /// named by `h[level + 1]`. `h`'s entry must be non-negative (the
    /// caller is only meant to use this while walking a concrete
    /// single-bank path).
    #[must_use]
    pub fn child_on_path(&self, level: LevelId, idx: usize, h: &[i32]) -> usize {
        let sibling = h[level as usize + 1];
        debug_assert!(sibling >= 0, "child_on_path called with wildcard address entry");
        self.node(level, idx).children[sibling as usize]
    }

    /// Walk from a channel node down to `target_level` following the
    /// concrete indices in `h`. Every level strictly between the
    /// channel and `target_level` must be concrete in `h` (not `-1`).
    #[must_use]
    pub fn resolve(&self, channel_idx: usize, h: &[i32], target_level: LevelId) -> (LevelId, usize) {
        let mut level: LevelId = 0;
        let mut idx = channel_idx;
        while level < target_level {
            idx = self.child_on_path(level, idx, h);
            level += 1;
        }
        (level, idx)
    }

    /// Every bank-level descendant of `(level, idx)`, in sibling order.
    #[must_use]
    pub fn banks_under(&self, level: LevelId, idx: usize, bank_level: LevelId) -> Vec<(LevelId, usize)> {
        let mut frontier = vec![(level, idx)];
        while frontier[0].0 < bank_level {
            frontier = frontier
                .iter()
                .flat_map(|&(l, i)| {
                    self.node(l, i)
                        .children
                        .iter()
                        .map(move |&c| (l + 1, c))
                })
                .collect();
        }
        frontier
    }

    /// The parent of `(level, idx)`, or `None` at the channel level.
    #[must_use]
    pub fn parent(&self, level: LevelId, idx: usize) -> Option<(LevelId, usize)> {
        self.node(level, idx).parent.map(|p| (level - 1, p))
    }
}
