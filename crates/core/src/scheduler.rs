//! First-Ready-First-Come-First-Serve scheduling (`spec.md` §4.7).
//!
//! Grounded in the original's `generic_scheduler.cpp`: a plain FRFCFS
//! picks the oldest ready request, falling back to the oldest request at
//! all if none are ready yet (so its prerequisite keeps getting chased).
//! The AiM-specific variant additionally respects *scope grouping*:
//! commands whose `action_scope` reaches the channel (all-bank PIM,
//! all-bank refresh) must issue in strict arrival order relative to each
//! other -- picking a later one out of order could activate/precharge
//! banks a still-pending earlier channel-scope request depends on. Finer
//! scoped requests (ordinary single-bank RD/WR, per-bank PIM) are free
//! to reorder around each other the usual FRFCFS way.

use crate::queue::ReqBuffer;
use crate::ready;
use crate::request::Request;
use crate::spec::{Clock, DeviceSpec};
use crate::tree::Tree;

/// Whether `req` is ready to issue its current (possibly intermediate)
/// command at `clk`.
#[must_use]
pub fn is_ready(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, req: &Request, clk: Clock) -> bool {
    ready::is_ready(tree, spec, channel_idx, req.command, &req.addr_h, clk)
}

/// Plain FRFCFS: the oldest ready request if any is ready, otherwise the
/// oldest request overall. Returns `None` for an empty buffer.
#[must_use]
pub fn best_index(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, buffer: &ReqBuffer, clk: Clock) -> Option<usize> {
    let mut oldest_ready: Option<(usize, Clock)> = None;
    let mut oldest_any: Option<(usize, Clock)> = None;

    for (i, req) in buffer.iter().enumerate() {
        if oldest_any.is_none_or(|(_, arrive)| req.arrive < arrive) {
            oldest_any = Some((i, req.arrive));
        }
        if is_ready(tree, spec, channel_idx, req, clk) && oldest_ready.is_none_or(|(_, arrive)| req.arrive < arrive) {
            oldest_ready = Some((i, req.arrive));
        }
    }

    oldest_ready.or(oldest_any).map(|(i, _)| i)
}

/// Scope-group-aware FRFCFS for AiM command buffers (`spec.md` §4.7's
/// "AiM-specific" variant). Channel-scope requests (`action_scope ==
/// 0`) must be picked in strict FIFO order among themselves: the first
/// one in the buffer is the only eligible candidate until it departs.
/// Every other request is free to use plain FRFCFS.
#[must_use]
pub fn best_aim_index(tree: &Tree, spec: &DeviceSpec, channel_idx: usize, buffer: &ReqBuffer, clk: Clock) -> Option<usize> {
    let channel_scope_head = buffer
        .iter()
        .enumerate()
        .find(|(_, req)| spec.commands[req.final_command as usize].action_scope == 0)
        .map(|(i, _)| i);

    match channel_scope_head {
        // A channel-scope request sits earlier than every finer-scope
        // candidate: it must go first, ready or not, once it's at the
        // front of its own scope group.
        Some(head) if buffer.iter().take(head).all(|r| spec.commands[r.final_command as usize].action_scope != 0) => {
            let req = buffer.iter().nth(head).unwrap_or_else(|| panic!("head index within bounds"));
            if is_ready(tree, spec, channel_idx, req, clk) {
                Some(head)
            } else {
                best_index_excluding(tree, spec, channel_idx, buffer, clk, head)
            }
        }
        _ => best_index(tree, spec, channel_idx, buffer, clk),
    }
}

fn best_index_excluding(
    tree: &Tree,
    spec: &DeviceSpec,
    channel_idx: usize,
    buffer: &ReqBuffer,
    clk: Clock,
    exclude: usize,
) -> Option<usize> {
    let mut oldest_ready: Option<(usize, Clock)> = None;
    for (i, req) in buffer.iter().enumerate() {
        if i == exclude {
            continue;
        }
        if spec.commands[req.final_command as usize].action_scope == 0 {
            // Don't let a later channel-scope request jump the earlier one.
            break;
        }
        if is_ready(tree, spec, channel_idx, req, clk) && oldest_ready.is_none_or(|(_, arrive)| req.arrive < arrive) {
            oldest_ready = Some((i, req.arrive));
        }
    }
    oldest_ready.map(|(i, _)| i)
}
