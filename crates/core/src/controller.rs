//! Per-channel memory controller (`spec.md` §4.8).
//!
//! Owns the six buffers named in §3, drives at most one command per
//! cycle in strict priority order (active, priority, PIM-bank,
//! PIM-no-bank, write-or-read per the watermark), and moves a request
//! into the matching pending-completion queue once its `final_command`
//! issues.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::config::ControllerConfig;
use crate::deferred::DeferredQueue;
use crate::error::AimError;
use crate::preq;
use crate::queue::ReqBuffer;
use crate::request::{PimKind, Request, RequestType};
use crate::scheduler;
use crate::spec::{ActionKind, Clock, DeviceSpec};
use crate::state;
use crate::timing;
use crate::tree::Tree;

/// Per-channel controller. One instance per `MemorySystem` channel.
#[derive(Debug)]
pub struct Controller {
    channel_idx: usize,
    clk: Clock,
    cfg: ControllerConfig,

    active_buffer: ReqBuffer,
    priority_buffer: ReqBuffer,
    read_buffer: ReqBuffer,
    write_buffer: ReqBuffer,
    pim_bank_buffer: ReqBuffer,
    pim_no_bank_buffer: ReqBuffer,

    pending_reads: VecDeque<Request>,
    pending_writes: Vec<Request>,
    pending_pim_bank: Vec<Request>,
    pending_pim_no_bank: Vec<Request>,

    write_mode: bool,
    /// One entry per bank flat index under this channel; `true` means
    /// some row is currently open. Maintained per `spec.md` §4.4's
    /// explicit controller-side placement of `open_rows`.
    open_rows: Vec<bool>,

    per_command_issues: Vec<u64>,
    cycles_by_request_type: HashMap<&'static str, u64>,
    idle_cycles: u64,
    active_cycles: u64,
    precharged_cycles: u64,
}

impl Controller {
    /// `bank_count` is the device's *global* bank count (`Tree::level_len`
    /// at `bank_level`), not just this channel's share -- bank flat
    /// indices are global across the whole arena (`crate::tree`), and
    /// this channel only ever touches the slice it owns.
    #[must_use]
    pub fn new(channel_idx: usize, cfg: ControllerConfig, bank_count: usize, n_commands: usize) -> Self {
        Self {
            channel_idx,
            clk: 0,
            active_buffer: ReqBuffer::new(cfg.active_buffer_capacity),
            priority_buffer: ReqBuffer::new(cfg.priority_buffer_capacity),
            read_buffer: ReqBuffer::new(cfg.read_buffer_capacity),
            write_buffer: ReqBuffer::new(cfg.write_buffer_capacity),
            pim_bank_buffer: ReqBuffer::new(cfg.pim_bank_buffer_capacity),
            pim_no_bank_buffer: ReqBuffer::new(cfg.pim_no_bank_buffer_capacity),
            pending_reads: VecDeque::new(),
            pending_writes: Vec::new(),
            pending_pim_bank: Vec::new(),
            pending_pim_no_bank: Vec::new(),
            write_mode: false,
            open_rows: vec![false; bank_count],
            per_command_issues: vec![0; n_commands],
            cycles_by_request_type: HashMap::new(),
            idle_cycles: 0,
            active_cycles: 0,
            precharged_cycles: 0,
            cfg,
        }
    }

    #[must_use]
    pub fn per_command_issues(&self) -> &[u64] {
        &self.per_command_issues
    }

    #[must_use]
    pub fn idle_cycles(&self) -> u64 {
        self.idle_cycles
    }
    #[must_use]
    pub fn active_cycles(&self) -> u64 {
        self.active_cycles
    }
    #[must_use]
    pub fn precharged_cycles(&self) -> u64 {
        self.precharged_cycles
    }

    #[must_use]
    pub fn cycles_by_request_type(&self) -> &HashMap<&'static str, u64> {
        &self.cycles_by_request_type
    }

    /// Submit a read or write. `spec.md` §6's `bool`-returning external
    /// contract; use [`Self::try_submit_rw`] for the detailed error.
    pub fn submit_rw(&mut self, req: Request) -> bool {
        self.try_submit_rw(req).is_ok()
    }

    /// # Errors
    /// [`AimError::ResourceExhausted`] if the PIM buffers are non-empty
    /// (enqueue policy, `spec.md` §4.8) or the target buffer is full.
    pub fn try_submit_rw(&mut self, req: Request) -> Result<(), AimError> {
        if !self.pim_bank_buffer.is_empty() || !self.pim_no_bank_buffer.is_empty() {
            return Err(AimError::resource_exhausted(
                "cannot enqueue a read/write while PIM requests are pending on this channel",
            ));
        }

        if matches!(req.request_type, RequestType::Read) {
            if self.write_buffer.iter().any(|w| w.addr_h == req.addr_h) {
                let mut forwarded = req;
                forwarded.issue = Some(self.clk);
                forwarded.depart = Some(self.clk + 1);
                self.pending_reads.push_back(forwarded);
                return Ok(());
            }
        }

        let buffer = match req.request_type {
            RequestType::Read => &mut self.read_buffer,
            RequestType::Write => &mut self.write_buffer,
            RequestType::AllBankRefresh | RequestType::PrechargeSingleBank => &mut self.priority_buffer,
            RequestType::Pim(_) => unreachable!("submit_rw only accepts RW request types"),
        };
        buffer
            .push(req)
            .map_err(|_| AimError::resource_exhausted("buffer is full"))
    }

    /// Submit a PIM request. `spec.md` §6's `bool`-returning contract.
    pub fn submit_pim(&mut self, req: Request) -> bool {
        self.try_submit_pim(req).is_ok()
    }

    /// # Errors
    /// [`AimError::ResourceExhausted`] if the read/write buffers are
    /// non-empty, or the target buffer is full.
    pub fn try_submit_pim(&mut self, req: Request) -> Result<(), AimError> {
        if matches!(
            req.request_type,
            RequestType::Pim(PimKind::Mac4bkIntraBg | PimKind::Af4bkIntraBg | PimKind::Ewmul | PimKind::Ewadd)
        ) {
            return Err(AimError::configuration(
                "intra-bankgroup 4-bank PIM is scaffolded but disabled (spec.md §9, Open Question (i))",
            ));
        }
        if !self.read_buffer.is_empty() || !self.write_buffer.is_empty() {
            return Err(AimError::resource_exhausted(
                "cannot enqueue a PIM request while reads/writes are pending on this channel",
            ));
        }
        let buffer = if req.request_type.fanout() == 0 {
            &mut self.pim_no_bank_buffer
        } else {
            &mut self.pim_bank_buffer
        };
        buffer
            .push(req)
            .map_err(|_| AimError::resource_exhausted("buffer is full"))
    }

    /// Advance this channel by one cycle.
    pub fn tick(&mut self, tree: &mut Tree, spec: &DeviceSpec, deferred: &mut DeferredQueue) {
        self.clk += 1;
        self.drain_completions();
        self.update_watermark();

        let _ = self.try_issue_from_priority_chain(tree, spec, deferred);
        self.account_idle_or_open();
    }

    fn drain_completions(&mut self) {
        while let Some(front) = self.pending_reads.front() {
            if front.depart.is_some_and(|d| d <= self.clk) {
                let req = self.pending_reads.pop_front().unwrap_or_else(|| panic!("front just checked"));
                req.retire(self.clk);
            } else {
                break;
            }
        }
        retire_due(&mut self.pending_writes, self.clk);
        retire_due(&mut self.pending_pim_bank, self.clk);
        retire_due(&mut self.pending_pim_no_bank, self.clk);
    }

    fn update_watermark(&mut self) {
        let occ = self.write_buffer.occupancy();
        if occ > self.cfg.high_watermark || self.read_buffer.is_empty() {
            self.write_mode = true;
        } else if occ < self.cfg.low_watermark && !self.read_buffer.is_empty() {
            self.write_mode = false;
        }
    }

    fn all_buffers_empty(&self) -> bool {
        self.active_buffer.is_empty()
            && self.priority_buffer.is_empty()
            && self.read_buffer.is_empty()
            && self.write_buffer.is_empty()
            && self.pim_bank_buffer.is_empty()
            && self.pim_no_bank_buffer.is_empty()
    }

    fn account_idle_or_open(&mut self) {
        if self.all_buffers_empty() {
            self.idle_cycles += 1;
        } else if self.open_rows.iter().any(|&open| open) {
            self.active_cycles += 1;
        } else {
            self.precharged_cycles += 1;
        }
    }

    /// Returns `true` if a command was issued this cycle.
    fn try_issue_from_priority_chain(&mut self, tree: &mut Tree, spec: &DeviceSpec, deferred: &mut DeferredQueue) -> bool {
        if self.try_issue_frfcfs_from(BufferKind::Active, tree, spec, deferred) {
            return true;
        }
        if self.try_issue_frfcfs_from(BufferKind::Priority, tree, spec, deferred) {
            return true;
        }
        if !self.pim_bank_buffer.is_empty() {
            // Strict in-order: only the front of pim_bank_buffer is ever
            // a candidate. If it isn't ready, the channel blocks this
            // cycle rather than falling through to later buffers.
            return self.try_issue_strict_front(BufferKind::PimBank, tree, spec, deferred);
        }
        if self.try_issue_frfcfs_from(BufferKind::PimNoBank, tree, spec, deferred) {
            return true;
        }
        let rw_kind = if self.write_mode { BufferKind::Write } else { BufferKind::Read };
        self.try_issue_frfcfs_from(rw_kind, tree, spec, deferred)
    }

    fn buffer_mut(&mut self, kind: BufferKind) -> &mut ReqBuffer {
        match kind {
            BufferKind::Active => &mut self.active_buffer,
            BufferKind::Priority => &mut self.priority_buffer,
            BufferKind::PimBank => &mut self.pim_bank_buffer,
            BufferKind::PimNoBank => &mut self.pim_no_bank_buffer,
            BufferKind::Read => &mut self.read_buffer,
            BufferKind::Write => &mut self.write_buffer,
        }
    }

    fn try_issue_frfcfs_from(&mut self, kind: BufferKind, tree: &mut Tree, spec: &DeviceSpec, deferred: &mut DeferredQueue) -> bool {
        let channel_idx = self.channel_idx;
        let clk = self.clk;
        let Some(index) = scheduler::best_index(tree, spec, channel_idx, self.buffer_mut(kind), clk) else {
            return false;
        };
        self.try_issue_at(kind, index, tree, spec, deferred)
    }

    fn try_issue_strict_front(&mut self, kind: BufferKind, tree: &mut Tree, spec: &DeviceSpec, deferred: &mut DeferredQueue) -> bool {
        self.try_issue_at(kind, 0, tree, spec, deferred)
    }

    fn try_issue_at(&mut self, kind: BufferKind, index: usize, tree: &mut Tree, spec: &DeviceSpec, deferred: &mut DeferredQueue) -> bool {
        let channel_idx = self.channel_idx;
        let clk = self.clk;

        let next_command = {
            let buffer = self.buffer_mut(kind);
            let req = buffer.iter().nth(index).unwrap_or_else(|| panic!("index came from this buffer"));
            preq::resolve(tree, spec, channel_idx, req.final_command, &req.addr_h, clk)
        };
        let ready = {
            let req = self.buffer_mut(kind).iter().nth(index).unwrap_or_else(|| panic!("still present"));
            crate::ready::is_ready(tree, spec, channel_idx, next_command, &req.addr_h, clk)
        };
        if !ready {
            return false;
        }

        let cspec = &spec.commands[next_command as usize];
        if matches!(cspec.action_kind, ActionKind::Precharge | ActionKind::AutoPrechargeAccess) {
            let (bank_level, bank_idx) = tree.resolve(channel_idx, self.buffer_mut(kind).iter().nth(index).unwrap_or_else(|| panic!("still present")).addr_h.as_slice(), spec.bank_level);
            let conflict = self.active_buffer.iter().any(|active| {
                let (al, ai) = tree.resolve(channel_idx, &active.addr_h, spec.bank_level);
                (al, ai) == (bank_level, bank_idx)
            });
            if conflict {
                return false;
            }
        }

        debug!(channel = channel_idx, clk, command = cspec.name, "issuing command");
        self.per_command_issues[next_command as usize] += 1;

        let addr_h = self.buffer_mut(kind).iter().nth(index).unwrap_or_else(|| panic!("still present")).addr_h.clone();
        timing::update_timing(tree, spec, channel_idx, next_command, &addr_h, clk);
        state::apply_action(tree, spec, channel_idx, next_command, &addr_h, clk, deferred);
        self.refresh_open_rows(tree, spec, next_command, &addr_h);

        let final_command = self.buffer_mut(kind).iter().nth(index).unwrap_or_else(|| panic!("still present")).final_command;
        if next_command == final_command {
            let mut req = self.buffer_mut(kind).remove(index).unwrap_or_else(|| panic!("index valid"));
            let latency = command_latency(spec, next_command);
            req.issue = Some(clk);
            req.depart = Some(clk + latency);
            self.warn_if_blocked(&req);
            *self.cycles_by_request_type.entry(request_type_label(req.request_type)).or_insert(0) += latency as u64;
            self.route_to_pending(req);
        } else {
            let mut req = self.buffer_mut(kind).remove(index).unwrap_or_else(|| panic!("index valid"));
            req.command = next_command;
            if cspec.meta.opens && kind != BufferKind::Active {
                let _ = self.active_buffer.push(req);
            } else {
                let _ = self.buffer_mut(kind).push(req);
            }
        }
        true
    }

    fn warn_if_blocked(&self, req: &Request) {
        if let (Some(depart), arrive) = (req.depart, req.arrive) {
            let latency = depart - arrive;
            if latency as u64 > self.cfg.block_warning_threshold {
                warn!(channel = self.channel_idx, source_id = req.source_id, latency, "possible block: completion exceeded threshold");
            }
        }
    }

    fn route_to_pending(&mut self, req: Request) {
        match req.request_type {
            RequestType::Read => self.pending_reads.push_back(req),
            RequestType::Write => self.pending_writes.push(req),
            RequestType::Pim(kind) if kind.fanout() == 0 => self.pending_pim_no_bank.push(req),
            RequestType::Pim(_) => self.pending_pim_bank.push(req),
            RequestType::AllBankRefresh | RequestType::PrechargeSingleBank => self.pending_pim_bank.push(req),
        }
    }

    fn refresh_open_rows(&mut self, tree: &Tree, spec: &DeviceSpec, cmd: crate::spec::CommandId, h: &[i32]) {
        let cspec = &spec.commands[cmd as usize];
        if !(cspec.meta.opens || cspec.meta.closes) {
            return;
        }
        let (scope_level, scope_idx) = tree.resolve(self.channel_idx, h, cspec.action_scope);
        for (_, bank_idx) in tree.banks_under(scope_level, scope_idx, spec.bank_level) {
            if bank_idx < self.open_rows.len() {
                self.open_rows[bank_idx] = cspec.meta.opens;
            }
        }
    }
}

/// Cycles from issue to data availability for a data-bearing command:
/// `nCL + nBL` for a DQ-bus burst (RD/WR family, including CAS
/// re-sync), 1 cycle for a PIM compute/copy access (`spec.md` §8's S4:
/// "MACAB latency = 1") or any other non-accessing final command (e.g.
/// a single-bank precharge request).
pub(crate) fn command_latency(spec: &DeviceSpec, cmd: crate::spec::CommandId) -> Clock {
    let cspec = &spec.commands[cmd as usize];
    if cspec.meta.dq_burst {
        spec.timing.get("nCL") + spec.timing.get("nBL")
    } else {
        1
    }
}

fn request_type_label(rt: RequestType) -> &'static str {
    match rt {
        RequestType::Read => "read",
        RequestType::Write => "write",
        RequestType::AllBankRefresh => "all_bank_refresh",
        RequestType::PrechargeSingleBank => "precharge_single_bank",
        RequestType::Pim(_) => "pim",
    }
}

fn retire_due(pending: &mut Vec<Request>, clk: Clock) {
    let mut i = 0;
    while i < pending.len() {
        if pending[i].depart.is_some_and(|d| d <= clk) {
            let req = pending.remove(i);
            req.retire(clk);
        } else {
            i += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    Active,
    Priority,
    PimBank,
    PimNoBank,
    Read,
    Write,
}
