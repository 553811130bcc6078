//! Cycle-accurate DRAM + processing-in-memory (AiM) simulator core.
//!
//! This crate implements the hard part of a GDDR6-/LPDDR5-class DRAM device
//! augmented with processing-in-memory (PIM) commands, and the per-channel
//! memory controller that drives it:
//! 1. **Spec tables:** per-device-model level/command/state name tables,
//!    organization and timing presets (`spec`).
//! 2. **Node tree:** the mutable channel → \[rank\] → bankgroup → bank
//!    hierarchy (`tree`).
//! 3. **Engines:** timing (`timing`), state (`state`), prerequisite
//!    resolution (`preq`), and readiness/row queries (`ready`), all
//!    operating over the node tree.
//! 4. **Requests & scheduling:** request/queue types (`request`, `queue`),
//!    First-Ready-First-Come-First-Serve scheduling (`scheduler`).
//! 5. **Controller & system:** the per-channel controller (`controller`),
//!    the deferred-action queue it relies on (`deferred`), the address
//!    mapper collaborator (`mapper`), and the multi-channel memory system
//!    that ties everything together (`system`).
//! 6. **Ambient:** configuration (`config`), error taxonomy (`error`),
//!    run statistics (`stats`).

#![forbid(unsafe_code)]

/// Error taxonomy for configuration, initialization, and resource exhaustion.
pub mod error;
/// Simulator configuration (device/organization/timing overrides, controller tuning).
pub mod config;
/// Device specification tables: levels, commands, states, presets.
pub mod spec;
/// The mutable node tree mirroring a device's organization hierarchy.
pub mod tree;
/// Timing engine: populates and advances `cmd_ready_clk` on issue.
pub mod timing;
/// State engine: applies per-command state transitions on issue.
pub mod state;
/// Prerequisite resolver: `preq(cmd, addr_h, clk) -> cmd'`.
pub mod preq;
/// Readiness, row-hit, and row-open queries.
pub mod ready;
/// Request record and PIM/RW request-type tables.
pub mod request;
/// Bounded FIFO request-buffer abstraction.
pub mod queue;
/// First-Ready-First-Come-First-Serve scheduler.
pub mod scheduler;
/// Deferred-action queue (e.g. end-of-refresh bank release).
pub mod deferred;
/// Address mapper collaborator: host address to address hierarchy.
pub mod mapper;
/// Per-channel memory controller.
pub mod controller;
/// Multi-channel memory system.
pub mod system;
/// Run statistics and YAML report serialization.
pub mod stats;

/// Root configuration type; deserialize with `Config::from_json`/`from_yaml`.
pub use crate::config::Config;
/// Unified error taxonomy for this crate.
pub use crate::error::AimError;
/// Per-channel memory controller.
pub use crate::controller::Controller;
/// Top-level multi-channel memory system; construct with `MemorySystem::new`.
pub use crate::system::MemorySystem;
