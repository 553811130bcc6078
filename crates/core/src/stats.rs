//! Run statistics and YAML report serialization (`spec.md` §6).
//!
//! A YAML document per run: per-channel per-command issue counts,
//! per-request-type total cycles (issue-to-depart), and idle/active/
//! precharged cycle totals. Built once from a [`crate::system::MemorySystem`]
//! via [`Stats::collect`] after the run finishes (`finalize()` in the
//! spec's terms).

use std::collections::HashMap;

use serde::Serialize;

use crate::error::AimError;
use crate::system::MemorySystem;

#[derive(Debug, Clone, Serialize)]
pub struct ChannelStats {
    pub idle_cycles: u64,
    pub active_cycles: u64,
    pub precharged_cycles: u64,
    /// Command mnemonic -> issue count.
    pub command_issues: HashMap<String, u64>,
    /// Request type label -> total issue-to-depart cycles.
    pub cycles_by_request_type: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_clk: i64,
    pub channels: Vec<ChannelStats>,
}

impl Stats {
    #[must_use]
    pub fn collect(system: &MemorySystem) -> Self {
        let spec = system.spec();
        let channels = system
            .controllers()
            .iter()
            .map(|controller| {
                let command_issues = controller
                    .per_command_issues()
                    .iter()
                    .enumerate()
                    .filter(|&(_, &count)| count > 0)
                    .map(|(i, &count)| (spec.commands[i].name.to_string(), count))
                    .collect();
                let cycles_by_request_type = controller
                    .cycles_by_request_type()
                    .iter()
                    .map(|(&label, &cycles)| (label.to_string(), cycles))
                    .collect();
                ChannelStats {
                    idle_cycles: controller.idle_cycles(),
                    active_cycles: controller.active_cycles(),
                    precharged_cycles: controller.precharged_cycles(),
                    command_issues,
                    cycles_by_request_type,
                }
            })
            .collect();
        Self { total_clk: system.clk(), channels }
    }

    /// Render this report as a YAML document.
    ///
    /// # Errors
    /// Returns [`AimError::Initialization`] only if `serde_yaml` itself
    /// fails, which does not happen for this crate's own serializable
    /// types (an internal-consistency invariant, not user input).
    pub fn to_yaml(&self) -> Result<String, AimError> {
        serde_yaml::to_string(self).map_err(|e| AimError::initialization(format!("failed to render stats as yaml: {e}")))
    }
}
