//! Multi-channel memory system (`spec.md` §4.9).
//!
//! Ties the node tree, device spec, deferred-action queue, per-channel
//! controllers, and address mapper together. Routes a request to
//! `controllers[addr_h[0]]` after the mapper fills `addr_h`; a vector of
//! requests (the channel-mask broadcast case) is routed address-by-
//! address, and the overall result is the AND of the individual sends.

use crate::config::Config;
use crate::controller::Controller;
use crate::deferred::DeferredQueue;
use crate::error::AimError;
use crate::mapper::{self, AddressMapper};
use crate::request::{Request, RequestType};
use crate::spec::{Clock, DeviceSpec};
use crate::tree::Tree;

#[derive(Debug)]
pub struct MemorySystem {
    tree: Tree,
    spec: DeviceSpec,
    deferred: DeferredQueue,
    controllers: Vec<Controller>,
    mapper: Box<dyn AddressMapper>,
    clk: Clock,
}

impl MemorySystem {
    /// # Errors
    /// Propagates [`AimError::Configuration`]/[`AimError::Initialization`]
    /// from device-spec resolution.
    pub fn new(cfg: &Config) -> Result<Self, AimError> {
        let spec = DeviceSpec::resolve(&cfg.device.model, &cfg.device)?;
        let tree = Tree::build(&spec);
        let bank_count = tree.level_len(spec.bank_level);
        let n_channels = cfg.system.num_channels as usize;
        if n_channels != spec.org.counts[0] as usize {
            return Err(AimError::configuration(format!(
                "system.num_channels ({n_channels}) does not match device organization channel count ({})",
                spec.org.counts[0]
            )));
        }
        let controllers = (0..n_channels)
            .map(|c| Controller::new(c, cfg.controller.clone(), bank_count, spec.n_commands()))
            .collect();
        Ok(Self {
            tree,
            spec,
            deferred: DeferredQueue::new(),
            controllers,
            mapper: mapper::build(cfg.system.mapper),
            clk: 0,
        })
    }

    #[must_use]
    pub fn spec(&self) -> &DeviceSpec {
        &self.spec
    }

    #[must_use]
    pub fn clk(&self) -> Clock {
        self.clk
    }

    #[must_use]
    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    /// Advance the whole system by one cycle: the node tree's deferred
    /// actions first, then every channel controller in order
    /// (`spec.md` §5: "the memory system ticks DRAM once, then every
    /// channel controller in order").
    pub fn tick(&mut self) {
        self.clk += 1;
        self.deferred.tick(&mut self.tree, self.spec.bank_level, self.clk);
        for controller in &mut self.controllers {
            controller.tick(&mut self.tree, &self.spec, &mut self.deferred);
        }
    }

    /// Submit a read or write. `fields` is a channel-first address tuple
    /// (see [`crate::mapper::AddressMapper::apply`]).
    pub fn submit_rw(&mut self, request_type: RequestType, fields: &[i32], source_id: u64, callback: impl FnOnce(&Request) + Send + 'static) -> Result<bool, AimError> {
        let addr_h = self.mapper.apply(&self.spec, fields)?;
        let channel = addr_h[0] as usize;
        let final_command = request_type.final_command(&self.spec);
        let req = Request::new(addr_h, request_type, source_id, final_command, self.clk).with_completion(callback);
        Ok(self.controller_mut(channel)?.submit_rw(req))
    }

    /// Submit a PIM request.
    pub fn submit_pim(&mut self, request_type: RequestType, fields: &[i32], source_id: u64, callback: impl FnOnce(&Request) + Send + 'static) -> Result<bool, AimError> {
        let addr_h = self.mapper.apply(&self.spec, fields)?;
        let channel = addr_h[0] as usize;
        let final_command = request_type.final_command(&self.spec);
        let req = Request::new(addr_h, request_type, source_id, final_command, self.clk).with_completion(callback);
        Ok(self.controller_mut(channel)?.submit_pim(req))
    }

    /// Submit a read or write addressed by a single flat host address
    /// (`spec.md` §6's `apply(request)` contract), decoded via the
    /// configured mapper's [`AddressMapper::apply_linear`].
    pub fn submit_rw_linear(&mut self, request_type: RequestType, address: u64, source_id: u64, callback: impl FnOnce(&Request) + Send + 'static) -> Result<bool, AimError> {
        let addr_h = self.mapper.apply_linear(&self.spec, address)?;
        let channel = addr_h[0] as usize;
        let final_command = request_type.final_command(&self.spec);
        let req = Request::new(addr_h, request_type, source_id, final_command, self.clk).with_completion(callback);
        Ok(self.controller_mut(channel)?.submit_rw(req))
    }

    fn controller_mut(&mut self, channel: usize) -> Result<&mut Controller, AimError> {
        self.controllers
            .get_mut(channel)
            .ok_or_else(|| AimError::configuration(format!("address resolves to out-of-range channel {channel}")))
    }
}
