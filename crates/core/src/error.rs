//! Error taxonomy.
//!
//! Four of the five kinds below are distinguishable at the type level;
//! the fifth, "programmer error" (an invariant violation inside the
//! prerequisite resolver or the node tree), is never represented as an
//! `AimError` — it is a `panic!`/`debug_assert!` naming the offending
//! level and child index, per the simulator's own failure-semantics
//! contract: a reachable-but-invalid state is a bug in the caller or in
//! this crate, not a condition the caller can recover from.

use thiserror::Error;

/// Unified error taxonomy for configuration, initialization, and tracing.
///
/// `ResourceExhausted` (a full bounded buffer) is deliberately *not* part
/// of the external request API's return type: `submit_rw`/`submit_pim`
/// return `bool` so the caller can retry on a later cycle without
/// matching on an error type. [`crate::controller::Controller`] exposes
/// `try_submit_rw`/`try_submit_pim` for callers that want the
/// [`AimError::ResourceExhausted`] detail (the CLI logs it).
#[derive(Debug, Error)]
pub enum AimError {
    /// An unknown preset name, a density mismatch between a resolved
    /// organization preset and a declared density, a missing mandatory
    /// parameter, or a conflicting override. Fatal at device/config init.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal initialization failure: node-tree construction failed,
    /// or a declarative timing rule referenced a level/command outside
    /// the device's own tables. Fatal.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// A bounded request buffer was full on enqueue.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A trace file line did not match any recognized mnemonic or had
    /// the wrong number of fields for its fanout class. Fatal at load
    /// time (this variant is only ever produced by `aim-sim`, not by
    /// `aim-core` itself, since trace parsing is not a core concern).
    #[error("trace format error: {0}")]
    TraceFormat(String),
}

impl AimError {
    /// Build a [`AimError::Configuration`] error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`AimError::Initialization`] error.
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Build a [`AimError::ResourceExhausted`] error.
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Build a [`AimError::TraceFormat`] error.
    pub fn trace_format(msg: impl Into<String>) -> Self {
        Self::TraceFormat(msg.into())
    }
}
