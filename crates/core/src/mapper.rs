//! Address mapper collaborator: translates a request's address into the
//! device's canonical channel-first `addr_h` (`spec.md` §4.9).
//!
//! Trace lines (`spec.md` §6) already name each address component
//! explicitly (channel, \[rank\,] bankgroup, bank, row, column), so the
//! default mapper is close to the identity -- it only validates field
//! counts/ranges and lets wildcard (`-1`) components through for the
//! broadcast request types. `RowBankRankColChannelLinear` additionally
//! supports a flat linear host address, decoded via mixed-radix digits
//! in row-major order, for callers that hand the simulator a single
//! address rather than pre-split fields.
//!
//! `Mop4ClXor`/`RoBaRaCoCh` are named in `spec.md` §6 but their exact bit
//! layout is Open Question (ii) in §9: left as disabled placeholders.

use crate::error::AimError;
use crate::spec::DeviceSpec;

/// Converts a host-facing address into a device's `addr_h`.
pub trait AddressMapper: Send + Sync + std::fmt::Debug {
    /// `fields` is channel-first, one entry per tree level plus row and
    /// column, with `-1` wildcards left untouched for broadcast
    /// commands. Returns the same shape, after validation/reordering.
    fn apply(&self, spec: &DeviceSpec, fields: &[i32]) -> Result<Vec<i32>, AimError>;

    /// Decode a single flat linear address into `addr_h`. Only
    /// `RowBankRankColChannelLinear` implements this meaningfully; other
    /// mappers reject it since trace-driven fields are their only input.
    fn apply_linear(&self, _spec: &DeviceSpec, _address: u64) -> Result<Vec<i32>, AimError> {
        Err(AimError::configuration(
            "this address mapper does not support linear address decoding; supply explicit fields instead"
                .to_string(),
        ))
    }
}

/// The default scheme: fields arrive already channel-first in the
/// device's own level order, so this mapper only validates shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelRowBankRowColLinear;

impl AddressMapper for ChannelRowBankRowColLinear {
    fn apply(&self, spec: &DeviceSpec, fields: &[i32]) -> Result<Vec<i32>, AimError> {
        let expected = spec.col_level() as usize + 1;
        if fields.len() != expected {
            return Err(AimError::configuration(format!(
                "address has {} fields, device expects {expected}",
                fields.len()
            )));
        }
        Ok(fields.to_vec())
    }
}

/// Row-major linear decomposition: `row, bank, [rank,] bankgroup, col,
/// channel`, least-significant field last, reassembled into the
/// canonical channel-first order this crate's tree uses internally.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowBankRankColChannelLinear;

impl AddressMapper for RowBankRankColChannelLinear {
    fn apply(&self, spec: &DeviceSpec, fields: &[i32]) -> Result<Vec<i32>, AimError> {
        ChannelRowBankRowColLinear.apply(spec, fields)
    }

    fn apply_linear(&self, spec: &DeviceSpec, address: u64) -> Result<Vec<i32>, AimError> {
        // Mixed-radix digits, channel least-significant: col, bank,
        // [rank,] bankgroup, row, channel -- reversed to the scheme's
        // name, which lists channel last (most significant bit range).
        let mut radices: Vec<u64> = vec![spec.org.cols as u64];
        for level in (0..spec.tree_level_count() as u8).rev() {
            radices.push(spec.org.counts[level as usize] as u64);
        }
        radices.push(spec.org.rows as u64);

        let mut remaining = address;
        let mut digits = Vec::with_capacity(radices.len());
        for radix in &radices {
            digits.push((remaining % radix) as i32);
            remaining /= radix;
        }
        // digits is now [col, bank, ..., channel, row] in pop order;
        // reassemble channel-first: channel, ..., bank, row, col.
        let col = digits[0];
        let row = *digits.last().unwrap_or_else(|| panic!("at least one digit"));
        let mut addr_h: Vec<i32> = digits[1..digits.len() - 1].to_vec();
        addr_h.reverse();
        addr_h.push(row);
        addr_h.push(col);
        Ok(addr_h)
    }
}

/// Open Question (ii): bit-layout undefined in `spec.md`. Disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mop4ClXor;

impl AddressMapper for Mop4ClXor {
    fn apply(&self, _spec: &DeviceSpec, _fields: &[i32]) -> Result<Vec<i32>, AimError> {
        Err(AimError::configuration(
            "MOP4CLXOR address mapping is not implemented (bit layout left undefined)".to_string(),
        ))
    }
}

/// Open Question (ii): bit-layout undefined in `spec.md`. Disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoBaRaCoCh;

impl AddressMapper for RoBaRaCoCh {
    fn apply(&self, _spec: &DeviceSpec, _fields: &[i32]) -> Result<Vec<i32>, AimError> {
        Err(AimError::configuration(
            "RoBaRaCoCh address mapping is not implemented (bit layout left undefined)".to_string(),
        ))
    }
}

/// Build the configured mapper.
#[must_use]
pub fn build(kind: crate::config::MapperKind) -> Box<dyn AddressMapper> {
    use crate::config::MapperKind;
    match kind {
        MapperKind::ChannelRowBankRowColLinear => Box::new(ChannelRowBankRowColLinear),
        MapperKind::RowBankRankColChannelLinear => Box::new(RowBankRankColChannelLinear),
        MapperKind::Mop4ClXor => Box::new(Mop4ClXor),
        MapperKind::RoBaRaCoCh => Box::new(RoBaRaCoCh),
    }
}
