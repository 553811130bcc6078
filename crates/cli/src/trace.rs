//! Trace file parsing (`spec.md` §6).
//!
//! Trace parsing is a CLI-only concern: `aim-core` only ever sees an
//! already-resolved [`RequestType`] and an already-shaped address field
//! vector. Whitespace-separated lines; `#` introduces a comment that
//! runs to end of line. The first token is a type mnemonic; everything
//! after it depends on that mnemonic's fanout class:
//!
//! - **RW** (`R`, `W`): one decimal host address.
//! - **no-bank** (`WR_GB`, `WR_MAC`, `WR_BIAS`, `RD_MAC`, `RD_AF`): a
//!   channel mask only.
//! - **single-bank/4-bank/all-bank** (everything else, including the
//!   PIM single-bank ops and `MAC_4BK_INTRA_BG`-class/`MAC_ABK`-class
//!   ops): `ch_mask rank pch bank row col`.
//!
//! The original project's packet struct carries a `pch` (precharge)
//! field alongside the address; this simulator's prerequisite resolver
//! decides precharging on its own from bank state, so `pch` is parsed
//! (to keep the field count self-documenting) and otherwise ignored.
//! `rank` is dropped on device models with no rank level (GDDR6).

use aim_core::error::AimError;
use aim_core::request::{PimKind, RequestType};
use aim_core::spec::DeviceSpec;

/// One parsed trace line, not yet resolved against a device's tree
/// shape (that happens in [`Self::channels`]/[`crate::run`]).
#[derive(Debug, Clone)]
pub enum TraceEntry {
    /// RW fanout class: a single flat host address.
    Linear { line_no: usize, request_type: RequestType, address: u64 },
    /// Every other fanout class: a channel mask plus explicit fields.
    Broadcast { line_no: usize, request_type: RequestType, ch_mask: u32, rank: i32, bank: i32, row: i32, col: i32 },
}

fn mnemonic_to_request_type(mnemonic: &str) -> Option<RequestType> {
    Some(match mnemonic {
        "R" => RequestType::Read,
        "W" => RequestType::Write,
        "REFAB" | "REFab" => RequestType::AllBankRefresh,
        "PRESB" => RequestType::PrechargeSingleBank,
        "MAC_SBK" => RequestType::Pim(PimKind::MacSbk),
        "AF_SBK" => RequestType::Pim(PimKind::AfSbk),
        "COPY_BKGB" => RequestType::Pim(PimKind::CopyBkgb),
        "COPY_GBBK" => RequestType::Pim(PimKind::CopyGbbk),
        "MAC_4BK_INTRA_BG" => RequestType::Pim(PimKind::Mac4bkIntraBg),
        "AF_4BK_INTRA_BG" => RequestType::Pim(PimKind::Af4bkIntraBg),
        "EWMUL" => RequestType::Pim(PimKind::Ewmul),
        "EWADD" => RequestType::Pim(PimKind::Ewadd),
        "MAC_ABK" => RequestType::Pim(PimKind::MacAbk),
        "AF_ABK" => RequestType::Pim(PimKind::AfAbk),
        "WR_AFLUT" => RequestType::Pim(PimKind::WrAflut),
        "WR_BK" => RequestType::Pim(PimKind::WrBk),
        "WR_GB" => RequestType::Pim(PimKind::WrGb),
        "WR_MAC" => RequestType::Pim(PimKind::WrMac),
        "WR_BIAS" => RequestType::Pim(PimKind::WrBias),
        "RD_MAC" => RequestType::Pim(PimKind::RdMac),
        "RD_AF" => RequestType::Pim(PimKind::RdAf),
        _ => return None,
    })
}

fn is_rw(request_type: RequestType) -> bool {
    matches!(request_type, RequestType::Read | RequestType::Write)
}

fn parse_field(line_no: usize, token: Option<&str>, field_name: &str) -> Result<i32, AimError> {
    token
        .ok_or_else(|| AimError::trace_format(format!("line {line_no}: missing {field_name} field")))?
        .parse::<i32>()
        .map_err(|e| AimError::trace_format(format!("line {line_no}: bad {field_name} field: {e}")))
}

/// Parse a full trace document into entries, in file order.
///
/// # Errors
/// Returns [`AimError::TraceFormat`] on the first malformed line
/// (unknown mnemonic, wrong field count, non-integer field).
pub fn parse(text: &str) -> Result<Vec<TraceEntry>, AimError> {
    let mut entries = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let mnemonic = tokens.next().unwrap_or("");
        let request_type = mnemonic_to_request_type(mnemonic)
            .ok_or_else(|| AimError::trace_format(format!("line {line_no}: unrecognized mnemonic `{mnemonic}`")))?;

        if is_rw(request_type) {
            let address_tok = tokens
                .next()
                .ok_or_else(|| AimError::trace_format(format!("line {line_no}: RW trace entry missing address")))?;
            let address = address_tok
                .parse::<u64>()
                .map_err(|e| AimError::trace_format(format!("line {line_no}: bad address: {e}")))?;
            entries.push(TraceEntry::Linear { line_no, request_type, address });
            continue;
        }

        let ch_mask = parse_field(line_no, tokens.next(), "ch_mask")? as u32;
        if request_type.fanout() == 0 {
            entries.push(TraceEntry::Broadcast { line_no, request_type, ch_mask, rank: 0, bank: 0, row: 0, col: 0 });
            continue;
        }
        let rank = parse_field(line_no, tokens.next(), "rank")?;
        let _pch = parse_field(line_no, tokens.next(), "pch")?;
        let bank = parse_field(line_no, tokens.next(), "bank_addr_or_mask")?;
        let row = parse_field(line_no, tokens.next(), "row")?;
        let col = parse_field(line_no, tokens.next(), "col")?;
        entries.push(TraceEntry::Broadcast { line_no, request_type, ch_mask, rank, bank, row, col });
    }
    Ok(entries)
}

/// Expand a [`TraceEntry::Broadcast`] into one channel-first field
/// vector per channel selected in `ch_mask`, shaped for the device's
/// tree (`channel, [rank,] bankgroup, bank, row, column`). `bank` fills
/// both the bankgroup and bank slots — sufficient because a request
/// whose `action_scope` cuts off above bank level (all-bank/4-bank/
/// no-bank) ignores everything below that scope anyway.
#[must_use]
pub fn expand_broadcast(spec: &DeviceSpec, ch_mask: u32, rank: i32, bank: i32, row: i32, col: i32) -> Vec<(usize, Vec<i32>)> {
    let has_rank = spec.bank_level >= 3;
    let mut out = Vec::new();
    for channel in 0..spec.org.counts[0] {
        if ch_mask & (1 << channel) == 0 {
            continue;
        }
        let mut fields = vec![i32::from(channel)];
        if has_rank {
            fields.push(rank);
        }
        fields.push(bank); // bankgroup slot
        fields.push(bank);
        fields.push(row);
        fields.push(col);
        out.push((channel as usize, fields));
    }
    out
}
