//! LPDDR5-class AiM device model.
//!
//! Grounded in `examples/original_source/src/aimulator/src/dram/impl/AiM_LPDDR5.cpp`:
//! adds a rank level above bankgroup, splits activate into `ACT-1`/
//! `ACT-2` (and the all-bank/4-bank-group variants likewise), and tracks
//! per-rank CAS re-sync via `final_synced_cycle`. The original source's
//! refresh-management commands (`RFMab`/`RFMpb`) implement a row-hammer
//! mitigation policy `spec.md` never mentions (its Non-goals explicitly
//! scope out "refresh policy beyond honoring the refresh latency
//! window"), so they are left out of this table rather than carried as
//! unused entries; noted in `DESIGN.md`.
//!
//! The exact JEDEC timing-preset figures for LPDDR5 were not confirmed
//! against the original source during research, so the values below are
//! a self-consistent, clearly-labeled preset rather than a byte-exact
//! transcription: every rule references these same named parameters, so
//! correctness of the engine does not depend on matching unverified
//! external figures.

use std::collections::HashMap;

use crate::config::DeviceConfig;
use crate::error::AimError;
use crate::spec::table::{
    ActionKind, CommandMeta, CommandSpec, OrgPreset, PreqKind, TimingPreset, TimingRule, WellKnown,
};
use crate::spec::{build_command_index, rounding, DeviceKind, DeviceSpec};

const LEVELS: [&str; 6] = ["channel", "rank", "bankgroup", "bank", "row", "column"];
const CHANNEL: u8 = 0;
const RANK: u8 = 1;
const BANKGROUP: u8 = 2;
const BANK: u8 = 3;
const ROW: u8 = 4;
const COLUMN: u8 = 5;

fn meta(opens: bool, closes: bool, accesses: bool, refresh: bool, dq_burst: bool) -> CommandMeta {
    CommandMeta { opens, closes, accesses, refresh, dq_burst }
}

#[allow(clippy::too_many_arguments)]
fn cmd(
    name: &'static str,
    addressing_level: u8,
    action_scope: u8,
    m: CommandMeta,
    action_kind: ActionKind,
    preq_kind: PreqKind,
    is_write: bool,
    refresh_latency_param: Option<&'static str>,
) -> CommandSpec {
    CommandSpec {
        name,
        addressing_level,
        action_scope,
        meta: m,
        action_kind,
        preq_kind,
        is_write,
        refresh_latency_param,
    }
}

fn commands() -> Vec<CommandSpec> {
    use ActionKind::{
        Activate, ActivatePhase1, ActivatePhase2, AutoPrechargeAccess, Precharge, PlainAccess,
        Refresh,
    };
    use PreqKind::{AllBankPim, AllBankRefresh, Bank4Intra, BankSingleRw, Ready};
    vec![
        cmd("ACT-1", ROW, BANK, meta(true, false, false, false, false), ActivatePhase1, Ready, false, None),
        cmd("ACT-2", ROW, BANK, meta(true, false, false, false, false), ActivatePhase2, Ready, false, None),
        cmd("PRE", BANK, BANK, meta(false, true, false, false, false), Precharge, Ready, false, None),
        cmd("PREA", BANK, RANK, meta(false, true, false, false, false), Precharge, Ready, false, None),
        // CASRD/CASWR: re-synchronization access issued in place of an
        // ordinary read/write when the rank's `final_synced_cycle` has
        // not yet elapsed (spec.md 4.5, "Opened, row in row_state").
        cmd("CASRD", COLUMN, BANK, meta(false, false, true, false, true), PlainAccess, Ready, false, None),
        cmd("CASWR", COLUMN, BANK, meta(false, false, true, false, true), PlainAccess, Ready, true, None),
        cmd("RD16", COLUMN, BANK, meta(false, false, true, false, true), PlainAccess, BankSingleRw, false, None),
        cmd("WR16", COLUMN, BANK, meta(false, false, true, false, true), PlainAccess, BankSingleRw, true, None),
        cmd("RD16A", COLUMN, BANK, meta(false, true, true, false, true), AutoPrechargeAccess, BankSingleRw, false, None),
        cmd("WR16A", COLUMN, BANK, meta(false, true, true, false, true), AutoPrechargeAccess, BankSingleRw, true, None),
        cmd("REFab", BANK, RANK, meta(false, false, false, true, false), Refresh, AllBankRefresh, false, Some("nRFCab")),
        cmd("REFpb", BANK, BANK, meta(false, false, false, true, false), Refresh, Ready, false, Some("nRFCpb")),
        cmd("MACSB", COLUMN, BANK, meta(false, false, true, false, false), PlainAccess, BankSingleRw, false, None),
        cmd("AFSB", COLUMN, BANK, meta(false, false, true, false, false), PlainAccess, BankSingleRw, false, None),
        cmd("RDCP", COLUMN, BANK, meta(false, false, true, false, false), PlainAccess, BankSingleRw, false, None),
        cmd("WRCP", COLUMN, BANK, meta(false, false, true, false, false), PlainAccess, BankSingleRw, true, None),
        cmd("ACT4_BG-1", ROW, BANKGROUP, meta(true, false, false, false, false), ActivatePhase1, Ready, false, None),
        cmd("ACT4_BG-2", ROW, BANKGROUP, meta(true, false, false, false, false), ActivatePhase2, Ready, false, None),
        cmd("PRE4_BG", BANK, BANKGROUP, meta(false, true, false, false, false), Precharge, Ready, false, None),
        cmd("MAC4B_INTRA", COLUMN, BANKGROUP, meta(false, false, true, false, false), PlainAccess, Bank4Intra, false, None),
        cmd("AF4B_INTRA", COLUMN, BANKGROUP, meta(false, false, true, false, false), PlainAccess, Bank4Intra, false, None),
        cmd("EWMUL", COLUMN, BANKGROUP, meta(false, false, true, false, false), PlainAccess, Bank4Intra, false, None),
        cmd("EWADD", COLUMN, BANKGROUP, meta(false, false, true, false, false), PlainAccess, Bank4Intra, false, None),
        cmd("ACT16-1", ROW, RANK, meta(true, false, false, false, false), ActivatePhase1, Ready, false, None),
        cmd("ACT16-2", ROW, RANK, meta(true, false, false, false, false), ActivatePhase2, Ready, false, None),
        cmd("MACAB", COLUMN, RANK, meta(false, false, true, false, false), PlainAccess, AllBankPim, false, None),
        cmd("AFAB", COLUMN, RANK, meta(false, false, true, false, false), PlainAccess, AllBankPim, false, None),
        cmd("WRAFLUT", COLUMN, RANK, meta(false, false, true, false, false), PlainAccess, AllBankPim, true, None),
        cmd("WRBK", COLUMN, RANK, meta(false, false, true, false, false), PlainAccess, AllBankPim, true, None),
        cmd("WRGB", CHANNEL, CHANNEL, meta(false, false, true, false, false), PlainAccess, Ready, true, None),
        cmd("WRMAC", CHANNEL, CHANNEL, meta(false, false, true, false, false), PlainAccess, Ready, true, None),
        cmd("WRBIAS", CHANNEL, CHANNEL, meta(false, false, true, false, false), PlainAccess, Ready, true, None),
        cmd("RDMAC", CHANNEL, CHANNEL, meta(false, false, true, false, false), PlainAccess, Ready, false, None),
        cmd("RDAF", CHANNEL, CHANNEL, meta(false, false, true, false, false), PlainAccess, Ready, false, None),
    ]
}

fn org_preset(name: &str) -> Result<OrgPreset, AimError> {
    match name {
        "LPDDR5_AiM" | "" => Ok(OrgPreset {
            density_gb: 8.589_934_592,
            dq_width: 16,
            prefetch_size: 16,
            counts: vec![1, 2, 4, 4],
            rows: 32768,
            cols: 1024,
        }),
        other => Err(AimError::configuration(format!(
            "unknown LPDDR5 organization preset `{other}`"
        ))),
    }
}

fn timing_preset(name: &str) -> Result<TimingPreset, AimError> {
    match name {
        "LPDDR5_AiM" | "" => {
            let names = [
                "rate", "nBL", "nCL", "nRCDRD", "nRCDWR", "nRP", "nRAS", "nRC", "nWR", "nRTP",
                "nCWL", "nCCDS", "nCCDL", "nRRDS", "nRRDL", "nWTRS", "nWTRL", "nFAW", "nRFCab",
                "nRFCpb", "nRREFD", "nREFI", "nRCDRDMAC", "nRCDRDAF", "nRCDRDCP", "nRCDWRCP",
                "nRCDEWMUL", "nACTtoACT2", "nResync", "tCK_ps",
            ];
            let values: [i64; 30] = [
                6400, 4, 68, 44, 34, 39, 68, 108, 40, 14, 8, 4, 4, 8, 12, 12, 16, 28, 280, 140,
                24, 6241, 70, 104, 80, 58, 30, 8, 32, 357,
            ];
            Ok(TimingPreset { values: names.into_iter().zip(values).collect() })
        }
        other => Err(AimError::configuration(format!(
            "unknown LPDDR5 timing preset `{name}`", name = other
        ))),
    }
}

fn timing_rules(t: &TimingPreset, idx: &HashMap<&'static str, u16>) -> Vec<TimingRule> {
    let c = |name: &str| idx[name];
    let r = |level: u8, preceding: &[&str], following: &[&str], latency: &str, window: u32, sibling: bool| TimingRule {
        level,
        preceding: preceding.iter().map(|n| c(n)).collect(),
        following: following.iter().map(|n| c(n)).collect(),
        latency: t.get(latency),
        window,
        is_sibling: sibling,
    };
    vec![
        r(BANK, &["ACT-1"], &["ACT-2"], "nACTtoACT2", 1, false),
        r(BANK, &["ACT-2"], &["RD16", "MACSB", "AFSB", "RD16A", "CASRD"], "nRCDRD", 1, false),
        r(BANK, &["ACT-2"], &["WR16", "WR16A", "CASWR"], "nRCDWR", 1, false),
        r(BANK, &["ACT-2"], &["RDCP"], "nRCDRDCP", 1, false),
        r(BANK, &["ACT-2"], &["WRCP"], "nRCDWRCP", 1, false),
        r(BANK, &["ACT-2"], &["PRE"], "nRAS", 1, false),
        r(BANK, &["PRE", "RD16A", "WR16A"], &["ACT-1"], "nRP", 1, false),
        r(BANK, &["RD16", "RD16A", "CASRD"], &["RD16", "WR16", "RD16A", "WR16A"], "nBL", 1, false),
        r(BANK, &["WR16", "WR16A", "CASWR"], &["RD16", "WR16", "RD16A", "WR16A"], "nBL", 1, false),
        r(BANK, &["WR16", "WR16A"], &["PRE"], "nWR", 1, false),
        r(BANK, &["RD16", "RD16A"], &["PRE"], "nRTP", 1, false),
        r(BANKGROUP, &["RD16", "WR16"], &["RD16", "WR16"], "nCCDS", 1, false),
        r(RANK, &["RD16", "WR16"], &["RD16", "WR16"], "nCCDL", 1, false),
        r(BANKGROUP, &["ACT-1"], &["ACT-1"], "nRRDS", 1, false),
        r(RANK, &["ACT-1"], &["ACT-1"], "nRRDL", 1, false),
        r(BANKGROUP, &["ACT-1"], &["ACT-1"], "nFAW", 4, false),
        r(BANK, &["WR16"], &["RD16"], "nWTRS", 1, false),
        r(RANK, &["WR16"], &["RD16"], "nWTRL", 1, false),
        r(RANK, &["REFab"], &["REFab"], "nREFI", 1, false),
        r(RANK, &["REFab"], &["ACT-1", "ACT16-1"], "nRFCab", 1, false),
        r(BANK, &["REFpb"], &["REFpb"], "nREFI", 1, false),
        r(BANK, &["REFpb"], &["ACT-1"], "nRFCpb", 1, false),
        // All-bank activate chain, rank scope: ACT16-1 -> ACT16-2 mirrors
        // the single-bank nACTtoACT2 gap; ACT16-2 -> the all-bank PIM
        // family mirrors the single-bank ACT-2 -> RD16/WR16 row-to-column
        // gap, one named RCD-class parameter per PIM family member
        // (spec.md 8's S4: "between them only rank-level timing (nRCD)
        // applies").
        r(RANK, &["ACT16-1"], &["ACT16-2"], "nACTtoACT2", 1, false),
        r(RANK, &["ACT16-2"], &["MACAB"], "nRCDRDMAC", 1, false),
        r(RANK, &["ACT16-2"], &["AFAB"], "nRCDRDAF", 1, false),
        r(RANK, &["ACT16-2"], &["WRAFLUT", "WRBK"], "nRCDWRCP", 1, false),
        // Intra-bankgroup 4-bank PIM (scaffolded, disabled per Open
        // Question (i)): the same RCD-class gating at bankgroup scope,
        // so the chain is complete if this family is ever re-enabled.
        r(BANKGROUP, &["ACT4_BG-2"], &["MAC4B_INTRA"], "nRCDRDMAC", 1, false),
        r(BANKGROUP, &["ACT4_BG-2"], &["AF4B_INTRA"], "nRCDRDAF", 1, false),
        r(BANKGROUP, &["ACT4_BG-2"], &["EWMUL", "EWADD"], "nRCDEWMUL", 1, false),
    ]
}

pub(crate) fn build(cfg: &DeviceConfig) -> Result<DeviceSpec, AimError> {
    let mut org = org_preset(cfg.organization_preset.as_deref().unwrap_or(""))?;
    for (name, value) in &cfg.organization_overrides {
        match name.as_str() {
            "channel" => org.counts[CHANNEL as usize] = *value,
            "rank" => org.counts[RANK as usize] = *value,
            "bankgroup" => org.counts[BANKGROUP as usize] = *value,
            "bank" => org.counts[BANK as usize] = *value,
            "dq_width" => org.dq_width = *value,
            "prefetch_size" => org.prefetch_size = *value,
            "rows" => org.rows = *value,
            "cols" => org.cols = *value,
            other => {
                return Err(AimError::configuration(format!(
                    "unknown LPDDR5 organization override `{other}`"
                )))
            }
        }
    }

    let mut timing = timing_preset(cfg.timing_preset.as_deref().unwrap_or(""))?;
    let tck_ps = timing.get("tCK_ps") as f64;
    for (name, cycles) in &cfg.timing_overrides_cycles {
        if !timing.values.contains_key(name.as_str()) {
            return Err(AimError::configuration(format!("unknown LPDDR5 timing parameter `{name}`")));
        }
        let _ = timing.values.insert(Box::leak(name.clone().into_boxed_str()), *cycles);
    }
    for (name, ns) in &cfg.timing_overrides_ns {
        if !timing.values.contains_key(name.as_str()) {
            return Err(AimError::configuration(format!("unknown LPDDR5 timing parameter `{name}`")));
        }
        let _ = timing
            .values
            .insert(Box::leak(name.clone().into_boxed_str()), rounding(*ns, tck_ps));
    }

    if let Some(declared) = cfg.density_gb {
        if (declared - org.density_gb).abs() > declared * 0.01 {
            return Err(AimError::configuration(format!(
                "declared density {declared} Gb does not match derived density {} Gb",
                org.density_gb
            )));
        }
    }

    let commands = commands();
    let command_index = build_command_index(&commands);
    let rules = timing_rules(&timing, &command_index);

    let well_known = WellKnown {
        act: command_index["ACT-1"],
        act_phase2: Some(command_index["ACT-2"]),
        pre: command_index["PRE"],
        pre_all: command_index["PREA"],
        act_all: command_index["ACT16-1"],
        act_all_phase2: Some(command_index["ACT16-2"]),
        cas_read_resync: Some(command_index["CASRD"]),
        cas_write_resync: Some(command_index["CASWR"]),
        pre_4bg: command_index["PRE4_BG"],
    };

    Ok(DeviceSpec {
        kind: DeviceKind::Lpddr5,
        levels: LEVELS.to_vec(),
        bank_level: BANK,
        commands,
        command_index,
        states: crate::spec::STATES.to_vec(),
        org,
        timing,
        timing_rules: rules,
        tck_ps,
        well_known,
    })
}
