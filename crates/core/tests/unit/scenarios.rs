//! End-to-end controller scenarios, following `spec.md` §8's S1-S6 and a
//! couple of its numbered invariants. Assertions lean on
//! [`aim_core::controller::Controller::per_command_issues`] rather than
//! literal cycle numbers wherever the scenario only cares about *which*
//! commands fired and how many times -- the timing-preset constants this
//! crate ships aren't cross-checked bit-for-bit against the original, so
//! a test that hard-codes an illustrative cycle number from the prose
//! would be asserting a coincidence rather than a property. S1 and S3 are
//! the exceptions: their expected cycles follow deterministically from
//! the shipped LPDDR5 preset and the forwarding rule, so those are
//! pinned exactly.

use std::collections::HashMap;

use aim_core::request::{PimKind, RequestType};

use crate::common;

/// Drives `system` tick-by-tick until `flag` departs (or `max_cycles`
/// elapses), recording the cycle at which each command in `names` first
/// issues on channel 0. Used where a scenario cares not just which
/// commands fired but the cycle gap between them.
fn run_tracking_first_issues(
    system: &mut aim_core::MemorySystem,
    flag: &common::Completion,
    names: &[&str],
    max_cycles: u64,
) -> HashMap<String, i64> {
    let ids: Vec<_> = names.iter().map(|n| system.spec().command_id(n)).collect();
    let mut seen = HashMap::new();
    for _ in 0..max_cycles {
        if flag.departed().is_some() {
            break;
        }
        system.tick();
        let clk = system.clk();
        let counts = system.controllers()[0].per_command_issues();
        for (name, id) in names.iter().zip(&ids) {
            if !seen.contains_key(*name) && counts[*id as usize] >= 1 {
                let _ = seen.insert((*name).to_string(), clk);
            }
        }
    }
    seen
}

/// S1: a read against a fully closed bank drives the whole two-phase
/// activate chain before the data access. `nACTtoACT2 = 8` puts `ACT-2`
/// 8 cycles after `ACT-1`; `nRCDRDMAC`/`nRCDRD`-style row-to-column
/// timing plus `nCL + nBL` account for the rest.
#[test]
fn s1_cold_read_drives_two_phase_activate() {
    let mut system = common::lpddr5_system();
    let flag = common::Completion::new();
    let fields = common::lpddr5_fields(0, 0, 0, 100, 0);
    assert!(system.submit_rw(common::READ, &fields, 1, flag.callback()).unwrap());

    common::run_until(&mut system, &[&flag], 200);

    assert_eq!(flag.issued(), Some(53));
    assert_eq!(flag.departed(), Some(125));

    let ctrl = &system.controllers()[0];
    let spec = system.spec();
    assert_eq!(ctrl.per_command_issues()[spec.command_id("ACT-1") as usize], 1);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("ACT-2") as usize], 1);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("RD16") as usize], 1);
}

/// S2: a second read to a different row in the same bank must close and
/// reopen it -- one extra `PRE`/`ACT-1`/`ACT-2` beyond the first read's
/// own activate chain, and two `RD16` issues total (one per read).
#[test]
fn s2_row_conflict_forces_precharge_and_reactivate() {
    let mut system = common::lpddr5_system();
    let spec_row = common::Completion::new();
    let fields_a = common::lpddr5_fields(0, 0, 0, 100, 0);
    assert!(system.submit_rw(common::READ, &fields_a, 1, spec_row.callback()).unwrap());
    common::run_until(&mut system, &[&spec_row], 200);

    let other_row = common::Completion::new();
    let fields_b = common::lpddr5_fields(0, 0, 0, 200, 0);
    assert!(system.submit_rw(common::READ, &fields_b, 2, other_row.callback()).unwrap());
    common::run_until(&mut system, &[&other_row], 200);

    let ctrl = &system.controllers()[0];
    let spec = system.spec();
    assert_eq!(ctrl.per_command_issues()[spec.command_id("PRE") as usize], 1);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("ACT-1") as usize], 2);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("ACT-2") as usize], 2);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("RD16") as usize], 2);
}

/// S3: a read chasing an address that still has a pending write in the
/// write buffer is forwarded directly -- it never touches the device at
/// all, departing exactly one cycle after it arrives, and issuing no
/// `RD16` of its own.
#[test]
fn s3_read_after_write_is_forwarded() {
    let mut system = common::lpddr5_system();
    let write_flag = common::Completion::new();
    let read_flag = common::Completion::new();
    let fields = common::lpddr5_fields(0, 1, 2, 50, 4);

    assert!(system.submit_rw(common::WRITE, &fields, 1, write_flag.callback()).unwrap());
    assert!(system.submit_rw(common::READ, &fields, 2, read_flag.callback()).unwrap());

    common::run_until(&mut system, &[&read_flag], 10);

    assert_eq!(read_flag.issued(), Some(0));
    assert_eq!(read_flag.departed(), Some(1));

    let rd16 = system.spec().command_id("RD16");
    assert_eq!(system.controllers()[0].per_command_issues()[rd16 as usize], 0);
}

/// S4: an all-bank PIM op against a fully closed device drives the
/// all-bank activate chain (`ACT16-1`/`ACT16-2`) and then completes one
/// cycle after issue -- a PIM compute command is not a DQ-bus burst, so
/// it must not pick up the `nCL + nBL` read/write latency.
#[test]
fn s4_all_bank_pim_from_closed_completes_in_one_cycle() {
    let mut system = common::lpddr5_system();
    let flag = common::Completion::new();
    let fields = common::lpddr5_fields(0, -1, -1, 10, 0);
    assert!(system.submit_pim(RequestType::Pim(PimKind::MacAbk), &fields, 1, flag.callback()).unwrap());

    let issue_clk = run_tracking_first_issues(&mut system, &flag, &["ACT16-1", "ACT16-2", "MACAB"], 300);

    let issue = flag.issued().expect("MACAB issued");
    let depart = flag.departed().expect("MACAB departed");
    assert_eq!(depart - issue, 1);

    let ctrl = &system.controllers()[0];
    let spec = system.spec();
    assert_eq!(ctrl.per_command_issues()[spec.command_id("ACT16-1") as usize], 1);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("ACT16-2") as usize], 1);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("MACAB") as usize], 1);

    // Between ACT16-1 and ACT16-2, and between ACT16-2 and MACAB, only
    // rank-level timing applies (spec.md 8's S4) -- exactly `nACTtoACT2`
    // and `nRCDRDMAC` cycles apart, the same named parameters the single-
    // bank ACT-1/ACT-2/RD16 chain uses.
    let act16_1 = issue_clk["ACT16-1"];
    let act16_2 = issue_clk["ACT16-2"];
    let macab = issue_clk["MACAB"];
    assert_eq!(act16_2 - act16_1, spec.timing.get("nACTtoACT2"));
    assert_eq!(macab - act16_2, spec.timing.get("nRCDRDMAC"));
}

/// S5: while any bank under an all-bank PIM op's scope is `Refreshing`,
/// the op cannot proceed -- its `ACT16-1` only issues once `nRFCab`
/// cycles have passed since the refresh itself issued.
#[test]
fn s5_refresh_blocks_all_bank_pim_until_it_clears() {
    let mut system = common::lpddr5_system();
    let refresh_flag = common::Completion::new();
    let refresh_fields = common::lpddr5_fields(0, -1, -1, -1, -1);
    assert!(system.submit_rw(RequestType::AllBankRefresh, &refresh_fields, 1, refresh_flag.callback()).unwrap());

    let pim_flag = common::Completion::new();
    let pim_fields = common::lpddr5_fields(0, -1, -1, 50, 0);
    assert!(system.submit_pim(RequestType::Pim(PimKind::MacAbk), &pim_fields, 2, pim_flag.callback()).unwrap());

    for _ in 0..50 {
        system.tick();
    }
    let act16_1 = system.spec().command_id("ACT16-1");
    assert_eq!(
        system.controllers()[0].per_command_issues()[act16_1 as usize],
        0,
        "all-bank PIM must not activate while a bank under scope is still refreshing"
    );

    let issue_clk = run_tracking_first_issues(&mut system, &pim_flag, &["ACT16-1", "ACT16-2", "MACAB"], 400);
    assert_eq!(system.controllers()[0].per_command_issues()[act16_1 as usize], 1);
    let spec = system.spec();
    assert_eq!(
        system.controllers()[0].per_command_issues()[spec.command_id("MACAB") as usize],
        1
    );

    // Once the refresh clears, the all-bank activate chain still only
    // has rank-level timing between its own steps and MACAB.
    let act16_1_clk = issue_clk["ACT16-1"];
    let act16_2_clk = issue_clk["ACT16-2"];
    let macab_clk = issue_clk["MACAB"];
    assert_eq!(act16_2_clk - act16_1_clk, spec.timing.get("nACTtoACT2"));
    assert_eq!(macab_clk - act16_2_clk, spec.timing.get("nRCDRDMAC"));
}

/// S6: once the write buffer's occupancy crosses `high_watermark` the
/// controller switches to write mode and drains writes ahead of a
/// pending read, flipping back only once occupancy falls back under
/// `low_watermark`. Observed here as most of a batch of writes
/// completing before a read that arrived first.
#[test]
fn s6_write_buffer_watermark_drains_writes_first() {
    let cfg = aim_core::config::Config::from_json(
        r#"{
            "system": {"num_channels": 1},
            "device": {"model": "LPDDR5_AiM"},
            "controller": {
                "write_buffer_capacity": 8,
                "read_buffer_capacity": 8,
                "high_watermark": 0.5,
                "low_watermark": 0.25
            }
        }"#,
    )
    .unwrap();
    let mut system = aim_core::MemorySystem::new(&cfg).unwrap();

    let read_flag = common::Completion::new();
    let read_fields = common::lpddr5_fields(0, 0, 0, 10, 0);
    assert!(system.submit_rw(common::READ, &read_fields, 1, read_flag.callback()).unwrap());

    let write_flags: Vec<common::Completion> = (0..5).map(|_| common::Completion::new()).collect();
    for (i, flag) in write_flags.iter().enumerate() {
        let fields = common::lpddr5_fields(0, 0, (i % 4) as i32, 300 + i as i32, 0);
        assert!(system.submit_rw(common::WRITE, &fields, 10 + i as u64, flag.callback()).unwrap());
    }

    let mut all_flags: Vec<&common::Completion> = write_flags.iter().collect();
    all_flags.push(&read_flag);
    common::run_until(&mut system, &all_flags, 2000);

    assert!(all_flags.iter().all(|f| f.departed().is_some()), "every request must complete within budget");

    let read_depart = read_flag.departed().unwrap_or_else(|| panic!("read departed"));
    let writes_before_read = write_flags.iter().filter(|f| f.departed().unwrap_or_else(|| panic!("write departed")) <= read_depart).count();
    assert!(
        writes_before_read >= 3,
        "expected the watermark flip to drain most writes before the read, got {writes_before_read}/5 ahead of it"
    );
}

/// Invariant #1 (`spec.md` §8): a channel issues at most one command per
/// cycle. Checked indirectly: the total number of commands a channel has
/// ever issued can never exceed the number of cycles it has ticked.
#[test]
fn invariant_one_issue_per_channel_per_cycle() {
    let mut system = common::lpddr5_system();
    let flag = common::Completion::new();
    let fields = common::lpddr5_fields(0, 0, 0, 100, 0);
    assert!(system.submit_rw(common::READ, &fields, 1, flag.callback()).unwrap());
    common::run_until(&mut system, &[&flag], 200);

    let ticks = system.clk() as u64;
    let total_issued: u64 = system.controllers()[0].per_command_issues().iter().sum();
    assert!(total_issued <= ticks, "{total_issued} commands issued over only {ticks} cycles");
}

/// Invariant #8 (`spec.md` §8): a second row-hit read against an
/// already-open row reuses the open row instead of reactivating --
/// `ACT-1` issues once, `RD16` issues twice.
#[test]
fn invariant_row_hit_reuses_open_row() {
    let mut system = common::lpddr5_system();
    let first = common::Completion::new();
    let fields = common::lpddr5_fields(0, 0, 0, 100, 0);
    assert!(system.submit_rw(common::READ, &fields, 1, first.callback()).unwrap());
    common::run_until(&mut system, &[&first], 200);

    let second = common::Completion::new();
    let fields_same_row = common::lpddr5_fields(0, 0, 0, 100, 8);
    assert!(system.submit_rw(common::READ, &fields_same_row, 2, second.callback()).unwrap());
    common::run_until(&mut system, &[&second], 200);

    let ctrl = &system.controllers()[0];
    let spec = system.spec();
    assert_eq!(ctrl.per_command_issues()[spec.command_id("ACT-1") as usize], 1);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("ACT-2") as usize], 1);
    assert_eq!(ctrl.per_command_issues()[spec.command_id("RD16") as usize], 2);
}
