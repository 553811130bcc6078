//! Shared test fixtures.
//!
//! Builds ready-to-drive [`MemorySystem`]s for the two shipped device
//! models and a small helper for submitting a request with a
//! completion flag the test can poll.

use std::sync::{Arc, Mutex};

use aim_core::config::Config;
use aim_core::request::RequestType;
use aim_core::MemorySystem;

/// One channel, one rank, 4 bankgroups x 4 banks, `"LPDDR5_AiM"` preset.
pub fn lpddr5_system() -> MemorySystem {
    let cfg = Config::from_json(
        r#"{
            "system": {"num_channels": 1},
            "device": {"model": "LPDDR5_AiM"},
            "controller": {}
        }"#,
    )
    .unwrap();
    MemorySystem::new(&cfg).unwrap()
}

/// One channel, 4 bankgroups x 4 banks, no rank level, `"GDDR6_AiM"` preset.
pub fn gddr6_system() -> MemorySystem {
    let cfg = Config::from_json(
        r#"{
            "system": {"num_channels": 1},
            "device": {"model": "GDDR6_AiM"},
            "controller": {}
        }"#,
    )
    .unwrap();
    MemorySystem::new(&cfg).unwrap()
}

/// Records `(issue, depart)` the moment a request's completion callback
/// fires, so a test can assert on both after driving `system.tick()` in
/// a loop. Backed by `Arc<Mutex<..>>` rather than `Rc<RefCell<..>>`
/// because `Request::with_completion`'s callback bound is `Send`.
pub struct Completion(pub Arc<Mutex<Option<(u64, u64)>>>);

impl Completion {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub fn callback(&self) -> impl FnOnce(&aim_core::request::Request) + Send + 'static {
        let cell = Arc::clone(&self.0);
        move |req| {
            let issue = req.issue.unwrap_or(req.arrive);
            let depart = req.depart.unwrap();
            *cell.lock().unwrap() = Some((issue as u64, depart as u64));
        }
    }

    pub fn departed(&self) -> Option<u64> {
        self.0.lock().unwrap().map(|(_, depart)| depart)
    }

    pub fn issued(&self) -> Option<u64> {
        self.0.lock().unwrap().map(|(issue, _)| issue)
    }
}

/// Drive `system` forward until every outstanding request named by
/// `flags` has completed, or `max_cycles` elapses (whichever first).
pub fn run_until(system: &mut MemorySystem, flags: &[&Completion], max_cycles: u64) {
    for _ in 0..max_cycles {
        if flags.iter().all(|f| f.departed().is_some()) {
            return;
        }
        system.tick();
    }
}

/// LPDDR5's read/write field order: channel, rank, bankgroup, bank, row, column.
pub fn lpddr5_fields(rank: i32, bankgroup: i32, bank: i32, row: i32, col: i32) -> Vec<i32> {
    vec![0, rank, bankgroup, bank, row, col]
}

/// GDDR6's read/write field order: channel, bankgroup, bank, row, column.
pub fn gddr6_fields(bankgroup: i32, bank: i32, row: i32, col: i32) -> Vec<i32> {
    vec![0, bankgroup, bank, row, col]
}

pub const READ: RequestType = RequestType::Read;
pub const WRITE: RequestType = RequestType::Write;
