//! Bounded request-buffer behavior.

use aim_core::request::{Request, RequestType};

fn dummy(source_id: u64) -> Request {
    Request::new(vec![0, 0, 0, 0, 0, 0], RequestType::Read, source_id, 0, 0)
}

#[test]
fn push_respects_capacity() {
    let mut buf = aim_core::queue::ReqBuffer::new(2);
    assert!(buf.push(dummy(1)).is_ok());
    assert!(buf.push(dummy(2)).is_ok());
    let rejected = buf.push(dummy(3));
    assert!(rejected.is_err());
    assert_eq!(rejected.unwrap_err().source_id, 3);
    assert!(buf.is_full());
}

#[test]
fn fifo_order_preserved() {
    let mut buf = aim_core::queue::ReqBuffer::new(4);
    buf.push(dummy(1)).unwrap();
    buf.push(dummy(2)).unwrap();
    buf.push(dummy(3)).unwrap();
    let ids: Vec<u64> = buf.iter().map(|r| r.source_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn remove_by_index_matches_iteration_order() {
    let mut buf = aim_core::queue::ReqBuffer::new(4);
    buf.push(dummy(1)).unwrap();
    buf.push(dummy(2)).unwrap();
    buf.push(dummy(3)).unwrap();
    let removed = buf.remove(1).unwrap();
    assert_eq!(removed.source_id, 2);
    let ids: Vec<u64> = buf.iter().map(|r| r.source_id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn drain_matching_removes_all_and_only_matching_entries() {
    let mut buf = aim_core::queue::ReqBuffer::new(8);
    for id in 0..5u64 {
        buf.push(dummy(id)).unwrap();
    }
    let removed = buf.drain_matching(|r| r.source_id % 2 == 0);
    assert_eq!(removed.len(), 3);
    let remaining: Vec<u64> = buf.iter().map(|r| r.source_id).collect();
    assert_eq!(remaining, vec![1, 3]);
}

#[test]
fn occupancy_tracks_fullness() {
    let mut buf = aim_core::queue::ReqBuffer::new(4);
    assert_eq!(buf.occupancy(), 0.0);
    buf.push(dummy(1)).unwrap();
    assert_eq!(buf.occupancy(), 0.25);
    buf.push(dummy(2)).unwrap();
    buf.push(dummy(3)).unwrap();
    buf.push(dummy(4)).unwrap();
    assert_eq!(buf.occupancy(), 1.0);
}

#[test]
fn zero_capacity_buffer_reports_full_and_zero_occupancy() {
    let mut buf = aim_core::queue::ReqBuffer::new(0);
    assert!(buf.is_full());
    assert_eq!(buf.occupancy(), 0.0);
    assert!(buf.push(dummy(1)).is_err());
}
