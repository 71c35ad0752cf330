//! Live Redis round trip: push, quarantine, restore.
//!
//! Skipped unless QLAT_TEST_REDIS_URL is set (e.g. redis://127.0.0.1:6379/15).

use std::time::Duration;

use qlat_redis::RedisLists;
use qlat_transport::{ListTransport, PushSide};
use uuid::Uuid;

#[test]
fn redis_move_then_restore_preserves_order() {
    let url = match std::env::var("QLAT_TEST_REDIS_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: QLAT_TEST_REDIS_URL not set");
            return;
        }
    };

    let mut r = RedisLists::connect(&url).expect("connect");
    let obs = format!("qlat-test:{}", Uuid::new_v4());
    let hold = format!("{obs}:hold");

    let items: Vec<Vec<u8>> = ["a", "b", "c"].iter().map(|s| s.as_bytes().to_vec()).collect();
    r.push(&obs, &items, PushSide::Rpush).unwrap();
    assert_eq!(r.len(&obs).unwrap(), 3);

    let first = r
        .move_blocking(&obs, &hold, Duration::from_millis(100))
        .unwrap();
    assert_eq!(first, Some(b"c".to_vec()));
    while r.move_now(&obs, &hold).unwrap().is_some() {}

    // Empty list: bounded wait returns the empty signal, not an error.
    let none = r
        .move_blocking(&obs, &hold, Duration::from_millis(100))
        .unwrap();
    assert!(none.is_none());

    let mut moved = 0;
    while r.move_now(&hold, &obs).unwrap().is_some() {
        moved += 1;
    }
    assert_eq!(moved, 3);
    assert_eq!(r.len(&hold).unwrap(), 0);

    let after = r.move_now(&obs, &hold).unwrap();
    assert_eq!(after, Some(b"c".to_vec()));

    r.delete(&obs).unwrap();
    r.delete(&hold).unwrap();
}
