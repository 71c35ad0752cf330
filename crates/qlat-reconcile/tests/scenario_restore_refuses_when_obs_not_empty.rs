use anyhow::Result;
use qlat_reconcile::{restore, RestoreError};
use qlat_transport::{ListTransport, MemoryLists, PushSide};

#[test]
fn scenario_restore_refuses_when_obs_not_empty() -> Result<()> {
    let mut lists = MemoryLists::new();
    lists.push("obs", &[b"late".to_vec()], PushSide::Rpush)?;
    lists.push("obs:hold", &[b"x".to_vec(), b"y".to_vec()], PushSide::Rpush)?;

    let err = restore(&mut lists, "obs", "obs:hold", true).unwrap_err();
    assert!(matches!(err, RestoreError::Refused { len: 1, .. }));
    assert_eq!(lists.len("obs:hold")?, 2);

    // Without the precondition the restore goes ahead.
    let r = restore(&mut lists, "obs", "obs:hold", false)?;
    assert_eq!(r.moved_back, 2);
    assert_eq!(lists.len("obs")?, 3);
    Ok(())
}
