mod test_utils;

use sqlbridge::ErrorCode;

// Closing a Database finalizes every statement still live on it before the close future
// resolves, and the statement becomes unusable afterward.
#[tokio::test]
async fn test_030_close_finalizes_statements() {
    let _log_handle = test_utils::init_logger();
    let db = test_utils::open_memory().await.unwrap();
    let stmt = db.prepare("SELECT 1").await.unwrap();

    db.close().await.unwrap();

    let err = stmt.step().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);
}

// A failed synchronous op on a closed Database returns a Failure rather than reopening or
// panicking; the Database remains in the closed state.
#[tokio::test]
async fn test_030_ops_after_close_fail_cleanly() {
    let db = test_utils::open_memory().await.unwrap();
    db.close().await.unwrap();

    assert!(db.prepare("SELECT 1").await.is_err());
    assert!(db.last_insert_rowid().is_err());
}

// `interrupt` has no Result to fail with, so the only observable property after a successful
// close is that calling it doesn't touch the now-freed engine handle. A second clone exercises
// the case that actually matters: a handle that didn't itself drive the close.
#[tokio::test]
async fn test_030_interrupt_after_close_is_a_no_op() {
    let db = test_utils::open_memory().await.unwrap();
    let other_handle = db.clone();
    db.close().await.unwrap();

    other_handle.interrupt();
}
