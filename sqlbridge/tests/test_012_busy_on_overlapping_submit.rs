mod test_utils;

use sqlbridge::ErrorCode;
use std::time::Duration;

// Scenario 3: submitting a second async op before the first's callback fires returns EBUSY
// synchronously, without ever reaching the worker thread for the second submission. The first
// op has to still be running when the second one lands, so it uses a step that takes a while
// rather than a prepare, which SQLite would compile near-instantly regardless of timing.
#[tokio::test]
async fn test_012_busy_on_overlapping_submit() {
    let _log_handle = test_utils::init_logger();
    let db = test_utils::open_memory().await.unwrap();
    let slow = db
        .prepare(
            "SELECT count(*) FROM (\
                WITH RECURSIVE c(i) AS (SELECT 1 UNION ALL SELECT i+1 FROM c) \
                SELECT i FROM c LIMIT 100000000)",
        )
        .await
        .unwrap();

    let first = slow.submit_step().unwrap();
    let second = db.submit_prepare("SELECT 1").unwrap_err();
    assert_eq!(second.code, ErrorCode::Busy);
    assert_eq!(second.who, "prepare");

    // give the worker time to actually be inside `sqlite3_step` before interrupting it; SQLite
    // only honors the interrupt flag once the call it's meant to abort is running.
    tokio::time::sleep(Duration::from_millis(20)).await;
    db.interrupt();
    let _ = first.await;

    // draining the first op clears `busy`, so the next submission succeeds again.
    db.submit_prepare("SELECT 1").unwrap().await.unwrap();
}
