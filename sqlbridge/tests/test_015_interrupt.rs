mod test_utils;

use sqlbridge::ErrorCode;
use std::time::Duration;

// Scenario 6: `interrupt` aborts an in-progress `step`; it is the only op safe to call while
// `busy = true`. A runaway recursive CTE gives a step that would otherwise never return DONE.
#[tokio::test]
async fn test_015_interrupt() {
    let _log_handle = test_utils::init_logger();
    let db = test_utils::open_memory().await.unwrap();

    // `count(*)` over the recursive source forces one single `step()` call to consume the whole
    // (effectively unbounded) CTE before it can produce its one output row, giving `interrupt` a
    // wide window to land mid-step rather than between two fast per-row steps.
    let stmt = db
        .prepare(
            "SELECT count(*) FROM (\
                WITH RECURSIVE c(i) AS (SELECT 1 UNION ALL SELECT i+1 FROM c) \
                SELECT i FROM c LIMIT 100000000)",
        )
        .await
        .unwrap();

    let pending = stmt.submit_step().unwrap();

    // interrupt is explicitly safe while busy, unlike every other synchronous op.
    tokio::time::sleep(Duration::from_millis(20)).await;
    db.interrupt();

    let err = pending.await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Sqlite(libsqlite3_sys::SQLITE_INTERRUPT));
    assert_eq!(err.who, "step");
}
