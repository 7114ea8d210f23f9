mod test_utils;

use sqlbridge::StatusOp;

// `status` reads a process-global SQLite counter; it doesn't require the issuing Database to be
// idle in any special way beyond the ordinary `busy` gate, and returns (current, highwater).
#[tokio::test]
async fn test_031_status_reports_memory_counters() {
    let _log_handle = test_utils::init_logger();
    let db = test_utils::open_memory().await.unwrap();

    let (current, highwater) = db.status(StatusOp::MemoryUsed, false).unwrap();
    assert!(current >= 0);
    assert!(highwater >= current);
}
