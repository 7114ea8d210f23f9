mod test_utils;

use sqlbridge::{Database, ErrorCode, OpenFlags};

// Scenario 2: opening a non-existent path with READONLY (no CREATE) surfaces SQLITE_CANTOPEN.
#[tokio::test]
async fn test_011_open_nonexistent_readonly() {
    let _log_handle = test_utils::init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.sqlite");

    let err = Database::open(&path, OpenFlags::READONLY).await.unwrap_err();

    assert_eq!(err.who, "open");
    assert_eq!(err.code, ErrorCode::Sqlite(libsqlite3_sys::SQLITE_CANTOPEN));
    assert!(err.message.is_some());
}
