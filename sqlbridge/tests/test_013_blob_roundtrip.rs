mod test_utils;

use sqlbridge::{StepResult, Value};

// Scenario 4: a bound byte-vector round-trips through SQLite unchanged.
#[tokio::test]
async fn test_013_blob_roundtrip() {
    let _log_handle = test_utils::init_logger();
    let db = test_utils::open_memory().await.unwrap();

    let select = db.prepare("SELECT ?").await.unwrap();
    select.bind(1, Value::Blob(vec![0xDE, 0xAD, 0xBE, 0xEF])).unwrap();

    assert_eq!(
        select.step().await.unwrap(),
        StepResult::Row(vec![Value::Blob(vec![0xDE, 0xAD, 0xBE, 0xEF])])
    );
}

// The empty blob is a distinct edge case from NULL and must round-trip too.
#[tokio::test]
async fn test_013_empty_blob_roundtrip() {
    let db = test_utils::open_memory().await.unwrap();

    let select = db.prepare("SELECT ?").await.unwrap();
    select.bind(1, Value::Blob(Vec::new())).unwrap();

    assert_eq!(select.step().await.unwrap(), StepResult::Row(vec![Value::Blob(Vec::new())]));
}
