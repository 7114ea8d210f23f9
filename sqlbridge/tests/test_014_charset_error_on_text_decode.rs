mod test_utils;

use sqlbridge::{ErrorCode, StepResult, Value};

// Scenario 5: bytes that are not valid UTF-8, assembled via the blob path and then read back as
// text, surface ECHARSET for the whole row rather than silently substituting or truncating.
#[tokio::test]
async fn test_014_charset_error_on_text_decode() {
    let _log_handle = test_utils::init_logger();
    let db = test_utils::open_memory().await.unwrap();

    db.prepare("CREATE TABLE t(b)").await.unwrap().step().await.unwrap();
    let insert = db.prepare("INSERT INTO t VALUES (?)").await.unwrap();
    // CESU-8 encoding of a lone high surrogate: never valid UTF-8.
    insert.bind(1, Value::Blob(vec![0xED, 0xA0, 0x80])).unwrap();
    assert_eq!(insert.step().await.unwrap(), StepResult::Done);

    let select = db.prepare("SELECT CAST(b AS TEXT) FROM t").await.unwrap();
    let err = select.step().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Charset);
    assert_eq!(err.who, "step");
}
