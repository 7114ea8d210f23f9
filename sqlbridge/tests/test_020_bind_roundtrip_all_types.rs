mod test_utils;

use pretty_assertions::assert_eq;
use sqlbridge::{StepResult, Value};

// Round-trip law: bind(i, v); step() yields a row whose column i equals v, for every
// bind-supported type, including the empty string and the empty blob as edge cases.
#[tokio::test]
async fn test_020_bind_roundtrip_all_types() {
    let _log_handle = test_utils::init_logger();
    let db = test_utils::open_memory().await.unwrap();

    let cases = vec![
        Value::Null,
        Value::Integer(0),
        Value::Integer(-1),
        Value::Integer(i64::MAX),
        Value::Integer(i64::MIN),
        Value::Real(3.5),
        Value::Real(-0.0),
        Value::Text(String::new()),
        Value::Text("caf\u{e9} \u{1f600}".into()),
        Value::Blob(Vec::new()),
        Value::Blob(vec![0, 1, 2, 255]),
    ];

    for value in cases {
        let select = db.prepare("SELECT ?").await.unwrap();
        select.bind(1, value.clone()).unwrap();
        assert_eq!(select.step().await.unwrap(), StepResult::Row(vec![value]));
    }
}
