mod test_utils;

use pretty_assertions::assert_eq;
use sqlbridge::{StepResult, Value};

// `prepare(sql); step*; reset; step*` must be observationally equivalent to
// `prepare(sql); step*; finalize; prepare(sql); step*`.
#[tokio::test]
async fn test_021_reset_vs_finalize_equivalence() {
    let _log_handle = test_utils::init_logger();
    let db = test_utils::open_memory().await.unwrap();
    db.prepare("CREATE TABLE t(x INTEGER)").await.unwrap().step().await.unwrap();
    let insert = db.prepare("INSERT INTO t VALUES (?)").await.unwrap();
    for x in [1, 2, 3] {
        insert.bind(1, Value::Integer(x)).unwrap();
        insert.step().await.unwrap();
        insert.reset().unwrap();
    }

    let sql = "SELECT x FROM t ORDER BY x";

    let via_reset = db.prepare(sql).await.unwrap();
    let first = drain(&via_reset).await;
    via_reset.reset().unwrap();
    let second = drain(&via_reset).await;
    assert_eq!(first, second);

    via_reset.finalize().unwrap();
    let via_finalize = db.prepare(sql).await.unwrap();
    let third = drain(&via_finalize).await;
    assert_eq!(second, third);
}

async fn drain(stmt: &sqlbridge::Statement) -> Vec<Value> {
    let mut rows = Vec::new();
    while let StepResult::Row(mut values) = stmt.step().await.unwrap() {
        rows.push(values.remove(0));
    }
    rows
}
