// not all test modules use every function here:
#![allow(dead_code)]

use flexi_logger::{Logger, LoggerHandle};
use sqlbridge::{Database, Failure, OpenFlags};

/// Returns a logger that prints out all info, warn and error messages, mirroring the teacher
/// driver's test harness (`Logger::try_with_env_or_str`).
pub fn init_logger() -> LoggerHandle {
    Logger::try_with_env_or_str("info")
        .unwrap()
        .start()
        .unwrap_or_else(|e| panic!("logger initialization failed with {e}"))
}

pub async fn open_memory() -> Result<Database, Failure> {
    Database::open(":memory:", OpenFlags::default()).await
}
