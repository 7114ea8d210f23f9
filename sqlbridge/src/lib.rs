//! An async bridge from a cooperative Tokio event loop to a synchronous, single-threaded
//! `SQLite` connection.
//!
//! Each [`Database`] owns a dedicated OS thread that runs `SQLite`'s synchronous C API; the
//! event loop never blocks on it. At most one operation is in flight per database at a time —
//! a second submission while one is pending returns `EBUSY` immediately rather than queuing.
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), sqlbridge::Failure> {
//! use sqlbridge::{Database, OpenFlags, Value};
//!
//! let db = Database::open(":memory:", OpenFlags::default()).await?;
//! let stmt = db.prepare("create table t (a integer, b text)").await?;
//! stmt.step().await?;
//!
//! let insert = db.prepare("insert into t values (?, ?)").await?;
//! insert.bind(1, Value::Integer(7))?;
//! insert.bind(2, Value::Text("hi".into()))?;
//! insert.step().await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub use sqlbridge_core::{
    Database, ErrorCode, Failure, OpenFlags, Pending, Statement, StatusOp, StepResult, Value,
};
