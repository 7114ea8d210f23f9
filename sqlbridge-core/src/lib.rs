//! Do not use this crate directly.
//!
//! This is the implementation crate for `sqlbridge`: the worker protocol that lets a single
//! cooperative event loop drive a synchronous, single-threaded `SQLite` connection from a
//! dedicated OS thread per open database. Use the `sqlbridge` crate instead.

#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

mod database;
mod engine;
mod error;
mod registry;
mod statement;
mod text;
mod value;
mod worker;

pub use crate::database::{Database, Pending};
pub use crate::engine::{OpenFlags, StatusOp};
pub use crate::error::{ErrorCode, Failure};
pub use crate::statement::Statement;
pub use crate::value::{StepResult, Value};
