//! `Statement`: a prepared statement handle. The generational `StatementKey` it carries is the
//! whole of its validity check — a finalized or foreign key simply misses in the table.

use std::sync::Arc;

use crate::database::{DbShared, Pending};
use crate::engine::RawStatement;
use crate::error::Failure;
use crate::registry::StatementKey;
use crate::value::{StepResult, Value};

pub struct Statement {
    shared: Arc<DbShared>,
    key: StatementKey,
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement").field("key", &self.key).finish_non_exhaustive()
    }
}

impl Statement {
    pub(crate) fn new(shared: Arc<DbShared>, key: StatementKey) -> Self {
        Self { shared, key }
    }

    /// Submits one `step()` and returns immediately; `EBUSY` if an op is already in flight on
    /// this statement's database.
    pub fn submit_step(&self) -> Result<Pending<StepResult>, Failure> {
        crate::database::Database::submit_step_for(&self.shared, self.key)
    }

    /// Convenience wrapper fusing `submit_step` and the `.await`.
    pub async fn step(&self) -> Result<StepResult, Failure> {
        self.submit_step()?.await
    }

    pub fn bind(&self, index: i32, value: Value) -> Result<(), Failure> {
        self.with_raw("bind", |raw| match value {
            Value::Null => raw.bind_null(index),
            Value::Integer(v) => raw.bind_int64(index, v),
            Value::Real(v) => raw.bind_double(index, v),
            Value::Text(v) => raw.bind_text(index, &v),
            Value::Blob(v) => raw.bind_blob(index, &v),
        })
    }

    pub fn clear_bindings(&self) -> Result<(), Failure> {
        self.with_raw("clear_bindings", RawStatement::clear_bindings)
    }

    pub fn reset(&self) -> Result<(), Failure> {
        self.with_raw("reset", RawStatement::reset)
    }

    pub fn columns(&self) -> Result<Vec<String>, Failure> {
        self.with_raw("columns", |raw| {
            (0..raw.column_count())
                .map(|index| {
                    raw.column_name(index)
                        .ok_or_else(|| Failure::invalid("columns", "column has no name"))
                })
                .collect()
        })
    }

    pub fn sql(&self) -> Result<String, Failure> {
        self.with_raw("sql", |raw| {
            raw.sql().ok_or_else(|| Failure::invalid("sql", "statement has no SQL text"))
        })
    }

    /// Finalizes the statement, consuming the handle. `EBUSY` if an op is in flight on this
    /// statement's database.
    pub fn finalize(self) -> Result<(), Failure> {
        let mut slot = self.shared.slot.lock().map_err(|_| Failure::lock_poisoned("finalize"))?;
        if slot.busy {
            return Err(Failure::busy("finalize"));
        }
        let raw = slot
            .statements
            .remove(self.key)
            .ok_or_else(|| Failure::invalid("finalize", "statement handle is no longer valid"))?;
        drop(slot);
        raw.finalize()
    }

    fn with_raw<R>(
        &self,
        who: &'static str,
        f: impl FnOnce(&RawStatement) -> Result<R, Failure>,
    ) -> Result<R, Failure> {
        let slot = self.shared.slot.lock().map_err(|_| Failure::lock_poisoned(who))?;
        if slot.busy {
            return Err(Failure::busy(who));
        }
        let raw = slot
            .statements
            .get(self.key)
            .copied()
            .ok_or_else(|| Failure::invalid(who, "statement handle is no longer valid"))?;
        drop(slot);
        f(&raw)
    }
}
