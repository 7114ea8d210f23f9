//! The worker thread's loop: the one algorithm this whole crate exists to host correctly.
//!
//! Each `Database` owns exactly one of these threads. Its life is a single loop: wait for work,
//! run it with the shared mutex released (so a long `step()` never blocks the submitting side
//! from observing `busy`), reacquire the mutex, deliver the result, and either wait again or —
//! for a `Close` that actually succeeded — exit.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use libsqlite3_sys as ffi;
use log::{debug, trace, warn};
use tokio::sync::oneshot;

use crate::database::DbShared;
use crate::engine::RawStep;
use crate::error::Failure;
use crate::registry::StatementKey;
use crate::statement::Statement;
use crate::text;
use crate::value::{StepResult, Value};

pub(crate) enum Work {
    Prepare {
        sql: Vec<u8>,
        reply: oneshot::Sender<Result<Statement, Failure>>,
    },
    Step {
        key: StatementKey,
        reply: oneshot::Sender<Result<StepResult, Failure>>,
    },
    Close {
        reply: oneshot::Sender<Result<(), Failure>>,
    },
}

/// The result of running one `Work` item, not yet delivered. Kept separate from the run itself
/// so the mutex can be reacquired before the reply is sent, matching the original protocol's
/// "fire the wake while still holding the lock" rule.
enum Completion {
    Prepare(Result<Statement, Failure>, oneshot::Sender<Result<Statement, Failure>>),
    Step(Result<StepResult, Failure>, oneshot::Sender<Result<StepResult, Failure>>),
    Close(Result<(), Failure>, oneshot::Sender<Result<(), Failure>>),
}

impl Completion {
    /// Delivers the reply. Returns whether the worker loop should now exit — true only for a
    /// `Close` that actually succeeded.
    fn deliver(self) -> bool {
        match self {
            Completion::Prepare(result, reply) => {
                let _ = reply.send(result);
                false
            }
            Completion::Step(result, reply) => {
                let _ = reply.send(result);
                false
            }
            Completion::Close(result, reply) => {
                let should_exit = result.is_ok();
                let _ = reply.send(result);
                should_exit
            }
        }
    }
}

pub(crate) fn run(shared: &Arc<DbShared>) {
    trace!("worker thread starting");
    let Ok(mut guard) = shared.slot.lock() else {
        log::error!("worker thread: submission-slot mutex poisoned at startup, exiting");
        return;
    };
    loop {
        if let Some(work) = guard.work.take() {
            drop(guard);
            let completion = execute(shared, work);
            let Ok(mut relocked) = shared.slot.lock() else {
                log::error!("worker thread: submission-slot mutex poisoned, exiting");
                return;
            };
            relocked.busy = false;
            let should_exit = completion.deliver();
            if should_exit {
                drop(relocked);
                break;
            }
            guard = relocked;
        } else {
            let Ok(woken) = shared.condvar.wait(guard) else {
                log::error!("worker thread: submission-slot mutex poisoned while waiting, exiting");
                return;
            };
            guard = woken;
        }
    }
    debug!("worker thread exiting after successful close");
}

fn execute(shared: &Arc<DbShared>, work: Work) -> Completion {
    match work {
        Work::Prepare { sql, reply } => {
            let result = shared.conn.prepare(&sql).and_then(|raw| {
                let key = shared
                    .slot
                    .lock()
                    .map_err(|_| Failure::lock_poisoned("prepare"))?
                    .statements
                    .insert(raw);
                Ok(Statement::new(Arc::clone(shared), key))
            });
            Completion::Prepare(result, reply)
        }
        Work::Step { key, reply } => {
            let raw = shared
                .slot
                .lock()
                .map_err(|_| Failure::lock_poisoned("step"))
                .map(|slot| slot.statements.get(key).copied());
            let result = match raw {
                Ok(Some(raw)) => step_once(raw),
                Ok(None) => Err(Failure::invalid("step", "statement handle is no longer valid")),
                Err(e) => Err(e),
            };
            Completion::Step(result, reply)
        }
        Work::Close { reply } => {
            let result = drain_and_close(shared);
            Completion::Close(result, reply)
        }
    }
}

fn drain_and_close(shared: &Arc<DbShared>) -> Result<(), Failure> {
    let keys: Vec<StatementKey> = shared
        .slot
        .lock()
        .map_err(|_| Failure::lock_poisoned("close"))?
        .statements
        .keys()
        .collect();
    for key in keys {
        let raw = shared
            .slot
            .lock()
            .map_err(|_| Failure::lock_poisoned("close"))?
            .statements
            .remove(key);
        if let Some(raw) = raw {
            if let Err(e) = raw.finalize() {
                warn!("finalizing statement during close failed, continuing: {e}");
            }
        }
    }

    // Flip `closed` in the same critical section as the call that actually frees the handle, not
    // after: `Database::interrupt` takes this same mutex before touching the connection, so this
    // is what rules out a concurrent `interrupt()` reaching `sqlite3_interrupt` on a handle
    // `sqlite3_close` has already freed, not the flag read on its own.
    let guard = shared.slot.lock().map_err(|_| Failure::lock_poisoned("close"))?;
    let result = shared.conn.close();
    if result.is_ok() {
        shared.closed.store(true, Ordering::Release);
    }
    drop(guard);
    result
}

fn step_once(raw: crate::engine::RawStatement) -> Result<StepResult, Failure> {
    match raw.step("step")? {
        RawStep::Done => Ok(StepResult::Done),
        RawStep::Row => {
            let count = raw.column_count();
            let mut values = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
            for index in 0..count {
                values.push(decode_column(raw, index)?);
            }
            Ok(StepResult::Row(values))
        }
    }
}

fn decode_column(raw: crate::engine::RawStatement, index: i32) -> Result<Value, Failure> {
    Ok(match raw.column_type(index) {
        ffi::SQLITE_INTEGER => Value::Integer(raw.column_int64(index)),
        ffi::SQLITE_FLOAT => Value::Real(raw.column_double(index)),
        ffi::SQLITE_TEXT => Value::Text(text::decode("step", raw.column_text_bytes(index))?),
        ffi::SQLITE_BLOB => Value::Blob(raw.column_blob(index)),
        _ => Value::Null,
    })
}
