//! `Database`: one open `SQLite` connection, the worker thread that owns it, and the submission
//! slot the worker and the async caller hand work across.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll};
use std::thread;

use log::{debug, trace};
use slotmap::SlotMap;
use tokio::sync::oneshot;

use crate::engine::{self, OpenFlags, RawConnection, RawStatement, StatusOp};
use crate::error::{ErrorCode, Failure};
use crate::registry::StatementKey;
use crate::statement::Statement;
use crate::value::StepResult;
use crate::worker::{self, Work};

/// The submission slot: everything the worker thread and the submitting task hand off across.
/// Guarded by one `Mutex` so `busy`, the pending `work` item, and the statement table can never
/// be observed in an inconsistent combination.
pub(crate) struct Slot {
    pub(crate) busy: bool,
    pub(crate) work: Option<Work>,
    pub(crate) statements: SlotMap<StatementKey, RawStatement>,
}

pub(crate) struct DbShared {
    pub(crate) conn: RawConnection,
    pub(crate) slot: Mutex<Slot>,
    pub(crate) condvar: Condvar,
    pub(crate) closed: AtomicBool,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Drop for DbShared {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            // The host never called `close` (or it never succeeded). Nothing in the protocol
            // gives the worker thread a way to be woken and told to exit short of `Close`
            // actually succeeding, so it is left parked in `cond_wait` and leaked deliberately
            // rather than synchronously driven from a `Drop` impl.
            log::warn!("database dropped without a successful close; its worker thread will remain parked");
        }
    }
}

/// A future `.await`-able for the result of an in-flight op. The non-async `submit_*` methods
/// hand one of these back the instant an op is accepted; `.await`ing it is the only suspension
/// point on the submitting side.
pub struct Pending<T> {
    receiver: oneshot::Receiver<Result<T, Failure>>,
}

impl<T> Pending<T> {
    fn new(receiver: oneshot::Receiver<Result<T, Failure>>) -> Self {
        Self { receiver }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, Failure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Failure::new(
                "await",
                ErrorCode::Io(-1),
                Some("worker thread dropped without replying".into()),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// One open, worker-backed `SQLite` connection. Cheap to clone (an `Arc` underneath); every clone
/// refers to the same connection, the same worker thread, and the same `busy` flag.
#[derive(Clone)]
pub struct Database(Arc<DbShared>);

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let busy = self.0.slot.lock().map_or(true, |s| s.busy);
        f.debug_struct("Database")
            .field("busy", &busy)
            .field("closed", &self.0.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}

impl Database {
    /// Opens a database file and starts its dedicated worker thread. Runs on Tokio's blocking
    /// pool since the `Database` — and so its worker — doesn't exist yet to do it.
    pub async fn open(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self, Failure> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::open_blocking(&path, flags))
            .await
            .map_err(|e| Failure::new("open", ErrorCode::Io(-1), Some(format!("open task panicked: {e}"))))?
    }

    fn open_blocking(path: &Path, flags: OpenFlags) -> Result<Self, Failure> {
        let conn = RawConnection::open(path, flags)?;
        let shared = Arc::new(DbShared {
            conn,
            slot: Mutex::new(Slot {
                busy: false,
                work: None,
                statements: SlotMap::with_key(),
            }),
            condvar: Condvar::new(),
            closed: AtomicBool::new(false),
            worker: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = match thread::Builder::new()
            .name("sqlbridge-worker".into())
            .spawn(move || worker::run(&worker_shared))
        {
            Ok(handle) => handle,
            Err(e) => {
                // The engine handle was already created and no worker thread exists to close it
                // on our behalf; close it here before the `Arc` drops it on the floor.
                if let Err(close_err) = shared.conn.close() {
                    log::warn!("closing engine handle after worker spawn failure also failed: {close_err}");
                }
                shared.closed.store(true, Ordering::Release);
                return Err(Failure::io("open", &e));
            }
        };
        *shared.worker.lock().map_err(|_| Failure::lock_poisoned("open"))? = Some(handle);

        trace!("database opened at {}", path.display());
        Ok(Self(shared))
    }

    /// Submits a prepare and returns immediately; `EBUSY` if an op is already in flight.
    pub fn submit_prepare(&self, sql: &str) -> Result<Pending<Statement>, Failure> {
        self.ensure_open("prepare")?;
        let encoded = crate::text::encode(sql);
        if encoded.len() > i32::MAX as usize {
            return Err(Failure::too_big("prepare", "SQL text exceeds 2^31 - 1 bytes"));
        }
        let mut slot = self.0.slot.lock().map_err(|_| Failure::lock_poisoned("prepare"))?;
        if slot.busy {
            return Err(Failure::busy("prepare"));
        }
        let (tx, rx) = oneshot::channel();
        slot.busy = true;
        slot.work = Some(Work::Prepare { sql: encoded, reply: tx });
        drop(slot);
        self.0.condvar.notify_one();
        Ok(Pending::new(rx))
    }

    /// Convenience wrapper fusing `submit_prepare` and the `.await`.
    pub async fn prepare(&self, sql: &str) -> Result<Statement, Failure> {
        self.submit_prepare(sql)?.await
    }

    /// Submits a close and returns immediately; `EBUSY` if an op is already in flight.
    pub fn submit_close(&self) -> Result<Pending<()>, Failure> {
        self.ensure_open("close")?;
        let mut slot = self.0.slot.lock().map_err(|_| Failure::lock_poisoned("close"))?;
        if slot.busy {
            return Err(Failure::busy("close"));
        }
        let (tx, rx) = oneshot::channel();
        slot.busy = true;
        slot.work = Some(Work::Close { reply: tx });
        drop(slot);
        self.0.condvar.notify_one();
        Ok(Pending::new(rx))
    }

    /// Closes the database. Takes `&self`, not `self`, because a failed close leaves the
    /// database open and retryable (see `DESIGN.md`) rather than consuming it unconditionally.
    ///
    /// `closed` itself is set by the worker thread the instant `conn.close()` succeeds (see
    /// `worker::drain_and_close`), not here — by the time this `.await` resolves it is already
    /// true.
    pub async fn close(&self) -> Result<(), Failure> {
        let result = self.submit_close()?.await;
        if result.is_ok() {
            debug_assert!(self.0.closed.load(Ordering::Acquire), "worker must set `closed` before replying Ok");
            match self.0.worker.lock() {
                Ok(mut guard) => {
                    if let Some(handle) = guard.take() {
                        let _ = handle.join();
                    }
                }
                Err(_) => log::warn!("worker handle mutex poisoned; leaving worker thread unjoined"),
            }
            debug!("database closed");
        }
        result
    }

    pub fn last_insert_rowid(&self) -> Result<i64, Failure> {
        self.ensure_open("last_insert_rowid")?;
        let slot = self.0.slot.lock().map_err(|_| Failure::lock_poisoned("last_insert_rowid"))?;
        if slot.busy {
            return Err(Failure::busy("last_insert_rowid"));
        }
        Ok(self.0.conn.last_insert_rowid())
    }

    /// Requests that an in-progress `step` abort. Safe to call while `busy`, unlike every other
    /// op, because `sqlite3_interrupt` is documented thread-safe at the engine level. A no-op
    /// once `close` has succeeded, since the engine handle it would touch is gone by then.
    ///
    /// Takes the slot mutex rather than reading `closed` bare: the worker thread flips `closed`
    /// under this same mutex in the instant `conn.close()` actually frees the handle (see
    /// `worker::drain_and_close`), so holding the lock here is what rules out calling into the
    /// engine on a handle that close has already torn down, not the flag by itself.
    pub fn interrupt(&self) {
        match self.0.slot.lock() {
            Ok(slot) => {
                if !self.0.closed.load(Ordering::Acquire) {
                    self.0.conn.interrupt();
                }
                drop(slot);
            }
            Err(_) => log::warn!("submission-slot mutex poisoned; dropping interrupt request"),
        }
    }

    pub fn status(&self, op: StatusOp, reset: bool) -> Result<(i64, i64), Failure> {
        let slot = self.0.slot.lock().map_err(|_| Failure::lock_poisoned("status"))?;
        if slot.busy {
            return Err(Failure::busy("status"));
        }
        drop(slot);
        engine::status(op, reset)
    }

    fn ensure_open(&self, who: &'static str) -> Result<(), Failure> {
        if self.0.closed.load(Ordering::Acquire) {
            Err(Failure::invalid(who, "database is closed"))
        } else {
            Ok(())
        }
    }

    /// Fuses `submit_step` and the `.await`; used by `Statement::step`.
    pub(crate) fn submit_step_for(
        shared: &Arc<DbShared>,
        key: StatementKey,
    ) -> Result<Pending<StepResult>, Failure> {
        let mut slot = shared.slot.lock().map_err(|_| Failure::lock_poisoned("step"))?;
        if slot.busy {
            return Err(Failure::busy("step"));
        }
        if !slot.statements.contains_key(key) {
            return Err(Failure::invalid("step", "statement handle is no longer valid"));
        }
        let (tx, rx) = oneshot::channel();
        slot.busy = true;
        slot.work = Some(Work::Step { key, reply: tx });
        drop(slot);
        shared.condvar.notify_one();
        Ok(Pending::new(rx))
    }
}
