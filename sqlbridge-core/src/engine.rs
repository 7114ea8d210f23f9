//! Thin synchronous wrapper over the subset of `SQLite`'s C API the worker protocol needs:
//! open, close, prepare, bind, step, reset, finalize, column access, interrupt, status.
//!
//! Nothing in this module is async. It is called only from the worker thread (for the ops
//! that share a connection with an in-flight call) or from the loop task while `busy = false`.

use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::path::Path;
use std::ptr::NonNull;

use libsqlite3_sys as ffi;

use crate::error::{ErrorCode, Failure};

bitflags::bitflags! {
    /// Mirrors the subset of `SQLITE_OPEN_*` flags the core cares about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: c_int {
        const READONLY  = ffi::SQLITE_OPEN_READONLY;
        const READWRITE = ffi::SQLITE_OPEN_READWRITE;
        const CREATE    = ffi::SQLITE_OPEN_CREATE;
        const NO_MUTEX  = ffi::SQLITE_OPEN_NOMUTEX;
        const URI       = ffi::SQLITE_OPEN_URI;
        const MEMORY    = ffi::SQLITE_OPEN_MEMORY;
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::READWRITE | Self::CREATE | Self::NO_MUTEX
    }
}

/// A process-global counter `SQLite` tracks via `sqlite3_status64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StatusOp {
    MemoryUsed = ffi::SQLITE_STATUS_MEMORY_USED,
    MallocSize = ffi::SQLITE_STATUS_MALLOC_SIZE,
    MallocCount = ffi::SQLITE_STATUS_MALLOC_COUNT,
    PageCacheUsed = ffi::SQLITE_STATUS_PAGECACHE_USED,
    PageCacheOverflow = ffi::SQLITE_STATUS_PAGECACHE_OVERFLOW,
}

/// An owned `sqlite3*`. Touched only by the worker thread while an op is in flight, and by the
/// loop thread otherwise; the worker protocol is what makes `Send` sound here, not the type
/// itself, so this stays `pub(crate)` and is never handed to callers directly.
#[derive(Debug)]
pub(crate) struct RawConnection(NonNull<ffi::sqlite3>);

// SAFETY: the worker protocol (see `worker.rs`) guarantees the pointer is touched by exactly
// one thread at a time: the worker thread while `busy`, the loop thread while `!busy`. `Sync`
// is needed only so `Arc<DbShared>` itself is `Send` across the `spawn`/`spawn_blocking` calls
// that hand the shared state to the worker thread; no two threads ever call through the
// pointer concurrently.
unsafe impl Send for RawConnection {}
unsafe impl Sync for RawConnection {}

impl RawConnection {
    pub(crate) fn open(path: &Path, flags: OpenFlags) -> Result<Self, Failure> {
        let c_path =
            CString::new(path.to_string_lossy().as_bytes()).map_err(|_| Failure::new(
                "open",
                ErrorCode::InvalidArgument,
                Some("database path contains an interior NUL byte".into()),
            ))?;
        let mut raw: *mut ffi::sqlite3 = std::ptr::null_mut();
        let rc =
            unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &raw mut raw, flags.bits(), std::ptr::null()) };
        match NonNull::new(raw) {
            Some(conn) if rc == ffi::SQLITE_OK => Ok(Self(conn)),
            Some(conn) => {
                // sqlite3_open_v2 still allocates a handle on failure, purely to report the error.
                let failure = Self::fetch_error("open", rc, conn.as_ptr());
                unsafe { ffi::sqlite3_close(conn.as_ptr()) };
                Err(failure)
            }
            None => Err(Failure::new("open", ErrorCode::OutOfMemory, None)),
        }
    }

    pub(crate) fn close(&self) -> Result<(), Failure> {
        let rc = unsafe { ffi::sqlite3_close(self.0.as_ptr()) };
        self.check("close", rc)
    }

    pub(crate) fn prepare(&self, sql: &[u8]) -> Result<RawStatement, Failure> {
        let mut stmt: *mut ffi::sqlite3_stmt = std::ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                self.0.as_ptr(),
                sql.as_ptr().cast(),
                sql.len().try_into().unwrap_or(c_int::MAX),
                &raw mut stmt,
                std::ptr::null_mut(),
            )
        };
        self.check("prepare", rc)?;
        NonNull::new(stmt)
            .map(RawStatement)
            .ok_or_else(|| Failure::new("prepare", ErrorCode::InvalidArgument, Some("empty SQL text".into())))
    }

    pub(crate) fn interrupt(&self) {
        unsafe { ffi::sqlite3_interrupt(self.0.as_ptr()) };
    }

    pub(crate) fn last_insert_rowid(&self) -> i64 {
        unsafe { ffi::sqlite3_last_insert_rowid(self.0.as_ptr()) }
    }

    fn check(&self, who: &'static str, rc: c_int) -> Result<(), Failure> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(Self::fetch_error(who, rc, self.0.as_ptr()))
        }
    }

    fn fetch_error(who: &'static str, rc: c_int, conn: *mut ffi::sqlite3) -> Failure {
        let message = unsafe {
            let ptr = ffi::sqlite3_errmsg(conn);
            if ptr.is_null() {
                None
            } else {
                Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
            }
        };
        Failure::new(who, ErrorCode::Sqlite(rc), message)
    }
}

pub(crate) fn status(op: StatusOp, reset: bool) -> Result<(i64, i64), Failure> {
    let mut current: i64 = 0;
    let mut highwater: i64 = 0;
    let rc = unsafe {
        ffi::sqlite3_status64(op as c_int, &raw mut current, &raw mut highwater, c_int::from(reset))
    };
    if rc == ffi::SQLITE_OK {
        Ok((current, highwater))
    } else {
        Err(Failure::new("status", ErrorCode::Sqlite(rc), None))
    }
}

/// What one `step()` produced, before the worker protocol's completion handler decodes it into
/// a `StepResult` (which also needs the text bridge).
pub(crate) enum RawStep {
    Row,
    Done,
}

/// Cheap to copy (it's just the pointer): the worker protocol locks the statement table only
/// long enough to look a key up, then releases the lock before running the engine call, so
/// callers hold a copy rather than a borrow across that gap.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawStatement(NonNull<ffi::sqlite3_stmt>);

// SAFETY: see `RawConnection`; a statement is touched under the same exclusion discipline as
// its owning connection.
unsafe impl Send for RawStatement {}
unsafe impl Sync for RawStatement {}

impl RawStatement {
    pub(crate) fn step(&self, who: &'static str) -> Result<RawStep, Failure> {
        match unsafe { ffi::sqlite3_step(self.0.as_ptr()) } {
            ffi::SQLITE_ROW => Ok(RawStep::Row),
            ffi::SQLITE_DONE => Ok(RawStep::Done),
            rc => Err(self.fetch_error(who, rc)),
        }
    }

    pub(crate) fn reset(&self) -> Result<(), Failure> {
        self.check("reset", unsafe { ffi::sqlite3_reset(self.0.as_ptr()) })
    }

    pub(crate) fn clear_bindings(&self) -> Result<(), Failure> {
        self.check(
            "clear_bindings",
            unsafe { ffi::sqlite3_clear_bindings(self.0.as_ptr()) },
        )
    }

    pub(crate) fn finalize(self) -> Result<(), Failure> {
        self.check("finalize", unsafe { ffi::sqlite3_finalize(self.0.as_ptr()) })
    }

    pub(crate) fn bind_null(&self, index: i32) -> Result<(), Failure> {
        self.check("bind_null", unsafe { ffi::sqlite3_bind_null(self.0.as_ptr(), index) })
    }

    pub(crate) fn bind_int64(&self, index: i32, value: i64) -> Result<(), Failure> {
        self.check(
            "bind_int64",
            unsafe { ffi::sqlite3_bind_int64(self.0.as_ptr(), index, value) },
        )
    }

    pub(crate) fn bind_double(&self, index: i32, value: f64) -> Result<(), Failure> {
        self.check(
            "bind_double",
            unsafe { ffi::sqlite3_bind_double(self.0.as_ptr(), index, value) },
        )
    }

    pub(crate) fn bind_text(&self, index: i32, value: &str) -> Result<(), Failure> {
        let len = value.len().try_into().unwrap_or(c_int::MAX);
        self.check("bind_text", unsafe {
            ffi::sqlite3_bind_text(
                self.0.as_ptr(),
                index,
                value.as_ptr().cast(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        })
    }

    pub(crate) fn bind_blob(&self, index: i32, value: &[u8]) -> Result<(), Failure> {
        let len = value.len().try_into().unwrap_or(c_int::MAX);
        self.check("bind_blob", unsafe {
            ffi::sqlite3_bind_blob(
                self.0.as_ptr(),
                index,
                value.as_ptr().cast(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        })
    }

    pub(crate) fn column_count(&self) -> i32 {
        unsafe { ffi::sqlite3_column_count(self.0.as_ptr()) }
    }

    pub(crate) fn column_name(&self, index: i32) -> Option<String> {
        unsafe {
            let ptr = ffi::sqlite3_column_name(self.0.as_ptr(), index);
            (!ptr.is_null()).then(|| CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }

    pub(crate) fn column_type(&self, index: i32) -> i32 {
        unsafe { ffi::sqlite3_column_type(self.0.as_ptr(), index) }
    }

    pub(crate) fn column_int64(&self, index: i32) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.0.as_ptr(), index) }
    }

    pub(crate) fn column_double(&self, index: i32) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.0.as_ptr(), index) }
    }

    /// The raw bytes of a text column, *not yet* validated as UTF-8 — the text bridge owns
    /// that. `SQLite` guarantees these bytes are valid UTF-8 when no encoding conversion was
    /// requested, but the core must not trust the engine blindly for the same reason it must
    /// not trust any other external input.
    pub(crate) fn column_text_bytes(&self, index: i32) -> Vec<u8> {
        unsafe {
            let ptr = ffi::sqlite3_column_text(self.0.as_ptr(), index);
            let len = ffi::sqlite3_column_bytes(self.0.as_ptr(), index);
            if ptr.is_null() || len <= 0 {
                Vec::new()
            } else {
                std::slice::from_raw_parts(ptr, usize::try_from(len).unwrap_or(0)).to_vec()
            }
        }
    }

    pub(crate) fn column_blob(&self, index: i32) -> Vec<u8> {
        unsafe {
            let ptr = ffi::sqlite3_column_blob(self.0.as_ptr(), index);
            let len = ffi::sqlite3_column_bytes(self.0.as_ptr(), index);
            if ptr.is_null() || len <= 0 {
                Vec::new()
            } else {
                std::slice::from_raw_parts(ptr.cast::<u8>(), usize::try_from(len).unwrap_or(0)).to_vec()
            }
        }
    }

    pub(crate) fn sql(&self) -> Option<String> {
        unsafe {
            let ptr = ffi::sqlite3_sql(self.0.as_ptr());
            (!ptr.is_null()).then(|| CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }

    fn check(self, who: &'static str, rc: c_int) -> Result<(), Failure> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.fetch_error(who, rc))
        }
    }

    fn fetch_error(self, who: &'static str, rc: c_int) -> Failure {
        let conn = unsafe { ffi::sqlite3_db_handle(self.0.as_ptr()) };
        let message = unsafe {
            let ptr = ffi::sqlite3_errmsg(conn);
            if ptr.is_null() {
                None
            } else {
                Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
            }
        };
        Failure::new(who, ErrorCode::Sqlite(rc), message)
    }
}
