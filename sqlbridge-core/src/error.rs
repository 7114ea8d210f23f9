//! The unified error space: host-runtime failures and engine error codes share one type so
//! callers never need to match on "which half of the bridge failed."

use std::fmt;

use thiserror::Error;

/// Where an error code came from, and what it means.
///
/// `Sqlite` carries a raw `SQLITE_*` result code as returned by the engine. The other variants
/// are host-runtime conditions the engine never produces itself (a second submission while one
/// is in flight, a malformed argument, an allocation failure the host detected before even
/// calling into the engine, and so on) but that callers need to discriminate exactly like an
/// engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A raw `SQLITE_*` result code (e.g. `SQLITE_CANTOPEN`, `SQLITE_INTERRUPT`).
    Sqlite(i32),
    /// A host-runtime I/O failure (worker thread spawn failure, etc), encoded as the negation
    /// of a `std::io::ErrorKind`-derived code so it can never collide with an `Sqlite` code.
    Io(i32),
    /// A second operation was submitted while one was already in flight on the same database
    /// or statement.
    Busy,
    /// An argument failed validation before reaching the engine (e.g. a negative column index).
    InvalidArgument,
    /// The host could not allocate the resources an operation needed.
    OutOfMemory,
    /// A text value could not be losslessly represented as UTF-8.
    Charset,
    /// A value exceeded a size limit the bridge enforces independently of the engine.
    TooBig,
}

impl ErrorCode {
    /// `true` if this code signals that the submitting side should retry, rather than treat the
    /// failure as terminal for the database or statement.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Busy | Self::Sqlite(libsqlite3_sys::SQLITE_BUSY))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(rc) => write!(f, "SQLITE_CODE({rc})"),
            Self::Io(code) => write!(f, "EIO({code})"),
            Self::Busy => write!(f, "EBUSY"),
            Self::InvalidArgument => write!(f, "EINVAL"),
            Self::OutOfMemory => write!(f, "ENOMEM"),
            Self::Charset => write!(f, "ECHARSET"),
            Self::TooBig => write!(f, "ETOOBIG"),
        }
    }
}

/// A failure from anywhere in the bridge: the engine, the worker protocol, or argument
/// validation. `who` names the operation that failed (`"prepare"`, `"step"`, `"open"`, ...) so
/// logs and error messages don't need a second lookup to tell what was being attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{who} failed: {code}{}", message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default())]
pub struct Failure {
    pub who: &'static str,
    pub code: ErrorCode,
    pub message: Option<String>,
}

impl Failure {
    pub(crate) fn new(who: &'static str, code: ErrorCode, message: Option<String>) -> Self {
        Self { who, code, message }
    }

    pub(crate) fn busy(who: &'static str) -> Self {
        Self::new(who, ErrorCode::Busy, None)
    }

    pub(crate) fn io(who: &'static str, err: &std::io::Error) -> Self {
        Self::new(who, ErrorCode::Io(-(err.raw_os_error().unwrap_or(1))), Some(err.to_string()))
    }

    pub(crate) fn invalid(who: &'static str, message: impl Into<String>) -> Self {
        Self::new(who, ErrorCode::InvalidArgument, Some(message.into()))
    }

    pub(crate) fn charset(who: &'static str, message: impl Into<String>) -> Self {
        Self::new(who, ErrorCode::Charset, Some(message.into()))
    }

    pub(crate) fn too_big(who: &'static str, message: impl Into<String>) -> Self {
        Self::new(who, ErrorCode::TooBig, Some(message.into()))
    }

    /// A previous operation panicked while holding the submission-slot mutex. Every lock
    /// acquisition in this crate propagates through this rather than unwrapping, so a poisoned
    /// lock surfaces to the caller as an ordinary `Failure` instead of a second panic.
    pub(crate) fn lock_poisoned(who: &'static str) -> Self {
        Self::new(who, ErrorCode::Io(-1), Some("internal lock poisoned by a prior panic".into()))
    }
}
