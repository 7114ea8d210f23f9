//! The text bridge: lossless UTF-8 round-trip in, strict rejection of anything that isn't
//! well-formed UTF-8 out. `str::from_utf8` already implements exactly the rules this needs —
//! rejecting overlong encodings, surrogate halves, and truncated continuation bytes — so this
//! module is a thin, named seam rather than a hand-rolled decoder.

use crate::error::Failure;

/// Bind-side: a `&str` is already guaranteed well-formed by the type system, so encoding to the
/// wire is infallible. Kept as a function (not an inline `.as_bytes()`) so the bridge has one
/// place to point at if that ever stops being true.
#[must_use]
pub(crate) fn encode(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// Column-side: reject anything that is not well-formed UTF-8, rather than lossily substitute
/// replacement characters. A caller that bound non-UTF-8 bytes as a blob and reads them back as
/// text gets `ECHARSET`, not silent corruption.
pub(crate) fn decode(who: &'static str, bytes: Vec<u8>) -> Result<String, Failure> {
    String::from_utf8(bytes).map_err(|e| {
        Failure::charset(who, format!("column bytes are not valid UTF-8: {}", e.utf8_error()))
    })
}
