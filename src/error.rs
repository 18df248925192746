//! Error type shared by every fallible primitive in the crate.
//!
//! Three kinds, each distinguishable by the caller:
//! - [`DerError::BadMessage`] — structural DER violation,
//! - [`DerError::RangeExceeded`] — well-formed input beyond implementation
//!   limits,
//! - [`DerError::AllocationFailed`] — only produced by the subparser driver.
//!
//! The engine never retries, falls back, or logs; a failed call is the whole
//! story.

use core::fmt;

/// Error kind returned by the codec primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerError {
    /// The input violates DER structure: truncated data, indefinite-length
    /// form, BIT STRING padding violations, an unmatched CHOICE, a
    /// mismatched non-optional tag, or trailing bytes where finality is
    /// required.
    BadMessage,
    /// The input is beyond what this implementation supports: a long-form
    /// (multi-byte) tag number, a length wider than the native word, or a
    /// length whose top bit is set.  Also reported when a `pack` output
    /// buffer is smaller than the measured size.
    RangeExceeded,
    /// The subparser driver could not obtain memory for a child view array.
    AllocationFailed,
}

impl DerError {
    /// Stable short name for the error kind.
    pub fn error_name(&self) -> &'static str {
        match self {
            DerError::BadMessage => "bad message",
            DerError::RangeExceeded => "range exceeded",
            DerError::AllocationFailed => "allocation failed",
        }
    }
}

impl fmt::Display for DerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.error_name())
    }
}

impl std::error::Error for DerError {}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, DerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        assert_ne!(DerError::BadMessage, DerError::RangeExceeded);
        assert_ne!(DerError::RangeExceeded, DerError::AllocationFailed);
        assert_ne!(DerError::BadMessage, DerError::AllocationFailed);
    }

    #[test]
    fn display_matches_error_name() {
        for e in [
            DerError::BadMessage,
            DerError::RangeExceeded,
            DerError::AllocationFailed,
        ] {
            assert_eq!(format!("{e}"), e.error_name());
        }
    }
}
