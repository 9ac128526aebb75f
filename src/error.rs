//! Internal-only error detail. None of the four public operations return
//! `Result` — the spec's null-on-failure contract is load-bearing API
//! behavior, not an omission — but the private `try_*` layer underneath them
//! names *why* a call declined, so unit tests can assert on error kind
//! instead of bare nullness.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AllocError {
  /// `allocate(0)`, `zeroed_allocate(0, _)`, or `zeroed_allocate(_, 0)`.
  ZeroSizedRequest,
  /// `resize` on a pointer whose header is already FREE.
  InvalidPointer,
  /// The OS declined to move the break or establish a mapping.
  OsPrimitiveFailed { primitive: &'static str },
}

impl fmt::Display for AllocError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AllocError::ZeroSizedRequest => write!(f, "zero-sized allocation request"),
      AllocError::InvalidPointer => write!(f, "resize of a released (FREE) block"),
      AllocError::OsPrimitiveFailed { primitive } => {
        write!(f, "OS primitive `{primitive}` failed")
      }
    }
  }
}

impl std::error::Error for AllocError {}
