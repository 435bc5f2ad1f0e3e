//! The one failure mode this allocator surfaces through `Result`
//! rather than a null return.
//!
//! Every other public operation (`allocate`, `release`, `resize`,
//! `zero_allocate`) fails the way `malloc`'s C family does: by
//! returning a null pointer, with the heap left untouched. `init` is
//! the exception, since there is no pointer to return null in place
//! of — it either reserves its bookkeeping chunk or it doesn't.

use std::fmt;

/// Failure returned by [`crate::Allocator::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
  /// The host's heap-growth primitive refused the initial chunk
  /// (the segregated free-list head table plus prologue/epilogue).
  HeapExhausted,
}

impl fmt::Display for InitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InitError::HeapExhausted => {
        write!(f, "failed to reserve the initial heap chunk")
      }
    }
  }
}

impl std::error::Error for InitError {}
