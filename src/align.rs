//! Alignment and word-size constants, plus the rounding helpers built
//! on top of them.
//!
//! `ALIGNMENT` is fixed at 16 bytes, the host contract this allocator
//! is built against (see the crate root docs) — every block size is
//! pinned to this boundary, which is what the header/footer encoding
//! assumes.

use std::mem;

/// Payload and block-size alignment, fixed by the host contract.
pub const ALIGNMENT: usize = 16;

/// Word size: the width of a packed header/footer word and of a
/// free-list offset field.
pub const WSIZE: usize = 4;

/// Double word size: header + footer, or the pair of offset fields.
pub const DSIZE: usize = 8;

/// Size of one segregated free-list head slot (a raw pointer).
pub const PSIZE: usize = mem::size_of::<*mut u8>();

/// Size of a heap-growth chunk requested from the `sbrk`-like
/// primitive when no free block satisfies a request.
pub const CHUNK_SIZE: usize = 4096;

/// Rounds `value` up to the next multiple of [`ALIGNMENT`].
pub fn round_up(value: usize) -> usize {
  (value + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Rounds `value` up to the next multiple of [`CHUNK_SIZE`].
pub fn round_mem(value: usize) -> usize {
  (value + CHUNK_SIZE - 1) & !(CHUNK_SIZE - 1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_up_snaps_to_alignment() {
    assert_eq!(round_up(1), ALIGNMENT);
    assert_eq!(round_up(ALIGNMENT), ALIGNMENT);
    assert_eq!(round_up(ALIGNMENT + 1), ALIGNMENT * 2);
    assert_eq!(round_up(0), 0);
  }

  #[test]
  fn round_mem_snaps_to_chunk_size() {
    assert_eq!(round_mem(1), CHUNK_SIZE);
    assert_eq!(round_mem(CHUNK_SIZE), CHUNK_SIZE);
    assert_eq!(round_mem(CHUNK_SIZE + 1), CHUNK_SIZE * 2);
  }
}
