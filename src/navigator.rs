//! Stepping from one block's payload pointer to its physical neighbor's.
//!
//! These walk the heap by size alone, the same way the free-list codec
//! walks a class by offset alone — no block stores a pointer to its
//! physical neighbor, it's always recomputed from a header or footer.

use crate::align::WSIZE;
use crate::codec::header;

/// Payload pointer of the block physically following `bp`.
///
/// Valid for any block, free or allocated; the epilogue is itself a
/// zero-size allocated block, so this is always a readable header even
/// at the top of the heap.
///
/// # Safety
///
/// `bp` must be a valid payload pointer to a live block within the
/// managed region.
pub unsafe fn next_block(bp: *mut u8) -> *mut u8 {
  let size = unsafe { header::size_of_word(header::read_word(header::header_ptr(bp))) };
  unsafe { bp.add(size as usize) }
}

/// Payload pointer of the block physically preceding `bp`.
///
/// Only meaningful when `bp`'s pfree bit is set — only then is there a
/// footer immediately below `bp`'s header to read the predecessor's
/// size from.
///
/// # Safety
///
/// `bp` must be a valid payload pointer within the managed region, and
/// its block's pfree bit must be set (so the preceding footer exists).
pub unsafe fn prev_block(bp: *mut u8) -> *mut u8 {
  let footer = unsafe { header::header_ptr(bp).sub(WSIZE) };
  let size = unsafe { header::size_of_word(header::read_word(footer)) };
  unsafe { bp.sub(size as usize) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::ALIGNMENT;

  #[test]
  fn next_block_steps_by_the_current_blocks_size() {
    let mut buf = vec![0u8; 4 * ALIGNMENT];
    unsafe {
      let bp = buf.as_mut_ptr().add(WSIZE);
      header::write_word(header::header_ptr(bp), header::pack(32, true, false));

      assert_eq!(next_block(bp), bp.add(32));
    }
  }

  #[test]
  fn prev_block_steps_back_by_the_predecessors_footer_size() {
    let mut buf = vec![0u8; 4 * ALIGNMENT];
    unsafe {
      let prev_bp = buf.as_mut_ptr().add(WSIZE);
      header::write_word(header::header_ptr(prev_bp), header::pack(32, false, false));
      header::write_word(header::footer_ptr(prev_bp, 32), header::pack(32, false, false));

      let bp = prev_bp.add(32);
      assert_eq!(prev_block(bp), prev_bp);
    }
  }
}
