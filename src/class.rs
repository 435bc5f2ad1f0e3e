//! Size-class index: maps a block size to the segregated free list
//! that must hold it.
//!
//! 24 classes total. The first 16 are *singular* — class `i` holds
//! blocks of exactly `(i + 1) * ALIGNMENT` bytes (16, 32, …, 256). The
//! remaining 8 are *ranged*, each covering a power-of-two span above
//! 256 bytes, with the last absorbing everything past 32768.

use crate::align::ALIGNMENT;

/// Number of free lists holding blocks of exactly one size.
pub const SINGULAR_CLASSES: usize = 16;

/// Number of free lists holding a power-of-two size range.
pub const RANGED_CLASSES: usize = 8;

/// Total number of segregated free lists.
pub const TOTAL_CLASSES: usize = SINGULAR_CLASSES + RANGED_CLASSES;

const SINGULAR_CEILING: usize = SINGULAR_CLASSES * ALIGNMENT; // 256
const RANGED_CEILING: u32 = 32768;

/// Returns the index of the free list that must hold a block of
/// `size` bytes. `size` must be a positive multiple of [`ALIGNMENT`].
///
/// Ranged classes are classified on `size - 1` rather than `size`
/// itself so a class's upper bound is inclusive: a block of exactly
/// 512 bytes lands in the (256, 512] class, not (512, 1024].
pub fn index_for_size(size: usize) -> usize {
  debug_assert!(size >= ALIGNMENT && size % ALIGNMENT == 0);

  if size <= SINGULAR_CEILING {
    return size / ALIGNMENT - 1;
  }

  let highest_leading_zeros = RANGED_CEILING.leading_zeros();
  let lowest_leading_zeros = (SINGULAR_CEILING as u32).leading_zeros();

  let z = ((size - 1) as u32).leading_zeros();
  if z <= highest_leading_zeros {
    return TOTAL_CLASSES - 1;
  }

  (lowest_leading_zeros - z) as usize + SINGULAR_CLASSES
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn singular_classes_cover_exact_sizes() {
    for i in 0..SINGULAR_CLASSES {
      let size = (i + 1) * ALIGNMENT;
      assert_eq!(index_for_size(size), i);
    }
  }

  #[test]
  fn ranged_class_boundaries_are_closed_on_the_right() {
    assert_eq!(index_for_size(272), 16); // smallest block above 256
    assert_eq!(index_for_size(512), 16); // boundary value stays in the lower class
    assert_eq!(index_for_size(528), 17); // just past the boundary
    assert_eq!(index_for_size(1024), 17);
    assert_eq!(index_for_size(1040), 18);
  }

  #[test]
  fn oversized_blocks_collapse_into_the_final_class() {
    assert_eq!(index_for_size(32768), 22);
    assert_eq!(index_for_size(32784), 23);
    assert_eq!(index_for_size(1 << 20), 23);
  }
}
