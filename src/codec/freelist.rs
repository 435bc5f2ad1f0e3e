//! Free-list offset codec and intrusive doubly-linked list operations.
//!
//! Intra-class neighbor pointers are encoded as signed 4-byte deltas
//! scaled by [`ALIGNMENT`], not as 8-byte absolute pointers — this is
//! what lets a free block's minimum size stay at 16 bytes (header +
//! two 4-byte offsets + footer) instead of 24. A stored delta of zero
//! always means "no neighbor"; a block is never its own neighbor, so
//! the encoding is unambiguous.

use crate::align::{ALIGNMENT, PSIZE};
use crate::class;
use crate::codec::header;

fn read_delta(p: *mut u8) -> i32 {
  unsafe { std::ptr::read_unaligned(p as *const i32) }
}

fn write_delta(p: *mut u8, value: i32) {
  unsafe { std::ptr::write_unaligned(p as *mut i32, value) }
}

fn next_offset_ptr(bp: *mut u8) -> *mut u8 {
  bp
}

fn prev_offset_ptr(bp: *mut u8) -> *mut u8 {
  unsafe { bp.add(4) }
}

/// Encodes the delta from `base` to `target`, or `0` if `target` is
/// absent.
fn delta(target: Option<*mut u8>, base: *mut u8) -> i32 {
  match target {
    Some(t) => ((t as isize - base as isize) / ALIGNMENT as isize) as i32,
    None => 0,
  }
}

fn resolve(base: *mut u8, encoded: i32) -> Option<*mut u8> {
  if encoded == 0 {
    None
  } else {
    Some(unsafe { base.offset(encoded as isize * ALIGNMENT as isize) })
  }
}

/// Head of class `index`'s free list, if non-empty.
pub fn head(heads: *mut u8, index: usize) -> Option<*mut u8> {
  read_head(heads, index)
}

/// Next free block in `bp`'s class list, if any.
pub fn next_free(bp: *mut u8) -> Option<*mut u8> {
  resolve(bp, read_delta(next_offset_ptr(bp)))
}

/// Previous free block in `bp`'s class list, if any.
pub fn prev_free(bp: *mut u8) -> Option<*mut u8> {
  resolve(bp, read_delta(prev_offset_ptr(bp)))
}

fn read_head(heads: *mut u8, index: usize) -> Option<*mut u8> {
  let slot = unsafe { heads.add(index * PSIZE) } as *const *mut u8;
  let raw = unsafe { std::ptr::read_unaligned(slot) };
  if raw.is_null() { None } else { Some(raw) }
}

fn write_head(heads: *mut u8, index: usize, value: Option<*mut u8>) {
  let slot = unsafe { heads.add(index * PSIZE) } as *mut *mut u8;
  unsafe { std::ptr::write_unaligned(slot, value.unwrap_or(std::ptr::null_mut())) };
}

/// Inserts `bp` at the front of class `index`'s free list. O(1).
pub fn insert(heads: *mut u8, index: usize, bp: *mut u8) {
  let old_head = read_head(heads, index);

  write_delta(next_offset_ptr(bp), delta(old_head, bp));
  write_delta(prev_offset_ptr(bp), 0);

  if let Some(h) = old_head {
    write_delta(prev_offset_ptr(h), delta(Some(bp), h));
  }
  write_head(heads, index, Some(bp));
}

/// Removes `bp` from its free list.
///
/// `index_hint`, when `Some`, is the class `bp` is already known to
/// belong to — callers that just computed it should pass it rather
/// than have it recomputed from `bp`'s header.
pub fn remove(heads: *mut u8, bp: *mut u8, index_hint: Option<usize>) {
  let index = index_hint.unwrap_or_else(|| {
    let size = unsafe { header::size_of_word(header::read_word(header::header_ptr(bp))) };
    class::index_for_size(size as usize)
  });

  let next = next_free(bp);
  let prev = prev_free(bp);

  match prev {
    Some(p) => write_delta(next_offset_ptr(p), delta(next, p)),
    None => write_head(heads, index, next),
  }
  if let Some(n) = next {
    write_delta(prev_offset_ptr(n), delta(prev, n));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// A byte buffer standing in for a slice of managed heap: one
  /// free-list head table followed by room for a handful of blocks.
  struct Fixture {
    buf: Vec<u8>,
    heads: *mut u8,
  }

  impl Fixture {
    fn new(classes: usize, block_slots: usize) -> Self {
      let mut buf = vec![0u8; classes * PSIZE + block_slots * ALIGNMENT];
      let heads = buf.as_mut_ptr();
      Fixture { buf, heads }
    }

    fn block(&mut self, slot: usize, classes: usize) -> *mut u8 {
      unsafe { self.buf.as_mut_ptr().add(classes * PSIZE + slot * ALIGNMENT) }
    }
  }

  #[test]
  fn insert_then_remove_empties_the_class() {
    let mut f = Fixture::new(1, 1);
    let b = f.block(0, 1);

    insert(f.heads, 0, b);
    assert_eq!(read_head(f.heads, 0), Some(b));

    remove(f.heads, b, Some(0));
    assert_eq!(read_head(f.heads, 0), None);
  }

  #[test]
  fn list_preserves_insertion_order_and_links() {
    let mut f = Fixture::new(1, 3);
    let a = f.block(0, 1);
    let b = f.block(1, 1);
    let c = f.block(2, 1);

    insert(f.heads, 0, a);
    insert(f.heads, 0, b);
    insert(f.heads, 0, c);

    // most recently inserted is the head
    assert_eq!(read_head(f.heads, 0), Some(c));
    assert_eq!(next_free(c), Some(b));
    assert_eq!(next_free(b), Some(a));
    assert_eq!(next_free(a), None);

    assert_eq!(prev_free(a), Some(b));
    assert_eq!(prev_free(b), Some(c));
    assert_eq!(prev_free(c), None);
  }

  #[test]
  fn removing_a_middle_node_relinks_neighbors() {
    let mut f = Fixture::new(1, 3);
    let a = f.block(0, 1);
    let b = f.block(1, 1);
    let c = f.block(2, 1);

    insert(f.heads, 0, a);
    insert(f.heads, 0, b);
    insert(f.heads, 0, c); // list: c -> b -> a

    remove(f.heads, b, Some(0));

    assert_eq!(read_head(f.heads, 0), Some(c));
    assert_eq!(next_free(c), Some(a));
    assert_eq!(prev_free(a), Some(c));
  }

  #[test]
  fn removing_the_head_promotes_its_successor() {
    let mut f = Fixture::new(1, 2);
    let a = f.block(0, 1);
    let b = f.block(1, 1);

    insert(f.heads, 0, a);
    insert(f.heads, 0, b); // list: b -> a

    remove(f.heads, b, Some(0));

    assert_eq!(read_head(f.heads, 0), Some(a));
    assert_eq!(prev_free(a), None);
  }
}
