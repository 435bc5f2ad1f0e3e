//! The allocator itself: owns a region of the process heap and serves
//! `allocate`/`release`/`resize` requests over it via a segregated
//! free list.
//!
//! An `Allocator` is a handle onto one contiguous run of memory
//! obtained through [`crate::sbrk`] — an instance, not a process-wide
//! singleton, so nothing here relies on global statics the way a
//! bump arena keyed off a single static pointer would.

use crate::align::{ALIGNMENT, DSIZE, WSIZE, round_mem, round_up};
use crate::checker;
use crate::class;
use crate::codec::{freelist, header};
use crate::error::InitError;
use crate::navigator;
use crate::sbrk;

/// A segregated-free-list allocator over a dedicated slice of the
/// process heap.
pub struct Allocator {
  heads: *mut u8,
  epilogue_hdr: *mut u8,
}

/// # Safety
///
/// `bp` must be a valid payload pointer within the managed region.
unsafe fn set_pfree(bp: *mut u8, value: bool) {
  unsafe {
    let hdr = header::header_ptr(bp);
    let word = header::read_word(hdr);
    header::write_word(hdr, header::pack(header::size_of_word(word), header::is_alloc(word), value));
  }
}

impl Allocator {
  /// Block size (header + payload, rounded to [`ALIGNMENT`]) needed to
  /// satisfy a `payload`-byte request.
  fn block_size_for(payload: usize) -> usize {
    round_up(payload + WSIZE).max(ALIGNMENT)
  }

  /// Lays down the head table and the prologue/epilogue sentinels.
  /// The managed region holds no free blocks yet — heap growth only
  /// happens the first time `allocate` can't find a fit.
  pub fn init() -> Result<Allocator, InitError> {
    let heads_bytes = class::TOTAL_CLASSES * crate::align::PSIZE;
    let static_region = heads_bytes + WSIZE + DSIZE + WSIZE;

    let heads = unsafe { sbrk::extend(static_region) }.ok_or(InitError::HeapExhausted)?;
    unsafe { std::ptr::write_bytes(heads, 0, heads_bytes) };

    unsafe {
      let prologue_hdr = heads.add(heads_bytes + WSIZE);
      let prologue_bp = prologue_hdr.add(WSIZE);
      header::write_word(prologue_hdr, header::pack(DSIZE as u32, true, false));
      header::write_word(header::footer_ptr(prologue_bp, DSIZE), header::pack(DSIZE as u32, true, false));

      let epilogue_hdr = prologue_bp.add(DSIZE - WSIZE);
      header::write_word(epilogue_hdr, header::pack(0, true, false));

      Ok(Allocator { heads, epilogue_hdr })
    }
  }

  /// Extends the heap by at least `min_size` bytes, folding the new
  /// space into the block immediately before the old epilogue if that
  /// block was free. Returns the resulting free block, not yet linked
  /// into any class list.
  fn grow(&mut self, min_size: usize) -> Option<*mut u8> {
    let size = round_mem(min_size.max(crate::align::CHUNK_SIZE));
    let pfree = unsafe { header::is_pfree(header::read_word(self.epilogue_hdr)) };
    let bp = unsafe { self.epilogue_hdr.add(WSIZE) };

    let region = unsafe { sbrk::extend(size) }?;
    debug_assert_eq!(region, bp);

    unsafe {
      header::write_word(header::header_ptr(bp), header::pack(size as u32, false, pfree));
      header::write_word(header::footer_ptr(bp, size), header::pack(size as u32, false, pfree));

      // the new epilogue's header occupies the last word of the bytes
      // just reserved; everything before it is this block's body
      let new_epilogue_hdr = bp.add(size - WSIZE);
      header::write_word(new_epilogue_hdr, header::pack(0, true, false));
      self.epilogue_hdr = new_epilogue_hdr;
    }

    Some(self.coalesce(bp))
  }

  /// Merges `bp` with whichever of its physical neighbors are free.
  /// `bp` itself must not currently be linked into any class list; any
  /// neighbor absorbed is unlinked from its own list. Returns the
  /// (possibly relocated) pointer to the merged free block, still
  /// unlinked.
  fn coalesce(&mut self, bp: *mut u8) -> *mut u8 {
    unsafe {
      let word = header::read_word(header::header_ptr(bp));
      let mut size = header::size_of_word(word) as usize;
      let prev_free = header::is_pfree(word);

      let next_bp = navigator::next_block(bp);
      let next_word = header::read_word(header::header_ptr(next_bp));
      if !header::is_alloc(next_word) {
        let next_size = header::size_of_word(next_word) as usize;
        freelist::remove(self.heads, next_bp, Some(class::index_for_size(next_size)));
        size += next_size;
      }

      let (new_bp, new_pfree) = if prev_free {
        let prev_bp = navigator::prev_block(bp);
        let prev_word = header::read_word(header::header_ptr(prev_bp));
        let prev_size = header::size_of_word(prev_word) as usize;
        freelist::remove(self.heads, prev_bp, Some(class::index_for_size(prev_size)));
        size += prev_size;
        (prev_bp, header::is_pfree(prev_word))
      } else {
        (bp, false)
      };

      header::write_word(header::header_ptr(new_bp), header::pack(size as u32, false, new_pfree));
      header::write_word(header::footer_ptr(new_bp, size), header::pack(size as u32, false, new_pfree));
      set_pfree(navigator::next_block(new_bp), true);

      new_bp
    }
  }

  /// Best-fit search: scans class lists from `size`'s own class
  /// upward, taking the smallest fitting block in the first class
  /// that has one.
  fn find_fit(&self, size: usize) -> Option<*mut u8> {
    for index in class::index_for_size(size)..class::TOTAL_CLASSES {
      let mut best: Option<(*mut u8, usize)> = None;
      let mut cursor = freelist::head(self.heads, index);
      while let Some(bp) = cursor {
        let block_size = unsafe { header::size_of_word(header::read_word(header::header_ptr(bp))) } as usize;
        if block_size >= size && best.map_or(true, |(_, best_size)| block_size < best_size) {
          best = Some((bp, block_size));
        }
        cursor = freelist::next_free(bp);
      }
      if let Some((bp, _)) = best {
        return Some(bp);
      }
    }
    None
  }

  /// Carves `request_size` bytes off the front of free block `bp`,
  /// which currently holds `block_size >= request_size` bytes.
  ///
  /// `was_linked` tells whether `bp` is currently registered in a
  /// class list (and so must be unlinked before its size changes) or
  /// is a block fresh out of [`Self::grow`] that was never linked.
  ///
  /// The residual, if any, is left at `bp`'s own address — only the
  /// allocated portion moves, to the high end of the block.
  fn split(&mut self, bp: *mut u8, request_size: usize, was_linked: bool) -> *mut u8 {
    unsafe {
      let word = header::read_word(header::header_ptr(bp));
      let block_size = header::size_of_word(word) as usize;
      let pfree = header::is_pfree(word);

      if was_linked {
        freelist::remove(self.heads, bp, Some(class::index_for_size(block_size)));
      }

      let remaining = block_size - request_size;
      if remaining < ALIGNMENT {
        header::write_word(header::header_ptr(bp), header::pack(block_size as u32, true, pfree));
        set_pfree(navigator::next_block(bp), false);
        return bp;
      }

      header::write_word(header::header_ptr(bp), header::pack(remaining as u32, false, pfree));
      header::write_word(header::footer_ptr(bp, remaining), header::pack(remaining as u32, false, pfree));
      freelist::insert(self.heads, class::index_for_size(remaining), bp);

      let alloc_bp = bp.add(remaining);
      header::write_word(header::header_ptr(alloc_bp), header::pack(request_size as u32, true, true));
      set_pfree(navigator::next_block(alloc_bp), false);

      alloc_bp
    }
  }

  /// Serves a `size`-byte request, growing the heap if no free block
  /// fits. Returns `None` only if the heap cannot be grown further.
  pub fn allocate(&mut self, size: usize) -> Option<*mut u8> {
    let block_size = Self::block_size_for(size);

    if let Some(bp) = self.find_fit(block_size) {
      return Some(self.split(bp, block_size, true));
    }

    let bp = self.grow(block_size)?;
    Some(self.split(bp, block_size, false))
  }

  /// `allocate`, followed by zeroing the `count * elem_size` bytes
  /// returned.
  pub fn zero_allocate(&mut self, count: usize, elem_size: usize) -> Option<*mut u8> {
    let total = count.checked_mul(elem_size)?;
    let bp = self.allocate(total)?;
    unsafe { std::ptr::write_bytes(bp, 0, total) };
    Some(bp)
  }

  /// Returns `bp` to the free pool, coalescing with free physical
  /// neighbors. A null `bp` is a no-op.
  pub fn release(&mut self, bp: *mut u8) {
    if bp.is_null() {
      return;
    }

    let (size, pfree) = unsafe {
      let word = header::read_word(header::header_ptr(bp));
      (header::size_of_word(word), header::is_pfree(word))
    };

    unsafe {
      header::write_word(header::header_ptr(bp), header::pack(size, false, pfree));
      header::write_word(header::footer_ptr(bp, size as usize), header::pack(size, false, pfree));
    }

    let merged = self.coalesce(bp);
    let merged_size = unsafe { header::size_of_word(header::read_word(header::header_ptr(merged))) };
    freelist::insert(self.heads, class::index_for_size(merged_size as usize), merged);
  }

  /// Resizes the allocation at `bp` to `new_payload` bytes, preserving
  /// its contents up to the smaller of the old and new sizes.
  ///
  /// A `new_payload` of `0` releases `bp` and returns `None`, matching
  /// the host `realloc` convention. A null `bp` instead behaves as a
  /// plain `allocate(new_payload)`. Shrinking in place never moves
  /// `bp`. Growing first tries to absorb a free block immediately
  /// following `bp`; only if that is insufficient does it fall back
  /// to allocating elsewhere and copying.
  pub fn resize(&mut self, bp: *mut u8, new_payload: usize) -> Option<*mut u8> {
    if new_payload == 0 {
      self.release(bp);
      return None;
    }

    if bp.is_null() {
      return self.allocate(new_payload);
    }

    let new_block_size = Self::block_size_for(new_payload);
    let (old_size, pfree) = unsafe {
      let word = header::read_word(header::header_ptr(bp));
      (header::size_of_word(word) as usize, header::is_pfree(word))
    };

    if new_block_size <= old_size {
      let remaining = old_size - new_block_size;
      if remaining < ALIGNMENT {
        return Some(bp);
      }

      let tail_bp = unsafe {
        header::write_word(header::header_ptr(bp), header::pack(new_block_size as u32, true, pfree));

        let tail_bp = bp.add(new_block_size);
        header::write_word(header::header_ptr(tail_bp), header::pack(remaining as u32, false, false));
        header::write_word(header::footer_ptr(tail_bp, remaining), header::pack(remaining as u32, false, false));
        tail_bp
      };

      let merged = self.coalesce(tail_bp);
      let merged_size = unsafe { header::size_of_word(header::read_word(header::header_ptr(merged))) };
      freelist::insert(self.heads, class::index_for_size(merged_size as usize), merged);

      return Some(bp);
    }

    let (next_bp, next_alloc, next_size) = unsafe {
      let next_bp = navigator::next_block(bp);
      let next_word = header::read_word(header::header_ptr(next_bp));
      (next_bp, header::is_alloc(next_word), header::size_of_word(next_word) as usize)
    };
    if !next_alloc {
      let combined = old_size + next_size;
      if combined >= new_block_size {
        freelist::remove(self.heads, next_bp, Some(class::index_for_size(next_size)));

        let remaining = combined - new_block_size;
        unsafe {
          if remaining < ALIGNMENT {
            header::write_word(header::header_ptr(bp), header::pack(combined as u32, true, pfree));
            set_pfree(navigator::next_block(bp), false);
          } else {
            header::write_word(header::header_ptr(bp), header::pack(new_block_size as u32, true, pfree));

            let tail_bp = bp.add(new_block_size);
            header::write_word(header::header_ptr(tail_bp), header::pack(remaining as u32, false, false));
            header::write_word(header::footer_ptr(tail_bp, remaining), header::pack(remaining as u32, false, false));
            freelist::insert(self.heads, class::index_for_size(remaining), tail_bp);
            set_pfree(navigator::next_block(tail_bp), true);
          }
        }

        return Some(bp);
      }
    }

    let new_bp = self.allocate(new_payload)?;
    let old_usable = old_size - WSIZE;
    let copy_size = old_usable.min(new_payload);
    unsafe { std::ptr::copy_nonoverlapping(bp, new_bp, copy_size) };
    self.release(bp);
    Some(new_bp)
  }

  /// Walks the managed region verifying every global invariant,
  /// printing diagnostics to stderr for anything that doesn't hold.
  /// Returns whether the heap passed.
  pub fn check(&self, verbosity: u8) -> bool {
    checker::check(self.heads, self.epilogue_hdr, verbosity)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sbrk::SBRK_GUARD;

  fn with_allocator<F: FnOnce(&mut Allocator)>(f: F) {
    let _guard = SBRK_GUARD.lock().unwrap();
    let mut allocator = Allocator::init().expect("heap init should succeed");
    f(&mut allocator);
  }

  #[test]
  fn allocate_returns_writable_distinct_pointers() {
    with_allocator(|a| {
      let p1 = a.allocate(64).unwrap();
      let p2 = a.allocate(64).unwrap();
      assert_ne!(p1, p2);
      unsafe {
        std::ptr::write_bytes(p1, 0xAB, 64);
        std::ptr::write_bytes(p2, 0xCD, 64);
        assert_eq!(*p1, 0xAB);
        assert_eq!(*p2, 0xCD);
      }
      assert!(a.check(0));
    });
  }

  #[test]
  fn released_block_is_reused_by_a_same_sized_request() {
    with_allocator(|a| {
      let p1 = a.allocate(48).unwrap();
      a.release(p1);
      let p2 = a.allocate(48).unwrap();
      assert_eq!(p1, p2);
      assert!(a.check(0));
    });
  }

  #[test]
  fn splitting_a_large_free_block_leaves_a_reusable_remainder() {
    with_allocator(|a| {
      let big = a.allocate(4000).unwrap();
      a.release(big);

      // the residual stays at the freed block's own address; only the
      // newly allocated piece is carved from its high end
      let small = a.allocate(32).unwrap();
      assert_ne!(small, big);

      a.release(small);
      let reused = a.allocate(32).unwrap();
      assert_eq!(reused, small, "releasing and re-requesting the same size should reuse the same slot");
      assert!(a.check(0));
    });
  }

  #[test]
  fn adjacent_released_blocks_coalesce_for_a_larger_request() {
    with_allocator(|a| {
      let p1 = a.allocate(256).unwrap();
      let p2 = a.allocate(256).unwrap();
      let p3 = a.allocate(256).unwrap();

      a.release(p1);
      a.release(p2);

      // neither p1 nor p2 alone holds 400 payload bytes; satisfying
      // this request proves they coalesced into one larger block
      let merged = a.allocate(400).unwrap();
      unsafe { std::ptr::write_bytes(merged, 0x9, 400) };

      a.release(p3);
      assert!(a.check(0));
    });
  }

  #[test]
  fn resize_shrinks_in_place_without_moving() {
    with_allocator(|a| {
      let p = a.allocate(512).unwrap();
      unsafe { std::ptr::write_bytes(p, 0x11, 64) };

      let shrunk = a.resize(p, 64).unwrap();
      assert_eq!(shrunk, p);
      unsafe { assert_eq!(*shrunk, 0x11) };
      assert!(a.check(0));
    });
  }

  #[test]
  fn resize_grows_in_place_into_a_free_neighbor() {
    with_allocator(|a| {
      // split order carves from the high end first, so the block
      // allocated before `p` physically follows it
      let filler = a.allocate(64).unwrap();
      let p = a.allocate(64).unwrap();
      a.release(filler);

      let grown = a.resize(p, 100).unwrap();
      assert_eq!(grown, p);
      assert!(a.check(0));
    });
  }

  #[test]
  fn resize_falls_back_to_copy_when_no_room_to_grow() {
    with_allocator(|a| {
      // the first allocation out of a fresh heap triggers its own
      // growth and sits at the top of the resulting chunk, directly
      // against the epilogue, so it has no free neighbor to grow into
      let p = a.allocate(32).unwrap();
      unsafe { std::ptr::write_bytes(p, 0x7, 32) };

      let grown = a.resize(p, 4000).unwrap();
      assert_ne!(grown, p);
      unsafe { assert_eq!(*grown, 0x7) };
      assert!(a.check(0));
    });
  }

  #[test]
  fn resize_to_zero_releases_and_returns_none() {
    with_allocator(|a| {
      let p = a.allocate(64).unwrap();
      assert!(a.resize(p, 0).is_none());
      assert!(a.check(0));
    });
  }

  #[test]
  fn zero_allocate_clears_the_returned_region() {
    with_allocator(|a| {
      let p = a.zero_allocate(16, 8).unwrap();
      unsafe {
        for i in 0..128 {
          assert_eq!(*p.add(i), 0);
        }
      }
      assert!(a.check(0));
    });
  }

  #[test]
  fn many_interleaved_requests_keep_the_heap_consistent() {
    with_allocator(|a| {
      let mut live = Vec::new();
      for i in 0..200 {
        let size = 8 + (i % 37) * 16;
        live.push(a.allocate(size).unwrap());
        if i % 3 == 0 {
          if let Some(p) = live.pop() {
            a.release(p);
          }
        }
      }
      for p in live {
        a.release(p);
      }
      assert!(a.check(0));
    });
  }

  #[test]
  fn release_of_a_null_pointer_is_a_noop() {
    with_allocator(|a| {
      a.release(std::ptr::null_mut());
      assert!(a.check(0));
    });
  }

  #[test]
  fn resize_of_a_null_pointer_behaves_like_allocate() {
    with_allocator(|a| {
      let p = a.resize(std::ptr::null_mut(), 48).unwrap();
      unsafe { std::ptr::write_bytes(p, 0x5, 48) };
      assert!(a.check(0));
    });
  }

  #[test]
  fn best_fit_picks_the_smallest_sufficient_block_in_a_ranged_class() {
    with_allocator(|a| {
      // payload sizes chosen so the resulting block sizes (288, 400,
      // 320 bytes) all land in the same ranged class, the (256, 512]
      // bucket — unlike every other test here, which either hits an
      // exact singular-class match or relies on uniform-size
      // coalescing, this exercises the best-fit scan's actual decision
      // logic across multiple distinct sizes within one class.
      let a1 = a.allocate(284).unwrap(); // block size 288
      let sep1 = a.allocate(8).unwrap(); // keeps a1 from coalescing with a3
      let a3 = a.allocate(396).unwrap(); // block size 400
      let sep2 = a.allocate(8).unwrap(); // keeps a3 from coalescing with a5
      let a5 = a.allocate(316).unwrap(); // block size 320

      a.release(a1);
      a.release(a3);
      a.release(a5);

      // a request needing a 320-byte block doesn't fit in the 288-byte
      // block; best-fit must pick the 320-byte block over the larger
      // 400-byte one
      let best = a.allocate(316).unwrap();
      assert_eq!(best, a5, "best-fit should pick the smallest block that still satisfies the request, not a larger one");

      a.release(sep1);
      a.release(sep2);
      assert!(a.check(0));
    });
  }
}
