//! Heap consistency checker: walks the managed region and every class
//! list, verifying the invariants the allocator is supposed to uphold
//! at rest. Intended for tests and for callers debugging a suspected
//! corruption, not for the hot allocate/release path.

use std::collections::HashSet;

use crate::align::{PSIZE, WSIZE};
use crate::class;
use crate::codec::{freelist, header};
use crate::navigator;

/// Walks the block chain and every class list rooted at `heads`,
/// printing a line to stderr for each invariant violation found
/// regardless of `verbosity`. `verbosity >= 1` also narrates the block
/// chain walk; `verbosity >= 2` additionally dumps every class list.
/// Returns `true` iff nothing was found wrong.
pub fn check(heads: *mut u8, epilogue_hdr: *mut u8, verbosity: u8) -> bool {
  let mut ok = true;

  let heads_bytes = class::TOTAL_CLASSES * PSIZE;
  let prologue_hdr = unsafe { heads.add(heads_bytes + WSIZE) };
  let prologue_bp = unsafe { prologue_hdr.add(WSIZE) };

  let mut reachable_from_chain: HashSet<usize> = HashSet::new();
  let mut bp = unsafe { navigator::next_block(prologue_bp) };
  let mut prev_was_free = false;

  while unsafe { header::header_ptr(bp) } != epilogue_hdr {
    let word = unsafe { header::read_word(header::header_ptr(bp)) };
    let size = header::size_of_word(word) as usize;
    let alloc = header::is_alloc(word);
    let pfree = header::is_pfree(word);

    if verbosity > 0 {
      eprintln!("block {:p} size={} alloc={} pfree={}", bp, size, alloc, pfree);
    }

    if size % crate::align::ALIGNMENT != 0 || size == 0 {
      eprintln!("check: block {:p} has non-aligned or zero size {}", bp, size);
      ok = false;
    }

    if pfree != prev_was_free {
      eprintln!("check: block {:p} pfree bit {} disagrees with predecessor's actual state {}", bp, pfree, prev_was_free);
      ok = false;
    }

    if !alloc {
      let footer = unsafe { header::read_word(header::footer_ptr(bp, size)) };
      if footer != word {
        eprintln!("check: free block {:p} header/footer mismatch ({:#x} vs {:#x})", bp, word, footer);
        ok = false;
      }
      if prev_was_free {
        eprintln!("check: block {:p} is free immediately after another free block", bp);
        ok = false;
      }
      reachable_from_chain.insert(bp as usize);
    }

    prev_was_free = !alloc;
    bp = unsafe { navigator::next_block(bp) };
  }

  let mut reachable_from_lists: HashSet<usize> = HashSet::new();
  for index in 0..class::TOTAL_CLASSES {
    let mut cursor = freelist::head(heads, index);
    let mut seen_in_class: HashSet<usize> = HashSet::new();

    while let Some(node) = cursor {
      let word = unsafe { header::read_word(header::header_ptr(node)) };
      let size = header::size_of_word(word) as usize;

      if verbosity >= 2 {
        eprintln!("class {} -> {:p} size={}", index, node, size);
      }

      if header::is_alloc(word) {
        eprintln!("check: allocated block {:p} is linked in free class {}", node, index);
        ok = false;
      }
      if class::index_for_size(size) != index {
        eprintln!("check: block {:p} of size {} is linked in class {} instead of {}", node, size, index, class::index_for_size(size));
        ok = false;
      }
      if !seen_in_class.insert(node as usize) {
        eprintln!("check: class {} list cycles back through {:p}", index, node);
        ok = false;
        break;
      }

      if let Some(next) = freelist::next_free(node) {
        if freelist::prev_free(next) != Some(node) {
          eprintln!("check: class {} link {:p} -> {:p} is not mirrored backward", index, node, next);
          ok = false;
        }
      }

      reachable_from_lists.insert(node as usize);
      cursor = freelist::next_free(node);
    }
  }

  if reachable_from_chain != reachable_from_lists {
    eprintln!(
      "check: free blocks reachable by walking the heap disagree with free blocks reachable from class lists (chain-only: {}, list-only: {})",
      reachable_from_chain.difference(&reachable_from_lists).count(),
      reachable_from_lists.difference(&reachable_from_chain).count(),
    );
    ok = false;
  }

  ok
}

#[cfg(test)]
mod tests {
  use crate::sbrk::SBRK_GUARD;

  #[test]
  fn a_freshly_initialized_heap_passes() {
    let _guard = SBRK_GUARD.lock().unwrap();
    let allocator = crate::engine::Allocator::init().expect("init");
    assert!(allocator.check(0));
  }
}
