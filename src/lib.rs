//! # sflalloc — a segregated free-list memory allocator
//!
//! A `malloc`/`free`/`realloc`-style dynamic memory allocator built
//! over the process heap via `sbrk`. Free blocks are tracked in 24
//! size-class buckets rather than one flat list, so a fit search only
//! ever walks blocks that are plausible candidates for the request.
//!
//! ## Crate layout
//!
//! ```text
//!   sflalloc
//!   ├── align     - alignment/word-size constants, rounding helpers
//!   ├── error     - InitError, the one fallible public operation
//!   ├── sbrk      - thin wrapper around the host heap-growth syscall
//!   ├── class     - size -> free-list-index mapping
//!   ├── codec
//!   │   ├── header   - packed size|alloc|pfree header/footer words
//!   │   └── freelist - offset-encoded intrusive doubly-linked lists
//!   ├── navigator - stepping to a block's physical neighbor
//!   ├── engine    - the Allocator itself: allocate/release/resize
//!   └── checker   - heap consistency verification (I1-I8)
//! ```
//!
//! ## Block layout
//!
//! Every block, free or allocated, opens with a 4-byte header packing
//! its size with two flag bits: whether it is currently allocated, and
//! whether the block immediately before it is free. A free block also
//! carries a matching 4-byte footer, and its first 8 payload bytes
//! hold signed, `ALIGNMENT`-scaled offsets to its next and previous
//! neighbors in its size class rather than raw 8-byte pointers — this
//! is what keeps a free block's minimum size at 16 bytes instead of
//! 24. An allocated block carries no footer and no list linkage; every
//! payload byte past its header belongs to the caller.
//!
//! ```text
//!   Free block (16+ bytes):      Allocated block:
//!   ┌────────┬──────┬──────┬────────┐   ┌────────┬──────────────┐
//!   │ header │ next │ prev │ footer │   │ header │   payload    │
//!   └────────┴──────┴──────┴────────┘   └────────┴──────────────┘
//!      4B       4B     4B      4B           4B
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use sflalloc::Allocator;
//!
//! fn main() {
//!     let mut heap = Allocator::init().expect("heap init");
//!
//!     unsafe {
//!         let p = heap.allocate(64).expect("allocation");
//!         std::ptr::write_bytes(p, 0, 64);
//!         heap.release(p);
//!     }
//! }
//! ```
//!
//! ## Concurrency
//!
//! Not thread-safe. `sbrk` mutates a single process-wide break and an
//! `Allocator` assumes it is the only writer moving it over the
//! lifetime of the region it manages; serialize access externally
//! (a mutex around the `Allocator`, or one per thread over disjoint
//! regions) if more than one thread needs to allocate.

pub mod align;
mod checker;
pub mod class;
pub mod codec;
mod engine;
pub mod error;
mod navigator;
pub mod sbrk;

pub use engine::Allocator;
pub use error::InitError;
