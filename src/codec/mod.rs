//! Byte-level codecs over the managed heap region.
//!
//! Everything here reads and writes raw words through explicit
//! (possibly unaligned) pointer casts rather than through typed
//! aliases of client allocations — the managed region is client memory
//! the allocator does not own a typed view of.

pub mod freelist;
pub mod header;
