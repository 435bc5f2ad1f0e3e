//! Thin wrapper around the host's heap-growth primitive.
//!
//! `sbrk(n)` extends the process break by `n` bytes and returns the
//! address of the start of the newly available region, or `(void *)-1`
//! on failure.

use libc::{c_void, intptr_t, sbrk};

/// Extends the process heap by `delta` bytes.
///
/// Returns the address of the newly available region, or `None` if
/// the underlying `sbrk` call failed — typically because a resource
/// limit such as `RLIMIT_DATA` was hit.
///
/// # Safety
///
/// Mutates process-wide state shared with every other heap user in
/// the process (the C runtime's own `malloc`, other allocator
/// instances, …). The caller is the sole owner of whatever region it
/// asks for; nothing here stops a concurrent caller from moving the
/// break out from under it (see the crate's concurrency notes).
pub unsafe fn extend(delta: usize) -> Option<*mut u8> {
  let addr = unsafe { sbrk(delta as intptr_t) };
  if addr == usize::MAX as *mut c_void {
    None
  } else {
    Some(addr as *mut u8)
  }
}

/// Serializes every test across the crate that touches the real
/// process break. `sbrk` mutates process-wide state and `cargo test`
/// runs suites on a thread pool by default, so any two tests that each
/// construct an `Allocator` must not run concurrently — one shared
/// guard, not one per test module, is what makes that true crate-wide.
#[cfg(test)]
pub static SBRK_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());
