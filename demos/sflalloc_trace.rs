use std::io::Read;

use libc::sbrk;
use sflalloc::Allocator;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  // Our allocator: a segregated free-list over a region obtained via
  // `sbrk`. Unlike a bump allocator it can reuse a released block and
  // will coalesce neighbors back together when it does.
  let mut heap = Allocator::init().expect("failed to reserve the initial heap chunk");

  unsafe { print_program_break("start") };
  block_until_enter_pressed();

  // ------------------------------------------------------------------
  // 1) Allocate 64 bytes and write a pattern into it.
  // ------------------------------------------------------------------
  let first = heap.allocate(64).expect("allocation");
  println!("\n[1] Allocate 64 bytes -> {:?}", first);
  unsafe { std::ptr::write_bytes(first, 0xAB, 64) };
  println!("[1] Filled with 0xAB");
  block_until_enter_pressed();

  // ------------------------------------------------------------------
  // 2) Allocate a second, differently sized block.
  // ------------------------------------------------------------------
  let second = heap.allocate(4000).expect("allocation");
  println!("\n[2] Allocate 4000 bytes -> {:?}", second);
  block_until_enter_pressed();

  // ------------------------------------------------------------------
  // 3) Release the first block and immediately request something that
  //    fits inside it, to watch the free-list reuse it.
  // ------------------------------------------------------------------
  heap.release(first);
  println!("\n[3] Released first block at {:?}", first);

  let third = heap.allocate(32).expect("allocation");
  println!(
    "[3] Allocated 32 bytes -> {:?} (reused first block? {})",
    third,
    third == first
  );
  block_until_enter_pressed();

  // ------------------------------------------------------------------
  // 4) Grow the second block in place via resize, then shrink it back.
  // ------------------------------------------------------------------
  let grown = heap.resize(second, 6000).expect("resize");
  println!(
    "\n[4] Resized second block to 6000 bytes -> {:?} (moved? {})",
    grown,
    grown != second
  );

  let shrunk = heap.resize(grown, 16).expect("resize");
  println!("[4] Shrunk back down to 16 bytes -> {:?}", shrunk);
  block_until_enter_pressed();

  // ------------------------------------------------------------------
  // 5) Force heap growth with a large allocation and watch the break
  //    move.
  // ------------------------------------------------------------------
  unsafe { print_program_break("before large alloc") };
  let big = heap.allocate(64 * 1024).expect("allocation");
  println!("\n[5] Allocate 64 KiB -> {:?}", big);
  unsafe { print_program_break("after large alloc") };
  block_until_enter_pressed();

  // ------------------------------------------------------------------
  // 6) Walk the heap and every class list, checking every invariant.
  // ------------------------------------------------------------------
  println!("\n[6] Running the consistency checker (verbose)...");
  let healthy = heap.check(1);
  println!("[6] Heap healthy: {}", healthy);

  println!("\n[7] End of trace. Process will exit and the OS will reclaim all memory.");
}
