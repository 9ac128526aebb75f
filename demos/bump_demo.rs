use std::{io::Read, ptr};

use libc::sbrk;
use rallocator::Allocator;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  // Our allocator. It holds a singly-linked list of block headers rooted at
  // `head`, a `tail` pointer for O(1) last-block checks, and a flag marking
  // whether the break-heap bootstrap reservation has happened yet.
  let mut allocator = Allocator::new();

  unsafe {
    // Initial heap state
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate space for a u32 (4 bytes).
    // --------------------------------------------------------------------
    let first_block = allocator.allocate(4);
    println!("\n[1] Allocate u32: {:?}", first_block);

    let first_ptr = first_block as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first_block = 0x{:X}", first_ptr.read());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate 12 bytes (u8[12]).
    //    This shows how the allocator handles "odd-sized" allocations.
    // --------------------------------------------------------------------
    let second_block = allocator.allocate(12);
    println!("\n[2] Allocate [u8; 12]: {:?}", second_block);

    ptr::write_bytes(second_block, 0xAB, 12);
    println!("[2] Initialized second block with 0xAB");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Allocate a u64 to test alignment (this allocator aligns to 8).
    // --------------------------------------------------------------------
    let third_block = allocator.allocate(8);
    println!("\n[3] Allocate u64 (observe alignment): {:?}", third_block);

    let third_ptr = third_block as *mut u64;
    third_ptr.write(0x1122334455667788);
    println!("[3] Value written = 0x{:X}", third_ptr.read());

    let addr_third = third_block as usize;
    println!(
      "[3] Address = {:#X}, addr % 8 = {}",
      addr_third,
      addr_third % 8
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Allocate an array of u16 to force more list movement.
    // --------------------------------------------------------------------
    let fourth_block = allocator.allocate(32); // 16 * u16
    println!("\n[4] Allocate [u16; 16]: {:?}", fourth_block);

    let fourth_ptr = fourth_block as *mut u16;
    for i in 0..16 {
      fourth_ptr.add(i).write(i as u16);
    }
    println!("[4] Wrote 0..15 into the u16 array");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Release the first block.
    //
    //    Unlike a pure bump allocator, this marks the block FREE and makes
    //    it available to best-fit on the next allocation.
    // --------------------------------------------------------------------
    allocator.release(first_block);
    println!("\n[5] Released first_block at {:?}", first_block);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Allocate a small block (2 bytes) to see if best-fit reuses the
    //    freed block.
    // --------------------------------------------------------------------
    let fifth_block = allocator.allocate(2);
    println!("\n[6] Allocate [u8; 2] (check reuse of freed block): {:?}", fifth_block);

    println!(
      "[6] fifth_block == first_block? {}",
      if fifth_block == first_block {
        "Yes, best-fit reused the freed block"
      } else {
        "No, it was placed somewhere else"
      }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 7) Allocate a large block to observe the mmap backend take over.
    //    This does NOT move the program break at all.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");

    let big_block = allocator.allocate(256 * 1024); // 256 KiB, above the mmap threshold
    println!("\n[7] Allocate large 256 KiB block: {:?}", big_block);

    print_program_break("after large alloc (unchanged: this went to mmap)");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 8) Resize the large block down, then back up, to show shrink/grow
    //    on a mapped region relocating through fresh mappings.
    // --------------------------------------------------------------------
    let resized_down = allocator.resize(big_block, 64 * 1024);
    println!("\n[8] Resize 256 KiB block down to 64 KiB: {:?}", resized_down);
    let resized_up = allocator.resize(resized_down, 512 * 1024);
    println!("[8] Resize back up to 512 KiB: {:?}", resized_up);
    allocator.release(resized_up);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 9) End of demo.
    //
    //    Releasing an allocated block marks it FREE (break-heap) or unmaps
    //    it immediately (mmap). The OS reclaims everything else on exit.
    // --------------------------------------------------------------------
    println!("\n[9] End of example. Process will exit and the OS will reclaim all memory.");
  }
}
