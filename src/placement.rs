//! Placement engine: best-fit search, splitting, coalescing, and the
//! last-block extension that avoids fragmenting the tail of the break-heap.
//!
//! Every function here walks or mutates the raw intrusive list rooted at a
//! caller-supplied head pointer. None of them touch the OS; they only
//! rearrange headers already present in memory the allocator owns.

use std::ptr;

use crate::align::round8;
use crate::block::{Block, Status, HEADER_SIZE};

/// Walks the list starting at `head`, considering only FREE blocks whose
/// size is at least `total`, and returns the smallest such block (earliest
/// wins on a tie). Returns null if none qualifies.
///
/// # Safety
/// `head` must be null or a valid pointer into a well-formed block list.
pub(crate) unsafe fn best_fit(head: *mut Block, total: usize) -> *mut Block {
  unsafe {
    let mut current = head;
    let mut best: *mut Block = ptr::null_mut();

    while !current.is_null() {
      if (*current).status == Status::Free && (*current).size >= total {
        if best.is_null() || (*current).size < (*best).size {
          best = current;
        }
      }
      current = (*current).next;
    }

    best
  }
}

/// Carves a FREE block down to exactly `total` bytes if the remainder would
/// leave room for another header; otherwise consumes the whole block. The
/// caller is responsible for marking `block` ALLOCATED afterward.
///
/// # Safety
/// `block` must be a valid, non-null pointer to a block whose `size >=
/// total`, and whose trailing bytes (if split) are owned exclusively by this
/// allocator.
pub(crate) unsafe fn split(block: *mut Block, total: usize) {
  unsafe {
    let remainder = (*block).size - total;
    if remainder <= HEADER_SIZE {
      return;
    }

    let new_header_addr = (block as *mut u8).add(total);
    let new_block = Block::write_at(new_header_addr, remainder, Status::Free);
    (*new_block).next = (*block).next;
    (*block).next = new_block;
    (*block).size = total;
  }
}

/// Forward-only single pass: whenever two adjacent entries are both FREE,
/// the second is absorbed into the first and the scan continues at the
/// merged node. MAPPED blocks are never coalesced; the scan treats them as
/// non-free.
///
/// # Safety
/// `head` must be null or a valid pointer into a well-formed block list.
pub(crate) unsafe fn coalesce(head: *mut Block) {
  unsafe {
    if head.is_null() {
      return;
    }

    let mut current = head;
    while !(*current).next.is_null() {
      let next = (*current).next;
      if (*current).status == Status::Free && (*next).status == Status::Free {
        (*current).size += (*next).size;
        (*current).next = (*next).next;
      } else {
        current = next;
      }
    }
  }
}

/// Whether `block` is both FREE and has no successor (i.e. it is the tail of
/// the list).
///
/// # Safety
/// `block` must be a valid, non-null pointer to a live block.
pub(crate) unsafe fn is_free_tail(block: *mut Block) -> bool {
  unsafe { (*block).status == Status::Free && (*block).next.is_null() }
}

/// Computes the 8-byte-aligned break delta needed to grow `current_size` up
/// to `target_size`. Never negative in the cases this allocator calls it
/// from (`target_size > current_size` is a precondition).
pub(crate) fn extension_delta(current_size: usize, target_size: usize) -> usize {
  round8(target_size - current_size)
}
