//! Block header layout: every region this allocator hands out, whether
//! carved from the break-heap or freshly mapped, is preceded by one of these.

use std::mem;
use std::ptr;

/// The three states a block can be in. There is no separate free-list
/// structure; FREE blocks are identified by walking the global list and
/// filtering on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Status {
  Free,
  Allocated,
  Mapped,
}

/// In-band metadata preceding every payload. `size` counts the header plus
/// the payload, never the payload alone. `next` threads every block this
/// allocator knows about into a single process-wide list, in creation order.
///
/// There is deliberately no `prev` field: a block's only predecessor lookup
/// (releasing a MAPPED block) is a plain forward scan, not a field to
/// maintain on every link update.
#[repr(C)]
pub(crate) struct Block {
  pub size: usize,
  pub status: Status,
  pub next: *mut Block,
}

/// `size_of::<Block>()` happens to already be a multiple of 8 on every ABI
/// this crate targets, because `next`'s 8-byte alignment forces the struct's
/// total size to round up to a multiple of 8. `HEADER_SIZE` is exposed as a
/// `usize` so call sites don't sprinkle `mem::size_of::<Block>()` everywhere.
pub(crate) const HEADER_SIZE: usize = mem::size_of::<Block>();

const _: () = assert!(HEADER_SIZE % 8 == 0, "Block header must be 8-byte aligned");

impl Block {
  /// Writes a fresh header at `at`, returning the block pointer.
  ///
  /// # Safety
  /// `at` must point to at least `HEADER_SIZE` writable, properly aligned
  /// bytes that this allocator owns exclusively.
  pub(crate) unsafe fn write_at(at: *mut u8, size: usize, status: Status) -> *mut Block {
    unsafe {
      let block = at as *mut Block;
      (*block).size = size;
      (*block).status = status;
      (*block).next = ptr::null_mut();
      block
    }
  }

  /// The address of the payload immediately following this header.
  ///
  /// # Safety
  /// `block` must be a valid, non-null pointer to a live `Block`.
  pub(crate) unsafe fn payload(block: *mut Block) -> *mut u8 {
    unsafe { (block as *mut u8).add(HEADER_SIZE) }
  }

  /// Recovers the header pointer given a payload pointer previously returned
  /// by [`Block::payload`].
  ///
  /// # Safety
  /// `payload` must have been returned by this allocator and must not be
  /// null.
  pub(crate) unsafe fn from_payload(payload: *mut u8) -> *mut Block {
    unsafe { payload.sub(HEADER_SIZE) }
  }

  /// The payload capacity of this block: total size minus header size.
  ///
  /// # Safety
  /// `block` must be a valid, non-null pointer to a live `Block`.
  pub(crate) unsafe fn payload_size(block: *mut Block) -> usize {
    unsafe { (*block).size - HEADER_SIZE }
  }
}
