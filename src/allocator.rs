//! Request API: `allocate`, `release`, `zeroed_allocate`, `resize`. This is
//! where the placement engine, the backend router, and the preallocation
//! bootstrap come together behind the four operations callers actually see.

use std::ptr;
use std::ptr::NonNull;

use crate::align::round8;
use crate::backend::{
  current_break, extend_break, map_region, unmap_region, MMAP_THRESHOLD, ZEROED_MMAP_THRESHOLD,
};
use crate::block::{Block, Status, HEADER_SIZE};
use crate::error::AllocError;
use crate::placement::{best_fit, coalesce, extension_delta, is_free_tail, split};

/// A single free-list heap allocator backed by the program break and
/// anonymous `mmap`.
///
/// There is no process-wide default instance: nothing in this crate's scope
/// calls for a free-function surface, so construct one and keep it wherever
/// it makes sense for the caller (a `static` behind a `Mutex` if shared
/// across threads is ever needed, though this allocator itself does no
/// internal synchronization).
pub struct Allocator {
  head: *mut Block,
  tail: *mut Block,
  prealloc: bool,
}

impl Default for Allocator {
  fn default() -> Self {
    Self::new()
  }
}

impl Allocator {
  /// Creates an empty allocator. No break or mapping calls happen until the
  /// first allocation.
  pub fn new() -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      prealloc: false,
    }
  }

  /// Returns a pointer to at least `size` writable, 8-byte-aligned bytes, or
  /// null on `size == 0` or OS failure.
  pub fn allocate(&mut self, size: usize) -> *mut u8 {
    match self.try_allocate(size) {
      Ok(p) => p.as_ptr(),
      Err(_) => ptr::null_mut(),
    }
  }

  /// Releases the block whose header immediately precedes `ptr`. A no-op on
  /// null. Undefined behavior on a double release or a foreign pointer, as
  /// with any allocator of this shape.
  pub fn release(&mut self, ptr: *mut u8) {
    if ptr.is_null() {
      return;
    }
    unsafe {
      let block = Block::from_payload(ptr);
      self.release_block(block);
    }
  }

  /// Returns a zero-filled region of `n * size` bytes, or null if either is
  /// zero or the OS declines.
  pub fn zeroed_allocate(&mut self, n: usize, size: usize) -> *mut u8 {
    match self.try_zeroed_allocate(n, size) {
      Ok(p) => p.as_ptr(),
      Err(_) => ptr::null_mut(),
    }
  }

  /// Resizes the block at `ptr` to hold `size` bytes, following the policy
  /// table in the design notes: shrink-in-place, expand-in-place,
  /// coalesce-with-neighbor, or relocate-and-copy, depending on the
  /// existing block's status and backend.
  pub fn resize(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
    match self.try_resize(ptr, size) {
      Ok(p) => p,
      Err(_) => ptr::null_mut(),
    }
  }

  fn try_allocate(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSizedRequest);
    }
    let total = round8(size + HEADER_SIZE);
    self.place(total, MMAP_THRESHOLD)
  }

  fn try_zeroed_allocate(&mut self, n: usize, size: usize) -> Result<NonNull<u8>, AllocError> {
    if n == 0 || size == 0 {
      return Err(AllocError::ZeroSizedRequest);
    }
    let payload_size = n * size;
    let total = round8(payload_size + HEADER_SIZE);
    let payload = self.place(total, ZEROED_MMAP_THRESHOLD)?;
    unsafe {
      ptr::write_bytes(payload.as_ptr(), 0, payload_size);
    }
    Ok(payload)
  }

  /// The shared body of `allocate` and `zeroed_allocate`: coalesce, then
  /// best-fit, then last-block extension, then hand off to the backend
  /// router. `threshold` is the mmap-vs-heap cutoff for a freshly created
  /// block; it does not affect the bootstrap reservation size, which is
  /// always [`MMAP_THRESHOLD`].
  fn place(&mut self, total: usize, threshold: usize) -> Result<NonNull<u8>, AllocError> {
    if !self.head.is_null() {
      unsafe { coalesce(self.head) };
    }

    // A request at or above the caller's threshold always becomes a MAPPED
    // block, regardless of what the break-heap free list currently holds:
    // placement and last-block extension are break-heap concerns only.
    // `threshold` is `MMAP_THRESHOLD` for `allocate` but `ZEROED_MMAP_THRESHOLD`
    // for `zeroed_allocate`, so this gate must honor the parameter, not the
    // `allocate`-specific constant.
    if total < threshold {
      let found = unsafe { best_fit(self.head, total) };
      if !found.is_null() {
        unsafe {
          self.split_updating_tail(found, total);
          (*found).status = Status::Allocated;
          return Ok(NonNull::new_unchecked(Block::payload(found)));
        }
      }

      if !self.tail.is_null() && unsafe { is_free_tail(self.tail) } {
        let tail = self.tail;
        unsafe {
          let delta = extension_delta((*tail).size, total);
          extend_break(delta)?;
          (*tail).size = total;
          (*tail).status = Status::Allocated;
          #[cfg(feature = "logging")]
          log::trace!("extended free tail in place to {total} bytes");
          return Ok(NonNull::new_unchecked(Block::payload(tail)));
        }
      }
    }

    self.create_block(total, threshold)
  }

  fn try_resize(&mut self, ptr: *mut u8, size: usize) -> Result<*mut u8, AllocError> {
    if size == 0 {
      self.release(ptr);
      return Ok(ptr::null_mut());
    }
    if ptr.is_null() {
      return self.try_allocate(size).map(NonNull::as_ptr);
    }

    let old = unsafe { Block::from_payload(ptr) };
    if unsafe { (*old).status } == Status::Free {
      return Err(AllocError::InvalidPointer);
    }

    let new_total = round8(size + HEADER_SIZE);
    let old_size = unsafe { (*old).size };
    if old_size == new_total {
      return Ok(ptr);
    }

    if !self.head.is_null() {
      unsafe { coalesce(self.head) };
    }

    let old_status = unsafe { (*old).status };
    if old_status == Status::Mapped {
      return if old_size > new_total {
        self.shrink_mapped(old, new_total, size)
      } else {
        self.grow_mapped(old, new_total, size)
      };
    }

    if old_size > new_total {
      unsafe {
        self.split_updating_tail(old, new_total);
        (*old).status = Status::Allocated;
      }
      return Ok(ptr);
    }

    self.grow_heap(old, ptr, new_total, size)
  }

  fn grow_heap(
    &mut self,
    old: *mut Block,
    ptr: *mut u8,
    new_total: usize,
    size: usize,
  ) -> Result<*mut u8, AllocError> {
    let next = unsafe { (*old).next };

    if next.is_null() {
      let old_size = unsafe { (*old).size };
      let delta = extension_delta(old_size, new_total);
      unsafe {
        extend_break(delta)?;
        (*old).size = new_total;
      }
      return Ok(ptr);
    }

    if unsafe { (*next).status } == Status::Free {
      let combined = unsafe { (*old).size + (*next).size };
      if combined >= new_total {
        unsafe {
          (*old).size = combined;
          (*old).next = (*next).next;
        }
        if self.tail == next {
          self.tail = old;
        }
        return Ok(ptr);
      }
    }

    self.grow_heap_relocate(old, new_total, size)
  }

  /// "Try best-fit; else try last-FREE-block extension; else create new
  /// block; copy and release old." Shared by the two heap-grow cases that
  /// can't expand in place.
  fn grow_heap_relocate(
    &mut self,
    old: *mut Block,
    new_total: usize,
    size: usize,
  ) -> Result<*mut u8, AllocError> {
    unsafe {
      let found = if new_total < MMAP_THRESHOLD {
        best_fit(self.head, new_total)
      } else {
        ptr::null_mut()
      };
      if !found.is_null() {
        self.split_updating_tail(found, new_total);
        (*found).status = Status::Allocated;
        let new_payload = Block::payload(found);
        self.relocate(old, new_payload, size);
        return Ok(new_payload);
      }

      let last_free = self.last_free_heap_tail();
      if !last_free.is_null() && new_total < MMAP_THRESHOLD {
        let delta = extension_delta((*last_free).size, new_total);
        extend_break(delta)?;
        (*last_free).size = new_total;
        (*last_free).status = Status::Allocated;
        let new_payload = Block::payload(last_free);
        self.relocate(old, new_payload, size);
        return Ok(new_payload);
      }

      let new_payload = self.create_block(new_total, MMAP_THRESHOLD)?;
      self.relocate(old, new_payload.as_ptr(), size);
      Ok(new_payload.as_ptr())
    }
  }

  fn shrink_mapped(
    &mut self,
    old: *mut Block,
    new_total: usize,
    size: usize,
  ) -> Result<*mut u8, AllocError> {
    unsafe {
      let found = if new_total < MMAP_THRESHOLD {
        best_fit(self.head, new_total)
      } else {
        ptr::null_mut()
      };
      let new_payload = if !found.is_null() {
        self.split_updating_tail(found, new_total);
        (*found).status = Status::Allocated;
        Block::payload(found)
      } else {
        self.create_block(new_total, MMAP_THRESHOLD)?.as_ptr()
      };
      self.relocate(old, new_payload, size);
      Ok(new_payload)
    }
  }

  fn grow_mapped(
    &mut self,
    old: *mut Block,
    new_total: usize,
    size: usize,
  ) -> Result<*mut u8, AllocError> {
    unsafe {
      let new_payload = self.create_block(new_total, MMAP_THRESHOLD)?;
      self.relocate(old, new_payload.as_ptr(), size);
      Ok(new_payload.as_ptr())
    }
  }

  /// Copies `min(size, old payload size)` bytes from `old`'s payload into
  /// `new_payload`, then releases `old`. Never reads past the end of the
  /// old payload.
  ///
  /// # Safety
  /// `old` must be a valid block and `new_payload` must point to at least
  /// that many writable bytes, disjoint from `old`'s payload.
  unsafe fn relocate(&mut self, old: *mut Block, new_payload: *mut u8, size: usize) {
    unsafe {
      let copy_len = size.min(Block::payload_size(old));
      ptr::copy_nonoverlapping(Block::payload(old), new_payload, copy_len);
      self.release_block(old);
    }
  }

  /// Creates a brand-new block via the backend router: mmap at or above
  /// `threshold`, otherwise the break-heap (firing the bootstrap on the
  /// first such request).
  fn create_block(&mut self, total: usize, threshold: usize) -> Result<NonNull<u8>, AllocError> {
    unsafe {
      if total >= threshold {
        let addr = map_region(total)?;
        let block = Block::write_at(addr, total, Status::Mapped);
        self.append(block);
        return Ok(NonNull::new_unchecked(Block::payload(block)));
      }

      if !self.prealloc {
        let base = extend_break(MMAP_THRESHOLD)?;
        let block = Block::write_at(base, MMAP_THRESHOLD, Status::Allocated);
        self.append(block);
        self.split_updating_tail(block, total);
        self.prealloc = true;
        #[cfg(feature = "logging")]
        log::debug!("bootstrap reserved {MMAP_THRESHOLD} bytes for the break-heap");
        return Ok(NonNull::new_unchecked(Block::payload(block)));
      }

      let base = extend_break(total)?;
      let block = Block::write_at(base, total, Status::Allocated);
      self.append(block);
      Ok(NonNull::new_unchecked(Block::payload(block)))
    }
  }

  /// Releases `block`: unmaps and unlinks a MAPPED block, or marks a
  /// break-heap block FREE with no immediate coalesce (deferred to the next
  /// allocate/resize).
  unsafe fn release_block(&mut self, block: *mut Block) {
    unsafe {
      if (*block).status == Status::Mapped {
        let total = (*block).size;
        let predecessor = self.find_predecessor(block);
        if predecessor.is_null() {
          self.head = (*block).next;
        } else {
          (*predecessor).next = (*block).next;
        }
        if self.tail == block {
          self.tail = predecessor;
        }
        unmap_region(block as *mut u8, total);
      } else {
        (*block).status = Status::Free;
      }
    }
  }

  /// Finds the predecessor of `target` in the list by forward scan. Returns
  /// null if `target` is the head (or isn't present).
  unsafe fn find_predecessor(&self, target: *mut Block) -> *mut Block {
    unsafe {
      let mut current = self.head;
      while !current.is_null() {
        if (*current).next == target {
          return current;
        }
        current = (*current).next;
      }
      ptr::null_mut()
    }
  }

  /// The last FREE block in the list, provided every entry after it (if
  /// any) is MAPPED — i.e. it is the final break-heap block, even if mapped
  /// regions were appended after it. Returns null if no such block exists.
  unsafe fn last_free_heap_tail(&self) -> *mut Block {
    unsafe {
      let mut current = self.head;
      let mut last_free: *mut Block = ptr::null_mut();
      while !current.is_null() {
        if (*current).status == Status::Free {
          last_free = current;
        }
        current = (*current).next;
      }

      if last_free.is_null() {
        return ptr::null_mut();
      }

      let mut trailing = (*last_free).next;
      while !trailing.is_null() {
        if (*trailing).status != Status::Mapped {
          return ptr::null_mut();
        }
        trailing = (*trailing).next;
      }

      last_free
    }
  }

  /// Appends a freshly created (unlinked) block as the new tail.
  unsafe fn append(&mut self, block: *mut Block) {
    unsafe {
      if self.head.is_null() {
        self.head = block;
      } else {
        (*self.tail).next = block;
      }
      self.tail = block;
    }
  }

  /// Splits `block` down to `total`, fixing up `self.tail` if `block` was
  /// the list's tail and the split actually produced a trailing remainder.
  unsafe fn split_updating_tail(&mut self, block: *mut Block, total: usize) {
    unsafe {
      let was_tail = self.tail == block;
      split(block, total);
      if was_tail {
        let next = (*block).next;
        if !next.is_null() {
          self.tail = next;
        }
      }
    }
  }

  /// The current program break, exposed for diagnostics and tests.
  #[cfg(test)]
  pub(crate) fn program_break() -> *mut u8 {
    current_break()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::HEADER_SIZE;

  fn is_aligned(ptr: *mut u8) -> bool {
    (ptr as usize) % 8 == 0
  }

  #[test]
  fn allocate_zero_returns_null() {
    let mut a = Allocator::new();
    assert!(a.allocate(0).is_null());
  }

  #[test]
  fn zeroed_allocate_rejects_zero_count_or_size() {
    let mut a = Allocator::new();
    assert!(a.zeroed_allocate(0, 16).is_null());
    assert!(a.zeroed_allocate(10, 0).is_null());
  }

  #[test]
  fn release_null_is_a_noop() {
    let mut a = Allocator::new();
    a.release(ptr::null_mut());
  }

  #[test]
  fn first_small_allocation_is_aligned_and_writable() {
    let mut a = Allocator::new();
    let p = a.allocate(100) as *mut u64;
    assert!(!p.is_null());
    assert!(is_aligned(p as *mut u8));
    unsafe {
      p.write(0xDEAD_BEEF_DEAD_BEEF);
      assert_eq!(0xDEAD_BEEF_DEAD_BEEF, p.read());
    }
  }

  #[test]
  fn large_allocation_is_writable_end_to_end() {
    let mut a = Allocator::new();
    let n = 200_000;
    let p = a.allocate(n);
    assert!(!p.is_null());
    unsafe {
      ptr::write_bytes(p, 0xAB, n);
      for i in 0..n {
        assert_eq!(0xAB, *p.add(i));
      }
    }
    a.release(p);
  }

  #[test]
  fn zeroed_allocate_zero_fills_the_whole_region() {
    let mut a = Allocator::new();
    let p = a.zeroed_allocate(10, 16);
    assert!(!p.is_null());
    unsafe {
      for i in 0..160 {
        assert_eq!(0, *p.add(i));
      }
    }
  }

  #[test]
  fn allocate_then_release_then_allocate_reuses_the_freed_block() {
    let mut a = Allocator::new();
    let p1 = a.allocate(64);
    assert!(!p1.is_null());
    a.release(p1);
    let p2 = a.allocate(32);
    assert!(!p2.is_null());
    assert_eq!(p1, p2);
  }

  #[test]
  fn resize_to_same_payload_size_is_a_noop_shortcut() {
    let mut a = Allocator::new();
    let p = a.allocate(100);
    assert!(!p.is_null());
    let q = a.resize(p, 100);
    assert_eq!(p, q);
  }

  #[test]
  fn resize_shrink_preserves_prefix_bytes() {
    let mut a = Allocator::new();
    let p = a.allocate(100) as *mut u8;
    unsafe {
      ptr::write_bytes(p, 0x42, 100);
    }
    let q = a.resize(p, 50);
    assert_eq!(p, q);
    unsafe {
      for i in 0..50 {
        assert_eq!(0x42, *q.add(i));
      }
    }
  }

  #[test]
  fn resize_grow_preserves_prefix_bytes_even_when_relocated() {
    let mut a = Allocator::new();
    let p = a.allocate(100);
    assert!(!p.is_null());
    unsafe {
      ptr::write_bytes(p, 0x7A, 100);
    }
    let q = a.resize(p, 100_000);
    assert!(!q.is_null());
    unsafe {
      for i in 0..100 {
        assert_eq!(0x7A, *q.add(i));
      }
    }
  }

  #[test]
  fn resize_null_delegates_to_allocate() {
    let mut a = Allocator::new();
    let p = a.resize(ptr::null_mut(), 40);
    assert!(!p.is_null());
  }

  #[test]
  fn resize_to_zero_delegates_to_release_and_returns_null() {
    let mut a = Allocator::new();
    let p = a.allocate(40);
    assert!(!p.is_null());
    let q = a.resize(p, 0);
    assert!(q.is_null());
  }

  #[test]
  fn resize_of_a_released_block_returns_null() {
    let mut a = Allocator::new();
    let p = a.allocate(40);
    a.release(p);
    let q = a.resize(p, 80);
    assert!(q.is_null());
  }

  #[test]
  fn resize_resize_preserves_the_common_prefix() {
    let mut a = Allocator::new();
    let p = a.allocate(200) as *mut u8;
    unsafe {
      for i in 0..200 {
        *p.add(i) = (i % 256) as u8;
      }
    }
    let q = a.resize(p as *mut u8, 80);
    let r = a.resize(q, 150);
    unsafe {
      for i in 0..80 {
        assert_eq!((i % 256) as u8, *r.add(i));
      }
    }
  }

  #[test]
  fn large_allocation_is_mapped_regardless_of_existing_free_heap_blocks() {
    let mut a = Allocator::new();
    let small = a.allocate(16);
    assert!(!small.is_null());
    a.release(small);

    let big = a.allocate(200_000);
    assert!(!big.is_null());
    assert_ne!(small, big);
    a.release(big);
  }

  #[test]
  fn release_of_mapped_block_unmaps_without_touching_heap_list() {
    let mut a = Allocator::new();
    let p1 = a.allocate(64);
    let mapped = a.allocate(200_000);
    assert!(!mapped.is_null());
    a.release(mapped);

    let p2 = a.allocate(32);
    assert!(!p2.is_null());
    assert_eq!(p1, p2);
  }

  #[test]
  fn zeroed_allocate_between_the_two_thresholds_still_routes_to_mmap() {
    // Bootstrap leaves a large trailing FREE break-heap block (~128 KiB), so
    // a naive gate that checks `total < MMAP_THRESHOLD` instead of the
    // `ZEROED_MMAP_THRESHOLD` passed into `place` would wrongly carve this
    // request out of that FREE block instead of mapping it.
    let mut a = Allocator::new();
    let small = a.allocate(16);
    assert!(!small.is_null());

    let n = 5000;
    let p = a.zeroed_allocate(n, 1);
    assert!(!p.is_null());
    assert!(total_for(n, 1) >= crate::backend::ZEROED_MMAP_THRESHOLD);
    assert!(total_for(n, 1) < crate::backend::MMAP_THRESHOLD);

    unsafe {
      let block = Block::from_payload(p);
      assert_eq!(Status::Mapped, (*block).status);
    }
  }

  fn total_for(n: usize, size: usize) -> usize {
    round8(n * size + HEADER_SIZE)
  }

  #[test]
  fn header_size_is_nonzero_and_eight_aligned() {
    assert!(HEADER_SIZE > 0);
    assert_eq!(0, HEADER_SIZE % 8);
  }
}
