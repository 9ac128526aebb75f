//! Backend router: the OS-primitive seam between the placement engine and
//! the two real allocation sources the kernel offers a user-space process —
//! the program break and anonymous `mmap`. Nothing above this module touches
//! `libc` directly.

use std::ptr;

use libc::{c_void, intptr_t, sbrk};

use crate::error::AllocError;

/// A request whose total footprint is strictly below this is served from the
/// break-heap; at or above it, from an anonymous mapping.
pub(crate) const MMAP_THRESHOLD: usize = 128 * 1024;

/// `zeroed_allocate` prefers the mapping backend sooner than `allocate`,
/// because mapped pages come pre-zeroed from the kernel.
pub(crate) const ZEROED_MMAP_THRESHOLD: usize = 4096;

/// Advances the program break by `total` bytes and returns the *old* break —
/// the base address of the newly reserved region.
///
/// # Safety
/// The caller must not race this allocator's own break adjustments with any
/// other code that also moves the break.
pub(crate) unsafe fn extend_break(total: usize) -> Result<*mut u8, AllocError> {
  unsafe {
    let old_break = sbrk(total as intptr_t);
    if old_break == usize::MAX as *mut c_void {
      return Err(AllocError::OsPrimitiveFailed { primitive: "sbrk" });
    }
    #[cfg(feature = "logging")]
    log::trace!("sbrk extended the break by {total} bytes at {old_break:?}");
    Ok(old_break as *mut u8)
  }
}

/// Reads the current program break without moving it.
pub(crate) fn current_break() -> *mut u8 {
  unsafe { sbrk(0) as *mut u8 }
}

/// Reserves `total` bytes of anonymous, zero-filled, read/write, private
/// memory.
///
/// # Safety
/// `total` must be non-zero.
pub(crate) unsafe fn map_region(total: usize) -> Result<*mut u8, AllocError> {
  unsafe {
    let addr = libc::mmap(
      ptr::null_mut(),
      total,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
      -1,
      0,
    );
    if addr == libc::MAP_FAILED {
      return Err(AllocError::OsPrimitiveFailed { primitive: "mmap" });
    }
    #[cfg(feature = "logging")]
    log::debug!("mmap reserved {total} bytes at {addr:?}");
    Ok(addr as *mut u8)
  }
}

/// Releases an exact, previously mapped region.
///
/// # Safety
/// `(addr, total)` must be exactly a region previously returned by
/// [`map_region`] and not already released.
pub(crate) unsafe fn unmap_region(addr: *mut u8, total: usize) {
  unsafe {
    libc::munmap(addr as *mut c_void, total);
    #[cfg(feature = "logging")]
    log::debug!("munmap released {total} bytes at {addr:?}");
  }
}
