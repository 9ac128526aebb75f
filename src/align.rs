//! Alignment discipline: every size this allocator tracks, and every address
//! it hands back to a caller, sits on an 8-byte boundary.

/// The allocator's fixed alignment. Every block footprint and every payload
/// address is a multiple of this.
pub(crate) const ALIGNMENT: usize = 8;

/// Rounds `value` up to the next multiple of [`ALIGNMENT`].
pub(crate) fn round8(value: usize) -> usize {
  (value + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}
