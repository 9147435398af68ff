use crate::payload_offset::{decode_link, encode_link};
use crate::{ALLOCATOR_HEADER_SIZE, PayloadOffset, RegionView, WORD_SIZE};
use bitfield_struct::bitfield;

/// Size word of a block in the tagged layout.
///
/// The low bit carries the allocation status; block sizes are kept even so
/// the bit is free to steal. The remaining 63 bits store the size in
/// two-byte units, which makes odd sizes unrepresentable rather than a
/// masking convention.
#[bitfield(u64)]
pub struct TaggedSize {
    /// Allocation status (bit 0). Set on occupied blocks, clear on free
    /// ones; a free block's word therefore equals its plain size.
    pub allocated: bool,
    #[bits(63)]
    half_size: u64,
}

impl TaggedSize {
    /// Pack an (even) block size and an allocation status into one word.
    #[inline]
    #[must_use]
    pub const fn from_parts(size: usize, allocated: bool) -> Self {
        debug_assert!(size % 2 == 0, "tagged block sizes must be even");
        Self::new()
            .with_half_size((size as u64) >> 1)
            .with_allocated(allocated)
    }

    /// Block size in bytes, header words included.
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        (self.half_size() << 1) as usize
    }
}

/// Block-level accessors.
///
/// All of these are offset arithmetic with no validation: `block` must be
/// the payload-relative base of a block that actually exists in the region,
/// or the access reads and writes bytes that belong to someone else.
impl RegionView {
    unsafe fn block_word(self, block: PayloadOffset, field: usize) -> usize {
        unsafe { self.read_word(ALLOCATOR_HEADER_SIZE + block.as_usize() + field) }
    }

    unsafe fn set_block_word(self, block: PayloadOffset, field: usize, value: usize) {
        unsafe { self.write_word(ALLOCATOR_HEADER_SIZE + block.as_usize() + field, value) }
    }

    /// Size of the free block at `block`, header words included.
    ///
    /// # Safety
    /// `block` must be the base of a free block inside the payload.
    #[must_use]
    pub unsafe fn free_block_size(self, block: PayloadOffset) -> usize {
        unsafe { self.block_word(block, 0) }
    }

    /// # Safety
    /// `block` must be the base of a block inside the payload with at least
    /// [`crate::FREE_HEADER_SIZE`] bytes available for the header.
    pub unsafe fn set_free_block_size(self, block: PayloadOffset, size: usize) {
        unsafe { self.set_block_word(block, 0, size) }
    }

    /// Link to the next free block, or `None` at the end of the list.
    ///
    /// # Safety
    /// `block` must be the base of a free block inside the payload.
    #[must_use]
    pub unsafe fn free_block_next(self, block: PayloadOffset) -> Option<PayloadOffset> {
        decode_link(unsafe { self.block_word(block, WORD_SIZE) })
    }

    /// # Safety
    /// `block` must be the base of a free block inside the payload.
    pub unsafe fn set_free_block_next(self, block: PayloadOffset, next: Option<PayloadOffset>) {
        unsafe { self.set_block_word(block, WORD_SIZE, encode_link(next)) }
    }

    /// Size of the occupied block at `block` in the plain layout.
    ///
    /// # Safety
    /// `block` must be the base of an occupied block inside the payload.
    #[must_use]
    pub unsafe fn occupied_block_size(self, block: PayloadOffset) -> usize {
        unsafe { self.block_word(block, 0) }
    }

    /// # Safety
    /// `block` must be the base of an occupied block inside the payload.
    pub unsafe fn set_occupied_block_size(self, block: PayloadOffset, size: usize) {
        unsafe { self.set_block_word(block, 0, size) }
    }

    /// Tagged size word of the block at `block`.
    ///
    /// # Safety
    /// `block` must be the base of a block inside the payload of a region
    /// using the tagged layout.
    #[must_use]
    pub unsafe fn tagged_size(self, block: PayloadOffset) -> TaggedSize {
        TaggedSize::from_bits(unsafe { self.block_word(block, 0) } as u64)
    }

    /// # Safety
    /// `block` must be the base of a block inside the payload of a region
    /// using the tagged layout.
    pub unsafe fn set_tagged_size(self, block: PayloadOffset, word: TaggedSize) {
        unsafe { self.set_block_word(block, 0, word.into_bits() as usize) }
    }
}
