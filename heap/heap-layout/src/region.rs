use crate::payload_offset::{decode_link, encode_link};
use crate::{ALLOCATOR_HEADER_SIZE, FitMode, PayloadOffset, WORD_SIZE};
use core::ptr::NonNull;

const MEMORY_SIZE_OFFSET: usize = 0;
const OUTER_HANDLE_OFFSET: usize = WORD_SIZE;
const LOGGER_HANDLE_OFFSET: usize = 2 * WORD_SIZE;
const FIT_MODE_OFFSET: usize = 3 * WORD_SIZE;
const FREE_HEAD_OFFSET: usize = 4 * WORD_SIZE;

/// Non-owning view of one trusted region.
///
/// The view carries nothing but the base pointer; everything else the
/// allocator needs to know about the region is stored in the region's own
/// header and read back on demand. Words are accessed with native-endian
/// unaligned loads and stores, since a block header may start at any byte
/// offset the split logic produced.
///
/// # Invariants
/// - The header fields live at fixed word offsets from the base, in the
///   order `memory_size`, outer handle, logger handle, fit mode, free head.
/// - Block offsets are payload-relative; the payload starts
///   [`ALLOCATOR_HEADER_SIZE`] bytes past the base.
#[derive(Copy, Clone, Debug)]
pub struct RegionView {
    base: NonNull<u8>,
}

impl RegionView {
    /// Wrap the base pointer of a trusted region.
    ///
    /// # Safety
    /// - `base` must point to an allocation of at least
    ///   [`ALLOCATOR_HEADER_SIZE`] plus the payload size the header
    ///   describes (or is about to describe), valid for reads and writes.
    /// - The allocation must be accessed exclusively through views of this
    ///   region for as long as any of them is in use.
    #[inline]
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> NonNull<u8> {
        self.base
    }

    pub(crate) unsafe fn read_word(self, at: usize) -> usize {
        unsafe { self.base.as_ptr().add(at).cast::<usize>().read_unaligned() }
    }

    pub(crate) unsafe fn write_word(self, at: usize, value: usize) {
        unsafe {
            self.base
                .as_ptr()
                .add(at)
                .cast::<usize>()
                .write_unaligned(value);
        }
    }

    /// Payload capacity of the region in bytes.
    #[inline]
    #[must_use]
    pub fn memory_size(self) -> usize {
        unsafe { self.read_word(MEMORY_SIZE_OFFSET) }
    }

    #[inline]
    pub fn set_memory_size(self, size: usize) {
        unsafe { self.write_word(MEMORY_SIZE_OFFSET, size) }
    }

    /// Opaque address of the outer allocator, for diagnostics. Zero when
    /// the region came from the operating system.
    #[inline]
    #[must_use]
    pub fn outer_handle(self) -> usize {
        unsafe { self.read_word(OUTER_HANDLE_OFFSET) }
    }

    #[inline]
    pub fn set_outer_handle(self, handle: usize) {
        unsafe { self.write_word(OUTER_HANDLE_OFFSET, handle) }
    }

    /// Opaque address of the attached logger, for diagnostics. Zero when
    /// no logger is attached.
    #[inline]
    #[must_use]
    pub fn logger_handle(self) -> usize {
        unsafe { self.read_word(LOGGER_HANDLE_OFFSET) }
    }

    #[inline]
    pub fn set_logger_handle(self, handle: usize) {
        unsafe { self.write_word(LOGGER_HANDLE_OFFSET, handle) }
    }

    #[inline]
    #[must_use]
    pub fn mode(self) -> FitMode {
        FitMode::from_word(unsafe { self.read_word(FIT_MODE_OFFSET) })
    }

    #[inline]
    pub fn set_mode(self, mode: FitMode) {
        unsafe { self.write_word(FIT_MODE_OFFSET, mode.into_word()) }
    }

    /// Offset of the first free block, or `None` when the payload is fully
    /// occupied.
    #[inline]
    #[must_use]
    pub fn free_head(self) -> Option<PayloadOffset> {
        decode_link(unsafe { self.read_word(FREE_HEAD_OFFSET) })
    }

    #[inline]
    pub fn set_free_head(self, head: Option<PayloadOffset>) {
        unsafe { self.write_word(FREE_HEAD_OFFSET, encode_link(head)) }
    }

    /// Raw pointer to a payload byte. Computing the pointer is always
    /// fine; dereferencing it is only sound while `offset` lies inside the
    /// payload of a live region.
    #[inline]
    #[must_use]
    pub fn payload_ptr(self, offset: PayloadOffset) -> *mut u8 {
        self.base
            .as_ptr()
            .wrapping_add(ALLOCATOR_HEADER_SIZE + offset.as_usize())
    }
}
