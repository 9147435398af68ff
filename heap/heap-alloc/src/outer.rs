use crate::MemoryError;
use core::ptr::NonNull;
use heap_layout::WORD_SIZE;
use std::alloc::Layout;

/// Upstream source of trusted regions.
///
/// An allocator borrows its outer allocator for its whole lifetime but
/// talks to it exactly twice: once to obtain the region at construction
/// and once to return it at destruction.
pub trait OuterAllocator {
    /// Hand out `size` bytes, aligned at least to the word size.
    ///
    /// # Errors
    /// [`MemoryError::OutOfMemory`] when the source cannot provide them.
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, MemoryError>;

    /// Take back a block previously handed out by [`allocate`](Self::allocate).
    /// Implementations must identify the block by its address alone.
    fn deallocate(&self, ptr: NonNull<u8>);
}

/// Obtain a trusted region from `outer`, or from the operating system's
/// general allocator when no outer allocator is given.
pub(crate) fn acquire(
    total: usize,
    outer: Option<&dyn OuterAllocator>,
) -> Result<NonNull<u8>, MemoryError> {
    match outer {
        Some(outer) => outer.allocate(total),
        None => {
            let Ok(layout) = Layout::from_size_align(total, WORD_SIZE) else {
                return Err(MemoryError::OutOfMemory { requested: total });
            };
            // SAFETY: constructors reject capacities below one free
            // header, so the layout is never zero-sized.
            let ptr = unsafe { std::alloc::alloc(layout) };
            NonNull::new(ptr).ok_or(MemoryError::OutOfMemory { requested: total })
        }
    }
}

/// Return a region obtained through [`acquire`].
///
/// # Safety
/// `ptr` and `total` must describe a region previously produced by
/// [`acquire`] with the same `outer` choice, and no accesses into the
/// region may happen afterwards.
pub(crate) unsafe fn release(ptr: NonNull<u8>, total: usize, outer: Option<&dyn OuterAllocator>) {
    match outer {
        Some(outer) => outer.deallocate(ptr),
        None => {
            let Ok(layout) = Layout::from_size_align(total, WORD_SIZE) else {
                return;
            };
            // SAFETY: the allocation was made with exactly this layout.
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}
