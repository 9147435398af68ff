use crate::allocator::{Allocator, BlockRecord, BlockStatus, emit, format_state};
use crate::{MemoryError, OuterAllocator, coalesce, free_list, outer};
use core::ptr::NonNull;
use heap_layout::{
    ALLOCATOR_HEADER_SIZE, FREE_HEADER_SIZE, FitMode, OCCUPIED_HEADER_SIZE, PayloadOffset,
    RegionView, WORD_SIZE,
};
use heap_logger::{Logger, Severity};

const TYPENAME: &str = "SortedListAllocator";

/// Fit allocator with an address-sorted free list.
///
/// Occupied blocks carry a plain size word. Deallocation finds the freed
/// block's place in the sorted list and merges across shared boundaries
/// with its list neighbors, so the list order doubles as the physical
/// order and the state dump can tell free from occupied by walking both
/// in step.
///
/// The allocator borrows its collaborators for its whole lifetime: the
/// outer allocator (absent means the operating system) provides the
/// trusted region, the logger (absent means silence) receives the guard
/// and diagnostic messages.
pub struct SortedListAllocator<'a> {
    region: RegionView,
    outer: Option<&'a dyn OuterAllocator>,
    logger: Option<&'a Logger>,
}

impl core::fmt::Debug for SortedListAllocator<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct(TYPENAME)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl<'a> SortedListAllocator<'a> {
    /// Obtain a trusted region of `memory_size` payload bytes and set it
    /// up as one single free block.
    ///
    /// # Errors
    /// [`MemoryError::RegionTooSmall`] when `memory_size` cannot hold one
    /// free-block header; [`MemoryError::OutOfMemory`] when the region
    /// itself cannot be obtained.
    pub fn new(
        memory_size: usize,
        outer: Option<&'a dyn OuterAllocator>,
        logger: Option<&'a Logger>,
        mode: FitMode,
    ) -> Result<Self, MemoryError> {
        emit(
            logger,
            Severity::Trace,
            &format!("{TYPENAME} construction started"),
        );
        emit(
            logger,
            Severity::Debug,
            &format!("requested memory size: {memory_size} bytes"),
        );

        if memory_size < FREE_HEADER_SIZE {
            let error = MemoryError::RegionTooSmall {
                requested: memory_size,
                minimum: FREE_HEADER_SIZE,
            };
            emit(logger, Severity::Error, &error.to_string());
            return Err(error);
        }

        let total = memory_size
            .checked_add(ALLOCATOR_HEADER_SIZE)
            .ok_or(MemoryError::OutOfMemory {
                requested: memory_size,
            })?;
        let base = outer::acquire(total, outer).inspect_err(|error| {
            emit(logger, Severity::Error, &error.to_string());
        })?;

        // SAFETY: `base` points at `total` bytes owned exclusively by this
        // instance until `Drop` returns them.
        let region = unsafe { RegionView::new(base) };
        region.set_memory_size(memory_size);
        region.set_outer_handle(outer.map_or(0, |outer| {
            core::ptr::from_ref(outer).cast::<u8>() as usize
        }));
        region.set_logger_handle(logger.map_or(0, |logger| {
            core::ptr::from_ref(logger).cast::<u8>() as usize
        }));
        region.set_mode(mode);

        // The whole payload starts as one free block.
        let first = PayloadOffset::new(0);
        // SAFETY: `memory_size >= FREE_HEADER_SIZE`, so the header fits.
        unsafe {
            region.set_free_block_size(first, memory_size);
            region.set_free_block_next(first, None);
        }
        region.set_free_head(Some(first));

        emit(
            logger,
            Severity::Trace,
            &format!("{TYPENAME} construction finished"),
        );
        Ok(Self {
            region,
            outer,
            logger,
        })
    }

    fn trace(&self, message: &str) {
        emit(self.logger, Severity::Trace, message);
    }

    fn debug(&self, message: &str) {
        emit(self.logger, Severity::Debug, message);
    }

    fn warning(&self, message: &str) {
        emit(self.logger, Severity::Warning, message);
    }

    fn dump_after(&self, operation: &str) {
        self.debug(&format!(
            "memory state after `{operation}`: {}",
            format_state(&self.blocks())
        ));
    }

    /// Block base for a caller pointer, without any validation.
    fn block_base(&self, ptr: NonNull<u8>) -> PayloadOffset {
        let payload_start = self.region.payload_ptr(PayloadOffset::new(0)) as usize;
        PayloadOffset::new(ptr.as_ptr() as usize - payload_start - OCCUPIED_HEADER_SIZE)
    }

    /// Block base for a caller pointer, or `None` when the pointer does
    /// not lie inside the payload.
    fn checked_block_base(&self, ptr: NonNull<u8>) -> Option<PayloadOffset> {
        let payload_start = self.region.payload_ptr(PayloadOffset::new(0)) as usize;
        let address = ptr.as_ptr() as usize;
        if address < payload_start + OCCUPIED_HEADER_SIZE
            || address >= payload_start + self.region.memory_size()
        {
            return None;
        }
        Some(self.block_base(ptr))
    }

    /// Physical walk of the payload. Free blocks are recognized by
    /// consuming the address-sorted free list in step with the walk.
    fn blocks(&self) -> Vec<BlockRecord> {
        let region = self.region;
        let memory_size = region.memory_size();
        let mut records = Vec::new();
        let mut cursor = 0;
        let mut next_free = region.free_head();

        while cursor < memory_size {
            let block = PayloadOffset::new(cursor);
            // SAFETY: the walk only visits block bases inside the payload;
            // every block starts where the previous one ended.
            let record = if next_free == Some(block) {
                let size = unsafe { region.free_block_size(block) };
                next_free = unsafe { region.free_block_next(block) };
                BlockRecord {
                    status: BlockStatus::Available,
                    size,
                }
            } else {
                BlockRecord {
                    status: BlockStatus::Occupied,
                    size: unsafe { region.occupied_block_size(block) },
                }
            };
            records.push(record);
            cursor += record.size;
        }
        records
    }
}

impl Allocator for SortedListAllocator<'_> {
    fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, MemoryError> {
        self.trace(&format!("{TYPENAME}::allocate started"));
        self.debug(&format!("requested {size} bytes"));

        // A block's usable part must be able to hold a `next` link, or a
        // later split could not turn it back into a free block.
        let wanted = size.max(WORD_SIZE);

        // SAFETY: the free list is well formed between operations.
        let target = wanted
            .checked_add(OCCUPIED_HEADER_SIZE)
            .and_then(|needed| unsafe { free_list::select(self.region, needed) });
        let Some(target) = target else {
            let error = MemoryError::OutOfMemory { requested: size };
            self.warning(&error.to_string());
            self.trace(&format!("{TYPENAME}::allocate finished"));
            return Err(error);
        };

        // SAFETY: `select` returned a list member large enough to carve.
        let carved = unsafe { free_list::carve(self.region, &target, wanted) };
        unsafe {
            self.region.set_occupied_block_size(carved.base, carved.size);
        }

        let served = carved.size - OCCUPIED_HEADER_SIZE;
        if served != wanted {
            self.trace(&format!(
                "requested {size} bytes, serving {served} so the residue stays a valid block"
            ));
        }

        // SAFETY: the user bytes of an occupied block are inside the
        // payload of a live region, hence non-null.
        let user = unsafe {
            NonNull::new_unchecked(self.region.payload_ptr(carved.base + OCCUPIED_HEADER_SIZE))
        };
        self.trace(&format!("allocated block at offset {}", carved.base));
        self.trace(&format!("{TYPENAME}::allocate finished"));
        self.dump_after("allocate");
        Ok(user)
    }

    fn deallocate(&mut self, ptr: NonNull<u8>) {
        self.trace(&format!("{TYPENAME}::deallocate started"));

        let Some(block) = self.checked_block_base(ptr) else {
            self.warning("attempt to deallocate memory not owned by this allocator");
            return;
        };

        // SAFETY: `block` is the base of an occupied block handed out by
        // `allocate`; the sorted free list is well formed.
        let size = unsafe { self.region.occupied_block_size(block) };
        let (merged_base, merged_size) = unsafe { coalesce::insert_sorted(self.region, block, size) };

        self.trace(&format!(
            "freed block at offset {block}; free range is now {merged_size} bytes at {merged_base}"
        ));
        self.trace(&format!("{TYPENAME}::deallocate finished"));
        self.dump_after("deallocate");
    }

    fn reallocate(
        &mut self,
        ptr: NonNull<u8>,
        new_size: usize,
    ) -> Result<NonNull<u8>, MemoryError> {
        self.trace(&format!("{TYPENAME}::reallocate started"));

        // SAFETY: `ptr` came from `allocate` on this instance, so the word
        // before it is the block's size.
        let old_payload =
            unsafe { self.region.occupied_block_size(self.block_base(ptr)) } - OCCUPIED_HEADER_SIZE;

        let moved = self.allocate(new_size)?;
        let new_payload =
            unsafe { self.region.occupied_block_size(self.block_base(moved)) } - OCCUPIED_HEADER_SIZE;

        // SAFETY: source and destination are distinct blocks, and the copy
        // stays within the payload bytes of each.
        unsafe {
            core::ptr::copy_nonoverlapping(
                ptr.as_ptr(),
                moved.as_ptr(),
                old_payload.min(new_payload),
            );
        }
        self.deallocate(ptr);

        self.trace(&format!("{TYPENAME}::reallocate finished"));
        Ok(moved)
    }

    fn reallocate_in_place(&mut self, ptr: &mut NonNull<u8>, new_size: usize) -> bool {
        match self.reallocate(*ptr, new_size) {
            Ok(moved) => {
                *ptr = moved;
                true
            }
            Err(error) => {
                self.warning(&error.to_string());
                false
            }
        }
    }

    fn set_mode(&mut self, mode: FitMode) {
        self.region.set_mode(mode);
        self.trace(&format!("allocation mode set to {mode}"));
    }

    fn mode(&self) -> FitMode {
        self.region.mode()
    }

    fn memory_size(&self) -> usize {
        self.region.memory_size()
    }

    fn block_map(&self) -> Vec<BlockRecord> {
        self.blocks()
    }

    fn dump_state(&self) {
        self.debug(&format!("memory state: {}", format_state(&self.blocks())));
    }
}

impl Drop for SortedListAllocator<'_> {
    fn drop(&mut self) {
        self.trace(&format!("{TYPENAME} destruction started"));
        let total = ALLOCATOR_HEADER_SIZE + self.region.memory_size();
        // SAFETY: the region was acquired in `new` with exactly this size
        // and outer choice, and no view outlives the allocator.
        unsafe { outer::release(self.region.base(), total, self.outer) };
        self.trace(&format!("{TYPENAME} destruction finished"));
    }
}
