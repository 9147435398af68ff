use crate::allocator::{Allocator, BlockRecord, BlockStatus, emit, format_state};
use crate::{MemoryError, OuterAllocator, coalesce, free_list, outer};
use core::ptr::NonNull;
use heap_layout::{
    ALLOCATOR_HEADER_SIZE, FREE_HEADER_SIZE, FitMode, OCCUPIED_HEADER_SIZE, PayloadOffset,
    RegionView, TaggedSize, WORD_SIZE,
};
use heap_logger::{Logger, Severity};

const TYPENAME: &str = "TaggedListAllocator";

/// Fit allocator whose size words carry an allocation bit.
///
/// Stealing the low bit requires every block size to be even, so requests
/// (and the region capacity itself) are rounded up. In exchange, a
/// physical walk can tell free from occupied by looking at a block alone,
/// and the free list needs no ordering discipline: deallocation clears the
/// freed block's bit, pulls physically adjacent list members into it by
/// scanning, and pushes the merged range at the list head.
///
/// Collaborators are borrowed exactly as in the sorted-list flavor.
pub struct TaggedListAllocator<'a> {
    region: RegionView,
    outer: Option<&'a dyn OuterAllocator>,
    logger: Option<&'a Logger>,
}

impl core::fmt::Debug for TaggedListAllocator<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct(TYPENAME)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl<'a> TaggedListAllocator<'a> {
    /// Obtain a trusted region of `memory_size` payload bytes (rounded up
    /// to even) and set it up as one single free block.
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

        // Odd capacities cannot be represented by tagged size words.
        let memory_size = memory_size.next_multiple_of(2);

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

        // One free block spanning the payload; even size, so its plain
        // word doubles as a cleared tagged word.
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

    fn block_base(&self, ptr: NonNull<u8>) -> PayloadOffset {
        let payload_start = self.region.payload_ptr(PayloadOffset::new(0)) as usize;
        PayloadOffset::new(ptr.as_ptr() as usize - payload_start - OCCUPIED_HEADER_SIZE)
    }

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

    /// Physical walk of the payload; the allocation bit tells free from
    /// occupied without consulting the free list.
    fn blocks(&self) -> Vec<BlockRecord> {
        let region = self.region;
        let memory_size = region.memory_size();
        let mut records = Vec::new();
        let mut cursor = 0;

        while cursor < memory_size {
            // SAFETY: the walk only visits block bases inside the payload;
            // every block starts where the previous one ended.
            let word = unsafe { region.tagged_size(PayloadOffset::new(cursor)) };
            let status = if word.allocated() {
                BlockStatus::Occupied
            } else {
                BlockStatus::Available
            };
            records.push(BlockRecord {
                status,
                size: word.size(),
            });
            cursor += word.size();
        }
        records
    }
}

impl Allocator for TaggedListAllocator<'_> {
    fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, MemoryError> {
        self.trace(&format!("{TYPENAME}::allocate started"));
        self.debug(&format!("requested {size} bytes"));

        // Room for a future `next` link, then up to even so the low bit of
        // the size word stays free for the allocation flag.
        let wanted = size.max(WORD_SIZE).next_multiple_of(2);

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
            self.region
                .set_tagged_size(carved.base, TaggedSize::from_parts(carved.size, true));
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
        // `allocate`; the free list is well formed.
        let word = unsafe { self.region.tagged_size(block) };
        unsafe {
            self.region.set_tagged_size(block, word.with_allocated(false));
        }
        let (merged_base, merged_size) =
            unsafe { coalesce::merge_by_scan(self.region, block, word.size()) };

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
        // before it is the block's tagged size.
        let old_payload =
            unsafe { self.region.tagged_size(self.block_base(ptr)) }.size() - OCCUPIED_HEADER_SIZE;

        let moved = self.allocate(new_size)?;
        let new_payload =
            unsafe { self.region.tagged_size(self.block_base(moved)) }.size() - OCCUPIED_HEADER_SIZE;

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

impl Drop for TaggedListAllocator<'_> {
    fn drop(&mut self) {
        self.trace(&format!("{TYPENAME} destruction started"));
        let total = ALLOCATOR_HEADER_SIZE + self.region.memory_size();
        // SAFETY: the region was acquired in `new` with exactly this size
        // and outer choice, and no view outlives the allocator.
        unsafe { outer::release(self.region.base(), total, self.outer) };
        self.trace(&format!("{TYPENAME} destruction finished"));
    }
}
