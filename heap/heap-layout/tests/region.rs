use core::ptr::NonNull;
use heap_layout::{
    ALLOCATOR_HEADER_SIZE, FitMode, PayloadOffset, RegionView, TaggedSize, WORD_SIZE,
};

/// Backing storage plus a view over it; the buffer must outlive the view.
fn scratch(payload: usize) -> (Vec<u8>, RegionView) {
    let mut buffer = vec![0_u8; ALLOCATOR_HEADER_SIZE + payload];
    let base = NonNull::new(buffer.as_mut_ptr()).unwrap();
    let region = unsafe { RegionView::new(base) };
    region.set_memory_size(payload);
    (buffer, region)
}

#[test]
fn header_fields_do_not_overlap() {
    let (_buffer, region) = scratch(256);

    region.set_memory_size(256);
    region.set_outer_handle(0xAAAA);
    region.set_logger_handle(0xBBBB);
    region.set_mode(FitMode::WorstFit);
    region.set_free_head(Some(PayloadOffset::new(48)));

    assert_eq!(region.memory_size(), 256);
    assert_eq!(region.outer_handle(), 0xAAAA);
    assert_eq!(region.logger_handle(), 0xBBBB);
    assert_eq!(region.mode(), FitMode::WorstFit);
    assert_eq!(region.free_head(), Some(PayloadOffset::new(48)));
}

#[test]
fn absent_links_read_back_as_none() {
    let (_buffer, region) = scratch(128);

    region.set_free_head(None);
    assert_eq!(region.free_head(), None);

    let block = PayloadOffset::new(0);
    unsafe {
        region.set_free_block_size(block, 128);
        region.set_free_block_next(block, None);
        assert_eq!(region.free_block_next(block), None);

        region.set_free_block_next(block, Some(PayloadOffset::new(64)));
        assert_eq!(region.free_block_next(block), Some(PayloadOffset::new(64)));
    }
}

#[test]
fn block_headers_work_at_odd_offsets() {
    // Splits after odd-sized requests leave headers off word boundaries;
    // the codec must not care.
    let (_buffer, region) = scratch(256);
    let block = PayloadOffset::new(13);

    unsafe {
        region.set_free_block_size(block, 77);
        region.set_free_block_next(block, Some(PayloadOffset::new(90)));
        assert_eq!(region.free_block_size(block), 77);
        assert_eq!(region.free_block_next(block), Some(PayloadOffset::new(90)));

        region.set_occupied_block_size(block, 21);
        assert_eq!(region.occupied_block_size(block), 21);
    }
}

#[test]
fn tagged_word_packs_status_and_size() {
    let word = TaggedSize::from_parts(1008, true);
    assert!(word.allocated());
    assert_eq!(word.size(), 1008);

    let free = TaggedSize::from_parts(1008, false);
    assert!(!free.allocated());
    assert_eq!(free.into_bits(), 1008);
}

#[test]
fn free_tagged_word_reads_as_plain_size() {
    let (_buffer, region) = scratch(64);
    let block = PayloadOffset::new(0);

    unsafe {
        region.set_tagged_size(block, TaggedSize::from_parts(64, false));
        assert_eq!(region.free_block_size(block), 64);

        region.set_tagged_size(block, TaggedSize::from_parts(64, true));
        let word = region.tagged_size(block);
        assert!(word.allocated());
        assert_eq!(word.size(), 64);
    }
}

#[test]
fn payload_ptr_skips_the_allocator_header() {
    let (buffer, region) = scratch(32);
    let start = region.payload_ptr(PayloadOffset::new(0)) as usize;
    assert_eq!(start - buffer.as_ptr() as usize, ALLOCATOR_HEADER_SIZE);
    assert_eq!(ALLOCATOR_HEADER_SIZE, 5 * WORD_SIZE);
}
