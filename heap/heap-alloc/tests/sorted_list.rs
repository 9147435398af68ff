mod common;

use common::{
    TrackingOuter, assert_well_formed, avl, churn, fragment_into_holes, occ, pattern, read_bytes,
    write_bytes,
};
use core::ptr::NonNull;
use heap_alloc::{Allocator, FitMode, MemoryError, SortedListAllocator};
use heap_layout::{FREE_HEADER_SIZE, OCCUPIED_HEADER_SIZE};
use heap_logger::{LoggerBuilder, Severity};
use std::fs;

fn fresh(memory_size: usize, mode: FitMode) -> SortedListAllocator<'static> {
    SortedListAllocator::new(memory_size, None, None, mode).unwrap()
}

#[test]
fn region_must_hold_one_free_header() {
    let error = SortedListAllocator::new(FREE_HEADER_SIZE - 1, None, None, FitMode::FirstFit)
        .unwrap_err();
    assert_eq!(
        error,
        MemoryError::RegionTooSmall {
            requested: FREE_HEADER_SIZE - 1,
            minimum: FREE_HEADER_SIZE,
        }
    );

    let allocator = fresh(FREE_HEADER_SIZE, FitMode::FirstFit);
    assert_eq!(allocator.memory_size(), FREE_HEADER_SIZE);
    assert_eq!(allocator.block_map(), vec![avl(FREE_HEADER_SIZE)]);
}

#[test]
fn freeing_the_first_block_leaves_two_sorted_holes() {
    let mut allocator = fresh(10_000, FitMode::FirstFit);

    let first = allocator.allocate(1000).unwrap();
    let second = allocator.allocate(2000).unwrap();
    assert_eq!(
        second.as_ptr() as usize - first.as_ptr() as usize,
        1008,
        "blocks must be carved back to back"
    );

    allocator.deallocate(first);
    assert_eq!(
        allocator.block_map(),
        vec![avl(1008), occ(2008), avl(10_000 - 3016)]
    );
}

#[test]
fn reallocate_moves_forward_and_preserves_bytes() {
    let mut allocator = fresh(10_000, FitMode::FirstFit);

    let first = allocator.allocate(1000).unwrap();
    let bytes = pattern(1000, 7);
    write_bytes(first, &bytes);

    let moved = allocator.reallocate(first, 2000).unwrap();
    assert_ne!(moved, first, "first fit cannot reuse the block just behind the carve point");
    assert_eq!(allocator.block_map(), vec![avl(1008), occ(2008), avl(6984)]);
    assert_eq!(read_bytes(moved, 1000), bytes);
}

#[test]
fn residual_too_small_for_a_header_is_not_reusable() {
    let mut allocator = fresh(100, FitMode::FirstFit);

    let first = allocator.allocate(50).unwrap();
    let error = allocator.allocate(50).unwrap_err();
    assert_eq!(error, MemoryError::OutOfMemory { requested: 50 });

    allocator.deallocate(first);
    assert_eq!(allocator.block_map(), vec![avl(100)]);
}

#[test]
fn first_fit_takes_the_lowest_qualifying_hole() {
    let mut allocator = fresh(2000, FitMode::FirstFit);
    let [hole_small, _, _] = fragment_into_holes(&mut allocator);

    // Holes of 120, 50 and 200 in address order; the 120 one comes first.
    let chosen = allocator.allocate(40).unwrap();
    assert_eq!(chosen, hole_small);
}

#[test]
fn best_fit_takes_the_tightest_hole() {
    let mut allocator = fresh(2000, FitMode::BestFit);
    let [_, hole_tight, _] = fragment_into_holes(&mut allocator);

    let chosen = allocator.allocate(40).unwrap();
    assert_eq!(chosen, hole_tight);
}

#[test]
fn worst_fit_takes_the_largest_hole() {
    let mut allocator = fresh(2000, FitMode::WorstFit);
    let [_, _, hole_large] = fragment_into_holes(&mut allocator);

    let chosen = allocator.allocate(40).unwrap();
    assert_eq!(chosen, hole_large);
}

#[test]
fn mode_changes_steer_subsequent_allocations() {
    let mut allocator = fresh(2000, FitMode::FirstFit);
    let [_, hole_tight, _] = fragment_into_holes(&mut allocator);

    allocator.set_mode(FitMode::BestFit);
    assert_eq!(allocator.mode(), FitMode::BestFit);

    let chosen = allocator.allocate(40).unwrap();
    assert_eq!(chosen, hole_tight);
}

#[test]
fn the_whole_payload_minus_one_header_is_allocatable() {
    let mut allocator = fresh(10_000, FitMode::FirstFit);

    let everything = allocator.allocate(10_000 - OCCUPIED_HEADER_SIZE).unwrap();
    assert_eq!(allocator.block_map(), vec![occ(10_000)], "free list must be empty");

    allocator.deallocate(everything);
    assert_eq!(allocator.block_map(), vec![avl(10_000)]);

    let mut allocator = fresh(10_000, FitMode::FirstFit);
    let error = allocator
        .allocate(10_000 - OCCUPIED_HEADER_SIZE + 1)
        .unwrap_err();
    assert_eq!(
        error,
        MemoryError::OutOfMemory {
            requested: 10_000 - OCCUPIED_HEADER_SIZE + 1
        }
    );
}

#[test]
fn foreign_pointers_are_rejected_without_state_changes() {
    let path = std::env::temp_dir().join(format!(
        "heap-alloc-sorted-foreign-{}.txt",
        std::process::id()
    ));
    let logger = LoggerBuilder::new()
        .file(&path, Severity::Warning)
        .build()
        .unwrap();

    {
        let mut allocator =
            SortedListAllocator::new(1000, None, Some(&logger), FitMode::FirstFit).unwrap();
        let _inside = allocator.allocate(100).unwrap();
        let before = allocator.block_map();

        let mut not_mine = 0_u64;
        allocator.deallocate(NonNull::from(&mut not_mine).cast::<u8>());
        assert_eq!(allocator.block_map(), before);
    }

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[warning] attempt to deallocate memory not owned by this allocator"));
    fs::remove_file(&path).unwrap();
}

#[test]
fn failed_growth_leaves_the_caller_pointer_alone() {
    let mut allocator = fresh(300, FitMode::FirstFit);

    let mut ptr = allocator.allocate(64).unwrap();
    let bytes = pattern(64, 3);
    write_bytes(ptr, &bytes);

    assert!(allocator.reallocate_in_place(&mut ptr, 128));
    assert_eq!(read_bytes(ptr, 64), bytes);

    let kept = ptr;
    assert!(!allocator.reallocate_in_place(&mut ptr, 10_000));
    assert_eq!(ptr, kept);
    assert_eq!(read_bytes(ptr, 64), bytes);
}

#[test]
fn zero_byte_requests_get_a_minimal_block() {
    let mut allocator = fresh(100, FitMode::FirstFit);
    let ptr = allocator.allocate(0).unwrap();
    assert_eq!(
        allocator.block_map()[0],
        occ(OCCUPIED_HEADER_SIZE + 8),
        "a block must keep room for a future free-list link"
    );
    allocator.deallocate(ptr);
}

#[test]
fn dump_state_walks_the_payload_in_physical_order() {
    let path = std::env::temp_dir().join(format!(
        "heap-alloc-sorted-dump-{}.txt",
        std::process::id()
    ));
    let logger = LoggerBuilder::new()
        .file(&path, Severity::Debug)
        .build()
        .unwrap();

    {
        let mut allocator =
            SortedListAllocator::new(10_000, None, Some(&logger), FitMode::FirstFit).unwrap();
        let first = allocator.allocate(1000).unwrap();
        let _second = allocator.allocate(2000).unwrap();
        allocator.deallocate(first);
        allocator.dump_state();
    }

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("memory state: |avl 1008|occ 2008|avl 6984|"));
    fs::remove_file(&path).unwrap();
}

#[test]
fn churn_preserves_the_invariants() {
    let mut allocator = fresh(1 << 14, FitMode::FirstFit);
    churn(&mut allocator, 400, 513);
}

#[test]
fn trusted_region_is_acquired_and_released_through_the_outer_allocator() {
    let outer = TrackingOuter::new();
    {
        let mut allocator =
            SortedListAllocator::new(4096, Some(&outer), None, FitMode::FirstFit).unwrap();
        assert_eq!(outer.outstanding(), 1);

        // Block churn stays inside the region; the outer allocator is not
        // consulted again until destruction.
        let ptr = allocator.allocate(128).unwrap();
        allocator.deallocate(ptr);
        assert_eq!(outer.outstanding(), 1);

        assert_well_formed(&allocator.block_map(), 4096);
    }
    assert_eq!(outer.outstanding(), 0);
}
