//! Merging newly freed blocks with their physical neighbors.
//!
//! Both strategies take a block that just left the occupied state and
//! return the base and size of the free range it ended up in, with the
//! free list updated so that no two free blocks share a boundary.

use crate::free_list::relink;
use heap_layout::{PayloadOffset, RegionView};

/// Sorted-list discipline: walk to the address-ordered insertion point,
/// merge across shared boundaries with the list predecessor and successor,
/// and splice the result in place.
///
/// # Safety
/// The free list must be address-sorted and well formed, and
/// `[base, base + size)` must be a block that is in the payload and in no
/// free list.
pub(crate) unsafe fn insert_sorted(
    region: RegionView,
    base: PayloadOffset,
    size: usize,
) -> (PayloadOffset, usize) {
    let mut prev: Option<PayloadOffset> = None;
    let mut current = region.free_head();
    while let Some(existing) = current {
        if existing > base {
            break;
        }
        prev = Some(existing);
        current = unsafe { region.free_block_next(existing) };
    }

    let mut merged_size = size;
    let mut next_link = current;
    if let Some(successor) = current {
        if base + size == successor {
            merged_size += unsafe { region.free_block_size(successor) };
            next_link = unsafe { region.free_block_next(successor) };
        }
    }

    if let Some(predecessor) = prev {
        let predecessor_size = unsafe { region.free_block_size(predecessor) };
        if predecessor + predecessor_size == base {
            // The predecessor keeps its list position; it just grows.
            let total = predecessor_size + merged_size;
            unsafe {
                region.set_free_block_size(predecessor, total);
                region.set_free_block_next(predecessor, next_link);
            }
            return (predecessor, total);
        }
    }

    unsafe {
        region.set_free_block_size(base, merged_size);
        region.set_free_block_next(base, next_link);
        relink(region, prev, Some(base));
    }
    (base, merged_size)
}

/// Tagged-list discipline: the list carries no ordering, so adjacency is
/// found by scanning. Any member ending at the freed range's base or
/// starting at its end is pulled out of the list and absorbed; the merged
/// block is then pushed at the head.
///
/// A freed block has at most one physical neighbor on each side, so the
/// rescan loop runs at most three times.
///
/// # Safety
/// The free list must be well formed, and `[base, base + size)` must be a
/// block that is in the payload and in no free list.
pub(crate) unsafe fn merge_by_scan(
    region: RegionView,
    base: PayloadOffset,
    size: usize,
) -> (PayloadOffset, usize) {
    let mut merged_base = base;
    let mut merged_size = size;

    loop {
        let mut prev = None;
        let mut current = region.free_head();
        let mut absorbed = false;

        while let Some(member) = current {
            let member_size = unsafe { region.free_block_size(member) };
            let member_next = unsafe { region.free_block_next(member) };
            if member + member_size == merged_base {
                unsafe { relink(region, prev, member_next) };
                merged_base = member;
                merged_size += member_size;
                absorbed = true;
                break;
            }
            if merged_base + merged_size == member {
                unsafe { relink(region, prev, member_next) };
                merged_size += member_size;
                absorbed = true;
                break;
            }
            prev = Some(member);
            current = member_next;
        }

        if !absorbed {
            break;
        }
    }

    unsafe {
        region.set_free_block_size(merged_base, merged_size);
        region.set_free_block_next(merged_base, region.free_head());
    }
    region.set_free_head(Some(merged_base));
    (merged_base, merged_size)
}
