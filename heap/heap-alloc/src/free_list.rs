use heap_layout::{FREE_HEADER_SIZE, FitMode, OCCUPIED_HEADER_SIZE, PayloadOffset, RegionView};

/// A free block chosen by the selector, together with its list context so
/// the caller can splice without re-walking.
pub(crate) struct Candidate {
    /// List predecessor; `None` means the block is the list head.
    pub prev: Option<PayloadOffset>,
    pub base: PayloadOffset,
    pub size: usize,
    pub next: Option<PayloadOffset>,
}

/// Walk the free list and pick the block the region's current fit mode
/// prefers among those with `size >= needed` (`needed` already includes
/// the occupied header). Ties under best and worst fit go to the earlier
/// list position.
///
/// # Safety
/// The region's free list must be well formed: every link reaches the
/// base of a free block inside the payload, and the list terminates.
pub(crate) unsafe fn select(region: RegionView, needed: usize) -> Option<Candidate> {
    let mode = region.mode();
    let mut prev = None;
    let mut current = region.free_head();
    let mut chosen: Option<Candidate> = None;

    while let Some(base) = current {
        let size = unsafe { region.free_block_size(base) };
        let next = unsafe { region.free_block_next(base) };
        if size >= needed {
            let better = match (&chosen, mode) {
                (None, _) => true,
                (Some(_), FitMode::FirstFit) => false,
                (Some(candidate), FitMode::BestFit) => size < candidate.size,
                (Some(candidate), FitMode::WorstFit) => size > candidate.size,
            };
            if better {
                chosen = Some(Candidate {
                    prev,
                    base,
                    size,
                    next,
                });
            }
            if mode == FitMode::FirstFit {
                break;
            }
        }
        prev = Some(base);
        current = next;
    }

    chosen
}

/// The occupied block produced by [`carve`]; `size` counts the header.
pub(crate) struct Carved {
    pub base: PayloadOffset,
    pub size: usize,
}

/// Split `target` for a request of `wanted` usable bytes and unlink the
/// consumed part from the free list.
///
/// If the residue past the request cannot hold a free header, the whole
/// block is consumed; the caller then serves more bytes than asked, never
/// fewer. Otherwise the low end becomes the occupied block and the residue
/// is installed as a new free block in the target's list position.
///
/// The occupied size word is **not** written here; the two layout flavors
/// encode it differently.
///
/// # Safety
/// `target` must describe a current member of the region's free list, and
/// `target.size >= wanted + OCCUPIED_HEADER_SIZE`.
pub(crate) unsafe fn carve(region: RegionView, target: &Candidate, wanted: usize) -> Carved {
    let leftover = target.size - wanted - OCCUPIED_HEADER_SIZE;
    if leftover < FREE_HEADER_SIZE {
        unsafe { relink(region, target.prev, target.next) };
        Carved {
            base: target.base,
            size: target.size,
        }
    } else {
        let residue = target.base + (OCCUPIED_HEADER_SIZE + wanted);
        unsafe {
            region.set_free_block_size(residue, leftover);
            region.set_free_block_next(residue, target.next);
            relink(region, target.prev, Some(residue));
        }
        Carved {
            base: target.base,
            size: OCCUPIED_HEADER_SIZE + wanted,
        }
    }
}

/// Point `prev`'s next link at `to`, or the list head when `prev` is
/// `None`.
///
/// # Safety
/// `prev`, when present, must be the base of a free block in the payload.
pub(crate) unsafe fn relink(
    region: RegionView,
    prev: Option<PayloadOffset>,
    to: Option<PayloadOffset>,
) {
    match prev {
        None => region.set_free_head(to),
        Some(prev) => unsafe { region.set_free_block_next(prev, to) },
    }
}

#[cfg(test)]
mod tests {
    use super::select;
    use heap_layout::{ALLOCATOR_HEADER_SIZE, FitMode, PayloadOffset, RegionView};

    /// Hand-build a region whose free list is exactly `holes`
    /// (offset, size), linked in the given order.
    fn scratch(payload: usize, mode: FitMode, holes: &[(usize, usize)]) -> (Vec<u8>, RegionView) {
        let mut buffer = vec![0_u8; ALLOCATOR_HEADER_SIZE + payload];
        let base = core::ptr::NonNull::new(buffer.as_mut_ptr()).unwrap();
        let region = unsafe { RegionView::new(base) };
        region.set_memory_size(payload);
        region.set_mode(mode);
        region.set_free_head(holes.first().map(|&(offset, _)| PayloadOffset::new(offset)));
        for (index, &(offset, size)) in holes.iter().enumerate() {
            let next = holes
                .get(index + 1)
                .map(|&(offset, _)| PayloadOffset::new(offset));
            unsafe {
                region.set_free_block_size(PayloadOffset::new(offset), size);
                region.set_free_block_next(PayloadOffset::new(offset), next);
            }
        }
        (buffer, region)
    }

    #[test]
    fn undersized_blocks_never_qualify() {
        let (_buffer, region) = scratch(512, FitMode::FirstFit, &[(0, 40), (64, 104)]);
        let chosen = unsafe { select(region, 48) }.unwrap();
        assert_eq!(chosen.base, PayloadOffset::new(64));
        assert!(unsafe { select(region, 200) }.is_none());
    }

    #[test]
    fn best_and_worst_fit_break_ties_towards_the_list_head() {
        let (_buffer, region) = scratch(512, FitMode::BestFit, &[(0, 64), (128, 64), (256, 64)]);
        let best = unsafe { select(region, 32) }.unwrap();
        assert_eq!(best.base, PayloadOffset::new(0));

        region.set_mode(FitMode::WorstFit);
        let worst = unsafe { select(region, 32) }.unwrap();
        assert_eq!(worst.base, PayloadOffset::new(0));
    }

    #[test]
    fn selector_reports_the_list_predecessor() {
        let (_buffer, region) = scratch(512, FitMode::BestFit, &[(0, 64), (128, 32)]);
        let chosen = unsafe { select(region, 24) }.unwrap();
        assert_eq!(chosen.base, PayloadOffset::new(128));
        assert_eq!(chosen.prev, Some(PayloadOffset::new(0)));
        assert_eq!(chosen.next, None);
    }
}
