//! Drives both allocator flavors through a small scenario with a console
//! logger at debug and a per-flavor trace file, then shows the error
//! surface an exhausted region produces.

use heap_alloc::{
    Allocator, FitMode, MemoryError, SortedListAllocator, TaggedListAllocator,
};
use heap_logger::{Logger, LoggerBuilder, Severity};
use std::error::Error;

const REGION_SIZE: usize = 10_000;

fn exercise(allocator: &mut dyn Allocator) -> Result<(), MemoryError> {
    let mut block = allocator.allocate(1000)?;
    if allocator.reallocate_in_place(&mut block, 2000) {
        println!("block grown in place of the caller's pointer");
    }
    allocator.dump_state();
    allocator.deallocate(block);

    // An impossible request raises; the region stays usable.
    match allocator.allocate(REGION_SIZE * 10) {
        Err(MemoryError::OutOfMemory { requested }) => {
            println!("request for {requested} bytes rejected, as it should be");
        }
        Err(other) => return Err(other),
        Ok(_) => println!("request unexpectedly succeeded"),
    }
    Ok(())
}

fn build_logger(trace_file: &str) -> std::io::Result<Logger> {
    LoggerBuilder::new()
        .console(Severity::Debug)
        .file(trace_file, Severity::Trace)
        .build()
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("sorted-list allocator:");
    let logger = build_logger("sorted-list-trace.txt")?;
    let mut allocator =
        SortedListAllocator::new(REGION_SIZE, None, Some(&logger), FitMode::FirstFit)?;
    exercise(&mut allocator)?;
    allocator.set_mode(FitMode::BestFit);
    exercise(&mut allocator)?;
    drop(allocator);

    println!();
    println!("tagged-list allocator:");
    let logger = build_logger("tagged-list-trace.txt")?;
    let mut allocator =
        TaggedListAllocator::new(REGION_SIZE, None, Some(&logger), FitMode::FirstFit)?;
    exercise(&mut allocator)?;
    drop(allocator);

    Ok(())
}
