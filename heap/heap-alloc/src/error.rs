/// Failures of the memory kind, distinct from logic errors.
///
/// Only construction and allocation raise; every other misuse the
/// allocators can detect is logged and absorbed (see the façade docs).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// The requested capacity cannot hold even one free-block header.
    #[error("trusted memory size must be at least {minimum} bytes, requested {requested}")]
    RegionTooSmall { requested: usize, minimum: usize },

    /// No free block satisfies the fit predicate for this request, or the
    /// upstream source could not provide the trusted region itself.
    #[error("no memory available to serve {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Reserved for operations an allocator flavor does not provide.
    /// None of the shipped allocators raise it.
    #[error("operation is not implemented")]
    NotImplemented,
}
