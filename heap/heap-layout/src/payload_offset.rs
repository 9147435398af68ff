use core::fmt;
use core::ops::Add;

// The wire format stores one field per machine word and the test scenarios
// pin the service sizes to 8/16 bytes, so the crate only targets 64-bit.
const _: () = assert!(size_of::<usize>() == 8, "word size mismatch");

/// Byte offset of a block from the payload base of a trusted region.
///
/// Offsets, not absolute addresses, are what the free list stores; dumps of
/// a region stay meaningful after the region itself has moved.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PayloadOffset(usize);

impl PayloadOffset {
    #[inline]
    #[must_use]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Debug for PayloadOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayloadOffset(0x{:X})", self.0)
    }
}

impl fmt::Display for PayloadOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl From<usize> for PayloadOffset {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl From<PayloadOffset> for usize {
    #[inline]
    fn from(offset: PayloadOffset) -> Self {
        offset.as_usize()
    }
}

impl Add<usize> for PayloadOffset {
    type Output = Self;

    #[inline]
    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

/// Reserved word for the absent link. Never a valid offset: the payload is
/// bounded by `memory_size`, which cannot reach `usize::MAX`.
const NIL_LINK: usize = usize::MAX;

#[inline]
pub(crate) const fn encode_link(link: Option<PayloadOffset>) -> usize {
    match link {
        Some(offset) => offset.as_usize(),
        None => NIL_LINK,
    }
}

#[inline]
pub(crate) const fn decode_link(word: usize) -> Option<PayloadOffset> {
    if word == NIL_LINK {
        None
    } else {
        Some(PayloadOffset::new(word))
    }
}
