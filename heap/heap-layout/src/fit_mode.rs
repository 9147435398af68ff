use core::fmt;

/// Policy for choosing among the free blocks that can satisfy a request.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum FitMode {
    /// Take the first qualifying block in list order.
    #[default]
    FirstFit,
    /// Take the qualifying block with the least slack; earlier list
    /// position wins ties.
    BestFit,
    /// Take the qualifying block with the largest size; earlier list
    /// position wins ties.
    WorstFit,
}

impl FitMode {
    #[inline]
    #[must_use]
    pub const fn into_word(self) -> usize {
        match self {
            Self::FirstFit => 0,
            Self::BestFit => 1,
            Self::WorstFit => 2,
        }
    }

    /// Decode a mode word. Unknown encodings read as first fit, the
    /// family's baseline policy; the codec performs no validation.
    #[inline]
    #[must_use]
    pub const fn from_word(word: usize) -> Self {
        match word {
            1 => Self::BestFit,
            2 => Self::WorstFit,
            _ => Self::FirstFit,
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstFit => f.write_str("first fit"),
            Self::BestFit => f.write_str("best fit"),
            Self::WorstFit => f.write_str("worst fit"),
        }
    }
}
