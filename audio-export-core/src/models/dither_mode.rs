use serde::{Deserialize, Serialize};

/// Dither algorithm applied before truncating to an integer sample format.
///
/// Persisted in configuration as its integer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DitherMode {
    /// Plain rounding.
    None,
    /// One LSB of flat noise.
    #[default]
    Rectangular,
    /// Triangular PDF noise with first-order error feedback.
    Triangular,
}

impl DitherMode {
    pub const ALL: [DitherMode; 3] = [Self::None, Self::Rectangular, Self::Triangular];

    pub fn index(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Rectangular => 1,
            Self::Triangular => 2,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.index() == index)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "No dither",
            Self::Rectangular => "Rectangular",
            Self::Triangular => "Triangular, noise shaped",
        }
    }
}
