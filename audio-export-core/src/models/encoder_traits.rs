use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dither_mode::DitherMode;
use super::error::ExportError;
use super::sample_format::SampleFormat;

/// Encoding strategy. Exactly one is active per export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "CBR")]
    Cbr = 1 << 0,
    #[serde(rename = "ABR")]
    Abr = 1 << 1,
    #[serde(rename = "VBR")]
    Vbr = 1 << 2,
    Quality = 1 << 3,
    Enumerated = 1 << 4,
}

impl Mode {
    pub const ALL: [Mode; 5] = [Self::Cbr, Self::Abr, Self::Vbr, Self::Quality, Self::Enumerated];

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Configuration string for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cbr => "CBR",
            Self::Abr => "ABR",
            Self::Vbr => "VBR",
            Self::Quality => "Quality",
            Self::Enumerated => "Enumerated",
        }
    }

    /// Whether the mode is driven by the bitrate table.
    pub fn uses_bitrate(self) -> bool {
        matches!(self, Self::Cbr | Self::Abr | Self::Vbr)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ExportError::Config(format!("invalid encoder mode: {:?}", s)))
    }
}

/// Union of modes a backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModeSet(u8);

impl ModeSet {
    pub const EMPTY: ModeSet = ModeSet(0);

    pub fn from_bits(bits: u8) -> Self {
        let valid = Mode::ALL.iter().fold(0, |acc, mode| acc | mode.bits());
        Self(bits & valid)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, mode: Mode) -> bool {
        self.0 & mode.bits() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Modes in the set, in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Mode> {
        Mode::ALL.into_iter().filter(move |mode| self.contains(*mode))
    }
}

impl From<Mode> for ModeSet {
    fn from(mode: Mode) -> Self {
        ModeSet(mode.bits())
    }
}

impl BitOr for Mode {
    type Output = ModeSet;

    fn bitor(self, rhs: Mode) -> ModeSet {
        ModeSet(self.bits() | rhs.bits())
    }
}

impl BitOr<Mode> for ModeSet {
    type Output = ModeSet;

    fn bitor(self, rhs: Mode) -> ModeSet {
        ModeSet(self.0 | rhs.bits())
    }
}

impl BitOr for ModeSet {
    type Output = ModeSet;

    fn bitor(self, rhs: ModeSet) -> ModeSet {
        ModeSet(self.0 | rhs.0)
    }
}

/// One concrete output format offered by an enumerated-mode backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Format {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    pub bitrate: u32,
    pub description: String,
}

impl Format {
    pub fn matches(&self, sample_rate: u32, channels: u16) -> bool {
        self.sample_rate == sample_rate && self.channels == channels
    }
}

/// Static description of one backend's capabilities and defaults.
///
/// Built once at backend registration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderTraits {
    pub file_extension: String,
    pub file_short_description: String,
    /// Prefix for the backend's configuration keys.
    pub encoder_settings_name: String,

    pub show_encoder_info: bool,
    pub file_description: String,
    pub encoder_name: String,
    pub description: String,

    pub can_tags: bool,
    pub genres: Vec<String>,
    pub modes_with_fixed_genres: ModeSet,

    pub can_cues: bool,

    pub max_channels: u16,
    pub sample_rates: Vec<u32>,

    pub modes: ModeSet,
    /// Bitrates in kbit/s, in display order.
    pub bitrates: Vec<u32>,
    pub formats: Vec<Format>,

    pub default_sample_rate: u32,
    pub default_channels: u16,
    pub default_mode: Mode,
    pub default_bitrate: u32,
    pub default_quality: f32,
    pub default_format: usize,
    pub default_dither: DitherMode,
}

impl Default for EncoderTraits {
    fn default() -> Self {
        Self {
            file_extension: String::new(),
            file_short_description: String::new(),
            encoder_settings_name: String::new(),
            show_encoder_info: false,
            file_description: String::new(),
            encoder_name: String::new(),
            description: String::new(),
            can_tags: false,
            genres: Vec::new(),
            modes_with_fixed_genres: ModeSet::EMPTY,
            can_cues: false,
            max_channels: 0,
            sample_rates: Vec::new(),
            modes: ModeSet::EMPTY,
            bitrates: Vec::new(),
            formats: Vec::new(),
            default_sample_rate: 44100,
            default_channels: 2,
            default_mode: Mode::Cbr,
            default_bitrate: 0,
            default_quality: 0.0,
            default_format: 0,
            default_dither: DitherMode::Rectangular,
        }
    }
}

impl EncoderTraits {
    /// Checks that every default is a member of its supported set.
    pub fn validate(&self) -> Result<(), ExportError> {
        let malformed = |what: String| ExportError::MalformedBackend(format!("{}: {}", self.encoder_name, what));

        if self.encoder_name.is_empty() {
            return Err(ExportError::MalformedBackend("encoder name is empty".into()));
        }
        if self.modes.is_empty() {
            return Err(malformed("no supported modes".into()));
        }
        if !self.modes.contains(self.default_mode) {
            return Err(malformed(format!("default mode {} is not supported", self.default_mode)));
        }
        if !self.sample_rates.contains(&self.default_sample_rate) {
            return Err(malformed(format!(
                "default sample rate {} is not supported",
                self.default_sample_rate
            )));
        }
        if self.default_channels == 0 || self.default_channels > self.max_channels {
            return Err(malformed(format!(
                "default channel count {} exceeds maximum {}",
                self.default_channels, self.max_channels
            )));
        }
        if self.modes.iter().any(Mode::uses_bitrate) && !self.bitrates.contains(&self.default_bitrate) {
            return Err(malformed(format!(
                "default bitrate {} is not in the bitrate table",
                self.default_bitrate
            )));
        }
        if !(0.0..=1.0).contains(&self.default_quality) {
            return Err(malformed(format!("default quality {} is out of range", self.default_quality)));
        }
        if self.modes.contains(Mode::Enumerated) {
            let format = self.formats.get(self.default_format).ok_or_else(|| {
                malformed(format!("default format index {} is out of range", self.default_format))
            })?;
            if !format.matches(self.default_sample_rate, self.default_channels) {
                return Err(malformed(format!(
                    "default format \"{}\" does not match default sample rate/channels",
                    format.description
                )));
            }
        }
        Ok(())
    }

    /// Formats matching a sample rate and channel count, with their indices.
    pub fn formats_for(&self, sample_rate: u32, channels: u16) -> impl Iterator<Item = (usize, &Format)> {
        self.formats
            .iter()
            .enumerate()
            .filter(move |(_, format)| format.matches(sample_rate, channels))
    }
}
