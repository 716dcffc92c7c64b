use serde::{Deserialize, Serialize};

/// Number of fractional bits in the mixer's fixed-point representation.
///
/// A mix sample of `1 << MIXING_FRACTIONAL_BITS` corresponds to full scale
/// (1.0). The remaining integer bits give the mixer headroom above 0 dBFS.
pub const MIXING_FRACTIONAL_BITS: u32 = 27;

/// Byte order of converted sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }
}

/// Sample representations the render sinks and encoders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    /// Unsigned 8-bit, silence at 0x80.
    Unsigned8,
    Int16,
    /// Signed 24-bit, packed into three bytes on the wire.
    Int24,
    Int32,
    Float32,
    Float64,
}

impl SampleFormat {
    pub const ALL: [SampleFormat; 6] = [
        Self::Unsigned8,
        Self::Int16,
        Self::Int24,
        Self::Int32,
        Self::Float32,
        Self::Float64,
    ];

    pub fn bits_per_sample(self) -> u32 {
        match self {
            Self::Unsigned8 => 8,
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Int32 | Self::Float32 => 32,
            Self::Float64 => 64,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bits_per_sample() as usize / 8
    }

    pub fn is_int(self) -> bool {
        !self.is_float()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

/// Signed 24-bit sample held in an `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct I24(i32);

impl I24 {
    pub const MIN: i32 = -(1 << 23);
    pub const MAX: i32 = (1 << 23) - 1;

    /// Saturates `value` into the 24-bit range.
    pub fn new(value: i32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for super::I24 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// An external sample type a render sink can produce.
///
/// Implemented for the closed set `u8`, `i16`, [`I24`], `i32`, `f32`, `f64`.
pub trait OutputSample: sealed::Sealed + Copy + Default + Send + 'static {
    const FORMAT: SampleFormat;

    /// Converts one fixed-point mix sample ([`MIXING_FRACTIONAL_BITS`]).
    ///
    /// Integer targets round half up and saturate. Float targets are scaled
    /// without clipping.
    fn from_fixed(value: i32) -> Self;

    /// Quantizes a native-range float sample (full scale is ±1.0).
    fn from_f32(value: f32) -> Self;

    /// Multiplies by `gain`. Only meaningful for float samples; integer
    /// samples are returned unchanged.
    fn scaled(self, gain: f32) -> Self {
        let _ = gain;
        self
    }

    /// Appends the encoded sample to `out` in the given byte order.
    fn encode(self, endian: Endianness, out: &mut Vec<u8>);
}

/// Rounds a fixed-point mix sample to a signed integer of `bits` bits.
fn fixed_to_int(value: i32, bits: u32) -> i32 {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if bits > MIXING_FRACTIONAL_BITS {
        let limit = 1i64 << MIXING_FRACTIONAL_BITS;
        let clamped = (value as i64).clamp(-limit, limit - 1);
        return (clamped << (bits - 1 - MIXING_FRACTIONAL_BITS)).clamp(min, max) as i32;
    }
    let shift = MIXING_FRACTIONAL_BITS + 1 - bits;
    let rounded = (value as i64 + (1i64 << (shift - 1))) >> shift;
    rounded.clamp(min, max) as i32
}

fn float_to_int(value: f64, bits: u32) -> i32 {
    let scale = (1i64 << (bits - 1)) as f64;
    let max = scale - 1.0;
    (value.clamp(-1.0, 1.0) * scale).round().clamp(-scale, max) as i32
}

const FIXED_TO_FLOAT: f64 = 1.0 / (1u64 << MIXING_FRACTIONAL_BITS) as f64;

impl OutputSample for u8 {
    const FORMAT: SampleFormat = SampleFormat::Unsigned8;

    fn from_fixed(value: i32) -> Self {
        (fixed_to_int(value, 8) + 0x80) as u8
    }

    fn from_f32(value: f32) -> Self {
        (float_to_int(value as f64, 8) + 0x80) as u8
    }

    fn encode(self, _endian: Endianness, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl OutputSample for i16 {
    const FORMAT: SampleFormat = SampleFormat::Int16;

    fn from_fixed(value: i32) -> Self {
        fixed_to_int(value, 16) as i16
    }

    fn from_f32(value: f32) -> Self {
        float_to_int(value as f64, 16) as i16
    }

    fn encode(self, endian: Endianness, out: &mut Vec<u8>) {
        match endian {
            Endianness::Little => out.extend_from_slice(&self.to_le_bytes()),
            Endianness::Big => out.extend_from_slice(&self.to_be_bytes()),
        }
    }
}

impl OutputSample for I24 {
    const FORMAT: SampleFormat = SampleFormat::Int24;

    fn from_fixed(value: i32) -> Self {
        I24(fixed_to_int(value, 24))
    }

    fn from_f32(value: f32) -> Self {
        I24(float_to_int(value as f64, 24))
    }

    fn encode(self, endian: Endianness, out: &mut Vec<u8>) {
        match endian {
            Endianness::Little => out.extend_from_slice(&self.0.to_le_bytes()[..3]),
            Endianness::Big => out.extend_from_slice(&self.0.to_be_bytes()[1..]),
        }
    }
}

impl OutputSample for i32 {
    const FORMAT: SampleFormat = SampleFormat::Int32;

    fn from_fixed(value: i32) -> Self {
        fixed_to_int(value, 32)
    }

    fn from_f32(value: f32) -> Self {
        float_to_int(value as f64, 32)
    }

    fn encode(self, endian: Endianness, out: &mut Vec<u8>) {
        match endian {
            Endianness::Little => out.extend_from_slice(&self.to_le_bytes()),
            Endianness::Big => out.extend_from_slice(&self.to_be_bytes()),
        }
    }
}

impl OutputSample for f32 {
    const FORMAT: SampleFormat = SampleFormat::Float32;

    fn from_fixed(value: i32) -> Self {
        (value as f64 * FIXED_TO_FLOAT) as f32
    }

    fn from_f32(value: f32) -> Self {
        value
    }

    fn scaled(self, gain: f32) -> Self {
        self * gain
    }

    fn encode(self, endian: Endianness, out: &mut Vec<u8>) {
        match endian {
            Endianness::Little => out.extend_from_slice(&self.to_le_bytes()),
            Endianness::Big => out.extend_from_slice(&self.to_be_bytes()),
        }
    }
}

impl OutputSample for f64 {
    const FORMAT: SampleFormat = SampleFormat::Float64;

    fn from_fixed(value: i32) -> Self {
        value as f64 * FIXED_TO_FLOAT
    }

    fn from_f32(value: f32) -> Self {
        value as f64
    }

    fn scaled(self, gain: f32) -> Self {
        self * gain as f64
    }

    fn encode(self, endian: Endianness, out: &mut Vec<u8>) {
        match endian {
            Endianness::Little => out.extend_from_slice(&self.to_le_bytes()),
            Endianness::Big => out.extend_from_slice(&self.to_be_bytes()),
        }
    }
}

/// Encodes a slice of samples into `out` in the given byte order.
pub fn encode_samples<T: OutputSample>(samples: &[T], endian: Endianness, out: &mut Vec<u8>) {
    out.reserve(samples.len() * T::FORMAT.bytes_per_sample());
    for &sample in samples {
        sample.encode(endian, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ONE: i32 = 1 << MIXING_FRACTIONAL_BITS;

    #[test]
    fn format_metadata() {
        assert_eq!(SampleFormat::Unsigned8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::Int24.bytes_per_sample(), 3);
        assert_eq!(SampleFormat::Float64.bits_per_sample(), 64);
        assert!(SampleFormat::Int32.is_int());
        assert!(SampleFormat::Float32.is_float());
    }

    #[test]
    fn fixed_to_i16_full_scale_saturates() {
        assert_eq!(i16::from_fixed(0), 0);
        assert_eq!(i16::from_fixed(ONE / 2), 16384);
        assert_eq!(i16::from_fixed(ONE), i16::MAX);
        assert_eq!(i16::from_fixed(-ONE), i16::MIN);
        assert_eq!(i16::from_fixed(i32::MAX), i16::MAX);
        assert_eq!(i16::from_fixed(i32::MIN), i16::MIN);
    }

    #[test]
    fn fixed_to_i16_rounds_half_up() {
        let lsb = 1 << (MIXING_FRACTIONAL_BITS + 1 - 16);
        assert_eq!(i16::from_fixed(lsb / 2), 1);
        assert_eq!(i16::from_fixed(lsb / 2 - 1), 0);
        assert_eq!(i16::from_fixed(-lsb / 2), 0);
    }

    #[test]
    fn fixed_to_u8_is_offset_binary() {
        assert_eq!(u8::from_fixed(0), 0x80);
        assert_eq!(u8::from_fixed(ONE), 0xFF);
        assert_eq!(u8::from_fixed(-ONE), 0x00);
    }

    #[test]
    fn fixed_to_i32_shifts_up() {
        assert_eq!(i32::from_fixed(ONE / 2), 1 << 30);
        assert_eq!(i32::from_fixed(ONE), i32::MAX - 15);
        assert_eq!(i32::from_fixed(-ONE), i32::MIN);
    }

    #[test]
    fn fixed_to_float_does_not_clip() {
        assert_relative_eq!(f32::from_fixed(ONE / 4), 0.25);
        assert_relative_eq!(f64::from_fixed(ONE * 8), 8.0);
        assert_relative_eq!(f64::from_fixed(-ONE * 3), -3.0);
    }

    #[test]
    fn i24_encoding_both_orders() {
        let sample = I24::new(0x123456);
        let mut le = Vec::new();
        sample.encode(Endianness::Little, &mut le);
        assert_eq!(le, vec![0x56, 0x34, 0x12]);

        let mut be = Vec::new();
        sample.encode(Endianness::Big, &mut be);
        assert_eq!(be, vec![0x12, 0x34, 0x56]);

        let negative = I24::new(-1);
        let mut out = Vec::new();
        negative.encode(Endianness::Little, &mut out);
        assert_eq!(out, vec![0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn i24_new_saturates() {
        assert_eq!(I24::new(1 << 30).get(), I24::MAX);
        assert_eq!(I24::new(-(1 << 30)).get(), I24::MIN);
    }

    #[test]
    fn from_f32_clamps() {
        assert_eq!(i16::from_f32(2.0), i16::MAX);
        assert_eq!(i16::from_f32(-2.0), i16::MIN);
        assert_eq!(i16::from_f32(0.5), 16384);
        assert_eq!(u8::from_f32(0.0), 0x80);
    }

    #[test]
    fn encode_samples_respects_endianness() {
        let mut out = Vec::new();
        encode_samples(&[1i16, -2], Endianness::Big, &mut out);
        assert_eq!(out, vec![0x00, 0x01, 0xFF, 0xFE]);
    }
}
