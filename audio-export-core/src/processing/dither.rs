use crate::models::dither_mode::DitherMode;
use crate::models::sample_format::MIXING_FRACTIONAL_BITS;

const DITHER_SEED: u32 = 0x2545_F491;

/// Dither engine operating on the fixed-point mix buffer.
///
/// Noise is injected at one LSB of the target bit depth before the render
/// sink truncates the buffer. In triangular mode the quantization error of
/// each channel is fed back into the next sample of that channel, so the
/// engine must live for the whole export: recreating it between chunks
/// makes the noise statistics discontinuous.
///
/// One engine belongs to exactly one render sink.
#[derive(Debug, Clone)]
pub struct Dither {
    mode: DitherMode,
    error: Vec<i64>,
    rng: u32,
}

impl Dither {
    pub fn new(mode: DitherMode, channels: usize) -> Self {
        Self {
            mode,
            error: vec![0; channels],
            rng: DITHER_SEED,
        }
    }

    pub fn mode(&self) -> DitherMode {
        self.mode
    }

    /// Dithers `frames` interleaved frames of `buffer` in place for a
    /// `target_bits` integer output.
    ///
    /// Targets at or above the mixer precision need no dither and are left
    /// untouched.
    pub fn process(&mut self, buffer: &mut [i32], frames: usize, channels: usize, target_bits: u32) {
        if self.mode == DitherMode::None || channels == 0 || target_bits == 0 || target_bits > MIXING_FRACTIONAL_BITS
        {
            return;
        }
        if self.error.len() < channels {
            self.error.resize(channels, 0);
        }

        let shift = MIXING_FRACTIONAL_BITS + 1 - target_bits;
        let lsb = 1i64 << shift;
        let samples = &mut buffer[..frames * channels];

        for frame in samples.chunks_exact_mut(channels) {
            for (channel, sample) in frame.iter_mut().enumerate() {
                let value = *sample as i64;
                *sample = match self.mode {
                    DitherMode::None => *sample,
                    DitherMode::Rectangular => {
                        let noise = self.next_lsb_fraction(shift) - lsb / 2;
                        saturate(value + noise)
                    }
                    DitherMode::Triangular => {
                        let noise = self.next_lsb_fraction(shift) - self.next_lsb_fraction(shift);
                        let shaped = value - self.error[channel];
                        let wanted = shaped + noise;
                        let quantized = quantize(wanted, shift, target_bits);
                        self.error[channel] = (quantized - wanted).clamp(-lsb, lsb);
                        saturate(quantized)
                    }
                };
            }
        }
    }

    /// Uniform value in `[0, 1 << shift)`.
    fn next_lsb_fraction(&mut self, shift: u32) -> i64 {
        // xorshift32
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 17;
        self.rng ^= self.rng << 5;
        (self.rng >> (32 - shift)) as i64
    }
}

/// Rounds to the target grid the same way the sample conversion does.
fn quantize(value: i64, shift: u32, target_bits: u32) -> i64 {
    let max = ((1i64 << (target_bits - 1)) - 1) << shift;
    let min = -(1i64 << (target_bits - 1)) << shift;
    (((value + (1i64 << (shift - 1))) >> shift) << shift).clamp(min, max)
}

fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_format::OutputSample;

    fn render_i16(dither: &mut Dither, buffer: &mut [i32], channels: usize) -> Vec<i16> {
        let frames = buffer.len() / channels;
        dither.process(buffer, frames, channels, 16);
        buffer.iter().map(|&s| i16::from_fixed(s)).collect()
    }

    #[test]
    fn none_mode_leaves_buffer_untouched() {
        let mut dither = Dither::new(DitherMode::None, 2);
        let mut buffer = vec![123, -456, 789, -1011];
        dither.process(&mut buffer, 2, 2, 16);
        assert_eq!(buffer, vec![123, -456, 789, -1011]);
    }

    #[test]
    fn high_resolution_targets_are_not_dithered() {
        let mut dither = Dither::new(DitherMode::Triangular, 1);
        let mut buffer = vec![1, 2, 3];
        dither.process(&mut buffer, 3, 1, 32);
        assert_eq!(buffer, vec![1, 2, 3]);
    }

    #[test]
    fn triangular_dither_is_unbiased_on_silence() {
        let channels = 2;
        let mut dither = Dither::new(DitherMode::Triangular, channels);
        let mut total: i64 = 0;
        let mut count: i64 = 0;
        for _ in 0..100 {
            let mut buffer = vec![0i32; 1000 * channels];
            let out = render_i16(&mut dither, &mut buffer, channels);
            total += out.iter().map(|&s| s as i64).sum::<i64>();
            count += out.len() as i64;
        }
        let mean = total as f64 / count as f64;
        assert!(mean.abs() < 0.02, "mean quantization error {} LSB", mean);
    }

    #[test]
    fn dither_noise_stays_within_a_few_lsb() {
        let mut dither = Dither::new(DitherMode::Triangular, 1);
        let mut buffer = vec![0i32; 10_000];
        let out = render_i16(&mut dither, &mut buffer, 1);
        assert!(out.iter().all(|s| s.abs() <= 3));
        assert!(out.iter().any(|&s| s != 0));
    }

    #[test]
    fn rectangular_dither_stays_within_one_lsb() {
        let mut dither = Dither::new(DitherMode::Rectangular, 1);
        let mut buffer = vec![0i32; 10_000];
        let out = render_i16(&mut dither, &mut buffer, 1);
        assert!(out.iter().all(|s| s.abs() <= 1));
    }

    #[test]
    fn chunked_processing_matches_single_pass() {
        let input: Vec<i32> = (0..4096).map(|i| (i * 7919) % 200_000 - 100_000).collect();

        let mut whole = input.clone();
        let mut single = Dither::new(DitherMode::Triangular, 2);
        single.process(&mut whole, 2048, 2, 16);

        let mut chunked = input;
        let mut engine = Dither::new(DitherMode::Triangular, 2);
        let (first, rest) = chunked.split_at_mut(300 * 2);
        engine.process(first, 300, 2, 16);
        engine.process(rest, 1748, 2, 16);

        assert_eq!(whole, chunked);
    }

    #[test]
    fn full_scale_input_does_not_wrap() {
        let mut dither = Dither::new(DitherMode::Triangular, 1);
        let mut buffer = vec![i32::MAX; 64];
        let out = render_i16(&mut dither, &mut buffer, 1);
        assert!(out.iter().all(|&s| s == i16::MAX));
    }
}
