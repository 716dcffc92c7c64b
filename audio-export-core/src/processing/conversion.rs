//! Fixed-point mix buffer conversion and gain helpers.

use crate::models::sample_format::OutputSample;

/// Converts `frames` interleaved fixed-point frames into `dst`.
pub fn convert_fixed_point_to_interleaved<T: OutputSample>(dst: &mut [T], src: &[i32], channels: usize, frames: usize) {
    let count = channels * frames;
    for (out, &sample) in dst[..count].iter_mut().zip(&src[..count]) {
        *out = T::from_fixed(sample);
    }
}

/// Converts one channel of `frames` interleaved fixed-point frames into a
/// planar destination.
pub fn convert_fixed_point_to_planar<T: OutputSample>(
    dst: &mut [T],
    src: &[i32],
    channel: usize,
    channels: usize,
    frames: usize,
) {
    let frames_in = src[..channels * frames].chunks_exact(channels);
    for (out, frame) in dst[..frames].iter_mut().zip(frames_in) {
        *out = T::from_fixed(frame[channel]);
    }
}

/// Converts a float gain to 16.16 fixed point.
pub fn gain_to_fixed(gain: f32) -> i32 {
    (gain as f64 * 65536.0).round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

/// Applies a 16.16 fixed-point gain to a fixed-point mix buffer, saturating.
pub fn apply_gain_fixed(buffer: &mut [i32], gain_16_16: i32) {
    if gain_16_16 == 1 << 16 {
        return;
    }
    for sample in buffer {
        let scaled = (*sample as i64 * gain_16_16 as i64 + (1 << 15)) >> 16;
        *sample = scaled.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    }
}

/// Applies a gain to already converted float samples.
pub fn apply_gain_float<T: OutputSample>(buffer: &mut [T], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for sample in buffer {
        *sample = sample.scaled(gain);
    }
}
