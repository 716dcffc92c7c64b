use crate::models::sample_format::OutputSample;
use crate::processing::conversion::{
    apply_gain_fixed, apply_gain_float, convert_fixed_point_to_interleaved, convert_fixed_point_to_planar,
    gain_to_fixed,
};
use crate::processing::dither::Dither;

/// Maximum number of planar destinations a render sink accepts.
pub const MAX_PLANAR_CHANNELS: usize = 4;

/// Receiver of fixed-point mix chunks produced by the mixing engine.
pub trait ReadTarget {
    /// Consumes `frames` interleaved frames of `channels` channels.
    ///
    /// The mix buffer may be modified in place (dither, gain).
    fn data_callback(&mut self, mix: &mut [i32], channels: usize, frames: usize);
}

/// Render sink converting mix chunks into `T` samples.
///
/// Writes into an interleaved destination, up to [`MAX_PLANAR_CHANNELS`]
/// planar destinations, or both. Every call appends after the frames
/// rendered by previous calls; a sink is used for one export and then
/// dropped.
///
/// # Panics
///
/// `data_callback` panics if a destination is too short for the frames
/// rendered so far, or if planar destinations are configured with fewer
/// buffers than channels.
pub struct ReadTargetBuffer<'a, T: OutputSample> {
    rendered: usize,
    dither: &'a mut Dither,
    output: Option<&'a mut [T]>,
    outputs: Vec<&'a mut [T]>,
}

impl<'a, T: OutputSample> ReadTargetBuffer<'a, T> {
    pub fn new(dither: &'a mut Dither, output: Option<&'a mut [T]>, outputs: Vec<&'a mut [T]>) -> Self {
        assert!(
            outputs.len() <= MAX_PLANAR_CHANNELS,
            "at most {} planar destinations are supported",
            MAX_PLANAR_CHANNELS
        );
        Self {
            rendered: 0,
            dither,
            output,
            outputs,
        }
    }

    pub fn interleaved(dither: &'a mut Dither, output: &'a mut [T]) -> Self {
        Self::new(dither, Some(output), Vec::new())
    }

    pub fn planar(dither: &'a mut Dither, outputs: Vec<&'a mut [T]>) -> Self {
        Self::new(dither, None, outputs)
    }

    /// Frames rendered so far.
    pub fn rendered_count(&self) -> usize {
        self.rendered
    }
}

impl<T: OutputSample> ReadTarget for ReadTargetBuffer<'_, T> {
    fn data_callback(&mut self, mix: &mut [i32], channels: usize, frames: usize) {
        let mix = &mut mix[..channels * frames];

        if T::FORMAT.is_int() {
            self.dither.process(mix, frames, channels, T::FORMAT.bits_per_sample());
        }

        if let Some(output) = self.output.as_deref_mut() {
            let start = self.rendered * channels;
            convert_fixed_point_to_interleaved(&mut output[start..start + channels * frames], mix, channels, frames);
        }

        if !self.outputs.is_empty() {
            assert!(
                self.outputs.len() >= channels,
                "{} planar destinations for {} channels",
                self.outputs.len(),
                channels
            );
            let start = self.rendered;
            for (channel, output) in self.outputs.iter_mut().take(channels).enumerate() {
                convert_fixed_point_to_planar(&mut output[start..start + frames], mix, channel, channels, frames);
            }
        }

        self.rendered += frames;
    }
}

/// Render sink applying a final output gain.
///
/// Integer output gets the gain on the fixed-point buffer before dithering
/// and conversion, so the dither sees the signal that is actually
/// quantized. Float output gets the gain after conversion; the fixed-point
/// buffer has limited headroom and would clip for large gains or lose
/// precision for small ones.
pub struct ReadTargetGainBuffer<'a, T: OutputSample> {
    base: ReadTargetBuffer<'a, T>,
    gain: f32,
}

impl<'a, T: OutputSample> ReadTargetGainBuffer<'a, T> {
    pub fn new(base: ReadTargetBuffer<'a, T>, gain: f32) -> Self {
        Self { base, gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn rendered_count(&self) -> usize {
        self.base.rendered_count()
    }
}

impl<T: OutputSample> ReadTarget for ReadTargetGainBuffer<'_, T> {
    fn data_callback(&mut self, mix: &mut [i32], channels: usize, frames: usize) {
        let offset = self.base.rendered_count();

        if T::FORMAT.is_int() {
            apply_gain_fixed(&mut mix[..channels * frames], gain_to_fixed(self.gain));
        }

        self.base.data_callback(mix, channels, frames);

        if T::FORMAT.is_float() {
            if let Some(output) = self.base.output.as_deref_mut() {
                apply_gain_float(&mut output[offset * channels..(offset + frames) * channels], self.gain);
            }
            for output in self.base.outputs.iter_mut().take(channels) {
                apply_gain_float(&mut output[offset..offset + frames], self.gain);
            }
        }
    }
}
