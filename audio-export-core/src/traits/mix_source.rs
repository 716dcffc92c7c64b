/// Producer of fixed-point mix data, normally the mixing engine.
///
/// Samples use [`MIXING_FRACTIONAL_BITS`](crate::models::sample_format::MIXING_FRACTIONAL_BITS)
/// fractional bits and are interleaved per frame.
pub trait MixSource {
    /// Number of interleaved channels produced.
    fn channels(&self) -> usize;

    /// Renders up to `max_frames` frames into `mix` and returns how many
    /// were produced. Zero means the source is exhausted.
    fn read(&mut self, mix: &mut [i32], max_frames: usize) -> usize;
}
