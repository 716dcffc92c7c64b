use crate::models::error::ExportError;
use crate::models::sample_format::{Endianness, SampleFormat};

/// Active encoder for one export.
///
/// Lifecycle: constructed → any number of writes → [`finish`](Self::finish).
/// An encoder only writes into a stream it borrows; it never opens or closes
/// it.
///
/// A session uses exactly one of the two write methods. Mixing
/// `write_interleaved` and `write_interleaved_converted` on one encoder is
/// not supported and the resulting file is unspecified.
///
/// Implementations must make `Drop` finish an encoder that was not finished
/// explicitly, logging any error, since `Drop` cannot report it. Callers
/// that skip `finish` give up error detection for the final flush.
pub trait StreamEncoder {
    /// Byte order `write_interleaved_converted` expects. Data in any other
    /// order produces a corrupt file, not an error.
    fn converted_endianness(&self) -> Endianness;

    /// Sample representation `write_interleaved_converted` expects.
    fn converted_format(&self) -> SampleFormat;

    /// Writes `frames` interleaved frames of native-range floats. The
    /// encoder quantizes internally.
    fn write_interleaved(&mut self, frames: usize, interleaved: &[f32]) -> Result<(), ExportError>;

    /// Writes `frames` interleaved frames already converted to
    /// [`converted_format`](Self::converted_format) in
    /// [`converted_endianness`](Self::converted_endianness).
    fn write_interleaved_converted(&mut self, frames: usize, data: &[u8]) -> Result<(), ExportError>;

    /// Records cue points, in frames from the start of the export.
    /// Backends without cue support accept and ignore them.
    fn write_cues(&mut self, cues: &[u64]) -> Result<(), ExportError> {
        let _ = cues;
        Ok(())
    }

    /// Flushes buffered data and finalizes container headers/trailers.
    fn finish(&mut self) -> Result<(), ExportError>;
}
