use crate::models::encoder_traits::{EncoderTraits, Mode};
use crate::models::error::ExportError;
use crate::models::settings::Settings;
use crate::models::tags::FileTags;
use crate::storage::stream_writer::OutputStream;
use crate::traits::stream_encoder::StreamEncoder;

/// One export backend.
///
/// Implemented by every concrete encoder family. Callers pick a factory
/// from the registry, build [`Settings`] from its traits, and construct one
/// [`StreamEncoder`] per export without knowing which backend is behind it.
///
/// A factory whose runtime dependency is missing still answers every query
/// for display, but refuses to construct encoders.
pub trait EncoderFactory {
    /// Static capabilities of this backend.
    fn traits(&self) -> &EncoderTraits;

    /// Whether the backend's runtime dependency is present.
    fn is_available(&self) -> bool;

    /// Backend-specific construction. Called by
    /// [`construct_stream_encoder`](Self::construct_stream_encoder) after
    /// availability and settings have been checked.
    fn make_stream_encoder<'a>(
        &self,
        stream: &'a mut dyn OutputStream,
        settings: &Settings,
        tags: &FileTags,
    ) -> Result<Box<dyn StreamEncoder + 'a>, ExportError>;

    /// Constructs an encoder writing into `stream` from its current
    /// position.
    ///
    /// Fails with `BackendUnavailable` when the runtime dependency is
    /// missing, `InvalidSettings` when `settings` are outside this backend's
    /// traits, and `ConstructionFailure` when the stream or codec cannot be
    /// initialized.
    fn construct_stream_encoder<'a>(
        &self,
        stream: &'a mut dyn OutputStream,
        settings: &Settings,
        tags: &FileTags,
    ) -> Result<Box<dyn StreamEncoder + 'a>, ExportError> {
        let traits = self.traits();
        if !self.is_available() {
            return Err(ExportError::BackendUnavailable(traits.encoder_name.clone()));
        }
        settings.validate(traits)?;

        log::info!(
            "Constructing {} encoder: {} Hz, {} ch, mode {}",
            traits.encoder_name,
            settings.sample_rate,
            settings.channels,
            settings.mode
        );
        self.make_stream_encoder(stream, settings, tags).map_err(|e| match e {
            ExportError::Io(msg) | ExportError::Codec(msg) => ExportError::ConstructionFailure(msg),
            other => other,
        })
    }

    /// Whether `bitrate` (kbit/s) can be used at the given sample rate and
    /// channel count.
    fn is_bitrate_supported(&self, sample_rate: u32, channels: u16, bitrate: u32) -> bool {
        let traits = self.traits();
        if traits.bitrates.contains(&bitrate) {
            return true;
        }
        traits.modes.contains(Mode::Enumerated)
            && traits
                .formats
                .iter()
                .any(|format| format.matches(sample_rate, channels) && format.bitrate == bitrate)
    }

    fn describe_quality(&self, quality: f32) -> String {
        format!("VBR {}%", (quality * 100.0).round() as i32)
    }

    fn describe_bitrate_vbr(&self, bitrate: u32) -> String {
        format!("VBR {} kbit", bitrate)
    }

    fn describe_bitrate_abr(&self, bitrate: u32) -> String {
        format!("ABR {} kbit", bitrate)
    }

    fn describe_bitrate_cbr(&self, bitrate: u32) -> String {
        format!("CBR {} kbit", bitrate)
    }
}
