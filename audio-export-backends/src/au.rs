use audio_export_core::models::encoder_traits::{EncoderTraits, Mode, ModeSet};
use audio_export_core::models::error::ExportError;
use audio_export_core::models::sample_format::{Endianness, SampleFormat};
use audio_export_core::models::settings::Settings;
use audio_export_core::models::tags::FileTags;
use audio_export_core::storage::stream_writer::{OutputStream, PositionMarker, StreamWriterBase};
use audio_export_core::traits::encoder_factory::EncoderFactory;
use audio_export_core::traits::stream_encoder::StreamEncoder;

use crate::pcm::{encode_float_as, enumerate_formats, find_format};
use crate::settings::DEFAULT_AU_PADDING_ALIGN_HINT;
use crate::tables::PCM_SAMPLERATES;

const AU_MAGIC: &[u8; 4] = b".snd";
/// Fixed header fields before the annotation.
const AU_HEADER_SIZE: usize = 24;
/// Minimum annotation size mandated by the format.
const AU_MIN_ANNOTATION: usize = 4;
const AU_MAX_CHANNELS: u16 = 4;

const AU_SAMPLE_FORMATS: &[SampleFormat] = &[
    SampleFormat::Int16,
    SampleFormat::Int24,
    SampleFormat::Int32,
    SampleFormat::Float32,
    SampleFormat::Float64,
];

/// Sun/NeXT AU encoding code for a sample format. AU has no unsigned 8-bit
/// linear encoding.
pub fn au_encoding(format: SampleFormat) -> Option<u32> {
    match format {
        SampleFormat::Unsigned8 => None,
        SampleFormat::Int16 => Some(3),
        SampleFormat::Int24 => Some(4),
        SampleFormat::Int32 => Some(5),
        SampleFormat::Float32 => Some(6),
        SampleFormat::Float64 => Some(7),
    }
}

/// Sun AU backend, big endian. Always available.
pub struct AuFactory {
    traits: EncoderTraits,
    padding_align_hint: u32,
}

impl AuFactory {
    pub fn new() -> Self {
        Self::with_padding_align_hint(DEFAULT_AU_PADDING_ALIGN_HINT)
    }

    /// Pads the header so audio data starts at a multiple of `hint` bytes.
    pub fn with_padding_align_hint(hint: u32) -> Self {
        let formats = enumerate_formats(PCM_SAMPLERATES, AU_MAX_CHANNELS, AU_SAMPLE_FORMATS);
        let default_format = find_format(&formats, 44100, 2, SampleFormat::Int16).unwrap_or(0);
        Self {
            traits: EncoderTraits {
                file_extension: "au".into(),
                file_short_description: "AU".into(),
                encoder_settings_name: "AU".into(),
                file_description: "Sun/NeXT Audio".into(),
                encoder_name: "AU".into(),
                description: "Sun/NeXT Audio File Format".into(),
                can_tags: true,
                can_cues: false,
                max_channels: AU_MAX_CHANNELS,
                sample_rates: PCM_SAMPLERATES.to_vec(),
                modes: ModeSet::from(Mode::Enumerated),
                formats,
                default_sample_rate: 44100,
                default_channels: 2,
                default_mode: Mode::Enumerated,
                default_format,
                ..Default::default()
            },
            padding_align_hint: hint,
        }
    }

    pub fn padding_align_hint(&self) -> u32 {
        self.padding_align_hint
    }
}

impl Default for AuFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderFactory for AuFactory {
    fn traits(&self) -> &EncoderTraits {
        &self.traits
    }

    fn is_available(&self) -> bool {
        true
    }

    fn make_stream_encoder<'a>(
        &self,
        stream: &'a mut dyn OutputStream,
        settings: &Settings,
        tags: &FileTags,
    ) -> Result<Box<dyn StreamEncoder + 'a>, ExportError> {
        let format = settings
            .enumerated_format(&self.traits)
            .ok_or_else(|| ExportError::InvalidSettings(format!("no AU format at index {}", settings.format)))?;
        let annotation = if settings.tags { annotation(tags) } else { String::new() };
        let encoder = AuEncoder::new(
            stream,
            format.sample_rate,
            format.channels,
            format.sample_format,
            &annotation,
            self.padding_align_hint,
        )?;
        Ok(Box::new(encoder))
    }
}

/// `name=value` lines for the header annotation.
fn annotation(tags: &FileTags) -> String {
    tags.fields().map(|(name, value)| format!("{}={}\n", name, value)).collect()
}

/// Size of the header including annotation and padding.
fn header_size(annotation_len: usize, align_hint: u32) -> usize {
    // NUL terminated, at least four bytes, 8-byte aligned.
    let annotation = (annotation_len + 1).max(AU_MIN_ANNOTATION);
    let unaligned = (AU_HEADER_SIZE + annotation).next_multiple_of(8);
    if align_hint == 0 {
        unaligned
    } else {
        unaligned.next_multiple_of(align_hint as usize)
    }
}

/// Streaming AU writer. The data size field is patched at finish.
pub struct AuEncoder<'a> {
    base: StreamWriterBase<'a>,
    sample_format: SampleFormat,
    block_align: usize,
    data_size: Option<PositionMarker>,
    data_bytes: u64,
    finished: bool,
}

impl<'a> AuEncoder<'a> {
    pub fn new(
        stream: &'a mut dyn OutputStream,
        sample_rate: u32,
        channels: u16,
        sample_format: SampleFormat,
        annotation: &str,
        padding_align_hint: u32,
    ) -> Result<Self, ExportError> {
        let encoding = au_encoding(sample_format)
            .ok_or_else(|| ExportError::InvalidSettings(format!("AU cannot store {:?}", sample_format)))?;
        let data_offset = header_size(annotation.len(), padding_align_hint);

        let mut base = StreamWriterBase::new(stream)?;
        base.append(AU_MAGIC)?;
        base.append(&(data_offset as u32).to_be_bytes())?;
        let data_size = base.reserve(4)?;
        base.append(&encoding.to_be_bytes())?;
        base.append(&sample_rate.to_be_bytes())?;
        base.append(&(channels as u32).to_be_bytes())?;
        base.append(annotation.as_bytes())?;
        base.append(&vec![0u8; data_offset - AU_HEADER_SIZE - annotation.len()])?;

        log::debug!("AU header written: {} bytes, encoding {}", data_offset, encoding);
        Ok(Self {
            base,
            sample_format,
            block_align: channels as usize * sample_format.bytes_per_sample(),
            data_size: Some(data_size),
            data_bytes: 0,
            finished: false,
        })
    }

    fn append_data(&mut self, frames: usize, data: &[u8]) -> Result<(), ExportError> {
        if data.len() != frames * self.block_align {
            return Err(ExportError::InvalidState(format!(
                "{} bytes for {} frames of {} bytes",
                data.len(),
                frames,
                self.block_align
            )));
        }
        self.base.write_interleaved_converted(frames, data)?;
        self.data_bytes += data.len() as u64;
        Ok(())
    }
}

impl StreamEncoder for AuEncoder<'_> {
    fn converted_endianness(&self) -> Endianness {
        Endianness::Big
    }

    fn converted_format(&self) -> SampleFormat {
        self.sample_format
    }

    fn write_interleaved(&mut self, frames: usize, interleaved: &[f32]) -> Result<(), ExportError> {
        let mut bytes = Vec::with_capacity(interleaved.len() * self.sample_format.bytes_per_sample());
        encode_float_as(self.sample_format, interleaved, Endianness::Big, &mut bytes);
        self.append_data(frames, &bytes)
    }

    fn write_interleaved_converted(&mut self, frames: usize, data: &[u8]) -> Result<(), ExportError> {
        self.append_data(frames, data)
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if let Some(marker) = self.data_size.take() {
            // 0xFFFFFFFF means "unknown" to readers.
            let size = u32::try_from(self.data_bytes).unwrap_or(u32::MAX);
            self.base.patch(marker, &size.to_be_bytes())?;
        }
        self.base.finish()
    }
}

impl Drop for AuEncoder<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("Failed to finalize AU file: {}", e);
        }
    }
}
