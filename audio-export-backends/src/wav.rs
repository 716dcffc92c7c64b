use audio_export_core::models::encoder_traits::{EncoderTraits, Mode, ModeSet};
use audio_export_core::models::error::ExportError;
use audio_export_core::models::sample_format::{Endianness, SampleFormat};
use audio_export_core::models::settings::Settings;
use audio_export_core::models::tags::FileTags;
use audio_export_core::storage::stream_writer::{OutputStream, PositionMarker, StreamWriterBase};
use audio_export_core::traits::encoder_factory::EncoderFactory;
use audio_export_core::traits::stream_encoder::StreamEncoder;

use crate::pcm::{encode_float_as, enumerate_formats, find_format};
use crate::tables::PCM_SAMPLERATES;
use crate::wav_format;

const WAV_MAX_CHANNELS: u16 = 4;

const WAV_SAMPLE_FORMATS: &[SampleFormat] = &[
    SampleFormat::Unsigned8,
    SampleFormat::Int16,
    SampleFormat::Int24,
    SampleFormat::Int32,
    SampleFormat::Float32,
    SampleFormat::Float64,
];

/// Uncompressed RIFF/WAVE backend. Always available.
pub struct WavFactory {
    traits: EncoderTraits,
}

impl WavFactory {
    pub fn new() -> Self {
        let formats = enumerate_formats(PCM_SAMPLERATES, WAV_MAX_CHANNELS, WAV_SAMPLE_FORMATS);
        let default_format = find_format(&formats, 44100, 2, SampleFormat::Int16).unwrap_or(0);
        Self {
            traits: EncoderTraits {
                file_extension: "wav".into(),
                file_short_description: "Wave".into(),
                encoder_settings_name: "Wav".into(),
                file_description: "Wave Audio".into(),
                encoder_name: "WAV".into(),
                description: "Microsoft RIFF Wave".into(),
                can_tags: true,
                can_cues: true,
                max_channels: WAV_MAX_CHANNELS,
                sample_rates: PCM_SAMPLERATES.to_vec(),
                modes: ModeSet::from(Mode::Enumerated),
                formats,
                default_sample_rate: 44100,
                default_channels: 2,
                default_mode: Mode::Enumerated,
                default_format,
                ..Default::default()
            },
        }
    }
}

impl Default for WavFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderFactory for WavFactory {
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
            .ok_or_else(|| ExportError::InvalidSettings(format!("no WAV format at index {}", settings.format)))?;
        let tags = settings.tags.then_some(tags);
        let encoder = WavEncoder::new(
            stream,
            format.sample_rate,
            format.channels,
            format.sample_format,
            tags,
            settings.cues,
        )?;
        Ok(Box::new(encoder))
    }
}

/// Streaming WAV writer.
///
/// RIFF and data sizes are reserved up front and patched at finish, so the
/// stream must be seekable but is otherwise written strictly in order.
pub struct WavEncoder<'a> {
    base: StreamWriterBase<'a>,
    sample_format: SampleFormat,
    block_align: usize,
    riff_size: Option<PositionMarker>,
    data_size: Option<PositionMarker>,
    data_bytes: u64,
    cues_enabled: bool,
    cues: Vec<u64>,
    finished: bool,
}

impl<'a> WavEncoder<'a> {
    pub fn new(
        stream: &'a mut dyn OutputStream,
        sample_rate: u32,
        channels: u16,
        sample_format: SampleFormat,
        tags: Option<&FileTags>,
        cues_enabled: bool,
    ) -> Result<Self, ExportError> {
        let mut base = StreamWriterBase::new(stream)?;
        base.append(b"RIFF")?;
        let riff_size = base.reserve(4)?;
        base.append(b"WAVE")?;
        base.append(&wav_format::fmt_chunk(sample_rate, channels, sample_format))?;
        if let Some(info) = tags.and_then(wav_format::info_chunk) {
            base.append(&info)?;
        }
        base.append(b"data")?;
        let data_size = base.reserve(4)?;

        log::debug!(
            "WAV header written: {} Hz, {} ch, {:?}",
            sample_rate,
            channels,
            sample_format
        );
        Ok(Self {
            base,
            sample_format,
            block_align: channels as usize * sample_format.bytes_per_sample(),
            riff_size: Some(riff_size),
            data_size: Some(data_size),
            data_bytes: 0,
            cues_enabled,
            cues: Vec::new(),
            finished: false,
        })
    }

    /// Audio bytes written so far.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
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

impl StreamEncoder for WavEncoder<'_> {
    fn converted_endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn converted_format(&self) -> SampleFormat {
        self.sample_format
    }

    fn write_interleaved(&mut self, frames: usize, interleaved: &[f32]) -> Result<(), ExportError> {
        let mut bytes = Vec::with_capacity(interleaved.len() * self.sample_format.bytes_per_sample());
        encode_float_as(self.sample_format, interleaved, Endianness::Little, &mut bytes);
        self.append_data(frames, &bytes)
    }

    fn write_interleaved_converted(&mut self, frames: usize, data: &[u8]) -> Result<(), ExportError> {
        self.append_data(frames, data)
    }

    fn write_cues(&mut self, cues: &[u64]) -> Result<(), ExportError> {
        if self.cues_enabled {
            self.cues.extend_from_slice(cues);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let data_size = u32::try_from(self.data_bytes)
            .map_err(|_| ExportError::Io(format!("WAV data of {} bytes exceeds 4 GiB", self.data_bytes)))?;
        if self.data_bytes % 2 == 1 {
            self.base.append(&[0])?;
        }
        if let Some(marker) = self.data_size.take() {
            self.base.patch(marker, &data_size.to_le_bytes())?;
        }
        if !self.cues.is_empty() {
            self.base.append(&wav_format::cue_chunk(&self.cues))?;
        }
        if let Some(marker) = self.riff_size.take() {
            let riff_size = u32::try_from(self.base.bytes_written() - 8)
                .map_err(|_| ExportError::Io("RIFF size exceeds 4 GiB".into()))?;
            self.base.patch(marker, &riff_size.to_le_bytes())?;
        }
        self.base.finish()
    }
}

impl Drop for WavEncoder<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("Failed to finalize WAV file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn export(settings: &Settings, tags: &FileTags, frames: &[f32], cues: &[u64]) -> Vec<u8> {
        let factory = WavFactory::new();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = factory.construct_stream_encoder(&mut cursor, settings, tags).unwrap();
            let channels = settings.channels as usize;
            encoder.write_interleaved(frames.len() / channels, frames).unwrap();
            encoder.write_cues(cues).unwrap();
            encoder.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn find_id(bytes: &[u8], id: &[u8; 4]) -> Option<usize> {
        bytes.windows(4).position(|w| w == id)
    }

    fn settings_for(sample_rate: u32, channels: u16, format: SampleFormat) -> Settings {
        let factory = WavFactory::new();
        let traits = factory.traits();
        Settings {
            sample_rate,
            channels,
            format: find_format(&traits.formats, sample_rate, channels, format).unwrap(),
            ..Settings::defaults(traits)
        }
    }

    #[test]
    fn traits_are_consistent() {
        let factory = WavFactory::new();
        factory.traits().validate().unwrap();
        let defaults = Settings::defaults(factory.traits());
        let format = defaults.enumerated_format(factory.traits()).unwrap();
        assert_eq!(format.sample_format, SampleFormat::Int16);
        assert!(format.matches(44100, 2));
    }

    #[test]
    fn sixteen_bit_stereo_reads_back_with_hound() {
        let settings = settings_for(44100, 2, SampleFormat::Int16);
        let bytes = export(&settings, &FileTags::default(), &[0.5, -0.5, 0.25, -1.0], &[]);

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let header = reader.spec();
        assert_eq!(header.channels, 2);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.sample_format, hound::SampleFormat::Int);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![16384, -16384, 8192, -32768]);
    }

    #[test]
    fn float_output_reads_back_with_hound() {
        let settings = settings_for(48000, 1, SampleFormat::Float32);
        let bytes = export(&settings, &FileTags::default(), &[0.125, -0.75, 1.5], &[]);

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.125, -0.75, 1.5]);
    }

    #[test]
    fn sizes_are_patched() {
        let settings = settings_for(44100, 1, SampleFormat::Unsigned8);
        let bytes = export(&settings, &FileTags::default(), &[0.0, 0.0, 0.0], &[]);
        // 12 (RIFF) + 24 (fmt) + 8 (data hdr) + 3 data + 1 pad
        assert_eq!(bytes.len(), 48);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 40);
        assert_eq!(u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]), 3);
        assert_eq!(&bytes[44..], &[0x80, 0x80, 0x80, 0]);
    }

    #[test]
    fn tags_and_cues_are_written_when_enabled() {
        let settings = settings_for(44100, 2, SampleFormat::Int24);
        let tags = FileTags {
            title: "Tune".into(),
            artist: "Someone".into(),
            ..Default::default()
        };
        let bytes = export(&settings, &tags, &[0.0; 8], &[0, 2]);

        assert!(find_id(&bytes, b"LIST").is_some());
        assert!(find_id(&bytes, b"INAM").is_some());
        let cue = find_id(&bytes, b"cue ").unwrap();
        assert!(cue > find_id(&bytes, b"data").unwrap());

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 24);
        assert_eq!(reader.duration(), 4);
    }

    #[test]
    fn tags_and_cues_skipped_when_disabled() {
        let settings = Settings {
            tags: false,
            cues: false,
            ..settings_for(44100, 2, SampleFormat::Int16)
        };
        let tags = FileTags {
            title: "Tune".into(),
            ..Default::default()
        };
        let bytes = export(&settings, &tags, &[0.0; 4], &[1]);
        assert!(find_id(&bytes, b"LIST").is_none());
        assert!(find_id(&bytes, b"cue ").is_none());
    }

    #[test]
    fn converted_writes_are_chunking_independent() {
        let settings = settings_for(44100, 2, SampleFormat::Int16);
        let data: Vec<u8> = (0..400u32).map(|i| (i * 7) as u8).collect();
        let render = |chunk_frames: usize| {
            let factory = WavFactory::new();
            let mut cursor = Cursor::new(Vec::new());
            {
                let mut encoder = factory
                    .construct_stream_encoder(&mut cursor, &settings, &FileTags::default())
                    .unwrap();
                for chunk in data.chunks(chunk_frames * 4) {
                    encoder.write_interleaved_converted(chunk.len() / 4, chunk).unwrap();
                }
                encoder.finish().unwrap();
            }
            cursor.into_inner()
        };
        assert_eq!(render(100), render(1));
        assert_eq!(render(3), render(100));
    }

    #[test]
    fn dropped_encoder_still_produces_valid_file() {
        let settings = settings_for(44100, 1, SampleFormat::Int16);
        let factory = WavFactory::new();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = factory
                .construct_stream_encoder(&mut cursor, &settings, &FileTags::default())
                .unwrap();
            encoder.write_interleaved(2, &[0.5, 0.5]).unwrap();
        }
        let reader = hound::WavReader::new(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(reader.duration(), 2);
    }

    #[test]
    fn mismatched_byte_count_is_rejected() {
        let settings = settings_for(44100, 2, SampleFormat::Int16);
        let factory = WavFactory::new();
        let mut cursor = Cursor::new(Vec::new());
        let mut encoder = factory
            .construct_stream_encoder(&mut cursor, &settings, &FileTags::default())
            .unwrap();
        assert!(encoder.write_interleaved_converted(2, &[0; 6]).is_err());
    }
}
