//! Codec families (FLAC and the lossy formats) backed by an external codec library.
//!
//! The library is injected at startup. Without it the factories still
//! describe their capabilities but refuse to construct encoders.

use std::sync::Arc;

use audio_export_core::models::encoder_traits::{EncoderTraits, Mode, ModeSet};
use audio_export_core::models::error::ExportError;
use audio_export_core::models::sample_format::{Endianness, SampleFormat};
use audio_export_core::models::settings::Settings;
use audio_export_core::models::tags::FileTags;
use audio_export_core::storage::stream_writer::{OutputStream, StreamWriterBase};
use audio_export_core::traits::encoder_factory::EncoderFactory;
use audio_export_core::traits::stream_encoder::StreamEncoder;

use crate::pcm::{decode_native_f32, enumerate_formats, find_format};
use crate::settings::{BackendSettings, Mp3TagOptions};
use crate::tables::{
    LAYER3_BITRATES, LAYER3_SAMPLERATES, MPEG1_LAYER3_BITRATES, MPEG1_LAYER3_SAMPLERATES, OPUS_ALL_SAMPLERATES,
    OPUS_BITRATES, PCM_SAMPLERATES, VORBIS_BITRATES, VORBIS_SAMPLERATES,
};

const FLAC_MAX_CHANNELS: u16 = 4;
const FLAC_SAMPLE_FORMATS: &[SampleFormat] = &[SampleFormat::Int16, SampleFormat::Int24];

/// Errors reported by a codec library.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("codec does not support {0}")]
    Unsupported(String),

    #[error("codec initialization failed: {0}")]
    Init(String),

    #[error("encoding failed: {0}")]
    Encode(String),
}

impl From<CodecError> for ExportError {
    fn from(e: CodecError) -> Self {
        ExportError::Codec(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    Flac,
    Mp3,
    Vorbis,
    Opus,
}

impl CodecFamily {
    pub const ALL: [CodecFamily; 4] = [Self::Flac, Self::Mp3, Self::Vorbis, Self::Opus];
}

/// Parameters handed to the codec library when a session is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecParams {
    pub family: CodecFamily,
    pub sample_rate: u32,
    pub channels: u16,
    pub mode: Mode,
    /// kbit/s
    pub bitrate: u32,
    pub quality: f32,
    /// Sample representation the codec stores. Lossy families get
    /// `Float32`; FLAC gets the selected integer format and quantizes the
    /// float frames it receives.
    pub sample_format: SampleFormat,
    /// Family-specific speed/quality trade-off (FLAC compression level,
    /// LAME quality, Opus complexity).
    pub complexity: i32,
    /// ID3v2 and ReplayGain options, MP3 only.
    pub mp3_tags: Option<Mp3TagOptions>,
}

/// External codec implementation (LAME, libvorbis, libopus or similar).
pub trait CodecLibrary: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, family: CodecFamily) -> bool;

    /// Opens one encoding session. `tags` is `None` when tagging is off.
    fn open(&self, params: &CodecParams, tags: Option<&FileTags>) -> Result<Box<dyn CodecSession>, CodecError>;
}

/// One running codec instance. Returned bytes are appended to the output
/// as they are.
pub trait CodecSession {
    fn encode(&mut self, frames: usize, interleaved: &[f32]) -> Result<Vec<u8>, CodecError>;

    /// Drains delayed output and any trailer.
    fn flush(&mut self) -> Result<Vec<u8>, CodecError>;
}

fn family_traits(family: CodecFamily) -> EncoderTraits {
    match family {
        CodecFamily::Flac => {
            let formats = enumerate_formats(PCM_SAMPLERATES, FLAC_MAX_CHANNELS, FLAC_SAMPLE_FORMATS);
            let default_format = find_format(&formats, 44100, 2, SampleFormat::Int16).unwrap_or(0);
            EncoderTraits {
                file_extension: "flac".into(),
                file_short_description: "FLAC".into(),
                encoder_settings_name: "FLAC".into(),
                show_encoder_info: true,
                file_description: "Free Lossless Audio Codec".into(),
                encoder_name: "FLAC".into(),
                description: "Free Lossless Audio Codec via an external libFLAC".into(),
                can_tags: true,
                max_channels: FLAC_MAX_CHANNELS,
                sample_rates: PCM_SAMPLERATES.to_vec(),
                modes: ModeSet::from(Mode::Enumerated),
                formats,
                default_sample_rate: 44100,
                default_channels: 2,
                default_mode: Mode::Enumerated,
                default_format,
                ..Default::default()
            }
        }
        CodecFamily::Mp3 => EncoderTraits {
            file_extension: "mp3".into(),
            file_short_description: "MP3".into(),
            encoder_settings_name: "MP3Lame".into(),
            show_encoder_info: true,
            file_description: "MPEG-1 Layer 3".into(),
            encoder_name: "MP3 (Lame)".into(),
            description: "MPEG-1/2 Layer 3 via an external LAME-compatible encoder".into(),
            can_tags: true,
            max_channels: 2,
            sample_rates: LAYER3_SAMPLERATES.to_vec(),
            modes: Mode::Quality | Mode::Abr | Mode::Cbr,
            bitrates: LAYER3_BITRATES.to_vec(),
            default_mode: Mode::Quality,
            default_bitrate: 256,
            default_quality: 0.8,
            ..Default::default()
        },
        CodecFamily::Vorbis => EncoderTraits {
            file_extension: "ogg".into(),
            file_short_description: "Vorbis".into(),
            encoder_settings_name: "Vorbis".into(),
            show_encoder_info: true,
            file_description: "Ogg Vorbis".into(),
            encoder_name: "Ogg Vorbis".into(),
            description: "Ogg Vorbis via an external libvorbis".into(),
            can_tags: true,
            max_channels: 4,
            sample_rates: VORBIS_SAMPLERATES.to_vec(),
            modes: Mode::Quality | Mode::Vbr,
            bitrates: VORBIS_BITRATES.to_vec(),
            default_mode: Mode::Quality,
            default_bitrate: 160,
            default_quality: 0.5,
            ..Default::default()
        },
        CodecFamily::Opus => EncoderTraits {
            file_extension: "opus".into(),
            file_short_description: "Opus".into(),
            encoder_settings_name: "Opus".into(),
            show_encoder_info: true,
            file_description: "Ogg Opus".into(),
            encoder_name: "Opus".into(),
            description: "Ogg Opus via an external libopus".into(),
            can_tags: true,
            max_channels: 4,
            sample_rates: OPUS_ALL_SAMPLERATES.to_vec(),
            modes: Mode::Vbr | Mode::Cbr,
            bitrates: OPUS_BITRATES.to_vec(),
            default_sample_rate: 48000,
            default_mode: Mode::Vbr,
            default_bitrate: 128,
            ..Default::default()
        },
    }
}

/// Factory for one codec family.
pub struct CodecFactory {
    family: CodecFamily,
    traits: EncoderTraits,
    complexity: i32,
    mp3_tags: Option<Mp3TagOptions>,
    library: Option<Arc<dyn CodecLibrary>>,
}

impl CodecFactory {
    pub fn new(family: CodecFamily, library: Option<Arc<dyn CodecLibrary>>, settings: &BackendSettings) -> Self {
        let complexity = match family {
            CodecFamily::Flac => settings.flac_compression_level,
            CodecFamily::Mp3 => settings.mp3_lame_quality,
            CodecFamily::Vorbis => 0,
            CodecFamily::Opus => settings.opus_complexity,
        };
        Self {
            family,
            traits: family_traits(family),
            complexity,
            mp3_tags: (family == CodecFamily::Mp3).then(|| settings.mp3_tags.clone()),
            library,
        }
    }

    pub fn family(&self) -> CodecFamily {
        self.family
    }
}

impl EncoderFactory for CodecFactory {
    fn traits(&self) -> &EncoderTraits {
        &self.traits
    }

    fn is_available(&self) -> bool {
        self.library.as_ref().is_some_and(|library| library.supports(self.family))
    }

    fn make_stream_encoder<'a>(
        &self,
        stream: &'a mut dyn OutputStream,
        settings: &Settings,
        tags: &FileTags,
    ) -> Result<Box<dyn StreamEncoder + 'a>, ExportError> {
        let library = self
            .library
            .as_ref()
            .ok_or_else(|| ExportError::BackendUnavailable(self.traits.encoder_name.clone()))?;
        let sample_format = match settings.mode {
            Mode::Enumerated => settings
                .enumerated_format(&self.traits)
                .map(|format| format.sample_format)
                .ok_or_else(|| ExportError::InvalidSettings(format!("no format at index {}", settings.format)))?,
            _ => SampleFormat::Float32,
        };
        let params = CodecParams {
            family: self.family,
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            mode: settings.mode,
            bitrate: settings.bitrate,
            quality: settings.quality,
            sample_format,
            complexity: self.complexity,
            mp3_tags: self.mp3_tags.clone(),
        };
        let tags = settings.tags.then_some(tags);
        let session = library.open(&params, tags)?;
        log::debug!("Opened {} session via {}", self.traits.encoder_name, library.name());
        Ok(Box::new(CodecEncoder::new(stream, session, settings.channels)?))
    }

    /// MPEG-1 rates (32/44.1/48 kHz) only allow the MPEG-1 Layer 3 bitrates;
    /// the lower MPEG-2 rates take the full table.
    fn is_bitrate_supported(&self, sample_rate: u32, channels: u16, bitrate: u32) -> bool {
        match self.family {
            CodecFamily::Mp3 if MPEG1_LAYER3_SAMPLERATES.contains(&sample_rate) => {
                MPEG1_LAYER3_BITRATES.contains(&bitrate)
            }
            CodecFamily::Mp3 => self.traits.bitrates.contains(&bitrate),
            _ => self.traits.bitrates.contains(&bitrate)
                || self
                    .traits
                    .formats
                    .iter()
                    .any(|format| format.matches(sample_rate, channels) && format.bitrate == bitrate),
        }
    }

    fn describe_quality(&self, quality: f32) -> String {
        match self.family {
            CodecFamily::Vorbis => format!("Q{:.1}", quality * 10.0),
            _ => format!("VBR {}%", (quality * 100.0).round() as i32),
        }
    }
}

/// Encoder forwarding float frames to a codec session.
pub struct CodecEncoder<'a> {
    base: StreamWriterBase<'a>,
    session: Box<dyn CodecSession>,
    channels: usize,
    finished: bool,
}

impl<'a> CodecEncoder<'a> {
    pub fn new(
        stream: &'a mut dyn OutputStream,
        session: Box<dyn CodecSession>,
        channels: u16,
    ) -> Result<Self, ExportError> {
        Ok(Self {
            base: StreamWriterBase::new(stream)?,
            session,
            channels: channels as usize,
            finished: false,
        })
    }
}

impl StreamEncoder for CodecEncoder<'_> {
    fn converted_endianness(&self) -> Endianness {
        self.base.converted_endianness()
    }

    fn converted_format(&self) -> SampleFormat {
        SampleFormat::Float32
    }

    fn write_interleaved(&mut self, frames: usize, interleaved: &[f32]) -> Result<(), ExportError> {
        if interleaved.len() != frames * self.channels {
            return Err(ExportError::InvalidState(format!(
                "{} samples for {} frames of {} channels",
                interleaved.len(),
                frames,
                self.channels
            )));
        }
        let encoded = self.session.encode(frames, interleaved)?;
        self.base.append(&encoded)
    }

    fn write_interleaved_converted(&mut self, frames: usize, data: &[u8]) -> Result<(), ExportError> {
        let expected = frames * self.channels * SampleFormat::Float32.bytes_per_sample();
        if data.len() != expected {
            return Err(ExportError::InvalidState(format!(
                "{} bytes for {} frames of {} float channels",
                data.len(),
                frames,
                self.channels
            )));
        }
        let samples = decode_native_f32(data);
        self.write_interleaved(frames, &samples)
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let trailer = self.session.flush()?;
        self.base.append(&trailer)?;
        self.base.finish()
    }
}

impl Drop for CodecEncoder<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("Failed to finalize encoded stream: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Cursor;

    /// Library that "encodes" each frame as one byte and records params.
    #[derive(Default)]
    struct FakeLibrary {
        opened: Mutex<Vec<CodecParams>>,
        fail_open: bool,
    }

    struct FakeSession {
        channels: usize,
    }

    impl CodecSession for FakeSession {
        fn encode(&mut self, frames: usize, interleaved: &[f32]) -> Result<Vec<u8>, CodecError> {
            if interleaved.len() != frames * self.channels {
                return Err(CodecError::Encode("frame count mismatch".into()));
            }
            Ok(vec![b'f'; frames])
        }

        fn flush(&mut self) -> Result<Vec<u8>, CodecError> {
            Ok(b"END".to_vec())
        }
    }

    impl CodecLibrary for FakeLibrary {
        fn name(&self) -> &str {
            "fake"
        }

        fn supports(&self, family: CodecFamily) -> bool {
            family != CodecFamily::Opus
        }

        fn open(&self, params: &CodecParams, _tags: Option<&FileTags>) -> Result<Box<dyn CodecSession>, CodecError> {
            if self.fail_open {
                return Err(CodecError::Init("no license".into()));
            }
            self.opened.lock().push(params.clone());
            Ok(Box::new(FakeSession {
                channels: params.channels as usize,
            }))
        }
    }

    #[test]
    fn every_family_has_consistent_traits() {
        for family in CodecFamily::ALL {
            let factory = CodecFactory::new(family, None, &BackendSettings::default());
            factory.traits().validate().unwrap();
            assert!(!factory.is_available());
        }
    }

    #[test]
    fn unavailable_without_library() {
        let factory = CodecFactory::new(CodecFamily::Mp3, None, &BackendSettings::default());
        let settings = Settings::defaults(factory.traits());
        let mut cursor = Cursor::new(Vec::new());
        let result = factory.construct_stream_encoder(&mut cursor, &settings, &FileTags::default());
        assert!(matches!(result, Err(ExportError::BackendUnavailable(_))));
        // Tables are still there for display.
        assert!(factory.is_bitrate_supported(44100, 2, 320));
        assert!(!factory.is_bitrate_supported(44100, 2, 500));
    }

    #[test]
    fn library_support_is_per_family() {
        let library: Arc<dyn CodecLibrary> = Arc::new(FakeLibrary::default());
        let settings = BackendSettings::default();
        assert!(CodecFactory::new(CodecFamily::Vorbis, Some(library.clone()), &settings).is_available());
        assert!(!CodecFactory::new(CodecFamily::Opus, Some(library), &settings).is_available());
    }

    #[test]
    fn frames_are_forwarded_and_trailer_written() {
        let library = Arc::new(FakeLibrary::default());
        let backend_settings = BackendSettings {
            mp3_lame_quality: 2,
            ..Default::default()
        };
        let factory = CodecFactory::new(CodecFamily::Mp3, Some(library.clone()), &backend_settings);
        let settings = Settings {
            mode: Mode::Cbr,
            bitrate: 192,
            ..Settings::defaults(factory.traits())
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = factory
                .construct_stream_encoder(&mut cursor, &settings, &FileTags::default())
                .unwrap();
            assert_eq!(encoder.converted_format(), SampleFormat::Float32);
            encoder.write_interleaved(2, &[0.0; 4]).unwrap();
            let mut bytes = Vec::new();
            for sample in [0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6] {
                bytes.extend_from_slice(&sample.to_ne_bytes());
            }
            encoder.write_interleaved_converted(3, &bytes).unwrap();
            encoder.finish().unwrap();
        }
        assert_eq!(cursor.into_inner(), b"fffffEND".to_vec());

        let opened = library.opened.lock();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].bitrate, 192);
        assert_eq!(opened[0].mode, Mode::Cbr);
        assert_eq!(opened[0].complexity, 2);
        assert_eq!(opened[0].sample_format, SampleFormat::Float32);
        assert_eq!(opened[0].mp3_tags, Some(Mp3TagOptions::default()));
    }

    #[test]
    fn mismatched_buffer_sizes_are_rejected() {
        let library = Arc::new(FakeLibrary::default());
        let factory = CodecFactory::new(CodecFamily::Mp3, Some(library), &BackendSettings::default());
        let settings = Settings::defaults(factory.traits());
        assert_eq!(settings.channels, 2);

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = factory
                .construct_stream_encoder(&mut cursor, &settings, &FileTags::default())
                .unwrap();
            let converted = encoder.write_interleaved_converted(1, &[0u8; 11]);
            assert!(matches!(converted, Err(ExportError::InvalidState(_))));
            let oversized = encoder.write_interleaved_converted(1, &[0u8; 12]);
            assert!(matches!(oversized, Err(ExportError::InvalidState(_))));
            let float = encoder.write_interleaved(1, &[0.0; 6]);
            assert!(matches!(float, Err(ExportError::InvalidState(_))));
            let short = encoder.write_interleaved(2, &[0.0; 3]);
            assert!(matches!(short, Err(ExportError::InvalidState(_))));
            encoder.write_interleaved(1, &[0.0; 2]).unwrap();
            encoder.finish().unwrap();
        }
        assert_eq!(cursor.into_inner(), b"fEND".to_vec());
    }

    #[test]
    fn flac_forwards_format_and_compression_level() {
        let library = Arc::new(FakeLibrary::default());
        let backend_settings = BackendSettings {
            flac_compression_level: 8,
            ..Default::default()
        };
        let factory = CodecFactory::new(CodecFamily::Flac, Some(library.clone()), &backend_settings);
        let traits = factory.traits();
        assert_eq!(traits.file_extension, "flac");
        assert_eq!(traits.default_mode, Mode::Enumerated);

        let format = find_format(&traits.formats, 48000, 2, SampleFormat::Int24).unwrap();
        let settings = Settings {
            sample_rate: 48000,
            format,
            ..Settings::defaults(traits)
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = factory
                .construct_stream_encoder(&mut cursor, &settings, &FileTags::default())
                .unwrap();
            encoder.finish().unwrap();
        }

        let opened = library.opened.lock();
        assert_eq!(opened[0].family, CodecFamily::Flac);
        assert_eq!(opened[0].sample_rate, 48000);
        assert_eq!(opened[0].sample_format, SampleFormat::Int24);
        assert_eq!(opened[0].complexity, 8);
        assert_eq!(opened[0].mp3_tags, None);
    }

    #[test]
    fn mp3_tag_options_come_from_backend_settings() {
        let library = Arc::new(FakeLibrary::default());
        let tags = Mp3TagOptions {
            id3v2_min_padding: 0,
            id3v2_write_replay_gain_txxx: false,
            ..Default::default()
        };
        let backend_settings = BackendSettings {
            mp3_tags: tags.clone(),
            ..Default::default()
        };
        let factory = CodecFactory::new(CodecFamily::Mp3, Some(library.clone()), &backend_settings);
        let settings = Settings::defaults(factory.traits());
        let mut cursor = Cursor::new(Vec::new());
        drop(factory.construct_stream_encoder(&mut cursor, &settings, &FileTags::default()).unwrap());

        assert_eq!(library.opened.lock()[0].mp3_tags, Some(tags));
    }

    #[test]
    fn mp3_bitrates_depend_on_mpeg_version() {
        let mp3 = CodecFactory::new(CodecFamily::Mp3, None, &BackendSettings::default());
        assert!(!mp3.is_bitrate_supported(44100, 2, 8));
        assert!(!mp3.is_bitrate_supported(48000, 2, 144));
        assert!(mp3.is_bitrate_supported(48000, 2, 320));
        assert!(mp3.is_bitrate_supported(22050, 2, 8));
        assert!(mp3.is_bitrate_supported(22050, 2, 144));
        assert!(!mp3.is_bitrate_supported(22050, 2, 100));

        let flac = CodecFactory::new(CodecFamily::Flac, None, &BackendSettings::default());
        assert!(flac.is_bitrate_supported(44100, 2, 16));
        assert!(!flac.is_bitrate_supported(44100, 2, 32));
    }

    #[test]
    fn open_failure_is_construction_failure() {
        let library = Arc::new(FakeLibrary {
            fail_open: true,
            ..Default::default()
        });
        let factory = CodecFactory::new(CodecFamily::Vorbis, Some(library), &BackendSettings::default());
        let settings = Settings::defaults(factory.traits());
        let mut cursor = Cursor::new(Vec::new());
        let result = factory.construct_stream_encoder(&mut cursor, &settings, &FileTags::default());
        assert!(matches!(result, Err(ExportError::ConstructionFailure(_))));
    }

    #[test]
    fn vorbis_describes_quality_as_q_scale() {
        let vorbis = CodecFactory::new(CodecFamily::Vorbis, None, &BackendSettings::default());
        assert_eq!(vorbis.describe_quality(0.5), "Q5.0");
        let mp3 = CodecFactory::new(CodecFamily::Mp3, None, &BackendSettings::default());
        assert_eq!(mp3.describe_quality(0.8), "VBR 80%");
    }
}
