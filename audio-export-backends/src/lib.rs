//! # audio-export-backends
//!
//! Concrete export backends for audio-export-core.
//!
//! Provides:
//! - `WavFactory`: RIFF/WAVE, integer and float PCM, INFO tags and cue points
//! - `AuFactory`: Sun/NeXT AU, big endian, padded header
//! - `CodecFactory`: FLAC, MP3, Vorbis and Opus through an injected `CodecLibrary`
//!
//! ## Usage
//! ```ignore
//! use audio_export_backends::{default_registry, BackendSettings};
//!
//! let registry = default_registry(None, &BackendSettings::default())?;
//! let wav = registry.find("WAV").unwrap();
//! let settings = Settings::defaults(wav.traits());
//! let encoder = wav.construct_stream_encoder(&mut file, &settings, &tags)?;
//! ```

pub mod au;
pub mod codec;
pub mod pcm;
pub mod settings;
pub mod tables;
pub mod wav;
pub mod wav_format;

use std::sync::Arc;

use audio_export_core::models::error::ExportError;
use audio_export_core::registry::EncoderRegistry;

pub use au::{AuEncoder, AuFactory};
pub use codec::{CodecEncoder, CodecError, CodecFactory, CodecFamily, CodecLibrary, CodecParams, CodecSession};
pub use settings::{BackendSettings, Mp3TagOptions};
pub use wav::{WavEncoder, WavFactory};

/// Registry with every backend: WAV, AU, then the codec families.
///
/// Codec families are registered even without a library so front ends can
/// list them; they report themselves unavailable.
pub fn default_registry(
    library: Option<Arc<dyn CodecLibrary>>,
    settings: &BackendSettings,
) -> Result<EncoderRegistry, ExportError> {
    let mut registry = EncoderRegistry::new();
    registry.register(Box::new(WavFactory::new()))?;
    registry.register(Box::new(AuFactory::with_padding_align_hint(settings.au_padding_align_hint)))?;
    for family in CodecFamily::ALL {
        registry.register(Box::new(CodecFactory::new(family, library.clone(), settings)))?;
    }
    log::info!(
        "Export backends registered: {} ({} available)",
        registry.len(),
        registry.available().count()
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio_export_core::models::dither_mode::DitherMode;
    use audio_export_core::models::settings::Settings;
    use audio_export_core::models::tags::FileTags;
    use audio_export_core::session::export::{ExportOptions, ExportSession};
    use audio_export_core::traits::mix_source::MixSource;
    use audio_export_core::MIXING_FRACTIONAL_BITS;
    use std::io::Cursor;

    struct Sine {
        phase: f64,
        remaining: usize,
    }

    impl MixSource for Sine {
        fn channels(&self) -> usize {
            2
        }

        fn read(&mut self, mix: &mut [i32], max_frames: usize) -> usize {
            let frames = max_frames.min(self.remaining);
            let amplitude = 0.5 * (1u64 << MIXING_FRACTIONAL_BITS) as f64;
            for frame in mix[..frames * 2].chunks_exact_mut(2) {
                let value = (self.phase.sin() * amplitude) as i32;
                frame[0] = value;
                frame[1] = -value;
                self.phase += 2.0 * std::f64::consts::PI * 440.0 / 44100.0;
            }
            self.remaining -= frames;
            frames
        }
    }

    #[test]
    fn registry_lists_all_backends_in_order() {
        let registry = default_registry(None, &BackendSettings::default()).unwrap();
        let names: Vec<_> = registry.iter().map(|f| f.traits().encoder_name.clone()).collect();
        assert_eq!(names, vec!["WAV", "AU", "FLAC", "MP3 (Lame)", "Ogg Vorbis", "Opus"]);
        assert_eq!(registry.available().count(), 2);
    }

    #[test]
    fn default_settings_are_valid_for_every_backend() {
        let registry = default_registry(None, &BackendSettings::default()).unwrap();
        for factory in registry.iter() {
            let settings = Settings::defaults(factory.traits());
            settings.validate(factory.traits()).unwrap();
        }
    }

    #[test]
    fn session_renders_wav_readable_by_hound() {
        let registry = default_registry(None, &BackendSettings::default()).unwrap();
        let wav = registry.find("WAV").unwrap();
        let settings = Settings {
            dither: DitherMode::None,
            ..Settings::defaults(wav.traits())
        };

        let mut cursor = Cursor::new(Vec::new());
        let report = {
            let encoder = wav
                .construct_stream_encoder(&mut cursor, &settings, &FileTags::default())
                .unwrap();
            let mut session = ExportSession::new(encoder, "WAV", settings.clone(), ExportOptions::default());
            session
                .run(&mut Sine {
                    phase: 0.0,
                    remaining: 4410,
                })
                .unwrap()
        };
        assert_eq!(report.frames, 4410);

        let mut reader = hound::WavReader::new(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(reader.duration(), 4410);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        let peak = samples.iter().map(|s| (*s as i32).abs()).max().unwrap();
        assert!((16380..=16384).contains(&peak), "peak {}", peak);
        // Mirrored channels, up to rounding.
        for frame in samples.chunks_exact(2) {
            assert!((frame[0] as i32 + frame[1] as i32).abs() <= 1);
        }
    }
}
