use serde::{Deserialize, Serialize};

use super::config::{self, setting_key, ConfigStore, EXPORT_SECTION};
use super::dither_mode::DitherMode;
use super::encoder_traits::{EncoderTraits, Format, Mode};
use super::error::ExportError;

/// Concrete parameters for one export with one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub cues: bool,
    pub tags: bool,
    pub sample_rate: u32,
    pub channels: u16,
    pub mode: Mode,
    /// kbit/s; used by CBR, ABR and VBR modes.
    pub bitrate: u32,
    /// 0.0–1.0; used by quality mode.
    pub quality: f32,
    /// Index into the backend's format list; used by enumerated mode.
    pub format: usize,
    pub dither: DitherMode,
}

impl Settings {
    /// Settings populated from the backend's defaults.
    pub fn defaults(traits: &EncoderTraits) -> Self {
        Self {
            cues: traits.can_cues,
            tags: traits.can_tags,
            sample_rate: traits.default_sample_rate,
            channels: traits.default_channels,
            mode: traits.default_mode,
            bitrate: traits.default_bitrate,
            quality: traits.default_quality,
            format: traits.default_format,
            dither: traits.default_dither,
        }
    }

    /// Checks every field against the backend's advertised capabilities.
    pub fn validate(&self, traits: &EncoderTraits) -> Result<(), ExportError> {
        if !traits.sample_rates.contains(&self.sample_rate) {
            return Err(ExportError::InvalidSettings(format!(
                "sample rate {} is not supported by {}",
                self.sample_rate, traits.encoder_name
            )));
        }
        if self.channels == 0 || self.channels > traits.max_channels {
            return Err(ExportError::InvalidSettings(format!(
                "{} channels requested, {} supports at most {}",
                self.channels, traits.encoder_name, traits.max_channels
            )));
        }
        if !traits.modes.contains(self.mode) {
            return Err(ExportError::InvalidSettings(format!(
                "mode {} is not supported by {}",
                self.mode, traits.encoder_name
            )));
        }
        match self.mode {
            Mode::Cbr | Mode::Abr | Mode::Vbr => {
                if !traits.bitrates.contains(&self.bitrate) {
                    return Err(ExportError::InvalidSettings(format!(
                        "bitrate {} kbit is not supported by {}",
                        self.bitrate, traits.encoder_name
                    )));
                }
            }
            Mode::Quality => {
                if !(0.0..=1.0).contains(&self.quality) {
                    return Err(ExportError::InvalidSettings(format!(
                        "quality {} is outside 0.0..=1.0",
                        self.quality
                    )));
                }
            }
            Mode::Enumerated => {
                let format = self.enumerated_format(traits).ok_or_else(|| {
                    ExportError::InvalidSettings(format!("format index {} is out of range", self.format))
                })?;
                if !format.matches(self.sample_rate, self.channels) {
                    return Err(ExportError::InvalidSettings(format!(
                        "format \"{}\" is not available at {} Hz with {} channels",
                        format.description, self.sample_rate, self.channels
                    )));
                }
            }
        }
        Ok(())
    }

    /// The selected entry of the backend's format list.
    pub fn enumerated_format<'t>(&self, traits: &'t EncoderTraits) -> Option<&'t Format> {
        traits.formats.get(self.format)
    }

    /// Reads settings for one backend from the host configuration, using the
    /// backend defaults for missing keys.
    ///
    /// The encoder path never calls this; the host loads settings explicitly
    /// and hands the result to the factory, which only validates.
    pub fn load(store: &dyn ConfigStore, traits: &EncoderTraits) -> Self {
        let defaults = Self::defaults(traits);
        let name = traits.encoder_settings_name.as_str();
        let read = |field: &str| store.get(EXPORT_SECTION, &setting_key(name, field));

        let mode = match read("Mode") {
            Some(serde_json::Value::String(s)) => s.parse::<Mode>().unwrap_or_else(|e| {
                log::warn!("{}; using {}", e, defaults.mode);
                defaults.mode
            }),
            _ => defaults.mode,
        };
        let dither_index =
            config::read_or(store, EXPORT_SECTION, &setting_key(name, "Dither"), defaults.dither.index());

        Self {
            cues: config::read_or(store, EXPORT_SECTION, &setting_key(name, "Cues"), defaults.cues),
            tags: config::read_or(store, EXPORT_SECTION, &setting_key(name, "Tags"), defaults.tags),
            sample_rate: config::read_or(store, EXPORT_SECTION, &setting_key(name, "Samplerate"), defaults.sample_rate),
            channels: config::read_or(store, EXPORT_SECTION, &setting_key(name, "Channels"), defaults.channels),
            mode,
            bitrate: config::read_or(store, EXPORT_SECTION, &setting_key(name, "Bitrate"), defaults.bitrate),
            quality: config::read_or(store, EXPORT_SECTION, &setting_key(name, "Quality"), defaults.quality),
            format: config::read_or(store, EXPORT_SECTION, &setting_key(name, "Format"), defaults.format),
            dither: DitherMode::from_index(dither_index).unwrap_or(defaults.dither),
        }
    }

    /// Writes every field back under the backend's configuration keys.
    pub fn store(&self, store: &dyn ConfigStore, traits: &EncoderTraits) {
        let name = traits.encoder_settings_name.as_str();
        config::write(store, EXPORT_SECTION, &setting_key(name, "Cues"), &self.cues);
        config::write(store, EXPORT_SECTION, &setting_key(name, "Tags"), &self.tags);
        config::write(store, EXPORT_SECTION, &setting_key(name, "Samplerate"), &self.sample_rate);
        config::write(store, EXPORT_SECTION, &setting_key(name, "Channels"), &self.channels);
        config::write(store, EXPORT_SECTION, &setting_key(name, "Mode"), &self.mode.as_str());
        config::write(store, EXPORT_SECTION, &setting_key(name, "Bitrate"), &self.bitrate);
        config::write(store, EXPORT_SECTION, &setting_key(name, "Quality"), &self.quality);
        config::write(store, EXPORT_SECTION, &setting_key(name, "Format"), &self.format);
        config::write(store, EXPORT_SECTION, &setting_key(name, "Dither"), &self.dither.index());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::MemoryConfigStore;
    use crate::models::encoder_traits::ModeSet;
    use crate::models::sample_format::SampleFormat;

    fn lossy_traits() -> EncoderTraits {
        EncoderTraits {
            encoder_name: "Lossy".into(),
            encoder_settings_name: "Lossy".into(),
            can_tags: true,
            max_channels: 2,
            sample_rates: vec![48000, 44100, 32000],
            modes: Mode::Cbr | Mode::Quality,
            bitrates: vec![128, 192, 320],
            default_mode: Mode::Quality,
            default_bitrate: 192,
            default_quality: 0.8,
            ..Default::default()
        }
    }

    fn enumerated_traits() -> EncoderTraits {
        let format = |sample_rate, channels, sample_format: SampleFormat| Format {
            sample_rate,
            channels,
            sample_format,
            bitrate: sample_format.bits_per_sample(),
            description: format!("{} Bit", sample_format.bits_per_sample()),
        };
        EncoderTraits {
            encoder_name: "Enum".into(),
            encoder_settings_name: "Enum".into(),
            max_channels: 2,
            sample_rates: vec![44100, 48000],
            modes: ModeSet::from(Mode::Enumerated),
            default_mode: Mode::Enumerated,
            formats: vec![
                format(44100, 2, SampleFormat::Int16),
                format(48000, 2, SampleFormat::Int24),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_valid() {
        for traits in [lossy_traits(), enumerated_traits()] {
            traits.validate().unwrap();
            Settings::defaults(&traits).validate(&traits).unwrap();
        }
    }

    #[test]
    fn rejects_unsupported_sample_rate() {
        let traits = lossy_traits();
        let settings = Settings {
            sample_rate: 22050,
            ..Settings::defaults(&traits)
        };
        assert!(matches!(settings.validate(&traits), Err(ExportError::InvalidSettings(_))));
    }

    #[test]
    fn rejects_too_many_channels() {
        let traits = lossy_traits();
        let settings = Settings {
            channels: 3,
            ..Settings::defaults(&traits)
        };
        assert!(settings.validate(&traits).is_err());
    }

    #[test]
    fn bitrate_checked_only_in_bitrate_modes() {
        let traits = lossy_traits();
        let quality = Settings {
            bitrate: 200,
            ..Settings::defaults(&traits)
        };
        assert!(quality.validate(&traits).is_ok());

        let cbr = Settings {
            mode: Mode::Cbr,
            ..quality
        };
        assert!(cbr.validate(&traits).is_err());
    }

    #[test]
    fn enumerated_format_must_match_rate_and_channels() {
        let traits = enumerated_traits();
        let settings = Settings {
            format: 1,
            ..Settings::defaults(&traits)
        };
        assert!(settings.validate(&traits).is_err());

        let matching = Settings {
            sample_rate: 48000,
            ..settings
        };
        assert!(matching.validate(&traits).is_ok());
        assert_eq!(
            matching.enumerated_format(&traits).map(|f| f.sample_format),
            Some(SampleFormat::Int24)
        );
    }

    #[test]
    fn store_then_load_round_trips_under_namespaced_keys() {
        let traits = lossy_traits();
        let store = MemoryConfigStore::new();
        let settings = Settings {
            mode: Mode::Cbr,
            bitrate: 320,
            sample_rate: 48000,
            dither: DitherMode::Triangular,
            ..Settings::defaults(&traits)
        };
        settings.store(&store, &traits);

        assert_eq!(
            store.get(EXPORT_SECTION, "Lossy_Mode"),
            Some(serde_json::Value::String("CBR".into()))
        );
        assert_eq!(store.get(EXPORT_SECTION, "Lossy_Dither"), Some(serde_json::json!(2)));
        assert_eq!(Settings::load(&store, &traits), settings);
    }

    #[test]
    fn load_uses_defaults_for_missing_or_invalid_values() {
        let traits = lossy_traits();
        let store = MemoryConfigStore::new();
        store.set(EXPORT_SECTION, "Lossy_Mode", serde_json::json!("Turbo"));
        store.set(EXPORT_SECTION, "Lossy_Dither", serde_json::json!(9));

        assert_eq!(Settings::load(&store, &traits), Settings::defaults(&traits));
    }
}
