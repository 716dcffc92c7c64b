use audio_export_core::models::config::{self, ConfigStore, EXPORT_SECTION};

pub const DEFAULT_AU_PADDING_ALIGN_HINT: u32 = 4096;
pub const DEFAULT_FLAC_COMPRESSION_LEVEL: i32 = 5;
pub const DEFAULT_MP3_LAME_QUALITY: i32 = 3;
pub const DEFAULT_OPUS_COMPLEXITY: i32 = -1;

/// ID3v2 and ReplayGain options for MP3 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mp3TagOptions {
    /// Minimum padding reserved after the ID3v2 frames, in bytes.
    pub id3v2_min_padding: u32,
    /// The ID3v2 tag is padded up to a multiple of this. 0 disables.
    pub id3v2_padding_align_hint: u32,
    /// Store ReplayGain as `TXXX` frames.
    pub id3v2_write_replay_gain_txxx: bool,
    pub calculate_replay_gain: bool,
    pub calculate_peak_sample: bool,
}

impl Default for Mp3TagOptions {
    fn default() -> Self {
        Self {
            id3v2_min_padding: 1024,
            id3v2_padding_align_hint: 4096,
            id3v2_write_replay_gain_txxx: true,
            calculate_replay_gain: true,
            calculate_peak_sample: true,
        }
    }
}

/// Backend-wide tuning shared by all exports, stored next to the
/// per-encoder settings in the `Export` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// The AU data offset is padded up to a multiple of this. 0 disables
    /// padding.
    pub au_padding_align_hint: u32,
    /// FLAC compression level, 0 (fastest) to 8 (smallest).
    pub flac_compression_level: i32,
    /// LAME algorithm quality, 0 (best) to 9 (fastest).
    pub mp3_lame_quality: i32,
    pub mp3_tags: Mp3TagOptions,
    /// Opus complexity 0–10, or -1 for the library default.
    pub opus_complexity: i32,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            au_padding_align_hint: DEFAULT_AU_PADDING_ALIGN_HINT,
            flac_compression_level: DEFAULT_FLAC_COMPRESSION_LEVEL,
            mp3_lame_quality: DEFAULT_MP3_LAME_QUALITY,
            mp3_tags: Mp3TagOptions::default(),
            opus_complexity: DEFAULT_OPUS_COMPLEXITY,
        }
    }
}

impl BackendSettings {
    pub fn load(store: &dyn ConfigStore) -> Self {
        let d = Self::default();
        let read_u32 = |key: &str, default: u32| config::read_or(store, EXPORT_SECTION, key, default);
        let read_i32 = |key: &str, default: i32| config::read_or(store, EXPORT_SECTION, key, default);
        let read_bool = |key: &str, default: bool| config::read_or(store, EXPORT_SECTION, key, default);
        Self {
            au_padding_align_hint: read_u32("AUPaddingAlignHint", d.au_padding_align_hint),
            flac_compression_level: read_i32("FLACCompressionLevel", d.flac_compression_level),
            mp3_lame_quality: read_i32("MP3LameQuality", d.mp3_lame_quality),
            mp3_tags: Mp3TagOptions {
                id3v2_min_padding: read_u32("MP3ID3v2MinPadding", d.mp3_tags.id3v2_min_padding),
                id3v2_padding_align_hint: read_u32("MP3ID3v2PaddingAlignHint", d.mp3_tags.id3v2_padding_align_hint),
                id3v2_write_replay_gain_txxx: read_bool(
                    "MP3ID3v2WriteReplayGainTXXX",
                    d.mp3_tags.id3v2_write_replay_gain_txxx,
                ),
                calculate_replay_gain: read_bool("MP3LameCalculateReplayGain", d.mp3_tags.calculate_replay_gain),
                calculate_peak_sample: read_bool("MP3LameCalculatePeakSample", d.mp3_tags.calculate_peak_sample),
            },
            opus_complexity: read_i32("OpusComplexity", d.opus_complexity),
        }
    }

    pub fn store(&self, store: &dyn ConfigStore) {
        let tags = &self.mp3_tags;
        config::write(store, EXPORT_SECTION, "AUPaddingAlignHint", &self.au_padding_align_hint);
        config::write(store, EXPORT_SECTION, "FLACCompressionLevel", &self.flac_compression_level);
        config::write(store, EXPORT_SECTION, "MP3LameQuality", &self.mp3_lame_quality);
        config::write(store, EXPORT_SECTION, "MP3ID3v2MinPadding", &tags.id3v2_min_padding);
        config::write(store, EXPORT_SECTION, "MP3ID3v2PaddingAlignHint", &tags.id3v2_padding_align_hint);
        config::write(store, EXPORT_SECTION, "MP3ID3v2WriteReplayGainTXXX", &tags.id3v2_write_replay_gain_txxx);
        config::write(store, EXPORT_SECTION, "MP3LameCalculateReplayGain", &tags.calculate_replay_gain);
        config::write(store, EXPORT_SECTION, "MP3LameCalculatePeakSample", &tags.calculate_peak_sample);
        config::write(store, EXPORT_SECTION, "OpusComplexity", &self.opus_complexity);
    }
}
