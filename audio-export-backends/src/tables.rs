//! Capability tables for the codec and container backends. Order is significant:
//! front ends list the entries as given.

/// kbit/s
pub const OPUS_BITRATES: &[u32] = &[
    8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 192, 224, 256, 320, 384, 448, 510,
];
pub const VORBIS_BITRATES: &[u32] = &[32, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 500];
pub const LAYER3_BITRATES: &[u32] = &[8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 192, 224, 256, 320];
pub const MPEG1_LAYER3_BITRATES: &[u32] = &[32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];

/// Rates accepted by the Opus encoder when it may resample.
pub const OPUS_ALL_SAMPLERATES: &[u32] = &[48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000];
pub const VORBIS_SAMPLERATES: &[u32] = &[48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000];
pub const LAYER3_SAMPLERATES: &[u32] = &[48000, 44100, 32000, 24000, 22050, 16000];
pub const MPEG1_LAYER3_SAMPLERATES: &[u32] = &[48000, 44100, 32000];

/// Sample rates offered by the uncompressed container backends.
pub const PCM_SAMPLERATES: &[u32] = &[44100, 48000, 96000];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpeg1_tables_are_subsets_of_layer3() {
        assert!(MPEG1_LAYER3_BITRATES.iter().all(|b| LAYER3_BITRATES.contains(b)));
        assert!(MPEG1_LAYER3_SAMPLERATES.iter().all(|r| LAYER3_SAMPLERATES.contains(r)));
    }

    #[test]
    fn table_order_is_preserved() {
        assert_eq!(OPUS_BITRATES.first(), Some(&8));
        assert_eq!(OPUS_BITRATES.last(), Some(&510));
        assert_eq!(VORBIS_SAMPLERATES[0], 48000);
        assert_eq!(LAYER3_SAMPLERATES[5], 16000);
    }
}
