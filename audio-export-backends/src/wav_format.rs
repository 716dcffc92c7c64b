//! RIFF/WAVE chunk builders.
//!
//! Size fields that depend on the amount of audio are not produced here;
//! the encoder reserves them and patches them at finish.
//!
//! File layout written by [`WavEncoder`](crate::wav::WavEncoder):
//! ```text
//! "RIFF" <size:u32 patched> "WAVE"
//! "fmt " 16 <format tag> <channels> <rate> <byte rate> <block align> <bits>
//!   or 40, tag 0xFFFE, then 22 <valid bits> <channel mask> <subformat guid>
//! ["LIST" <size> "INFO" <subchunks...>]
//! "data" <size:u32 patched> <samples...> [pad]
//! ["cue " <size> <count> <points...>]
//! ```

use audio_export_core::models::sample_format::SampleFormat;
use audio_export_core::models::tags::FileTags;

pub const WAVE_FORMAT_PCM: u16 = 1;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// KSDATAFORMAT_SUBTYPE GUID bytes following the leading format tag.
const SUBFORMAT_GUID_TAIL: [u8; 14] = [
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// Size of a cue point record in the `cue ` chunk.
const CUE_POINT_SIZE: usize = 24;

fn push_chunk(out: &mut Vec<u8>, id: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
}

/// Speaker positions for the first `channels` outputs: FC for mono, FL FR
/// for stereo, FL FR FC for three, quad FL FR BL BR for four.
fn channel_mask(channels: u16) -> u32 {
    match channels {
        1 => 0x4,
        2 => 0x3,
        3 => 0x7,
        4 => 0x33,
        _ => 0,
    }
}

/// Complete `fmt ` chunk.
///
/// Stereo and mono at 16 bits or less use the plain 16-byte body; anything
/// wider or with more channels uses `WAVE_FORMAT_EXTENSIBLE` with a
/// speaker mask.
pub fn fmt_chunk(sample_rate: u32, channels: u16, format: SampleFormat) -> Vec<u8> {
    let bits = format.bits_per_sample() as u16;
    let block_align = channels * (bits / 8);
    let byte_rate = sample_rate * block_align as u32;
    let tag = if format.is_float() {
        WAVE_FORMAT_IEEE_FLOAT
    } else {
        WAVE_FORMAT_PCM
    };

    let extensible = channels > 2 || bits > 16;

    let mut body = Vec::with_capacity(40);
    let header_tag = if extensible { WAVE_FORMAT_EXTENSIBLE } else { tag };
    body.extend_from_slice(&header_tag.to_le_bytes());
    body.extend_from_slice(&channels.to_le_bytes());
    body.extend_from_slice(&sample_rate.to_le_bytes());
    body.extend_from_slice(&byte_rate.to_le_bytes());
    body.extend_from_slice(&block_align.to_le_bytes());
    body.extend_from_slice(&bits.to_le_bytes());
    if extensible {
        body.extend_from_slice(&22u16.to_le_bytes());
        body.extend_from_slice(&bits.to_le_bytes());
        body.extend_from_slice(&channel_mask(channels).to_le_bytes());
        body.extend_from_slice(&tag.to_le_bytes());
        body.extend_from_slice(&SUBFORMAT_GUID_TAIL);
    }

    let mut chunk = Vec::with_capacity(8 + body.len());
    push_chunk(&mut chunk, b"fmt ", &body);
    chunk
}

fn info_id(field: &str) -> Option<&'static [u8; 4]> {
    match field {
        "title" => Some(b"INAM"),
        "artist" => Some(b"IART"),
        "album" => Some(b"IPRD"),
        "track" => Some(b"ITRK"),
        "year" => Some(b"ICRD"),
        "genre" => Some(b"IGNR"),
        "comments" => Some(b"ICMT"),
        "url" => Some(b"IURL"),
        "encoder" => Some(b"ISFT"),
        _ => None,
    }
}

/// `LIST/INFO` chunk for the tags, or `None` if no tag maps to an INFO
/// field.
pub fn info_chunk(tags: &FileTags) -> Option<Vec<u8>> {
    let mut body = b"INFO".to_vec();
    for (field, value) in tags.fields() {
        let Some(id) = info_id(field) else {
            continue;
        };
        let mut text = value.as_bytes().to_vec();
        text.push(0);
        push_chunk(&mut body, id, &text);
    }
    if body.len() == 4 {
        return None;
    }
    let mut chunk = Vec::with_capacity(body.len() + 8);
    push_chunk(&mut chunk, b"LIST", &body);
    Some(chunk)
}

/// `cue ` chunk with one point per position, in frames.
pub fn cue_chunk(cues: &[u64]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + cues.len() * CUE_POINT_SIZE);
    body.extend_from_slice(&(cues.len() as u32).to_le_bytes());
    for (index, &position) in cues.iter().enumerate() {
        let position = position.min(u32::MAX as u64) as u32;
        body.extend_from_slice(&(index as u32).to_le_bytes()); // id
        body.extend_from_slice(&position.to_le_bytes());
        body.extend_from_slice(b"data");
        body.extend_from_slice(&0u32.to_le_bytes()); // chunk start
        body.extend_from_slice(&0u32.to_le_bytes()); // block start
        body.extend_from_slice(&position.to_le_bytes()); // sample offset
    }
    let mut chunk = Vec::with_capacity(body.len() + 8);
    push_chunk(&mut chunk, b"cue ", &body);
    chunk
}
