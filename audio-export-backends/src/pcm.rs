use audio_export_core::models::encoder_traits::Format;
use audio_export_core::models::sample_format::{encode_samples, Endianness, OutputSample, SampleFormat, I24};

/// Every combination of rate, channel count (1..=`max_channels`) and sample
/// format, rates outermost. The bitrate field holds the bits per sample.
pub fn enumerate_formats(sample_rates: &[u32], max_channels: u16, sample_formats: &[SampleFormat]) -> Vec<Format> {
    let mut formats = Vec::with_capacity(sample_rates.len() * max_channels as usize * sample_formats.len());
    for &sample_rate in sample_rates {
        for channels in 1..=max_channels {
            for &sample_format in sample_formats {
                let kind = if sample_format.is_float() { "Float" } else { "PCM" };
                formats.push(Format {
                    sample_rate,
                    channels,
                    sample_format,
                    bitrate: sample_format.bits_per_sample(),
                    description: format!("{} {} bit", kind, sample_format.bits_per_sample()),
                });
            }
        }
    }
    formats
}

/// Index of the first format matching rate, channels and sample format.
pub fn find_format(formats: &[Format], sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Option<usize> {
    formats
        .iter()
        .position(|f| f.matches(sample_rate, channels) && f.sample_format == sample_format)
}

/// Quantizes native-range floats to `format` and appends them in `endian`
/// byte order.
pub fn encode_float_as(format: SampleFormat, samples: &[f32], endian: Endianness, out: &mut Vec<u8>) {
    match format {
        SampleFormat::Unsigned8 => encode_converted::<u8>(samples, endian, out),
        SampleFormat::Int16 => encode_converted::<i16>(samples, endian, out),
        SampleFormat::Int24 => encode_converted::<I24>(samples, endian, out),
        SampleFormat::Int32 => encode_converted::<i32>(samples, endian, out),
        SampleFormat::Float32 => encode_samples(samples, endian, out),
        SampleFormat::Float64 => encode_converted::<f64>(samples, endian, out),
    }
}

fn encode_converted<T: OutputSample>(samples: &[f32], endian: Endianness, out: &mut Vec<u8>) {
    let converted: Vec<T> = samples.iter().map(|&s| T::from_f32(s)).collect();
    encode_samples(&converted, endian, out);
}

/// Decodes native-endian `f32` bytes.
pub fn decode_native_f32(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
