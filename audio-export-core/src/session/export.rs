use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::models::error::ExportError;
use crate::models::export_report::ExportReport;
use crate::models::sample_format::{encode_samples, OutputSample, SampleFormat, I24};
use crate::models::settings::Settings;
use crate::models::state::ExportState;
use crate::processing::dither::Dither;
use crate::processing::read_target::{ReadTarget, ReadTargetBuffer, ReadTargetGainBuffer};
use crate::traits::export_delegate::ExportDelegate;
use crate::traits::mix_source::MixSource;
use crate::traits::stream_encoder::StreamEncoder;

/// Frames rendered per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_FRAMES: usize = 1024;

/// How rendered audio reaches the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteStrategy {
    /// Render into the encoder's converted format and hand over bytes.
    #[default]
    Converted,
    /// Render `f32` and let the encoder quantize.
    Float,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub chunk_frames: usize,
    /// Linear output gain.
    pub gain: f32,
    /// Stop after this many frames even if the source has more.
    pub max_frames: Option<u64>,
    pub strategy: WriteStrategy,
    /// Cue positions in frames, written when the settings enable cues.
    pub cues: Vec<u64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            gain: 1.0,
            max_frames: None,
            strategy: WriteStrategy::default(),
            cues: Vec::new(),
        }
    }
}

/// Drives one export: pulls mix chunks from a [`MixSource`], renders them
/// through a gain-staged sink and feeds the encoder.
///
/// ```text
/// [MixSource] → i32 mix → [Dither + gain + conversion] → T samples → [StreamEncoder]
/// ```
///
/// The dither engine lives as long as the session, so its error feedback
/// carries across chunks. A session runs once; create a new one per export.
pub struct ExportSession<'e> {
    encoder: Box<dyn StreamEncoder + 'e>,
    encoder_name: String,
    settings: Settings,
    options: ExportOptions,
    dither: Dither,
    state: ExportState,
    delegate: Option<Arc<dyn ExportDelegate>>,
}

impl<'e> ExportSession<'e> {
    pub fn new(
        encoder: Box<dyn StreamEncoder + 'e>,
        encoder_name: &str,
        settings: Settings,
        options: ExportOptions,
    ) -> Self {
        let dither = Dither::new(settings.dither, settings.channels as usize);
        Self {
            encoder,
            encoder_name: encoder_name.to_string(),
            settings,
            options,
            dither,
            state: ExportState::Idle,
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn ExportDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Renders `source` to the end (or the frame limit) and finishes the
    /// encoder.
    pub fn run<S: MixSource + ?Sized>(&mut self, source: &mut S) -> Result<ExportReport, ExportError> {
        if !self.state.is_idle() {
            return Err(ExportError::InvalidState(format!(
                "export already ran (state: {:?})",
                self.state
            )));
        }

        match self.render(source) {
            Ok(report) => {
                log::info!(
                    "Export finished: {} frames ({:.2}s) with {}",
                    report.frames,
                    report.duration_secs,
                    report.encoder_name
                );
                self.set_state(ExportState::Finished(report.clone()));
                if let Some(ref delegate) = self.delegate {
                    delegate.on_export_finished(&report);
                }
                Ok(report)
            }
            Err(e) => {
                log::error!("Export with {} failed: {}", self.encoder_name, e);
                self.set_state(ExportState::Failed(e.clone()));
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(&e);
                }
                Err(e)
            }
        }
    }

    fn render<S: MixSource + ?Sized>(&mut self, source: &mut S) -> Result<ExportReport, ExportError> {
        let channels = self.settings.channels as usize;
        if source.channels() != channels {
            return Err(ExportError::InvalidSettings(format!(
                "source has {} channels, settings expect {}",
                source.channels(),
                channels
            )));
        }
        if self.options.chunk_frames == 0 {
            return Err(ExportError::InvalidSettings("chunk size must be at least one frame".into()));
        }

        let format = match self.options.strategy {
            WriteStrategy::Converted => self.encoder.converted_format(),
            WriteStrategy::Float => SampleFormat::Float32,
        };
        log::debug!(
            "Rendering {} ch as {:?} ({:?}), {} frames per chunk",
            channels,
            format,
            self.options.strategy,
            self.options.chunk_frames
        );

        self.set_state(ExportState::Rendering { frames: 0 });
        let mut hasher = Sha256::new();
        let mut mix = vec![0i32; self.options.chunk_frames * channels];
        let mut total: u64 = 0;

        loop {
            let wanted = match self.options.max_frames {
                Some(limit) => (limit.saturating_sub(total)).min(self.options.chunk_frames as u64) as usize,
                None => self.options.chunk_frames,
            };
            if wanted == 0 {
                break;
            }
            let frames = source.read(&mut mix[..wanted * channels], wanted).min(wanted);
            if frames == 0 {
                break;
            }
            let chunk = &mut mix[..frames * channels];

            match (self.options.strategy, format) {
                (WriteStrategy::Float, _) => self.write_float_chunk(chunk, frames, &mut hasher)?,
                (WriteStrategy::Converted, SampleFormat::Unsigned8) => {
                    self.write_converted_chunk::<u8>(chunk, frames, &mut hasher)?
                }
                (WriteStrategy::Converted, SampleFormat::Int16) => {
                    self.write_converted_chunk::<i16>(chunk, frames, &mut hasher)?
                }
                (WriteStrategy::Converted, SampleFormat::Int24) => {
                    self.write_converted_chunk::<I24>(chunk, frames, &mut hasher)?
                }
                (WriteStrategy::Converted, SampleFormat::Int32) => {
                    self.write_converted_chunk::<i32>(chunk, frames, &mut hasher)?
                }
                (WriteStrategy::Converted, SampleFormat::Float32) => {
                    self.write_converted_chunk::<f32>(chunk, frames, &mut hasher)?
                }
                (WriteStrategy::Converted, SampleFormat::Float64) => {
                    self.write_converted_chunk::<f64>(chunk, frames, &mut hasher)?
                }
            }

            total += frames as u64;
            self.set_state(ExportState::Rendering { frames: total });
            if let Some(ref delegate) = self.delegate {
                delegate.on_progress(total);
            }
        }

        self.set_state(ExportState::Finishing { frames: total });
        let cue_count = if self.settings.cues && !self.options.cues.is_empty() {
            self.encoder.write_cues(&self.options.cues)?;
            self.options.cues.len()
        } else {
            0
        };
        self.encoder.finish()?;

        Ok(ExportReport::new(
            &self.encoder_name,
            total,
            self.settings.sample_rate,
            self.settings.channels,
            format,
            hex_encode(&hasher.finalize()),
            cue_count,
        ))
    }

    /// Renders one chunk into `T` and writes it as bytes in the encoder's
    /// byte order.
    fn write_converted_chunk<T: OutputSample>(
        &mut self,
        mix: &mut [i32],
        frames: usize,
        hasher: &mut Sha256,
    ) -> Result<(), ExportError> {
        let samples = self.render_chunk::<T>(mix, frames);
        let mut bytes = Vec::with_capacity(samples.len() * T::FORMAT.bytes_per_sample());
        encode_samples(&samples, self.encoder.converted_endianness(), &mut bytes);
        hasher.update(&bytes);
        self.encoder.write_interleaved_converted(frames, &bytes)
    }

    fn write_float_chunk(&mut self, mix: &mut [i32], frames: usize, hasher: &mut Sha256) -> Result<(), ExportError> {
        let samples = self.render_chunk::<f32>(mix, frames);
        for sample in &samples {
            hasher.update(sample.to_le_bytes());
        }
        self.encoder.write_interleaved(frames, &samples)
    }

    fn render_chunk<T: OutputSample>(&mut self, mix: &mut [i32], frames: usize) -> Vec<T> {
        let channels = self.settings.channels as usize;
        let mut samples = vec![T::default(); frames * channels];
        let base = ReadTargetBuffer::interleaved(&mut self.dither, &mut samples);
        let mut target = ReadTargetGainBuffer::new(base, self.options.gain);
        target.data_callback(mix, channels, frames);
        samples
    }

    fn set_state(&mut self, new_state: ExportState) {
        self.state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&self.state);
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
