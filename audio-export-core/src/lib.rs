//! # audio-export-core
//!
//! Backend-agnostic streaming audio export.
//!
//! Turns the fixed-point output of a mixing engine into encoded files:
//! dithering, gain staging, sample conversion, buffered writing with
//! deferred header patching, and the encoder factory abstraction that
//! concrete backends (WAV, AU, lossy codecs) implement.
//!
//! ## Architecture
//!
//! ```text
//! audio-export-core (this crate)
//! ├── traits/       ← EncoderFactory, StreamEncoder, MixSource, ExportDelegate
//! ├── models/       ← EncoderTraits, Settings, ExportError, ExportState, sample formats
//! ├── processing/   ← Dither, conversion, ReadTargetBuffer / ReadTargetGainBuffer
//! ├── session/      ← ExportSession (render loop)
//! ├── storage/      ← StreamWriterBase, report sidecars, config files
//! └── registry      ← EncoderRegistry
//! ```

pub mod models;
pub mod processing;
pub mod registry;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{ConfigStore, MemoryConfigStore};
pub use models::dither_mode::DitherMode;
pub use models::encoder_traits::{EncoderTraits, Format, Mode, ModeSet};
pub use models::error::ExportError;
pub use models::export_report::ExportReport;
pub use models::sample_format::{Endianness, OutputSample, SampleFormat, I24, MIXING_FRACTIONAL_BITS};
pub use models::settings::Settings;
pub use models::state::ExportState;
pub use models::tags::FileTags;
pub use processing::dither::Dither;
pub use processing::read_target::{ReadTarget, ReadTargetBuffer, ReadTargetGainBuffer};
pub use registry::EncoderRegistry;
pub use session::export::{ExportOptions, ExportSession, WriteStrategy};
pub use storage::stream_writer::{OutputStream, PositionMarker, StreamWriterBase};
pub use traits::encoder_factory::EncoderFactory;
pub use traits::export_delegate::ExportDelegate;
pub use traits::mix_source::MixSource;
pub use traits::stream_encoder::StreamEncoder;
