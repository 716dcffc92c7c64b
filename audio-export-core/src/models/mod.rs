pub mod config;
pub mod dither_mode;
pub mod encoder_traits;
pub mod error;
pub mod export_report;
pub mod sample_format;
pub mod settings;
pub mod state;
pub mod tags;
