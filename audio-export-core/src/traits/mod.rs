pub mod encoder_factory;
pub mod export_delegate;
pub mod mix_source;
pub mod stream_encoder;
