pub mod conversion;
pub mod dither;
pub mod read_target;
