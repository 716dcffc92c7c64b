pub mod config_file;
pub mod report;
pub mod stream_writer;
