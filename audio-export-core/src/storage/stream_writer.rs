use std::io::{Seek, SeekFrom, Write};

use crate::models::error::ExportError;
use crate::models::sample_format::{encode_samples, Endianness, OutputSample};

/// Default number of buffered bytes that triggers a flush to the stream.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 64 * 1024;

/// Seekable byte sink an encoder writes into.
///
/// The stream is borrowed: the caller opens it, positions it, and closes it
/// after the encoder is gone.
pub trait OutputStream: Write + Seek {}

impl<T: Write + Seek + ?Sized> OutputStream for T {}

/// Placeholder for a header field whose value is only known at the end.
///
/// Obtained from [`StreamWriterBase::reserve`] and consumed by
/// [`StreamWriterBase::patch`]. A writer refuses to finish while markers
/// are outstanding.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "reserved header fields must be patched before finishing"]
pub struct PositionMarker {
    offset: u64,
    len: usize,
}

impl PositionMarker {
    /// Offset of the field relative to the writer's start position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Buffered writer shared by stream encoders.
///
/// ## Layout
///
/// ```text
/// [bytes already in the stream][bytes in `buf`]
/// ^ start                      ^ start + flushed
/// ```
///
/// Bytes accumulate in `buf` and go to the stream whenever the buffer
/// reaches the flush threshold. [`finish`](Self::finish) writes whatever is
/// left; dropping an unfinished writer does the same on a best-effort basis
/// and logs failures.
pub struct StreamWriterBase<'a> {
    stream: &'a mut dyn OutputStream,
    start: u64,
    flushed: u64,
    buf: Vec<u8>,
    threshold: usize,
    pending_markers: usize,
    finished: bool,
}

impl<'a> StreamWriterBase<'a> {
    pub fn new(stream: &'a mut dyn OutputStream) -> Result<Self, ExportError> {
        Self::with_flush_threshold(stream, DEFAULT_FLUSH_THRESHOLD)
    }

    pub fn with_flush_threshold(stream: &'a mut dyn OutputStream, threshold: usize) -> Result<Self, ExportError> {
        let start = stream
            .stream_position()
            .map_err(|e| ExportError::ConstructionFailure(format!("failed to query stream position: {}", e)))?;
        Ok(Self {
            stream,
            start,
            flushed: 0,
            buf: Vec::with_capacity(threshold.min(DEFAULT_FLUSH_THRESHOLD)),
            threshold: threshold.max(1),
            pending_markers: 0,
            finished: false,
        })
    }

    /// Stream position at construction.
    pub fn start_position(&self) -> u64 {
        self.start
    }

    /// Bytes written since construction, buffered or not.
    pub fn bytes_written(&self) -> u64 {
        self.flushed + self.buf.len() as u64
    }

    /// Bytes currently held in the buffer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Byte order expected by [`write_interleaved_converted`](Self::write_interleaved_converted)
    /// unless the encoder declares otherwise.
    pub fn converted_endianness(&self) -> Endianness {
        Endianness::native()
    }

    /// Appends raw bytes, flushing if the buffer is full.
    pub fn append(&mut self, data: &[u8]) -> Result<(), ExportError> {
        if self.finished {
            return Err(ExportError::InvalidState("write after finish".into()));
        }
        self.buf.extend_from_slice(data);
        if self.buf.len() >= self.threshold {
            self.write_buffer()?;
        }
        Ok(())
    }

    /// Encodes typed samples in `endian` byte order and appends them.
    pub fn write_samples<T: OutputSample>(&mut self, samples: &[T], endian: Endianness) -> Result<(), ExportError> {
        let mut bytes = Vec::with_capacity(samples.len() * T::FORMAT.bytes_per_sample());
        encode_samples(samples, endian, &mut bytes);
        self.append(&bytes)
    }

    /// Appends already converted sample bytes as they are.
    pub fn write_interleaved_converted(&mut self, frame_count: usize, data: &[u8]) -> Result<(), ExportError> {
        log::trace!("Appending {} converted frames ({} bytes)", frame_count, data.len());
        self.append(data)
    }

    /// Cue points are ignored unless the encoder handles them.
    pub fn write_cues(&mut self, cues: &[u64]) -> Result<(), ExportError> {
        if !cues.is_empty() {
            log::debug!("Ignoring {} cue points", cues.len());
        }
        Ok(())
    }

    /// Writes buffered bytes to the stream.
    pub fn write_buffer(&mut self) -> Result<(), ExportError> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.stream.write_all(&self.buf)?;
        self.flushed += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }

    /// Writes `len` placeholder bytes and returns a marker for patching them.
    pub fn reserve(&mut self, len: usize) -> Result<PositionMarker, ExportError> {
        let offset = self.bytes_written();
        self.append(&vec![0u8; len])?;
        self.pending_markers += 1;
        Ok(PositionMarker { offset, len })
    }

    /// Overwrites a reserved field and returns to the end of the data.
    pub fn patch(&mut self, marker: PositionMarker, bytes: &[u8]) -> Result<(), ExportError> {
        if bytes.len() != marker.len {
            return Err(ExportError::InvalidState(format!(
                "patch of {} bytes for a {}-byte field",
                bytes.len(),
                marker.len
            )));
        }
        let foreign = || {
            ExportError::InvalidState(format!("marker at {} does not belong to this writer", marker.offset))
        };
        if marker.offset + marker.len as u64 > self.bytes_written() {
            return Err(foreign());
        }
        let pending = self.pending_markers.checked_sub(1).ok_or_else(foreign)?;
        self.write_buffer()?;
        self.stream.seek(SeekFrom::Start(self.start + marker.offset))?;
        self.stream.write_all(bytes)?;
        self.stream.seek(SeekFrom::Start(self.start + self.flushed))?;
        self.pending_markers = pending;
        Ok(())
    }

    /// Flushes everything to the stream.
    ///
    /// Fails with [`ExportError::UnpatchedHeader`] if reserved fields were
    /// never patched. Calling it again after success is a no-op.
    pub fn finish(&mut self) -> Result<(), ExportError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.write_buffer()?;
        self.stream.flush()?;
        if self.pending_markers > 0 {
            return Err(ExportError::UnpatchedHeader(self.pending_markers));
        }
        Ok(())
    }
}

impl Drop for StreamWriterBase<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.finish() {
            log::error!("Failed to finalize output stream: {}", e);
        }
    }
}
