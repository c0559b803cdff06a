use std::io::{ErrorKind, Read};
use std::sync::Arc;

use fastnet_table::FormatTable;

use crate::codec::DecoderConfig;
use crate::decoder::StreamDecoder;
use crate::error::{ReadError, Result};
use crate::record::{DecodedRecord, Outcome};

const READ_CHUNK_SIZE: usize = 1024;

/// Configuration for [`FrameReader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Bytes requested from the source per read. Default: 1024.
    pub read_chunk_size: usize,
    pub decoder: DecoderConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: READ_CHUNK_SIZE,
            decoder: DecoderConfig::default(),
        }
    }
}

/// Reads decoded sentences from any `Read` source (serial port, capture file).
///
/// Handles partial reads internally. Decode errors are returned as
/// [`Outcome::Error`] and never end the stream.
pub struct FrameReader<T> {
    inner: T,
    decoder: StreamDecoder,
    chunk: Vec<u8>,
}

impl<T: Read> FrameReader<T> {
    /// Create a reader with default configuration.
    pub fn new(inner: T, table: Arc<FormatTable>) -> Self {
        Self::with_config(inner, table, ReaderConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(inner: T, table: Arc<FormatTable>, config: ReaderConfig) -> Self {
        Self {
            inner,
            decoder: StreamDecoder::with_config(table, config.decoder),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
        }
    }

    /// Read until the next record or decode error (blocking).
    ///
    /// Returns `Err(ReadError::StreamEnded)` at EOF, carrying the number of
    /// buffered bytes that never formed a frame.
    pub fn read_outcome(&mut self) -> Result<Outcome> {
        loop {
            if let Some(outcome) = self.decoder.next_outcome() {
                return Ok(outcome);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ReadError::Io(err)),
            };

            if read == 0 {
                return Err(ReadError::StreamEnded {
                    pending: self.decoder.pending_len(),
                });
            }

            self.decoder.feed(&self.chunk[..read]);
        }
    }

    /// Read until the next record, skipping decode errors.
    pub fn read_record(&mut self) -> Result<DecodedRecord> {
        loop {
            match self.read_outcome()? {
                Outcome::Record(record) => return Ok(record),
                Outcome::Error(err) => {
                    tracing::debug!(kind = err.kind(), command = err.command(), "skipping");
                }
            }
        }
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn decoder(&self) -> &StreamDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut StreamDecoder {
        &mut self.decoder
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Outcome>;

    /// Yields outcomes until the source ends cleanly.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_outcome() {
            Ok(outcome) => Some(Ok(outcome)),
            Err(ReadError::StreamEnded { .. }) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
