use std::sync::Arc;

use bytes::BytesMut;
use fastnet_table::FormatTable;
use tokio_util::codec::Decoder;

use crate::codec::DecoderConfig;
use crate::decoder::StreamDecoder;
use crate::error::ReadError;
use crate::record::Outcome;

/// `tokio_util` codec yielding one [`Outcome`] per item.
///
/// Wrap an `AsyncRead` with `FramedRead::new(io, FastnetCodec::new(table))`.
pub struct FastnetCodec {
    decoder: StreamDecoder,
}

impl FastnetCodec {
    pub fn new(table: Arc<FormatTable>) -> Self {
        Self::with_config(table, DecoderConfig::default())
    }

    pub fn with_config(table: Arc<FormatTable>, config: DecoderConfig) -> Self {
        Self {
            decoder: StreamDecoder::with_config(table, config),
        }
    }

    pub fn decoder(&self) -> &StreamDecoder {
        &self.decoder
    }
}

impl Decoder for FastnetCodec {
    type Item = Outcome;
    type Error = ReadError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            let incoming = src.split();
            self.decoder.feed(&incoming);
        }
        Ok(self.decoder.next_outcome())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(outcome) = self.decode(src)? {
            return Ok(Some(outcome));
        }

        let pending = self.decoder.pending_len();
        if pending == 0 {
            return Ok(None);
        }

        tracing::debug!(pending, "stream ended inside a frame");
        self.decoder.reset();
        Err(ReadError::StreamEnded { pending })
    }
}
