use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Buf, Bytes, BytesMut};
use fastnet_table::FormatTable;
use serde::Serialize;

use crate::checksum;
use crate::codec::{DecoderConfig, Header, HEADER_SIZE};
use crate::error::DecodeError;
use crate::record::{decode_fields, DecodedRecord, Outcome};

/// Synchronizer state, exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Scanning for five bytes that form a valid header.
    SeekingHeader,
    /// Header found, command not yet resolved against the table.
    ReadingType,
    /// Waiting for the rest of the frame.
    AccumulatingPayload,
    /// Full frame buffered, body checksum not yet checked.
    Validating,
}

#[derive(Debug, Clone, Copy)]
enum State {
    SeekingHeader,
    ReadingType(Header),
    AccumulatingPayload(Header),
    Validating(Header),
}

/// Running totals of everything a decoder has produced or skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    pub records: u64,
    pub unknown_sentence_types: u64,
    pub checksum_mismatches: u64,
    pub length_mismatches: u64,
    pub field_errors: u64,
    /// Bytes discarded because no valid header started at them.
    pub noise_bytes: u64,
}

impl DecoderStats {
    /// Total decode errors of every kind.
    pub fn errors(&self) -> u64 {
        self.unknown_sentence_types
            + self.checksum_mismatches
            + self.length_mismatches
            + self.field_errors
    }
}

/// Incremental Fastnet decoder for one bus.
///
/// Bytes go in through [`feed`](Self::feed); records and decode errors come
/// out of [`next_outcome`](Self::next_outcome) in input order. The decoder
/// never blocks and never gives up: after any rejection it resumes the
/// header search one byte past the start of the rejected candidate.
pub struct StreamDecoder {
    table: Arc<FormatTable>,
    buf: BytesMut,
    state: State,
    config: DecoderConfig,
    sequence: u64,
    stats: DecoderStats,
}

impl StreamDecoder {
    /// Create a decoder with default configuration.
    pub fn new(table: Arc<FormatTable>) -> Self {
        Self::with_config(table, DecoderConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(table: Arc<FormatTable>, config: DecoderConfig) -> Self {
        Self {
            table,
            buf: BytesMut::with_capacity(config.initial_capacity),
            state: State::SeekingHeader,
            config,
            sequence: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Create a decoder over the bundled format table.
    pub fn with_bundled_table() -> fastnet_table::Result<Self> {
        Ok(Self::new(Arc::new(FormatTable::bundled()?)))
    }

    /// Append received bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Resolve the next record or error, or `None` if more bytes are needed.
    pub fn next_outcome(&mut self) -> Option<Outcome> {
        loop {
            match self.state {
                State::SeekingHeader => {
                    if self.buf.len() < HEADER_SIZE {
                        return None;
                    }
                    match Header::parse(&self.buf) {
                        Some(header) => self.state = State::ReadingType(header),
                        None => self.skip_noise(),
                    }
                }
                State::ReadingType(header) => {
                    let fixed_len = match self.table.lookup(header.command) {
                        Some(format) => format.layout.fixed_len(),
                        None => return Some(self.reject_unknown(header)),
                    };
                    if let Some(expected) = fixed_len {
                        if expected != header.body_len() {
                            return Some(self.reject_length(header, expected));
                        }
                    }
                    self.state = State::AccumulatingPayload(header);
                }
                State::AccumulatingPayload(header) => {
                    if self.buf.len() < header.frame_len() {
                        return None;
                    }
                    self.state = State::Validating(header);
                }
                State::Validating(header) => {
                    self.state = State::SeekingHeader;
                    return Some(self.validate(header));
                }
            }
        }
    }

    /// Drain every outcome resolvable from the bytes fed so far.
    pub fn outcomes(&mut self) -> impl Iterator<Item = Outcome> + '_ {
        std::iter::from_fn(move || self.next_outcome())
    }

    /// Drop all buffered bytes and return to header search.
    ///
    /// Sequence numbers and stats carry on.
    pub fn reset(&mut self) {
        if !self.buf.is_empty() {
            tracing::debug!(discarded = self.buf.len(), "decoder reset");
        }
        self.buf.clear();
        self.state = State::SeekingHeader;
    }

    /// Bytes buffered but not yet resolved.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Current synchronizer state.
    pub fn state(&self) -> SyncState {
        match self.state {
            State::SeekingHeader => SyncState::SeekingHeader,
            State::ReadingType(_) => SyncState::ReadingType,
            State::AccumulatingPayload(_) => SyncState::AccumulatingPayload,
            State::Validating(_) => SyncState::Validating,
        }
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    pub fn table(&self) -> &Arc<FormatTable> {
        &self.table
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn skip_noise(&mut self) {
        tracing::trace!(byte = self.buf[0], "discarding noise byte");
        self.buf.advance(1);
        self.stats.noise_bytes += 1;
    }

    fn reject_unknown(&mut self, header: Header) -> Outcome {
        tracing::debug!(command = header.command, "unknown sentence type");
        let bytes = self.diagnostic(HEADER_SIZE);
        self.resync();
        self.stats.unknown_sentence_types += 1;
        Outcome::Error(DecodeError::UnknownSentenceType {
            command: header.command,
            bytes,
        })
    }

    fn reject_length(&mut self, header: Header, expected: usize) -> Outcome {
        tracing::debug!(
            command = header.command,
            declared = header.body_len(),
            expected,
            "sentence length does not match its format"
        );
        let bytes = self.diagnostic(HEADER_SIZE);
        self.resync();
        self.stats.length_mismatches += 1;
        Outcome::Error(DecodeError::LengthMismatch {
            command: header.command,
            declared: header.body_len(),
            expected,
            bytes,
        })
    }

    fn validate(&mut self, header: Header) -> Outcome {
        let frame_len = header.frame_len();

        if let Err(mismatch) = checksum::verify(&self.buf[header.checked_body_range()]) {
            tracing::warn!(
                command = header.command,
                expected = mismatch.expected,
                actual = mismatch.actual,
                len = frame_len,
                "body checksum mismatch, resynchronizing"
            );
            let bytes = self.diagnostic(frame_len);
            self.resync();
            self.stats.checksum_mismatches += 1;
            return Outcome::Error(DecodeError::ChecksumMismatch {
                command: header.command,
                expected: mismatch.expected,
                actual: mismatch.actual,
                bytes,
            });
        }

        let table = Arc::clone(&self.table);
        let Some(format) = table.lookup(header.command) else {
            // Only reachable if the table changed under a running decoder.
            let bytes = self.diagnostic(HEADER_SIZE);
            self.resync();
            self.stats.unknown_sentence_types += 1;
            return Outcome::Error(DecodeError::UnknownSentenceType {
                command: header.command,
                bytes,
            });
        };

        // A one-byte body checksum passes by chance for 1 in 256 false
        // headers, so the frame stays buffered until its fields decode.
        let frame = Bytes::copy_from_slice(&self.buf[..frame_len]);
        let body = frame.slice(header.body_range());

        match decode_fields(&header, &body, &format.layout, &table) {
            Ok(fields) => {
                self.buf.advance(frame_len);
                let record = DecodedRecord {
                    sequence: self.sequence,
                    received_at: SystemTime::now(),
                    to: header.to,
                    to_name: table.address(header.to).map(|a| Arc::clone(&a.name)),
                    from: header.from,
                    from_name: table.address(header.from).map(|a| Arc::clone(&a.name)),
                    command: header.command,
                    command_name: Arc::clone(&format.name),
                    fields,
                    wire_len: frame_len,
                };
                self.sequence += 1;
                self.stats.records += 1;
                tracing::trace!(
                    command = header.command,
                    fields = record.fields.len(),
                    "decoded sentence"
                );
                Outcome::Record(record)
            }
            Err(source) => {
                tracing::error!(
                    command = header.command,
                    error = %source,
                    len = frame_len,
                    "checksum-valid sentence failed to decode, resynchronizing"
                );
                let bytes = self.truncate(&frame);
                self.resync();
                self.stats.field_errors += 1;
                Outcome::Error(DecodeError::FieldDecode {
                    command: header.command,
                    source,
                    bytes,
                })
            }
        }
    }

    /// Give up on the candidate at the front of the buffer.
    fn resync(&mut self) {
        self.buf.advance(1);
        self.state = State::SeekingHeader;
    }

    fn diagnostic(&self, len: usize) -> Bytes {
        let len = len.min(self.buf.len()).min(self.config.max_diagnostic_bytes);
        Bytes::copy_from_slice(&self.buf[..len])
    }

    fn truncate(&self, frame: &Bytes) -> Bytes {
        frame.slice(..frame.len().min(self.config.max_diagnostic_bytes))
    }
}

impl std::fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("state", &self.state())
            .field("pending", &self.buf.len())
            .field("sequence", &self.sequence)
            .field("stats", &self.stats)
            .finish()
    }
}
