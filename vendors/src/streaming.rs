//! Incremental aggregation of streamed chat completions.
//!
//! The endpoint answers a streaming request with newline-delimited frames:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Transport chunks split these frames at arbitrary byte offsets, including
//! inside multi-byte UTF-8 sequences. [`StreamAggregator`] buffers partial
//! lines across chunks and reassembles the delta text.

use probe_bench_core::ProbeOutput;

use crate::openai::wire::ChatChunk;

/// Maximum bytes held for one unterminated line (1MB).
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Payload that ends a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

// ============================================================================
// Stream State
// ============================================================================

/// Lifecycle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No delta text has arrived yet
    Buffering,
    /// At least one delta has been appended
    Emitting,
    /// The sentinel was seen; further input is ignored
    Done,
}

// ============================================================================
// Stream Aggregator
// ============================================================================

/// State machine that turns transport chunks into response text.
///
/// # Line Handling
///
/// - Lines are split on `\n`; a trailing `\r` is trimmed with other whitespace.
/// - Only lines starting with `data:` (optionally followed by a space) matter.
/// - A payload that is not valid chunk JSON is skipped and counted.
/// - An unterminated line longer than 1MB is dropped and counted as malformed.
#[derive(Debug)]
pub struct StreamAggregator {
    state: StreamState,
    /// Bytes of the current unterminated line
    pending: Vec<u8>,
    /// Skipping the remainder of an overlong line
    discarding: bool,
    text: String,
    malformed: usize,
    mark_malformed: bool,
}

impl Default for StreamAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAggregator {
    /// Create an aggregator that silently skips malformed frames.
    pub fn new() -> Self {
        Self {
            state: StreamState::Buffering,
            pending: Vec::new(),
            discarding: false,
            text: String::new(),
            malformed: 0,
            mark_malformed: false,
        }
    }

    /// Append `[unparsable chunk: <raw>]` to the text for each malformed frame.
    pub fn with_placeholders(mut self, enabled: bool) -> Self {
        self.mark_malformed = enabled;
        self
    }

    /// Current state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Whether the sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.state == StreamState::Done
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Frames skipped so far.
    pub fn malformed_chunks(&self) -> usize {
        self.malformed
    }

    /// Feed one transport chunk and return the resulting state.
    pub fn feed(&mut self, bytes: &[u8]) -> StreamState {
        if self.is_done() {
            return self.state;
        }

        let mut rest = bytes;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let head = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
            } else if self.pending.is_empty() {
                self.process_line(head);
            } else {
                let mut line = std::mem::take(&mut self.pending);
                line.extend_from_slice(head);
                self.process_line(&line);
            }

            if self.is_done() {
                self.pending.clear();
                return self.state;
            }
        }

        if !self.discarding {
            self.pending.extend_from_slice(rest);
            if self.pending.len() > MAX_LINE_BYTES {
                tracing::warn!(
                    bytes = self.pending.len(),
                    "Stream line exceeded {} bytes, dropping it",
                    MAX_LINE_BYTES
                );
                self.pending.clear();
                self.discarding = true;
                self.malformed += 1;
            }
        }

        self.state
    }

    /// Finish the session at end of stream.
    ///
    /// An unterminated trailing line is processed first.
    pub fn finish(mut self) -> ProbeOutput {
        if !self.is_done() && !self.discarding && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.process_line(&line);
        }

        ProbeOutput {
            text: self.text,
            missing_content: false,
            malformed_chunks: self.malformed,
        }
    }

    fn process_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        let Some(payload) = line.trim().strip_prefix("data:") else {
            return;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return;
        }

        if payload == DONE_SENTINEL {
            tracing::trace!(chars = self.text.chars().count(), "Stream finished");
            self.state = StreamState::Done;
            return;
        }

        match serde_json::from_str::<ChatChunk>(payload) {
            Ok(chunk) => {
                if let Some(delta) = chunk.delta_content().filter(|d| !d.is_empty()) {
                    self.text.push_str(delta);
                    self.state = StreamState::Emitting;
                }
            }
            Err(e) => {
                self.malformed += 1;
                tracing::warn!(error = %e, chunk = payload, "Skipping unparsable stream chunk");
                if self.mark_malformed {
                    self.text.push_str("[unparsable chunk: ");
                    self.text.push_str(payload);
                    self.text.push(']');
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
