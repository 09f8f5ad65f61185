//! Newline-delimited JSON framing for the stream toward the game server.
//!
//! Each message is one JSON value followed by a single `\n`. The decoder works
//! on raw bytes, so a chunk may end anywhere: inside a token, inside a UTF-8
//! sequence or right before the delimiter. After every call the decoder holds
//! at most one incomplete trailing fragment.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::DEFAULT_MAX_FRAME_LEN;

const DELIMITER: u8 = b'\n';

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// One frame failed to parse. Only that frame is lost.
    #[error("malformed frame {frame:?}: {source}")]
    Malformed {
        frame: String,
        #[source]
        source: serde_json::Error,
    },
    /// A frame grew past the configured limit; the buffered bytes were dropped.
    #[error("frame exceeds {limit} bytes")]
    Oversized { limit: usize },
}

impl FrameError {
    /// Whether the stream can no longer be trusted after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Oversized { .. })
    }
}

/// Reassembles frames from arbitrarily chunked input.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_frame_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_len,
        }
    }

    /// Feed one chunk and return every message it completed, in order.
    ///
    /// Blank lines are skipped. A malformed frame yields an error entry in
    /// place of its message and decoding continues with the next frame.
    pub fn push<T: DeserializeOwned>(&mut self, chunk: &[u8]) -> Vec<Result<T, FrameError>> {
        self.buf.extend_from_slice(chunk);

        let Some(last) = self.buf.iter().rposition(|&b| b == DELIMITER) else {
            if self.buf.len() > self.max_frame_len {
                self.buf.clear();
                return vec![Err(FrameError::Oversized {
                    limit: self.max_frame_len,
                })];
            }
            return Vec::new();
        };

        let complete: Vec<u8> = self.buf.drain(..=last).collect();
        let mut out = Vec::new();
        for line in complete[..last].split(|&b| b == DELIMITER) {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }
            if line.len() > self.max_frame_len {
                out.push(Err(FrameError::Oversized {
                    limit: self.max_frame_len,
                }));
                continue;
            }
            out.push(serde_json::from_slice(line).map_err(|source| FrameError::Malformed {
                frame: String::from_utf8_lossy(line).into_owned(),
                source,
            }));
        }

        if self.buf.len() > self.max_frame_len {
            self.buf.clear();
            out.push(Err(FrameError::Oversized {
                limit: self.max_frame_len,
            }));
        }
        out
    }

    /// Bytes held back as an incomplete frame.
    pub fn retained(&self) -> &[u8] {
        &self.buf
    }
}

/// Serialize `msg` as one frame, delimiter included.
pub fn encode_frame<T: Serialize + ?Sized>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut data = serde_json::to_vec(msg)?;
    data.push(DELIMITER);
    Ok(data)
}
