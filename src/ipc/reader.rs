//! Frames the raw byte stream from Hyprland's event socket into [`Event`]s.
//!
//! # Wire format
//!
//! Every record is a single UTF-8 line terminated by `\n`:
//!
//! ```text
//! workspace>>3
//! focusedmon>>DP-1,3
//! moveworkspacev2>>3,3,HDMI-A-1
//! custom>>swapws 2
//! ```
//!
//! Reads may end anywhere inside a record.  Bytes are accumulated in an
//! internal buffer until a newline arrives; anything after the newline stays
//! buffered for the next call, so a record is never split or dropped.

use crate::event::Event;
use log::{debug, warn};
use std::io::{self, ErrorKind, Read};

/// Size of a single `read` from the underlying channel.
const READ_CHUNK: usize = 4096;

/// Errors and end-of-stream conditions reported by [`EventReader::read_event`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A complete line that is not a valid `NAME>>DATA` record.
    #[error("malformed frame: {0:?}")]
    Malformed(String),
    /// The read was interrupted by a signal.  Buffered bytes are kept.
    #[error("read interrupted")]
    Interrupted,
    /// The peer closed the channel.
    #[error("event stream closed")]
    Closed,
    /// Any other read error.
    #[error("event stream read error: {0}")]
    Io(#[from] io::Error),
}

/// Turns a byte channel into a sequence of [`Event`]s.
///
/// Use [`read_event`](Self::read_event) when the caller needs to observe
/// malformed frames or signal interruptions, or iterate to receive only
/// well-formed events until the channel closes.
pub struct EventReader<R> {
    inner: R,
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
    closed: bool,
}

impl<R: Read> EventReader<R> {
    /// Wrap a connected channel.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            scanned: 0,
            closed: false,
        }
    }

    /// Block until the next complete line is available and parse it.
    pub fn read_event(&mut self) -> Result<Event, StreamError> {
        loop {
            if let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
                let pos = self.scanned + offset;
                self.scanned = 0;
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                return decode_frame(line);
            }
            self.scanned = self.buf.len();

            if self.closed {
                return Err(StreamError::Closed);
            }

            let mut chunk = [0u8; READ_CHUNK];
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    if !self.buf.is_empty() {
                        debug!("stream closed with {} unterminated bytes", self.buf.len());
                        let rest = std::mem::take(&mut self.buf);
                        self.scanned = 0;
                        return decode_frame(rest);
                    }
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    return Err(StreamError::Interrupted)
                }
                Err(e) => return Err(StreamError::Io(e)),
            }
        }
    }
}

/// Decode one line (newline already stripped).
fn decode_frame(line: Vec<u8>) -> Result<Event, StreamError> {
    let text = String::from_utf8(line)
        .map_err(|e| StreamError::Malformed(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;
    Event::parse(&text).ok_or(StreamError::Malformed(text))
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        loop {
            match self.read_event() {
                Ok(event) => return Some(event),
                Err(StreamError::Malformed(line)) => debug!("skipping malformed frame {:?}", line),
                Err(StreamError::Interrupted) => continue,
                Err(StreamError::Closed) => return None,
                Err(StreamError::Io(e)) => {
                    warn!("event stream ended: {}", e);
                    return None;
                }
            }
        }
    }
}

//  Tests
