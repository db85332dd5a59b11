//! The event record shared by the reader, the dispatcher and every handler.
//!
//! Hyprland writes one notification per line on its event socket
//! (`socket2`) in the form `EVENT>>DATA`.  Only the *first* `>>` separates
//! the name from the payload; the payload itself may contain further `>>`
//! sequences.

use std::fmt;

/// Separator between event name and payload on the wire.
pub const SEPARATOR: &str = ">>";

/// One parsed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    name: String,
    data: String,
}

impl Event {
    /// Build an event from its name and payload.
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Parse a single line (without the trailing newline).
    ///
    /// Returns `None` when the line has no separator or an empty name.
    pub fn parse(line: &str) -> Option<Self> {
        let (name, data) = split_event_line(line)?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, data))
    }

    /// The event type, e.g. `workspace` or `focusedmon`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw payload after the separator.
    pub fn data(&self) -> &str {
        &self.data
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, SEPARATOR, self.data)
    }
}

/// Split a line at the first `>>`.
fn split_event_line(line: &str) -> Option<(&str, &str)> {
    let sep = line.find(SEPARATOR)?;
    Some((&line[..sep], &line[sep + SEPARATOR.len()..]))
}
