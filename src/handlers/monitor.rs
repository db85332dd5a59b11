//! Per-monitor workspace history.

use std::fmt;

/// A display surface with the workspace it shows now and the one it showed
/// before.
///
/// `current` and `previous` are never equal once both are set: assigning the
/// workspace a monitor already shows leaves the history untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    name: String,
    id: i64,
    current: Option<i32>,
    previous: Option<i32>,
}

impl Monitor {
    /// A monitor with no history.
    pub fn new(name: impl Into<String>, id: i64, current: Option<i32>) -> Self {
        Self {
            name: name.into(),
            id,
            current,
            previous: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    /// Workspace shown right now.
    pub fn current(&self) -> Option<i32> {
        self.current
    }

    /// Workspace shown before the current one.
    pub fn previous(&self) -> Option<i32> {
        self.previous
    }

    /// Record that the monitor now shows `workspace`.
    ///
    /// History only moves when the workspace actually changes, so duplicated
    /// notifications for the same switch are harmless.
    pub fn set_current(&mut self, workspace: i32) {
        if self.current != Some(workspace) {
            self.previous = self.current;
            self.current = Some(workspace);
        }
        debug_assert!(self.previous.is_none() || self.previous != self.current);
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (id {}, current {:?}, previous {:?})",
            self.name, self.id, self.current, self.previous
        )
    }
}
