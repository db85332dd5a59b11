//! Test doubles shared by the unit tests of several modules.

use crate::traits::{CommandGateway, GatewayError, Reply};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;

/// One monitor as the fake window manager sees it.
#[derive(Debug, Clone)]
struct FakeMonitor {
    name: String,
    id: i64,
    workspace: i32,
}

/// An in-memory stand-in for Hyprland's control interface.
///
/// Answers `monitors` and `activeworkspace` from its own state, applies
/// `focusworkspaceoncurrentmonitor` the way Hyprland does (swapping the
/// workspace over from another monitor), and records every request.
#[derive(Debug, Default)]
pub struct FakeWm {
    monitors: RefCell<Vec<FakeMonitor>>,
    active: RefCell<String>,
    log: RefCell<Vec<String>>,
    /// Workspaces forced onto the active monitor, one per `monitors` query,
    /// to simulate changes made behind the tracker's back.
    drift: RefCell<VecDeque<i32>>,
    /// Requests to answer before the next one fails.
    fail_in: RefCell<Option<usize>>,
}

impl FakeWm {
    /// `monitors` lists `(name, id, workspace)` in enumeration order.
    pub fn new(monitors: &[(&str, i64, i32)], active: &str) -> Self {
        Self {
            monitors: RefCell::new(
                monitors
                    .iter()
                    .map(|&(name, id, workspace)| FakeMonitor {
                        name: name.into(),
                        id,
                        workspace,
                    })
                    .collect(),
            ),
            active: RefCell::new(active.into()),
            ..Self::default()
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Workspaces passed to `focusworkspaceoncurrentmonitor`, in order.
    pub fn focus_requests(&self) -> Vec<i32> {
        self.log
            .borrow()
            .iter()
            .filter_map(|r| r.strip_prefix("dispatch focusworkspaceoncurrentmonitor "))
            .filter_map(|ws| ws.parse().ok())
            .collect()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        self.log.borrow_mut().clear();
    }

    /// Change what a monitor shows, as if the user did it directly.
    pub fn set_workspace(&self, monitor: &str, workspace: i32) {
        if let Some(m) = self.monitors.borrow_mut().iter_mut().find(|m| m.name == monitor) {
            m.workspace = workspace;
        }
    }

    /// Move focus to another monitor.
    pub fn set_active(&self, monitor: &str) {
        *self.active.borrow_mut() = monitor.into();
    }

    /// Plug in a new monitor.
    pub fn add_monitor(&self, name: &str, id: i64, workspace: i32) {
        self.monitors.borrow_mut().push(FakeMonitor {
            name: name.into(),
            id,
            workspace,
        });
    }

    /// Queue workspaces to force onto the active monitor on each enumeration.
    pub fn push_drift(&self, workspaces: &[i32]) {
        self.drift.borrow_mut().extend(workspaces.iter().copied());
    }

    /// Make the next request fail with a non-zero exit.
    pub fn fail_next(&self) {
        self.fail_after(0);
    }

    /// Answer `n` more requests, then fail the one after.
    pub fn fail_after(&self, n: usize) {
        *self.fail_in.borrow_mut() = Some(n);
    }

    fn focus_on_current(&self, workspace: i32) {
        let active = self.active.borrow().clone();
        let mut monitors = self.monitors.borrow_mut();
        let Some(current) = monitors.iter().find(|m| m.name == active).map(|m| m.workspace) else {
            return;
        };
        for m in monitors.iter_mut() {
            if m.name == active {
                m.workspace = workspace;
            } else if m.workspace == workspace {
                m.workspace = current;
            }
        }
    }

    fn answer(&self, command: &str) -> Reply {
        match command {
            "monitors" => {
                if let Some(ws) = self.drift.borrow_mut().pop_front() {
                    let active = self.active.borrow().clone();
                    self.set_workspace(&active, ws);
                }
                let monitors = self.monitors.borrow();
                let active = self.active.borrow();
                let body: Vec<_> = monitors
                    .iter()
                    .map(|m| {
                        let focused = m.name == *active;
                        json!({
                            "id": m.id,
                            "name": m.name,
                            "focused": focused,
                            "activeWorkspace": { "id": m.workspace, "name": m.workspace.to_string() },
                        })
                    })
                    .collect();
                Reply::Json(Value::Array(body))
            }
            "activeworkspace" => {
                let monitors = self.monitors.borrow();
                let active = self.active.borrow();
                match monitors.iter().find(|m| m.name == *active) {
                    Some(m) => Reply::Json(json!({
                        "id": m.workspace,
                        "name": m.workspace.to_string(),
                        "monitor": m.name,
                        "monitorID": m.id,
                    })),
                    None => Reply::Json(json!({})),
                }
            }
            _ if command.starts_with("notify ") => Reply::Text("ok".into()),
            _ => match command.strip_prefix("dispatch focusworkspaceoncurrentmonitor ") {
                Some(ws) => match ws.parse() {
                    Ok(ws) => {
                        self.focus_on_current(ws);
                        Reply::Text("ok".into())
                    }
                    Err(_) => Reply::Text("invalid workspace".into()),
                },
                None => Reply::Text("Invalid dispatcher".into()),
            },
        }
    }
}

impl CommandGateway for FakeWm {
    fn execute(&self, command: &str) -> Result<Reply, GatewayError> {
        self.log.borrow_mut().push(command.to_string());
        let mut fail_in = self.fail_in.borrow_mut();
        match *fail_in {
            Some(0) => {
                *fail_in = None;
                return Err(GatewayError::Ipc {
                    stderr: "fake failure".into(),
                    code: 1,
                });
            }
            Some(n) => *fail_in = Some(n - 1),
            None => {}
        }
        drop(fail_in);
        Ok(self.answer(command))
    }

    fn execute_batch(&self, commands: &[&str]) -> Result<Vec<(String, Reply)>, GatewayError> {
        commands
            .iter()
            .map(|c| self.execute(c).map(|r| (c.to_string(), r)))
            .collect()
    }
}
