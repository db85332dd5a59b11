//! Focus-or-toggle workspace switching across multiple monitors.
//!
//! Triggered by a `custom` event (`hyprctl dispatch event swapws 3`), the
//! handler brings workspace 3 to the focused monitor.  If workspace 3 is
//! already shown there, it goes back to the workspace that monitor showed
//! before, so the same key binding toggles between two workspaces.
//!
//! To know what "before" means the handler keeps a [`Monitor`] entry per
//! display, fed by three notifications:
//!
//! | Event             | Payload                 | Effect                                |
//! |-------------------|-------------------------|---------------------------------------|
//! | `focusedmon`      | `MONNAME,WORKSPACE`     | the named monitor becomes active      |
//! | `workspace`       | `ID`                    | the active monitor now shows `ID`     |
//! | `moveworkspacev2` | `ID,NAME,MONNAME`       | the named monitor now shows `ID`      |
//!
//! Hyprland may repeat these (a workspace move produces two
//! `moveworkspacev2` events), which [`Monitor::set_current`] absorbs.  Before
//! acting on a trigger the whole table is resynchronised from Hyprland, so
//! missed events only cost history, never correctness.

use crate::event::Event;
use crate::handlers::monitor::Monitor;
use crate::hyprland::query;
use crate::traits::{CommandGateway, Handler, HandlerError};
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::rc::Rc;

/// Name under which the handler is registered and configured.
pub const NAME: &str = "workspaceswap";

const FOCUSED_MONITOR: &str = "focusedmon";
const WORKSPACE: &str = "workspace";
const MOVE_WORKSPACE: &str = "moveworkspacev2";
const CUSTOM: &str = "custom";

/// Configuration section of the handler.
///
/// ```json
/// {
///   "subscribes": ["focusedmon", "workspace", "moveworkspacev2", "custom"],
///   "swap-ev": { "data": "^swapws (\\d+)$" },
///   "reset_on_load": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceSwapConfig {
    /// Event names to subscribe to.
    pub subscribes: Vec<String>,
    /// Which `custom` payloads trigger a switch.
    #[serde(rename = "swap-ev")]
    pub trigger: TriggerConfig,
    /// Discard tracked history whenever the configuration is (re)loaded.
    /// When `false`, a reload merges Hyprland's current state into the
    /// existing table and previous workspaces survive.  Default: `true`.
    #[serde(default = "default_reset_on_load")]
    pub reset_on_load: bool,
}

/// Matcher for trigger payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// Regular expression whose first capture group is the workspace id.
    pub data: String,
}

fn default_reset_on_load() -> bool {
    true
}

/// Result of [`WorkspaceSwap::focus_or_swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The workspace was requested on the active monitor.
    Focused(i32),
    /// The target is already shown and there is nothing to go back to.
    NoPrevious,
    /// Resolution came back to a workspace it had already tried.
    CycleDetected(i32),
}

/// Monitor table and focus as reported by the window manager.
struct WmState {
    monitors: Vec<query::MonitorJson>,
    active: query::ActiveWorkspaceJson,
}

/// Tracks per-monitor workspace history and performs focus-or-toggle.
pub struct WorkspaceSwap {
    gateway: Rc<dyn CommandGateway>,
    subscribes: Vec<String>,
    trigger: Option<Regex>,
    reset_on_load: bool,
    /// In Hyprland's enumeration order; entries are never removed.
    monitors: Vec<Monitor>,
    active: Option<String>,
}

impl WorkspaceSwap {
    /// Create the handler, loading `config` right away if given.
    pub fn new(gateway: Rc<dyn CommandGateway>, config: Option<&Value>) -> Result<Self, HandlerError> {
        let mut handler = Self {
            gateway,
            subscribes: Vec::new(),
            trigger: None,
            reset_on_load: default_reset_on_load(),
            monitors: Vec::new(),
            active: None,
        };
        if let Some(config) = config {
            handler.load_config(config)?;
        }
        Ok(handler)
    }

    /// All known monitors.
    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    /// Look up a monitor by name.
    pub fn monitor(&self, name: &str) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.name() == name)
    }

    /// The monitor that currently has focus.
    pub fn active_monitor(&self) -> Option<&Monitor> {
        self.active.as_deref().and_then(|name| self.monitor(name))
    }

    fn monitor_index(&self, name: &str) -> Option<usize> {
        self.monitors.iter().position(|m| m.name() == name)
    }

    fn active_index(&self) -> Result<usize, HandlerError> {
        self.active
            .as_deref()
            .and_then(|name| self.monitor_index(name))
            .ok_or_else(|| HandlerError::Fault("no active monitor known".into()))
    }

    /// Index of monitor `name`, resynchronising once if it is not known yet.
    fn ensure_monitor(&mut self, name: &str) -> Result<usize, HandlerError> {
        if let Some(idx) = self.monitor_index(name) {
            return Ok(idx);
        }
        debug!("unknown monitor {}, refreshing", name);
        self.refresh()?;
        self.monitor_index(name)
            .ok_or_else(|| HandlerError::Fault(format!("unknown monitor {}", name)))
    }

    /// Pull the authoritative monitor/workspace state from the window
    /// manager.
    ///
    /// Known monitors go through [`Monitor::set_current`], so history only
    /// moves where Hyprland disagrees with the table.
    pub fn refresh(&mut self) -> Result<(), HandlerError> {
        let snapshot = self.query_state()?;
        self.apply_state(snapshot);
        Ok(())
    }

    /// Query monitors and the focused workspace without touching the table.
    fn query_state(&self) -> Result<WmState, HandlerError> {
        let monitors = query::monitors(&*self.gateway)?;
        let active = query::active_workspace(&*self.gateway)?;
        Ok(WmState { monitors, active })
    }

    fn apply_state(&mut self, state: WmState) {
        for info in state.monitors {
            match self.monitor_index(&info.name) {
                Some(idx) => {
                    let mon = &mut self.monitors[idx];
                    mon.set_id(info.id);
                    mon.set_current(info.active_workspace.id);
                }
                None => {
                    debug!("new monitor {}", info.name);
                    self.monitors.push(Monitor::new(
                        info.name,
                        info.id,
                        Some(info.active_workspace.id),
                    ));
                }
            }
        }

        let active = state.active;
        let idx = match self.monitor_index(&active.monitor) {
            Some(idx) => idx,
            None => {
                self.monitors
                    .push(Monitor::new(active.monitor.clone(), active.monitor_id, None));
                self.monitors.len() - 1
            }
        };
        self.monitors[idx].set_id(active.monitor_id);
        self.monitors[idx].set_current(active.id);
        self.active = Some(active.monitor);
    }

    /// Bring `target` to the active monitor, or toggle back to that
    /// monitor's previous workspace if `target` is already shown there.
    ///
    /// Every step starts from a fresh [`refresh`](Self::refresh).  Each
    /// target is tried at most once, so the loop ends after at most one
    /// step per distinct workspace even if Hyprland keeps changing under us.
    pub fn focus_or_swap(&mut self, target: i32) -> Result<SwapOutcome, HandlerError> {
        let mut target = target;
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(target) {
                warn!("workspace {} already tried, giving up", target);
                return Ok(SwapOutcome::CycleDetected(target));
            }

            self.refresh()?;
            let active = self.active_index()?;
            let shown_on = self
                .monitors
                .iter()
                .position(|m| m.current() == Some(target));

            if shown_on != Some(active) {
                info!(
                    "focusing workspace {} on {}",
                    target,
                    self.monitors[active].name()
                );
                query::focus_workspace_on_current_monitor(&*self.gateway, target)?;
                return Ok(SwapOutcome::Focused(target));
            }

            match self.monitors[active].previous() {
                Some(previous) => {
                    debug!(
                        "workspace {} already on {}, going back to {}",
                        target,
                        self.monitors[active].name(),
                        previous
                    );
                    target = previous;
                }
                None => {
                    debug!("no previous workspace, no action taken");
                    return Ok(SwapOutcome::NoPrevious);
                }
            }
        }
    }

    /// Workspace requested by a `custom` payload, if it is meant for us.
    fn trigger_target(&self, data: &str) -> Option<i32> {
        let caps = self.trigger.as_ref()?.captures(data)?;
        let raw = caps.get(1)?.as_str();
        match raw.parse() {
            Ok(ws) => Some(ws),
            Err(_) => {
                debug!("trigger matched but {:?} is not a workspace id", raw);
                None
            }
        }
    }
}

impl Handler for WorkspaceSwap {
    fn load_config(&mut self, config: &Value) -> Result<(), HandlerError> {
        let config: WorkspaceSwapConfig = serde_json::from_value(config.clone())
            .map_err(|e| HandlerError::Config(e.to_string()))?;
        let trigger = Regex::new(&config.trigger.data)
            .map_err(|e| HandlerError::Config(format!("swap-ev pattern: {}", e)))?;
        if trigger.captures_len() < 2 {
            return Err(HandlerError::Config(
                "swap-ev pattern needs a capture group for the workspace id".into(),
            ));
        }

        // Nothing is committed until Hyprland has answered.
        let snapshot = self.query_state()?;

        self.subscribes = config.subscribes;
        self.trigger = Some(trigger);
        self.reset_on_load = config.reset_on_load;
        if self.reset_on_load {
            self.monitors.clear();
            self.active = None;
        }
        self.apply_state(snapshot);

        for mon in &self.monitors {
            debug!("tracking {}", mon);
        }
        Ok(())
    }

    fn subscriptions(&self) -> &[String] {
        &self.subscribes
    }

    fn handle_event(&mut self, event: &Event) -> Result<(), HandlerError> {
        match event.name() {
            FOCUSED_MONITOR => {
                let name = parse_focused_monitor(event.data())?;
                self.ensure_monitor(name)?;
                self.active = Some(name.to_string());
                debug!("active monitor: {}", name);
            }
            WORKSPACE => {
                let ws = parse_workspace_id(event.data())?;
                let idx = self.active_index()?;
                self.monitors[idx].set_current(ws);
                debug!("active monitor: {}", self.monitors[idx]);
            }
            MOVE_WORKSPACE => {
                let (ws, monitor) = parse_moved_workspace(event.data())?;
                let idx = self.ensure_monitor(monitor)?;
                self.monitors[idx].set_current(ws);
                debug!("workspace {} moved to {}", ws, monitor);
            }
            CUSTOM => {
                // Every handler sees every custom event; foreign payloads
                // are not errors.
                if let Some(target) = self.trigger_target(event.data()) {
                    self.focus_or_swap(target)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

//  Payload parsing

fn parse_workspace_id(raw: &str) -> Result<i32, HandlerError> {
    raw.trim()
        .parse()
        .map_err(|_| HandlerError::Fault(format!("bad workspace id {:?}", raw)))
}

/// `MONNAME,WORKSPACE` → `MONNAME`.
fn parse_focused_monitor(data: &str) -> Result<&str, HandlerError> {
    match data.split_once(',') {
        Some((name, _)) if !name.is_empty() => Ok(name),
        _ => Err(HandlerError::Fault(format!("bad focusedmon data {:?}", data))),
    }
}

/// `ID,NAME,MONNAME` → `(ID, MONNAME)`.  The workspace name may itself
/// contain commas.
fn parse_moved_workspace(data: &str) -> Result<(i32, &str), HandlerError> {
    let bad = || HandlerError::Fault(format!("bad moveworkspacev2 data {:?}", data));
    let (id, rest) = data.split_once(',').ok_or_else(bad)?;
    let (_, monitor) = rest.rsplit_once(',').ok_or_else(bad)?;
    if monitor.is_empty() {
        return Err(bad());
    }
    Ok((parse_workspace_id(id)?, monitor))
}

//  Tests
