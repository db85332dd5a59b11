//! Typed requests on top of a [`CommandGateway`].
//!
//! Only the fields hyprevents actually reads are modelled; everything else in
//! Hyprland's JSON is ignored.

use crate::traits::{CommandGateway, GatewayError};
use serde::Deserialize;

//  Minimal serde structs for the JSON we care about

/// Subset of the JSON object returned by `monitors`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonitorJson {
    pub id: i64,
    pub name: String,
    #[serde(rename = "activeWorkspace")]
    pub active_workspace: WorkspaceRef,
}

/// The `{ "id": …, "name": … }` workspace reference embedded in other objects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkspaceRef {
    pub id: i32,
}

/// Subset of the JSON object returned by `activeworkspace`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActiveWorkspaceJson {
    pub id: i32,
    pub monitor: String,
    #[serde(rename = "monitorID")]
    pub monitor_id: i64,
}

/// Enumerate all monitors.
pub fn monitors(gateway: &dyn CommandGateway) -> Result<Vec<MonitorJson>, GatewayError> {
    gateway.execute("monitors")?.into_json("monitors")
}

/// The focused workspace and the monitor it is shown on.
pub fn active_workspace(gateway: &dyn CommandGateway) -> Result<ActiveWorkspaceJson, GatewayError> {
    gateway
        .execute("activeworkspace")?
        .into_json("activeworkspace")
}

/// Send a dispatcher and check for `"ok"`.
pub fn dispatch(gateway: &dyn CommandGateway, args: &str) -> Result<(), GatewayError> {
    let command = format!("dispatch {}", args);
    let reply = gateway.execute(&command)?;
    if reply.is_ok() {
        Ok(())
    } else {
        Err(GatewayError::UnexpectedReply {
            command,
            reason: format!("dispatch error: {:?}", reply),
        })
    }
}

/// Show `workspace_id` on the focused monitor, swapping it over from
/// another monitor if needed.
pub fn focus_workspace_on_current_monitor(
    gateway: &dyn CommandGateway,
    workspace_id: i32,
) -> Result<(), GatewayError> {
    dispatch(
        gateway,
        &format!("focusworkspaceoncurrentmonitor {}", workspace_id),
    )
}
