//! Discovery of and connection to Hyprland's event socket.
//!
//! Hyprland ≥ 0.40 stores its sockets at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/`.  The event socket
//! (`.socket2.sock`) broadcasts `EVENT>>DATA` lines to every connected client.

use crate::ipc::reader::EventReader;
use log::{debug, warn};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Environment variable naming the running Hyprland instance.
pub const INSTANCE_ENV: &str = "HYPRLAND_INSTANCE_SIGNATURE";
/// Environment variable naming the per-user runtime directory.
pub const RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";

/// Errors from locating or connecting to the event socket.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("a hyprland instance does not seem to be running (HYPRLAND_INSTANCE_SIGNATURE not set)")]
    NoInstance,
    #[error("connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The per-user runtime directory, defaulting to `/run/user/<uid>`.
pub fn runtime_dir() -> PathBuf {
    match std::env::var(RUNTIME_DIR_ENV) {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            // SAFETY: getuid has no preconditions and cannot fail.
            let uid = unsafe { libc::getuid() };
            warn!("{} not set, using default for uid {}", RUNTIME_DIR_ENV, uid);
            PathBuf::from(format!("/run/user/{}", uid))
        }
    }
}

/// The event socket for a given runtime directory and instance signature.
pub fn event_socket_in(runtime_dir: &Path, signature: &str) -> PathBuf {
    runtime_dir
        .join("hypr")
        .join(signature)
        .join(".socket2.sock")
}

/// Resolve the event socket of the running instance.
pub fn event_socket_path() -> Result<PathBuf, SocketError> {
    let signature = std::env::var(INSTANCE_ENV).map_err(|_| SocketError::NoInstance)?;
    Ok(event_socket_in(&runtime_dir(), &signature))
}

/// Connect to the event socket at `path`.
pub fn connect_events_at(path: &Path) -> Result<EventReader<UnixStream>, SocketError> {
    let stream = UnixStream::connect(path).map_err(|source| SocketError::Connect {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("connected to event socket {}", path.display());
    Ok(EventReader::new(stream))
}

/// Connect to the running instance's event socket.
pub fn connect_events() -> Result<EventReader<UnixStream>, SocketError> {
    connect_events_at(&event_socket_path()?)
}
