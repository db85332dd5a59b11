//! [`CommandGateway`] implementation backed by the `hyprctl` program.
//!
//! Every request spawns `hyprctl -j …` and waits for it to exit.  Replies are
//! decoded as JSON where possible and kept as raw text otherwise (dispatchers
//! answer with a bare `ok`).

use crate::traits::{CommandGateway, GatewayError, Reply};
use log::debug;
use std::process::Command;

/// Separator `hyprctl --batch` prints between the replies of consecutive
/// requests.
const BATCH_SEPARATOR: &str = "\n\n\n";

/// `hyprctl`-backed gateway.
#[derive(Debug, Clone)]
pub struct Hyprctl {
    program: String,
}

impl Default for Hyprctl {
    fn default() -> Self {
        Self::new()
    }
}

impl Hyprctl {
    /// Use `hyprctl` from `$PATH`.
    pub fn new() -> Self {
        Self::with_program("hyprctl")
    }

    /// Use a different executable with the same command line interface.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run the program with `args` and return its stdout.
    fn run(&self, args: &[&str]) -> Result<String, GatewayError> {
        debug!("{} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| GatewayError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GatewayError::Ipc {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                code: output.status.code().unwrap_or(-1),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl CommandGateway for Hyprctl {
    fn execute(&self, command: &str) -> Result<Reply, GatewayError> {
        let stdout = self.run(&["-j", command])?;
        Ok(Reply::decode(&stdout))
    }

    fn execute_batch(&self, commands: &[&str]) -> Result<Vec<(String, Reply)>, GatewayError> {
        let joined = commands.join(";");
        let stdout = self.run(&["-j", "--batch", &joined])?;
        Ok(decode_batch(commands, &stdout))
    }
}

/// Pair each request with its block of the batch output.
///
/// Requests without a matching block are dropped, as are surplus blocks.
fn decode_batch(commands: &[&str], stdout: &str) -> Vec<(String, Reply)> {
    commands
        .iter()
        .zip(stdout.split(BATCH_SEPARATOR))
        .map(|(cmd, block)| (cmd.to_string(), Reply::decode(block)))
        .collect()
}

//  Notifications

/// Icon shown next to a Hyprland notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Warning,
    Info,
    Hint,
    Error,
    Confused,
    Ok,
    Other,
}

impl NotificationKind {
    /// The numeric code `hyprctl notify` expects.
    pub fn code(self) -> i32 {
        match self {
            NotificationKind::Warning => 0,
            NotificationKind::Info => 1,
            NotificationKind::Hint => 2,
            NotificationKind::Error => 3,
            NotificationKind::Confused => 4,
            NotificationKind::Ok => 5,
            NotificationKind::Other => -1,
        }
    }
}

/// How long notifications stay on screen (ms).
const NOTIFY_TIMEOUT_MS: u32 = 5000;
/// Font size of the notification text.
const NOTIFY_FONT_SIZE: u32 = 10;

/// Build the `notify` request for `message`.
///
/// `color` is a hex triple without `#`, e.g. `ff0000`.
pub fn notify_command(kind: NotificationKind, color: &str, message: &str) -> String {
    format!(
        "notify {} {} rgb({}) fontsize:{} {}",
        kind.code(),
        NOTIFY_TIMEOUT_MS,
        color,
        NOTIFY_FONT_SIZE,
        message
    )
}

/// Show an on-screen notification through the window manager.
pub fn notify(
    gateway: &dyn CommandGateway,
    kind: NotificationKind,
    color: &str,
    message: &str,
) -> Result<(), GatewayError> {
    gateway.execute(&notify_command(kind, color, message))?;
    Ok(())
}
