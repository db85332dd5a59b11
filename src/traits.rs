//! Core traits that decouple hyprevents from any specific window manager
//! transport or handler implementation.
//!
//! * [`CommandGateway`]: request/response access to the window manager's
//!   control interface.  The production backend shells out to `hyprctl`
//!   ([`Hyprctl`](crate::hyprland::ctl::Hyprctl)); tests use recording
//!   doubles.
//! * [`Handler`]: a pluggable reaction to events.  The
//!   [`EventDispatcher`](crate::dispatch::EventDispatcher) only ever sees
//!   handlers through this trait.

use crate::event::Event;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

//  Command gateway

/// Structured result of a single gateway request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The window manager answered with valid JSON.
    Json(Value),
    /// Anything else, e.g. the `ok` returned by dispatchers.
    Text(String),
}

impl Reply {
    /// Decode a reply into a JSON body, or keep it as text.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(value) => Reply::Json(value),
            Err(_) => Reply::Text(raw.to_string()),
        }
    }

    /// Deserialize a JSON reply into `T`.
    ///
    /// `command` is only used for the error message.
    pub fn into_json<T: DeserializeOwned>(self, command: &str) -> Result<T, GatewayError> {
        match self {
            Reply::Json(value) => {
                serde_json::from_value(value).map_err(|e| GatewayError::UnexpectedReply {
                    command: command.to_string(),
                    reason: e.to_string(),
                })
            }
            Reply::Text(text) => Err(GatewayError::UnexpectedReply {
                command: command.to_string(),
                reason: format!("expected JSON, got {:?}", text),
            }),
        }
    }

    /// Whether this is the plain `ok` acknowledgement.
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Text(t) if t.trim() == "ok")
    }
}

/// Errors that can occur when talking to the window manager.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The control program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The control program exited with a non-zero status.
    #[error("hyprctl terminated with errcode {code}: {stderr}")]
    Ipc { stderr: String, code: i32 },
    /// The reply did not have the expected shape.
    #[error("unexpected reply to {command:?}: {reason}")]
    UnexpectedReply { command: String, reason: String },
}

/// Synchronous request/response channel to the window manager.
///
/// Every call blocks for the full round trip.
pub trait CommandGateway {
    /// Send one command and return its decoded reply.
    fn execute(&self, command: &str) -> Result<Reply, GatewayError>;

    /// Send several commands at once.  Each reply is paired with the
    /// command that produced it, in request order.
    fn execute_batch(&self, commands: &[&str]) -> Result<Vec<(String, Reply)>, GatewayError>;
}

//  Handlers

/// Failure reported by a [`Handler`].
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler's configuration section does not match its schema.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Transient inability to act.  Callers log and ignore it.
    #[error("handler busy: {0}")]
    Busy(String),
    /// A gateway call made by the handler failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Any other failure while handling an event.
    #[error("{0}")]
    Fault(String),
}

impl HandlerError {
    /// `true` for outcomes that must not abort the event cycle.
    pub fn is_busy(&self) -> bool {
        matches!(self, HandlerError::Busy(_))
    }
}

/// A pluggable component that reacts to subscribed event types.
///
/// Handlers are constructed through the
/// [`HandlerFactory`](crate::handlers::HandlerFactory) and then driven
/// exclusively through this trait.
pub trait Handler {
    /// Re-initialise from a configuration section, including the list of
    /// event names the handler subscribes to.
    fn load_config(&mut self, config: &Value) -> Result<(), HandlerError>;

    /// Event names this handler is currently subscribed to.
    fn subscriptions(&self) -> &[String];

    /// React to one event.
    fn handle_event(&mut self, event: &Event) -> Result<(), HandlerError>;
}

/// A handler shared between the handler registry and the subscription
/// lists.  The dispatcher is single-threaded, so `Rc`/`RefCell` suffice.
pub type SharedHandler = Rc<RefCell<dyn Handler>>;
