//! **hyprevents** routes Hyprland events to pluggable handlers.
//!
//! Hyprland announces every state change (workspace switched, monitor
//! focused, window opened, …) on its event socket.  hyprevents reads that
//! stream, looks up which handlers subscribed to each event type, and calls
//! them in order.  Handlers react by keeping their own state and sending
//! commands back to Hyprland.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::CommandGateway`]: request/response access to Hyprland's
//!   control interface, so handlers are not coupled to `hyprctl`.
//! * [`traits::Handler`]: the capability set every handler provides; the
//!   [`dispatch::EventDispatcher`] never looks further than this.
//!
//! Concrete implementations live in [`hyprland`] (the `hyprctl` gateway and
//! socket discovery) and [`handlers`] (the built-in handlers, currently the
//! [`workspace_swap`](handlers::workspace_swap) toggle).

pub mod config;
pub mod dispatch;
pub mod event;
pub mod handlers;
pub mod hyprland;
pub mod ipc;
pub mod shutdown;
pub mod traits;

#[cfg(test)]
mod testing;
