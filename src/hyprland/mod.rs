//! Hyprland-specific implementations.
//!
//! This module provides the concrete [`CommandGateway`](crate::traits::CommandGateway)
//! backend, typed queries on top of it, and discovery of Hyprland's event
//! socket.
//!
//! Nothing outside this module should reference Hyprland's IPC layout
//! directly.

pub mod ctl;
pub mod query;
pub mod socket;
