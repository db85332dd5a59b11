//! Reading Hyprland's event stream.
//!
//! Hyprland broadcasts state changes as newline-delimited `NAME>>DATA`
//! records on its event socket; [`reader::EventReader`] turns that byte
//! stream into [`Event`](crate::event::Event)s.

pub mod reader;
