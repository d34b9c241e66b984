//! Crewboard client library.
//!
//! Board state, store access, configuration and the terminal UI. The
//! `crewboard` binary wires these together.

pub mod app;
pub mod board;
pub mod config;
pub mod gate;
pub mod store;
pub mod ui;
