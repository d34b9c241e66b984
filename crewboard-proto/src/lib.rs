//! Shared data model and wire protocol for `crewboard`.

pub mod member;
pub mod task;
pub mod wire;
