//! Board state and logic: cache, derived views, mutations, drag/drop and
//! filter selection.

pub mod cache;
pub mod committee;
pub mod controller;
pub mod drag;
pub mod selection;
pub mod views;

pub use cache::{BoardCache, SharedBoard};
pub use controller::{BoardSettings, TaskController, TaskDraft, TaskError};
