//! `crewboard` store server library.
//!
//! Hosts the `members` and `tasks` tables behind a WebSocket endpoint that
//! speaks the request/response protocol from `crewboard_proto::wire`.
//! Exposed as a library for tests and embedding.

pub mod config;
pub mod seed;
pub mod server;
pub mod tables;
