//! Checkpoint is an HTTP service whose handlers run behind a fixed
//! interception pipeline.
//!
//! Every request passes through body capture, then a capability gate that
//! admits only handlers carrying the open-access marker (on the operation
//! or on its group), then around-advice scoped to one handler group that
//! times the call, normalizes phone numbers on a copy of the argument and
//! reports the outcome.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate).
//! - [`config`] -- Configuration model, file loading and validation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`registry`] -- Handler descriptors and their capability markers.
//! - [`events`] -- Pipeline events and the sinks that record them.
//! - [`gate`] -- Capability gate middleware.
//! - [`capture`] -- Request/response body capture and replay.
//! - [`advice`] -- Group-scoped around-advice.
//! - [`handlers`] -- The `user` and `open` handler groups.
//! - [`pipeline`] -- Composition of the stages around the handlers.
//! - [`health`] -- `GET /health` endpoint handler.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`server`] -- Axum server setup, shared state and graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file formats |
//! | `full` | All features |

#![allow(clippy::missing_errors_doc)]

pub mod advice;
pub mod capture;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod handlers;
pub mod health;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod server;
