//! # depot-notifications
//!
//! Notification queue and event history for a metadata depot.
//!
//! Producers queue "artifact published" events for a project coordinate.
//! The queue admits at most one pending event per coordinate, and only for
//! projects the registry knows. An external consumer drains the queue and
//! appends what it processed to history, which answers "what changed since T".
//!
//! Queue, history and registry are traits with in-memory and Postgres
//! implementations; [`manager::NotificationManager`] ties them together.

pub mod auth;
pub mod config;
pub mod consumer;
pub mod db;
pub mod error;
pub mod history;
pub mod manager;
pub mod model;
pub mod queue;
pub mod registry;
pub mod telemetry;
pub mod timestamp;
pub mod validator;

pub use error::{Error, Result};
pub use manager::NotificationManager;
