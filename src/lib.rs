//! Client-side test doubles for services that do not exist yet.
//!
//! Two building blocks:
//! - [`deferred`]: settle a value after a simulated network delay
//! - [`store`]: an in-memory store of named record tables
//!
//! A mock service typically reads or writes a shared [`Store`]
//! synchronously and hands the result back through
//! [`resolve_after_delay`] or [`reject_after_delay`].

pub mod config;
pub mod deferred;
pub mod error;
pub mod store;
pub mod telemetry;

pub use config::{Config, DelayConfig, LogConfig};
pub use deferred::{Settler, reject_after_delay, resolve_after_delay, settle_after_delay};
pub use error::{ConfigError, StoreError, StoreResult};
pub use store::{Record, Store};
