//! # Keygate Worker
//!
//! Runs the outbox drain engine against the MySQL store and serves a small
//! health endpoint reporting database reachability and drain counters.

pub mod app;
pub mod telemetry;

pub use app::{build_otp_service, create_app, AppState};
