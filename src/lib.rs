//! gharchive-extract - GH Archive cohort sampling and daily activity extraction.
//!
//! This library exposes the core modules for use by the binary and in integration tests.

pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod warehouse;
pub mod window;
