//! BrewOS controller core.
//!
//! Exposes the pure-logic modules for integration testing and for the
//! firmware binary.  ESP-IDF specific code is guarded by the `espidf`
//! feature inside each adapter.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod runtime;
pub mod schedule;
pub mod settings;
pub mod statistics;
