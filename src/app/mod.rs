//! Application core: domain orchestration with no direct I/O.
//!
//! The [`controller::Controller`] owns settings, statistics, shot history,
//! runtime state and the schedule engine.  Persistence, time and heap
//! queries go through the **port traits** in [`ports`]; observers receive
//! [`events::AppEvent`]s.  Everything here runs on the host for tests.

pub mod commands;
pub mod controller;
pub mod events;
pub mod ports;
