//! # vigil
//!
//! Watches local git checkouts and alerts when their tracked remote
//! branch has commits that are missing locally.
//!
//! The interesting part lives in [`core::engine`]: given a repository
//! handle, decide "has the remote moved ahead" while rationing network
//! round-trips through a per-repository, time-boxed cache
//! ([`core::cache`]). Everything around it (registry, unix-socket IPC,
//! notifications) is plumbing for the `vigild` daemon and the `vigil`
//! client.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod ipc;
pub mod logging;
pub mod notifications;
