//! Host configuration engine for Windows network and system tuning.
//!
//! Every tunable area, from per-adapter DNS servers and MTU to the TCP stack,
//! the Windows Update policy and update service start types, is a
//! [`domains::Domain`] driven through one generic discover, snapshot, apply,
//! verify and restore cycle.
//!
//! The public API is organised into four layers:
//!
//! - **[`store`]** and **[`resources`]**: where settings live and which
//!   adapters they apply to
//! - **[`mutation`]**: the per-domain engine over those backends
//! - **[`tasks`]**: the fail-forward optimize sequence with its threshold
//!   verdict
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod actions;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domains;
pub mod error;
pub mod exec;
pub mod logging;
pub mod mutation;
pub mod operations;
pub mod platform;
pub mod resources;
pub mod setting;
pub mod snapshot;
pub mod store;
pub mod tasks;
