//! Declarative, idempotent development environment provisioning.
//!
//! Recipes described in `conf/recipes.toml` install packages through
//! whichever package manager the host offers (with ordered fallbacks), place
//! dotfiles, and run initialisation commands. Every filesystem change is
//! checked first and backed up before it happens, so repeated runs converge
//! on the same state.
//!
//! The public API is organised into layers:
//!
//! - **[`platform`]**: OS, architecture and package-manager detection
//! - **[`installer`]**: install-with-fallback over package managers and scripts
//! - **[`resources`]** and **[`guard`]**: idempotent `check + apply` primitives
//!   wrapped with backup-before-mutate and dry-run handling
//! - **[`config`]** and **[`recipes`]**: settings, TOML recipe files and the
//!   ordered recipe registry
//! - **[`engine`]**: sequential execution with the critical failure policy
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `list`, `check`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod guard;
pub mod installer;
pub mod logging;
pub mod platform;
pub mod recipes;
pub mod resources;
