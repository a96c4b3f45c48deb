//! babylog CLI library.
//!
//! This crate provides the command-line interface for the feeding and diaper log.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, DiaperKind, EditArgs, SideArg};
pub use config::Config;
