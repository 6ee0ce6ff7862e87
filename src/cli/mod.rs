//! CLI module for auditdash - command-line interface and subcommands.
//!
//! Covers account handling, scan submission, job inspection and a live
//! watch that polls running jobs until they settle.

pub mod commands;

pub use commands::Cli;
