//! Subcommands

pub mod run;
