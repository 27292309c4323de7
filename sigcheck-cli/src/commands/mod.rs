//! Subcommand implementations.

pub mod account;
pub mod classify;
pub mod records;
pub mod scan;
