//! Subcommand implementations.

pub mod convert;
pub mod init;
pub mod list_rules;
pub mod output;
