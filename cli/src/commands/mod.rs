//! CLI command implementations.

pub mod profiles;
pub mod run;
pub mod show_logs;
