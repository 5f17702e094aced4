//! Command-line front-end for Strongbox vaults

pub mod cli;
pub mod commands;

pub use cli::{Args, Command};
pub use commands::execute;
