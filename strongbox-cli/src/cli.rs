//! Argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use strongbox_core::logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "strongbox")]
#[command(author, version, about = "Encrypted record vault", long_about = None)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON formatted logging
    #[arg(long)]
    pub json_logs: bool,

    /// TOML configuration file
    #[arg(short, long, env = "STRONGBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding vault and credential files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create a user
    Register {
        username: String,
        #[arg(long, env = "STRONGBOX_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Check a username and password
    Login {
        username: String,
        #[arg(long, env = "STRONGBOX_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Encrypt a file into the vault
    Store {
        file: PathBuf,

        /// Metadata entry, repeatable
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,

        /// Recipients to share with, comma separated
        #[arg(long, value_delimiter = ',')]
        share: Vec<String>,

        /// Days until shared access expires; 0 means never
        #[arg(long, allow_negative_numbers = true)]
        expiry_days: Option<i64>,
    },

    /// Decrypt a record
    Get {
        /// Record id or unique prefix
        id: String,

        /// Write the original file bytes here instead of printing the record
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find records containing any of the words
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Grant recipients access to a record
    Share {
        id: String,
        #[arg(required = true)]
        recipients: Vec<String>,
        /// Days until access expires; 0 means never
        #[arg(long, allow_negative_numbers = true)]
        expiry_days: Option<i64>,
    },

    /// Remove a recipient's access
    Revoke { id: String, recipient: String },

    /// Check one recipient, or list every grant on a record
    Access { id: String, recipient: Option<String> },

    /// Purge expired grants
    Sweep,

    /// List stored records
    List,

    /// Merge a peer vault into the local one
    Sync {
        /// Peer vault name (defaults to the configured remote)
        #[arg(long)]
        from: Option<String>,
    },

    /// Log in and keep syncing from the peer until interrupted
    Watch {
        username: String,
        #[arg(long, env = "STRONGBOX_PASSWORD", hide_env_values = true)]
        password: String,

        /// Sync interval, e.g. "30s"
        #[arg(long, value_parser = parse_duration)]
        interval: Option<Duration>,

        /// Stop after this long instead of waiting for a signal
        #[arg(long = "for", value_parser = parse_duration)]
        run_for: Option<Duration>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_flags() {
        let args = Args::try_parse_from([
            "strongbox",
            "store",
            "report.txt",
            "--meta",
            "project=apollo",
            "--share",
            "alice,bob",
            "--expiry-days",
            "7",
        ])
        .unwrap();

        assert_eq!(
            args.command,
            Command::Store {
                file: PathBuf::from("report.txt"),
                meta: vec![("project".to_string(), "apollo".to_string())],
                share: vec!["alice".to_string(), "bob".to_string()],
                expiry_days: Some(7),
            }
        );
    }

    #[test]
    fn test_negative_expiry_reaches_validation() {
        let args =
            Args::try_parse_from(["strongbox", "share", "abc", "bob", "--expiry-days", "-2"]).unwrap();
        assert!(matches!(args.command, Command::Share { expiry_days: Some(-2), .. }));
    }

    #[test]
    fn test_global_flags() {
        let args = Args::try_parse_from([
            "strongbox",
            "--log-level",
            "debug",
            "--data-dir",
            "/tmp/sb",
            "list",
        ])
        .unwrap();
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/sb")));
        assert_eq!(args.command, Command::List);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(Args::try_parse_from(["strongbox", "store", "f", "--meta", "novalue"]).is_err());
        assert!(Args::try_parse_from(["strongbox", "--log-level", "loud", "list"]).is_err());
        assert!(Args::try_parse_from(["strongbox", "search"]).is_err());
        assert!(Args::try_parse_from([
            "strongbox", "watch", "amy", "--password", "pw", "--interval", "often"
        ])
        .is_err());
    }

    #[test]
    fn test_watch_durations() {
        let args = Args::try_parse_from([
            "strongbox", "watch", "amy", "--password", "pw", "--interval", "5s", "--for", "1m",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Watch {
                interval: Some(i),
                run_for: Some(f),
                ..
            } if i == Duration::from_secs(5) && f == Duration::from_secs(60)
        ));
    }
}
