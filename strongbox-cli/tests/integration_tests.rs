//! Integration Tests for the Strongbox CLI
//!
//! These tests drive the command layer end to end against a temporary data
//! directory:
//! - Registration and login
//! - Storing, reading back and searching files
//! - Sharing, revoking and sweeping grants
//! - Syncing between the local vault and its peer

use anyhow::Result;
use clap::Parser;
use std::fs;
use std::time::Duration;
use strongbox_cli::{execute, Args, Command};
use strongbox_core::core_vault::{CorruptStatePolicy, Document, Session, VaultOptions};
use strongbox_core::StrongboxConfig;
use tempfile::TempDir;

/// A data directory plus the config pointing at it
struct TestDesk {
    dir: TempDir,
    config: StrongboxConfig,
}

impl TestDesk {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = StrongboxConfig::default();
        config.vault.data_dir = dir.path().join("data");
        TestDesk { dir, config }
    }

    /// Parse `argv` like the binary would and run it
    async fn run(&self, argv: &[&str]) -> Result<String> {
        let args = Args::try_parse_from(std::iter::once("strongbox").chain(argv.iter().copied()))?;
        self.run_command(args.command).await
    }

    async fn run_command(&self, command: Command) -> Result<String> {
        let mut out = Vec::new();
        execute(&self.config, command, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    fn write_file(&self, name: &str, contents: &[u8]) -> String {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    /// Store a file and return the printed record id
    async fn store(&self, name: &str, contents: &str) -> String {
        let file = self.write_file(name, contents.as_bytes());
        self.run(&["store", file.as_str()]).await.unwrap().trim().to_string()
    }
}

#[tokio::test]
async fn test_register_and_login() {
    let desk = TestDesk::new();

    let out = desk.run(&["register", "amy", "--password", "hunter2"]).await.unwrap();
    assert_eq!(out.trim(), "Registered amy");

    let out = desk.run(&["login", "amy", "--password", "hunter2"]).await.unwrap();
    assert_eq!(out.trim(), "Welcome, amy");

    let err = desk.run(&["login", "amy", "--password", "wrong"]).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid username or password");

    let err = desk.run(&["login", "nobody", "--password", "x"]).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid username or password");

    // Same name twice
    assert!(desk.run(&["register", "amy", "--password", "other"]).await.is_err());
}

#[tokio::test]
async fn test_store_get_and_search() {
    let desk = TestDesk::new();
    let id = desk.store("plan.txt", "Launch window opens Tuesday").await;
    assert_eq!(id.len(), 64);

    // Full JSON view by prefix
    let out = desk.run(&["get", &id[..10]]).await.unwrap();
    let doc: Document = serde_json::from_str(&out).unwrap();
    assert_eq!(doc, Document::new()
        .with("file_name", "plan.txt")
        .with("file_type", "text")
        .with("content", "Launch window opens Tuesday"));

    let out = desk.run(&["search", "TUESDAY"]).await.unwrap();
    assert!(out.contains("plan.txt"));
    assert!(out.starts_with(&id[..8]));

    let out = desk.run(&["search", "wednesday"]).await.unwrap();
    assert_eq!(out.trim(), "No records match 'wednesday'");
}

#[tokio::test]
async fn test_binary_file_round_trip() {
    let desk = TestDesk::new();
    let raw = [0xffu8, 0x00, 0xfe, 0x10, 0x80];
    let file = desk.write_file("image.bin", &raw);

    let id = desk.run(&["store", file.as_str()]).await.unwrap().trim().to_string();
    let restored = desk.path("restored.bin");
    let out = desk.run(&["get", id.as_str(), "--output", restored.as_str()]).await.unwrap();

    assert!(out.starts_with("Wrote 5 bytes"));
    assert_eq!(fs::read(&restored).unwrap(), raw);
}

#[tokio::test]
async fn test_store_with_metadata_and_list() {
    let desk = TestDesk::new();
    let file = desk.write_file("a.txt", b"alpha");
    desk.run(&["store", file.as_str(), "--meta", "name=Alpha report", "--meta", "owner=amy"])
        .await
        .unwrap();
    desk.store("b.txt", "beta").await;

    let out = desk.run(&["list"]).await.unwrap();
    assert!(out.contains("Alpha report"));
    assert!(out.trim_end().ends_with("2 record(s), 0 grant(s)"));
}

#[tokio::test]
async fn test_share_access_and_revoke() {
    let desk = TestDesk::new();
    let file = desk.write_file("memo.txt", b"board memo");
    let id = desk
        .run(&["store", file.as_str(), "--share", "bob,carol", "--expiry-days", "3"])
        .await
        .unwrap()
        .trim()
        .to_string();

    let out = desk.run(&["access", id.as_str(), "bob"]).await.unwrap();
    assert_eq!(out.trim(), "bob: allowed");
    let out = desk.run(&["access", id.as_str(), "dave"]).await.unwrap();
    assert_eq!(out.trim(), "dave: denied");

    let out = desk.run(&["share", id.as_str(), "dave"]).await.unwrap();
    assert!(out.contains("1 recipient(s)"));

    let out = desk.run(&["access", id.as_str()]).await.unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().any(|l| l.starts_with("dave") && l.contains("never")));

    let out = desk.run(&["revoke", id.as_str(), "bob"]).await.unwrap();
    assert!(out.starts_with("Revoked bob"));
    let out = desk.run(&["revoke", id.as_str(), "bob"]).await.unwrap();
    assert!(out.contains("had no access"));
    let out = desk.run(&["access", id.as_str(), "bob"]).await.unwrap();
    assert_eq!(out.trim(), "bob: denied");

    // Nothing has expired yet
    let out = desk.run(&["sweep"]).await.unwrap();
    assert_eq!(out.trim(), "Removed 0 expired grant(s)");
}

#[tokio::test]
async fn test_invalid_requests_are_errors() {
    let desk = TestDesk::new();
    let id = desk.store("x.txt", "x").await;

    assert!(desk.run(&["share", id.as_str(), "bob", "--expiry-days", "-1"]).await.is_err());
    assert!(desk.run(&["share", "0000000000", "bob"]).await.is_err());
    assert!(desk.run(&["get", "zz"]).await.is_err());
    assert!(desk.run(&["store", desk.path("missing.txt").as_str()]).await.is_err());
    assert!(desk.run(&["sync", "--from", "local"]).await.is_err());
}

#[tokio::test]
async fn test_sync_from_peer() {
    let desk = TestDesk::new();

    // Upload straight into the peer vault
    let content = Document::new()
        .with("file_name", "cloud.txt")
        .with("file_type", "text")
        .with("content", "written in the cloud");
    {
        let mut session = Session::new(&desk.config.vault.data_dir, VaultOptions::default());
        let cloud = session.vault("cloud").unwrap();
        cloud.lock().unwrap().store(&content, None).unwrap();
    }

    let out = desk.run(&["search", "cloud"]).await.unwrap();
    assert!(out.starts_with("No records match"));

    let out = desk.run(&["sync"]).await.unwrap();
    assert_eq!(out.trim(), "Synced from cloud: 1 adopted, 0 kept, 0 grant(s), 0 skipped");

    let out = desk.run(&["search", "cloud"]).await.unwrap();
    assert!(out.contains("cloud.txt"));

    // Second pass has nothing newer
    let out = desk.run(&["sync"]).await.unwrap();
    assert!(out.contains("0 adopted, 1 kept"));
}

#[tokio::test]
async fn test_watch_syncs_until_time_limit() {
    let desk = TestDesk::new();
    desk.run(&["register", "amy", "--password", "pw"]).await.unwrap();
    {
        let mut session = Session::new(&desk.config.vault.data_dir, VaultOptions::default());
        let cloud = session.vault("cloud").unwrap();
        cloud
            .lock()
            .unwrap()
            .store(&Document::new().with("content", "synced by watch"), None)
            .unwrap();
    }

    let out = desk
        .run_command(Command::Watch {
            username: "amy".to_string(),
            password: "pw".to_string(),
            interval: Some(Duration::from_millis(20)),
            run_for: Some(Duration::from_millis(200)),
        })
        .await
        .unwrap();
    assert!(out.starts_with("Syncing local from cloud"));
    assert!(!out.contains("after 0 sync"));

    let out = desk.run(&["search", "watch"]).await.unwrap();
    assert!(!out.starts_with("No records match"));
}

#[tokio::test]
async fn test_watch_requires_login() {
    let desk = TestDesk::new();
    let err = desk
        .run(&["watch", "ghost", "--password", "pw", "--for", "1s"])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid username or password");
}

#[tokio::test]
async fn test_corrupt_state_policy_from_config() {
    let mut desk = TestDesk::new();
    desk.store("keep.txt", "first").await;

    let state = desk.config.vault.data_dir.join("local_vault.enc");
    let mut bytes = fs::read(&state).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&state, &bytes).unwrap();

    assert!(desk.run(&["list"]).await.is_err());

    desk.config.vault.corrupt_policy = CorruptStatePolicy::Quarantine;
    let out = desk.run(&["list"]).await.unwrap();
    assert!(out.trim_end().ends_with("0 record(s), 0 grant(s)"));
}
