//! Command execution
//!
//! Each invocation opens a fresh [`Session`] over the configured data
//! directory. Output goes to the writer passed in so the same code serves
//! the binary and the tests.

use crate::cli::Command;
use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use strongbox_core::auth::CredentialStore;
use strongbox_core::core_vault::{
    Document, FieldValue, Metadata, RecipientId, RecordId, Session, SharedVault, Vault,
};
use strongbox_core::shutdown::{install_signal_handlers, ShutdownSignal};
use strongbox_core::StrongboxConfig;
use tracing::{debug, info};

const FILE_TYPE_TEXT: &str = "text";
const FILE_TYPE_BINARY: &str = "binary";

/// Run one command against the vaults described by `config`
pub async fn execute<W: Write>(config: &StrongboxConfig, command: Command, out: &mut W) -> Result<()> {
    let credentials = CredentialStore::new(config.vault.users_dir());
    let mut session = Session::new(&config.vault.data_dir, config.vault.vault_options());
    debug!(data_dir = %config.vault.data_dir.display(), "Executing command");

    match command {
        Command::Register { username, password } => {
            credentials.register(&username, &password)?;
            writeln!(out, "Registered {}", username)?;
        }

        Command::Login { username, password } => {
            login(&credentials, &username, &password)?;
            writeln!(out, "Welcome, {}", username)?;
        }

        Command::Store {
            file,
            meta,
            share,
            expiry_days,
        } => {
            let content = file_document(&file)?;
            let metadata = if meta.is_empty() {
                None
            } else {
                Some(meta.into_iter().collect::<Metadata>())
            };

            let local = local_vault(&mut session, config)?;
            let mut vault = local.lock()?;
            let id = if share.is_empty() {
                vault.store(&content, metadata)?
            } else {
                let recipients = recipients(share);
                vault.store_and_share(&content, metadata, &recipients, expiry_days)?
            };
            writeln!(out, "{}", id)?;
        }

        Command::Get { id, output } => {
            let local = local_vault(&mut session, config)?;
            let vault = local.lock()?;
            let id = resolve_id(&vault, &id)?;
            let content = vault
                .retrieve(&id)?
                .with_context(|| format!("Record {} could not be decrypted", id.short()))?;

            match output {
                Some(path) => {
                    let bytes = file_bytes(&content)?;
                    fs::write(&path, &bytes)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    writeln!(out, "Wrote {} bytes to {}", bytes.len(), path.display())?;
                }
                None => writeln!(out, "{}", serde_json::to_string_pretty(&content)?)?,
            }
        }

        Command::Search { query } => {
            let query = query.join(" ");
            let local = local_vault(&mut session, config)?;
            let hits = local.lock()?.search(&query)?;

            if hits.is_empty() {
                writeln!(out, "No records match '{}'", query)?;
            }
            for (id, content) in hits {
                writeln!(out, "{}  {}", id.short(), display_name(&content))?;
            }
        }

        Command::Share {
            id,
            recipients: names,
            expiry_days,
        } => {
            let local = local_vault(&mut session, config)?;
            let mut vault = local.lock()?;
            let id = resolve_id(&vault, &id)?;
            let written = vault.grant(&id, &recipients(names), expiry_days)?;
            writeln!(out, "Shared {} with {} recipient(s)", id.short(), written)?;
        }

        Command::Revoke { id, recipient } => {
            let local = local_vault(&mut session, config)?;
            let mut vault = local.lock()?;
            let id = resolve_id(&vault, &id)?;
            if vault.revoke(&id, &RecipientId::new(recipient.as_str()))? {
                writeln!(out, "Revoked {} on {}", recipient, id.short())?;
            } else {
                writeln!(out, "{} had no access to {}", recipient, id.short())?;
            }
        }

        Command::Access { id, recipient } => {
            let local = local_vault(&mut session, config)?;
            let vault = local.lock()?;
            let id = resolve_id(&vault, &id)?;

            match recipient {
                Some(name) => {
                    let allowed = vault.has_access(&id, &RecipientId::new(name.as_str()));
                    writeln!(out, "{}: {}", name, if allowed { "allowed" } else { "denied" })?;
                }
                None => {
                    let grants = vault.grants_for(&id);
                    if grants.is_empty() {
                        writeln!(out, "No grants on {}", id.short())?;
                    }
                    for status in grants {
                        let expiry = match status.grant.expires_at {
                            Some(at) => at.to_string(),
                            None => "never".to_string(),
                        };
                        let marker = if status.expired { " (expired)" } else { "" };
                        writeln!(out, "{}  expires {}{}", status.recipient, expiry, marker)?;
                    }
                }
            }
        }

        Command::Sweep => {
            let local = local_vault(&mut session, config)?;
            let removed = local.lock()?.sweep_expired()?;
            writeln!(out, "Removed {} expired grant(s)", removed)?;
        }

        Command::List => {
            let local = local_vault(&mut session, config)?;
            let vault = local.lock()?;
            let stats = vault.stats();

            for summary in vault.list() {
                let name = summary.metadata.get("name").map(String::as_str).unwrap_or("-");
                writeln!(out, "{}  {}  updated {}", summary.id.short(), name, summary.updated_at)?;
            }
            writeln!(out, "{} record(s), {} grant(s)", stats.records, stats.grants)?;
        }

        Command::Sync { from } => {
            let from = from.unwrap_or_else(|| config.sync.remote_name.clone());
            if from == config.vault.local_name {
                bail!("Cannot sync vault '{}' with itself", from);
            }

            let local = local_vault(&mut session, config)?;
            let remote = session.vault(&from)?;
            let report = local.sync_from(&remote)?;
            writeln!(
                out,
                "Synced from {}: {} adopted, {} kept, {} grant(s), {} skipped",
                from, report.adopted, report.kept_local, report.grants_merged, report.skipped
            )?;
        }

        Command::Watch {
            username,
            password,
            interval,
            run_for,
        } => {
            login(&credentials, &username, &password)?;
            let interval = interval.unwrap_or(config.sync.interval);
            session.start_auto_sync(&config.vault.local_name, &config.sync.remote_name, interval)?;
            writeln!(
                out,
                "Syncing {} from {} every {}",
                config.vault.local_name,
                config.sync.remote_name,
                humantime_serde::re::humantime::format_duration(interval)
            )?;

            let coordinator = session.shutdown_coordinator();
            install_signal_handlers(coordinator.clone());
            wait_for_stop(coordinator.subscribe(), run_for).await;

            let cycles = session.close().await.map(|s| s.cycles).unwrap_or(0);
            writeln!(out, "Stopped after {} sync cycle(s)", cycles)?;
        }
    }

    Ok(())
}

async fn wait_for_stop(mut signal: ShutdownSignal, run_for: Option<Duration>) {
    match run_for {
        Some(limit) => {
            tokio::select! {
                _ = signal.recv() => {}
                _ = tokio::time::sleep(limit) => info!("Watch time limit reached"),
            }
        }
        None => signal.recv().await,
    }
}

fn login(credentials: &CredentialStore, username: &str, password: &str) -> Result<()> {
    if !credentials.verify(username, password)? {
        bail!("Invalid username or password");
    }
    info!(user = username, "Logged in");
    Ok(())
}

fn local_vault(session: &mut Session, config: &StrongboxConfig) -> Result<SharedVault> {
    Ok(session.vault(&config.vault.local_name)?)
}

fn recipients(names: Vec<String>) -> Vec<RecipientId> {
    names.into_iter().map(RecipientId::new).collect()
}

/// Exact id, or the single record whose id starts with `raw`
fn resolve_id(vault: &Vault, raw: &str) -> Result<RecordId> {
    if raw.is_empty() {
        bail!("Record id must not be empty");
    }
    let exact = RecordId::new(raw);
    if vault.state().records.contains(&exact) {
        return Ok(exact);
    }

    let matches: Vec<RecordId> = vault
        .state()
        .records
        .ids()
        .filter(|id| id.as_str().starts_with(raw))
        .cloned()
        .collect();

    match matches.as_slice() {
        [] => bail!("No record matches '{}'", raw),
        [id] => Ok(id.clone()),
        _ => bail!("'{}' matches {} records; use a longer prefix", raw, matches.len()),
    }
}

/// Wrap a file as a document. Non-UTF-8 files are stored hex encoded.
pub fn file_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (file_type, content) = match String::from_utf8(bytes) {
        Ok(text) => (FILE_TYPE_TEXT, text),
        Err(e) => (FILE_TYPE_BINARY, hex::encode(e.into_bytes())),
    };

    Ok(Document::new()
        .with("file_name", file_name)
        .with("file_type", file_type)
        .with("content", content))
}

/// Original bytes of a document built by [`file_document`]
pub fn file_bytes(content: &Document) -> Result<Vec<u8>> {
    let body = content
        .get("content")
        .and_then(FieldValue::as_text)
        .context("Record has no text content field")?;

    match content.get("file_type").and_then(FieldValue::as_text) {
        Some(FILE_TYPE_BINARY) => Ok(hex::decode(body).context("Binary content is not valid hex")?),
        _ => Ok(body.as_bytes().to_vec()),
    }
}

fn display_name(content: &Document) -> &str {
    content
        .get("file_name")
        .and_then(FieldValue::as_text)
        .unwrap_or("-")
}
