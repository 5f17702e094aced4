/*
    codec.rs - Encrypted persistence of the whole vault state

    One file per vault location:

        magic "SBXV" (4) | format version (1) | nonce (12) | AES-256-GCM ciphertext

    The plaintext is the bincode encoding of PersistedState. Records, access
    ledger and index are always written together.

    Writes are atomic: encode to `<path>.tmp`, fsync, rename over the target,
    then fsync the directory so the rename survives a crash. A failed write
    removes the temp file.
    A file that exists but cannot be read back is reported as CorruptState,
    never as an empty vault.
*/

use crate::core_vault::access::AccessLedger;
use crate::core_vault::model::{Document, RecordId, Timestamp};
use crate::core_vault::query::{IndexLists, SearchIndex};
use crate::core_vault::store::encryption::Cipher;
use crate::core_vault::store::errors::{StoreError, StoreResult};
use crate::core_vault::store::keys::VaultLocation;
use crate::core_vault::store::record_store::{unseal, RecordStore};
use crate::core_vault::store::state::VaultState;
use crate::metrics::{Timer, SAVE_DURATION_MS};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File magic
pub const MAGIC: &[u8; 4] = b"SBXV";

/// Current on-disk format version
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1;

/// Serialized form of a vault
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    records: RecordStore,
    access: AccessLedger,
    search_index: IndexLists,
}

/// Result of loading a vault file
#[derive(Debug)]
pub enum LoadOutcome {
    /// No state file yet
    Fresh(VaultState),
    /// State read back from disk
    Existing(VaultState),
}

impl LoadOutcome {
    pub fn is_fresh(&self) -> bool {
        matches!(self, LoadOutcome::Fresh(_))
    }

    pub fn into_state(self) -> VaultState {
        match self {
            LoadOutcome::Fresh(state) | LoadOutcome::Existing(state) => state,
        }
    }
}

/// Reads and writes one location's state file
pub struct PersistenceCodec {
    path: PathBuf,
    cipher: Cipher,
}

impl PersistenceCodec {
    pub fn new(location: &VaultLocation, cipher: Cipher) -> Self {
        PersistenceCodec {
            path: location.state_path(),
            cipher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the state file with `state`
    pub fn save(&self, state: &VaultState) -> StoreResult<()> {
        let timer = Timer::new(SAVE_DURATION_MS);
        let data = self.encode(state)?;

        let temp_path = self.temp_path();
        if let Err(e) = write_synced(&temp_path, &data).and_then(|()| fs::rename(&temp_path, &self.path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        sync_parent_dir(&self.path)?;
        timer.stop();

        debug!(
            path = %self.path.display(),
            bytes = data.len(),
            records = state.records.len(),
            "Vault state saved"
        );
        Ok(())
    }

    /// Load the state file.
    ///
    /// A missing file is `Fresh`; anything present but unreadable is
    /// `Err(CorruptState)`.
    pub fn load(&self) -> StoreResult<LoadOutcome> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No vault state on disk");
                return Ok(LoadOutcome::Fresh(VaultState::new()));
            }
            Err(e) => return Err(e.into()),
        };

        let state = self.decode(&data)?;
        debug!(
            path = %self.path.display(),
            records = state.records.len(),
            grants = state.access.grant_count(),
            "Vault state loaded"
        );
        Ok(LoadOutcome::Existing(state))
    }

    /// Move a corrupt state file aside so the next save cannot overwrite it.
    /// Returns the new path.
    pub fn quarantine(&self, now: Timestamp) -> StoreResult<PathBuf> {
        let mut raw = self.path.clone().into_os_string();
        raw.push(format!(".corrupt-{}", now.as_millis()));
        let target = PathBuf::from(raw);

        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    fn temp_path(&self) -> PathBuf {
        let mut raw = self.path.clone().into_os_string();
        raw.push(".tmp");
        PathBuf::from(raw)
    }

    fn encode(&self, state: &VaultState) -> StoreResult<Vec<u8>> {
        let persisted = PersistedState {
            records: state.records.clone(),
            access: state.access.clone(),
            search_index: state.index.to_lists(),
        };
        let plaintext = bincode::serialize(&persisted)?;
        let sealed = self.cipher.encrypt(&plaintext)?;

        let mut out = Vec::with_capacity(HEADER_LEN + sealed.len());
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> StoreResult<VaultState> {
        if data.len() < HEADER_LEN || &data[..MAGIC.len()] != MAGIC {
            return Err(self.corrupt("bad magic"));
        }
        let version = data[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(self.corrupt(&format!("unsupported format version {}", version)));
        }

        let plaintext = self
            .cipher
            .decrypt(&data[HEADER_LEN..])
            .map_err(|e| self.corrupt(&e.to_string()))?;
        let persisted: PersistedState = bincode::deserialize(&plaintext)
            .map_err(|e| self.corrupt(&format!("decode failed: {}", e)))?;

        let mut index = SearchIndex::from_lists(persisted.search_index);
        let dangling = index.retain_records(|id| persisted.records.contains(id));
        if dangling > 0 {
            warn!(
                path = %self.path.display(),
                dangling,
                "Search index references unknown records, rebuilding"
            );
            let (rebuilt, _) = rebuild_index(&self.cipher, &persisted.records);
            index = rebuilt;
        }

        Ok(VaultState {
            records: persisted.records,
            access: persisted.access,
            index,
        })
    }

    fn corrupt(&self, reason: &str) -> StoreError {
        StoreError::CorruptState(format!("{}: {}", self.path.display(), reason))
    }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Build a fresh index from the decrypted contents of `records`.
/// Returns the index and how many records could not be decrypted.
pub fn rebuild_index(cipher: &Cipher, records: &RecordStore) -> (SearchIndex, usize) {
    let mut skipped = 0;
    let mut contents: Vec<(RecordId, Document)> = Vec::with_capacity(records.len());

    for (id, record) in records.iter() {
        match unseal(cipher, record) {
            Ok(content) => contents.push((id.clone(), content)),
            Err(e) => {
                warn!(record = %id.short(), error = %e, "Skipping undecryptable record while indexing");
                skipped += 1;
            }
        }
    }

    let mut index = SearchIndex::new();
    index.rebuild(contents.iter().map(|(id, content)| (id, content)));
    (index, skipped)
}
