/*
    keys.rs - Per-location vault key management

    One symmetric key per vault location, generated once and reused across
    restarts. The key file holds the raw 32 key bytes.

    Layout for a location prefix `data/local`:
    - data/local_key.key    raw key bytes
    - data/local_vault.enc  encrypted vault state (see codec.rs)
*/

use crate::core_vault::store::errors::{StoreError, StoreResult};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a vault key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

const KEY_SUFFIX: &str = "_key.key";
const STATE_SUFFIX: &str = "_vault.enc";

/// Storage location of one vault, expressed as a path prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultLocation {
    prefix: PathBuf,
}

impl VaultLocation {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        VaultLocation { prefix: prefix.into() }
    }

    /// Location named `name` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        VaultLocation::new(dir.as_ref().join(name))
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Last path component of the prefix, used in logs
    pub fn name(&self) -> String {
        self.prefix
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.prefix.display().to_string())
    }

    pub fn key_path(&self) -> PathBuf {
        self.with_suffix(KEY_SUFFIX)
    }

    pub fn state_path(&self) -> PathBuf {
        self.with_suffix(STATE_SUFFIX)
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut raw = self.prefix.clone().into_os_string();
        raw.push(suffix);
        PathBuf::from(raw)
    }

    /// Create the directory holding this location's files
    pub fn ensure_parent(&self) -> StoreResult<()> {
        if let Some(parent) = self.prefix.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for VaultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix.display())
    }
}

/// Symmetric vault key, wiped from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey([u8; KEY_LEN]);

impl VaultKey {
    /// Fresh key from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        VaultKey(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> StoreResult<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            StoreError::InvalidKey(format!("expected {} bytes, found {}", KEY_LEN, bytes.len()))
        })?;
        Ok(VaultKey(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey(<redacted>)")
    }
}

/// Loads or creates the key bound to a vault location
pub struct KeyManager;

impl KeyManager {
    /// Return the key stored at the location, generating and persisting a
    /// new one on first use. An existing key file is never rewritten.
    pub fn load_or_create(location: &VaultLocation) -> StoreResult<VaultKey> {
        let path = location.key_path();

        match Self::load(&path) {
            Ok(key) => {
                debug!("Loaded vault key from {}", path.display());
                return Ok(key);
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        location.ensure_parent()?;
        let key = VaultKey::generate();

        match Self::write_new(&path, &key) {
            Ok(()) => {
                info!("Generated new vault key at {}", path.display());
                Ok(key)
            }
            // Another opener won the race; use its key
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Self::load(&path),
            Err(e) => Err(e.into()),
        }
    }

    fn load(path: &Path) -> StoreResult<VaultKey> {
        match fs::read(path) {
            Ok(bytes) => VaultKey::from_bytes(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("key file {}", path.display())))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_new(path: &Path, key: &VaultKey) -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(key.as_bytes())?;
        file.sync_all()
    }
}
