//! Local cache store
//!
//! Last-resort persistence for the wallet list and the selected wallet id.
//! Writes are whole-value overwrites with no batching; the cache is never
//! treated as authoritative when the gateway has fresher data. A corrupted
//! snapshot reads back as empty rather than failing the caller.

use crate::model::Wallet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walletsync_error::Result;

const WALLETS_FILE: &str = "wallets.json";
const SELECTED_FILE: &str = "selected.json";

/// Persistence seam for the wallet directory.
pub trait CacheStore: Send + Sync {
    /// Overwrite the cached wallet list.
    fn save_wallets(&self, wallets: &[Wallet]) -> Result<()>;

    /// Load the cached wallet list, `None` when absent or unreadable.
    fn load_wallets(&self) -> Result<Option<Vec<Wallet>>>;

    /// Overwrite the cached selected wallet id.
    fn save_selected(&self, id: &str) -> Result<()>;

    /// Load the cached selected wallet id.
    fn load_selected(&self) -> Result<Option<String>>;
}

/// In-memory cache, used in tests and as a null store.
#[derive(Default)]
pub struct MemoryCache {
    wallets: Mutex<Option<Vec<Wallet>>>,
    selected: Mutex<Option<String>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn save_wallets(&self, wallets: &[Wallet]) -> Result<()> {
        *self.wallets.lock().expect("cache lock poisoned") = Some(wallets.to_vec());
        Ok(())
    }

    fn load_wallets(&self) -> Result<Option<Vec<Wallet>>> {
        Ok(self.wallets.lock().expect("cache lock poisoned").clone())
    }

    fn save_selected(&self, id: &str) -> Result<()> {
        *self.selected.lock().expect("cache lock poisoned") = Some(id.to_string());
        Ok(())
    }

    fn load_selected(&self) -> Result<Option<String>> {
        Ok(self.selected.lock().expect("cache lock poisoned").clone())
    }
}

/// File-backed cache: one JSON blob per key under a directory.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at the given directory, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.dir.join(file);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(file, error = %e, "discarding unreadable cache snapshot");
                Ok(None)
            }
        }
    }

    fn write_json<T: serde::Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        std::fs::write(self.dir.join(file), raw)?;
        Ok(())
    }
}

impl CacheStore for FileCache {
    fn save_wallets(&self, wallets: &[Wallet]) -> Result<()> {
        self.write_json(WALLETS_FILE, &wallets)
    }

    fn load_wallets(&self) -> Result<Option<Vec<Wallet>>> {
        self.read_json(WALLETS_FILE)
    }

    fn save_selected(&self, id: &str) -> Result<()> {
        self.write_json(SELECTED_FILE, &id)
    }

    fn load_selected(&self) -> Result<Option<String>> {
        self.read_json(SELECTED_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChainNetwork, WalletKind};

    #[test]
    fn test_file_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path()).unwrap();

        assert!(cache.load_wallets().unwrap().is_none());
        assert!(cache.load_selected().unwrap().is_none());

        let wallet = Wallet::new("Main", WalletKind::Native, ChainNetwork::Ethereum);
        cache.save_wallets(std::slice::from_ref(&wallet)).unwrap();
        cache.save_selected(&wallet.id).unwrap();

        let loaded = cache.load_wallets().unwrap().unwrap();
        assert_eq!(loaded, vec![wallet.clone()]);
        assert_eq!(cache.load_selected().unwrap().as_deref(), Some(wallet.id.as_str()));
    }

    #[test]
    fn test_corrupted_snapshot_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path()).unwrap();
        std::fs::write(dir.path().join(WALLETS_FILE), "{not json").unwrap();

        assert!(cache.load_wallets().unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path()).unwrap();

        let first = Wallet::new("First", WalletKind::Native, ChainNetwork::Ethereum);
        let second = Wallet::new("Second", WalletKind::Imported, ChainNetwork::Bsc);
        cache.save_wallets(&[first]).unwrap();
        cache.save_wallets(std::slice::from_ref(&second)).unwrap();

        let loaded = cache.load_wallets().unwrap().unwrap();
        assert_eq!(loaded, vec![second]);
    }
}
