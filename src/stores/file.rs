//! Directory-backed document store.
//!
//! Layout on disk:
//!
//! ```text
//! <path>/MANIFEST          magic + format version
//! <path>/LOCK             exclusive advisory lock while open
//! <path>/<name>.col       one file per collection
//! ```
//!
//! A collection file is `COL\0`, a version byte, the payload length (u64
//! LE), the MessagePack-encoded key→document map, then a CRC32 of the
//! payload (u32 LE). Files are rewritten whole through a temporary file and
//! a rename, so a crash never leaves a half-written collection behind.

use super::{apply_write, validate_collection, DocumentStore, WriteMode};
use crate::error::{InventoryError, Result};
use crate::types::Document;
use fs2::FileExt;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Magic bytes for the store manifest.
const STORE_MAGIC: &[u8; 4] = b"STK\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

/// Magic bytes for collection files.
const COLLECTION_MAGIC: &[u8; 4] = b"COL\0";

/// Current collection file format version.
const COLLECTION_VERSION: u8 = 1;

/// Header: magic + version + payload length.
const HEADER_LEN: usize = 4 + 1 + 8;

/// Upper bound on a collection payload (sanity check against corrupt lengths).
const MAX_COLLECTION_BYTES: u64 = 256 * 1024 * 1024;

type Collection = BTreeMap<String, Document>;

/// File store configuration.
#[derive(Clone, Debug)]
pub struct FileStoreConfig {
    /// Base directory for the store.
    pub path: PathBuf,

    /// How many collections stay decoded in memory.
    pub collection_cache_size: usize,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./stockroom"),
            collection_cache_size: 16,
            create_if_missing: true,
        }
    }
}

/// A document store persisted under a directory.
///
/// Every write is flushed to disk before it returns. Decoded collections
/// are kept in an LRU cache; an evicted collection is simply reloaded from
/// its file on next access.
pub struct FileStore {
    config: FileStoreConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Decoded collections, most recently used first.
    cache: Mutex<LruCache<String, Collection>>,
}

impl FileStore {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: FileStoreConfig) -> Result<Self> {
        if config.path.join("MANIFEST").exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(InventoryError::NotInitialized)
        }
    }

    /// Create a new store.
    pub fn create(config: FileStoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        Self::write_manifest(&config.path)?;
        let lock_file = Self::acquire_lock(&config.path)?;

        info!(path = %config.path.display(), "created file store");
        Ok(Self::with_lock(config, lock_file))
    }

    /// Open an existing store.
    pub fn open(config: FileStoreConfig) -> Result<Self> {
        Self::verify_manifest(&config.path)?;
        let lock_file = Self::acquire_lock(&config.path)?;

        info!(path = %config.path.display(), "opened file store");
        Ok(Self::with_lock(config, lock_file))
    }

    fn with_lock(config: FileStoreConfig, lock_file: File) -> Self {
        let cache_size = NonZeroUsize::new(config.collection_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            _lock_file: lock_file,
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    /// Base directory of the store.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Number of collections currently decoded in memory.
    pub fn cached_collections(&self) -> usize {
        self.cache.lock().len()
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.config.path.join(format!("{}.col", name))
    }

    /// Run `f` against a collection, loading it into the cache if needed.
    fn read_collection<T>(&self, name: &str, f: impl FnOnce(&Collection) -> T) -> Result<T> {
        validate_collection(name)?;

        let mut cache = self.cache.lock();
        if let Some(collection) = cache.get(name) {
            return Ok(f(collection));
        }

        let collection = Self::load_collection(&self.collection_path(name))?;
        let result = f(&collection);
        cache.put(name.to_string(), collection);
        Ok(result)
    }

    /// Mutate a collection and persist it. On a failed save the cached copy
    /// is evicted so the next access rereads what is actually on disk.
    fn update_collection(&self, name: &str, f: impl FnOnce(&mut Collection)) -> Result<()> {
        validate_collection(name)?;

        let path = self.collection_path(name);
        let mut cache = self.cache.lock();

        let mut collection = match cache.pop(name) {
            Some(c) => c,
            None => Self::load_collection(&path)?,
        };
        f(&mut collection);

        match Self::save_collection(&path, &collection) {
            Ok(()) => {
                cache.put(name.to_string(), collection);
                Ok(())
            }
            Err(e) => {
                warn!(collection = name, error = %e, "failed to persist collection");
                Err(e)
            }
        }
    }

    fn load_collection(path: &Path) -> Result<Collection> {
        if !path.exists() {
            return Ok(Collection::new());
        }

        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_LEN {
            return Err(InventoryError::Corruption(format!(
                "collection file too short: {}",
                path.display()
            )));
        }

        if &bytes[0..4] != COLLECTION_MAGIC {
            return Err(InventoryError::InvalidFormat(
                "Invalid collection magic".into(),
            ));
        }

        if bytes[4] != COLLECTION_VERSION {
            return Err(InventoryError::InvalidFormat(format!(
                "Unsupported collection version: {}",
                bytes[4]
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[5..HEADER_LEN]);
        let len = u64::from_le_bytes(len_bytes);

        if len > MAX_COLLECTION_BYTES {
            return Err(InventoryError::Corruption("collection too large".into()));
        }

        let len = len as usize;
        if bytes.len() != HEADER_LEN + len + 4 {
            return Err(InventoryError::Corruption(format!(
                "collection length mismatch: {}",
                path.display()
            )));
        }

        let payload = &bytes[HEADER_LEN..HEADER_LEN + len];
        let mut checksum_bytes = [0u8; 4];
        checksum_bytes.copy_from_slice(&bytes[HEADER_LEN + len..]);
        let stored_checksum = u32::from_le_bytes(checksum_bytes);

        let computed_checksum = crc32fast::hash(payload);
        if stored_checksum != computed_checksum {
            return Err(InventoryError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        let collection: Collection = rmp_serde::from_slice(payload)?;
        debug!(path = %path.display(), documents = collection.len(), "loaded collection");
        Ok(collection)
    }

    fn save_collection(path: &Path, collection: &Collection) -> Result<()> {
        let encoded = rmp_serde::to_vec(collection)?;
        let checksum = crc32fast::hash(&encoded);

        let tmp_path = path.with_extension("col.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;

            file.write_all(COLLECTION_MAGIC)?;
            file.write_all(&[COLLECTION_VERSION])?;
            file.write_all(&(encoded.len() as u64).to_le_bytes())?;
            file.write_all(&encoded)?;
            file.write_all(&checksum.to_le_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        debug!(path = %path.display(), documents = collection.len(), "saved collection");
        Ok(())
    }

    // --- Private Helpers ---

    fn write_manifest(path: &Path) -> Result<()> {
        let mut file = File::create(path.join("MANIFEST"))?;

        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;

        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        let manifest_path = path.join("MANIFEST");
        if !manifest_path.exists() {
            return Err(InventoryError::NotInitialized);
        }
        let mut file = File::open(manifest_path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(InventoryError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != STORE_VERSION {
            return Err(InventoryError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| InventoryError::Locked)?;

        Ok(lock_file)
    }
}

impl DocumentStore for FileStore {
    fn fetch_all(&self, collection: &str) -> Result<Vec<(String, Document)>> {
        self.read_collection(collection, |docs| {
            docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        })
    }

    fn fetch(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        self.read_collection(collection, |docs| docs.get(key).cloned())
    }

    fn write(&self, collection: &str, key: &str, fields: Document, mode: WriteMode) -> Result<()> {
        self.update_collection(collection, |docs| {
            let merged = apply_write(docs.remove(key), fields, mode);
            docs.insert(key.to_string(), merged);
        })?;

        debug!(collection, key, ?mode, "file store write");
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> Result<()> {
        self.update_collection(collection, |docs| {
            docs.remove(key);
        })?;

        debug!(collection, key, "file store delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{quantity_document, ItemFields};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> FileStoreConfig {
        FileStoreConfig {
            path: dir.path().join("store"),
            collection_cache_size: 2,
            create_if_missing: true,
        }
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let fields = ItemFields::new(3, "red", "2024-01-01", "2024-02-01").to_document();

        {
            let store = FileStore::open_or_create(config(&dir)).unwrap();
            store
                .write("inventory", "apples", fields.clone(), WriteMode::Replace)
                .unwrap();
        }

        let store = FileStore::open_or_create(config(&dir)).unwrap();
        assert_eq!(store.fetch("inventory", "apples").unwrap(), Some(fields));
    }

    #[test]
    fn test_second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let _store = FileStore::create(config(&dir)).unwrap();

        let result = FileStore::open(config(&dir));
        assert!(matches!(result, Err(InventoryError::Locked)));
    }

    #[test]
    fn test_open_missing_not_initialized() {
        let dir = TempDir::new().unwrap();
        let cfg = FileStoreConfig {
            create_if_missing: false,
            ..config(&dir)
        };

        assert!(matches!(
            FileStore::open_or_create(cfg),
            Err(InventoryError::NotInitialized)
        ));
    }

    #[test]
    fn test_corrupted_collection_detected() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::create(config(&dir)).unwrap();
            store
                .write("inventory", "apples", quantity_document(4), WriteMode::Merge)
                .unwrap();
        }

        let path = dir.path().join("store").join("inventory.col");
        let mut bytes = fs::read(&path).unwrap();
        bytes[HEADER_LEN] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let store = FileStore::open(config(&dir)).unwrap();
        let result = store.fetch_all("inventory");
        assert!(matches!(
            result,
            Err(InventoryError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_cache_eviction_reloads_from_disk() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::create(config(&dir)).unwrap();

        for name in ["a", "b", "c"] {
            store
                .write(name, "item", quantity_document(1), WriteMode::Merge)
                .unwrap();
        }
        assert_eq!(store.cached_collections(), 2);

        // "a" was evicted but must still be readable.
        let docs = store.fetch_all("a").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "item");
    }

    #[test]
    fn test_delete_and_merge() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::create(config(&dir)).unwrap();

        let fields = ItemFields::new(3, "red", "a", "b").to_document();
        store
            .write("inventory", "apples", fields, WriteMode::Replace)
            .unwrap();
        store
            .write("inventory", "apples", quantity_document(8), WriteMode::Merge)
            .unwrap();

        let doc = store.fetch("inventory", "apples").unwrap().unwrap();
        assert_eq!(doc["quantity"], serde_json::json!(8));
        assert_eq!(doc["description"], serde_json::json!("red"));

        store.delete("inventory", "apples").unwrap();
        assert!(store.fetch_all("inventory").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_unsafe_collection_name() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::create(config(&dir)).unwrap();
        let result = store.fetch_all("../outside");
        assert!(matches!(result, Err(InventoryError::InvalidInput(_))));
    }
}
