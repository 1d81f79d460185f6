use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use tracing::{debug, warn};

use crate::config::{DurabilityMode, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::layout::ValueLayout;

/// Object table: raw 20-byte object ID → tagged payload.
pub(crate) const OBJECTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("objects");

/// Store-wide metadata, currently only the value layout code.
const META: TableDefinition<&str, u8> = TableDefinition::new("meta");
const LAYOUT_KEY: &str = "value-layout";

/// An open store file: the engine database plus the layout its values use.
///
/// The file is a single flat file (no directory of its own). Dropping the
/// environment closes it; [`Environment::close`] does the same eagerly and
/// may be called any number of times.
pub struct Environment {
    path: PathBuf,
    db: Option<Database>,
    layout: ValueLayout,
    durability: DurabilityMode,
}

impl Environment {
    /// Open or create the store file at `path`.
    ///
    /// Creates the object and meta tables on first use. If the file already
    /// records a different value layout, opening fails rather than handing
    /// out a backend that would misread every object. Any failure releases
    /// whatever was acquired and reports [`StoreError::SetupFailure`].
    pub fn open(path: &Path, layout: ValueLayout, config: &StoreConfig) -> StoreResult<Self> {
        let db = setup(path, layout, config).map_err(|reason| {
            warn!(path = %path.display(), %reason, "object store setup failed");
            StoreError::SetupFailure {
                path: path.to_path_buf(),
                reason,
            }
        })?;
        debug!(path = %path.display(), ?layout, "object store opened");
        Ok(Self {
            path: path.to_path_buf(),
            db: Some(db),
            layout,
            durability: config.durability,
        })
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value layout used by this environment.
    pub fn layout(&self) -> ValueLayout {
        self.layout
    }

    /// Returns `false` once the environment has been closed.
    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    /// The engine handle, or [`StoreError::BackendUnavailable`] if closed.
    pub fn database(&self) -> StoreResult<&Database> {
        self.db.as_ref().ok_or(StoreError::BackendUnavailable)
    }

    /// Begin a top-level write transaction with the configured durability.
    pub fn begin_write(&self) -> StoreResult<WriteTransaction> {
        let mut txn = self.database()?.begin_write()?;
        txn.set_durability(self.durability.into());
        Ok(txn)
    }

    /// Begin an independent read-only snapshot.
    pub fn begin_read(&self) -> StoreResult<ReadTransaction> {
        Ok(self.database()?.begin_read()?)
    }

    /// Close the engine handle. Idempotent.
    pub fn close(&mut self) {
        if let Some(db) = self.db.take() {
            drop(db);
            debug!(path = %self.path.display(), "object store closed");
        }
    }

    /// Raw stored value for a key, bypassing layout decoding.
    #[cfg(test)]
    pub(crate) fn raw_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        let txn = self.begin_read().ok()?;
        let table = txn.open_table(OBJECTS).ok()?;
        let guard = table.get(key).ok()??;
        Some(guard.value().to_vec())
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .field("layout", &self.layout)
            .finish()
    }
}

/// Acquire every engine resource in order. An early return drops whatever
/// was acquired so far, innermost first.
fn setup(path: &Path, layout: ValueLayout, config: &StoreConfig) -> Result<Database, String> {
    if config.create_parent_dirs {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| format!("create parent directory: {e}"))?;
        }
    }

    let file = open_store_file(path, config.file_mode).map_err(|e| format!("open file: {e}"))?;

    let mut builder = Database::builder();
    if let Some(bytes) = config.cache_size {
        builder.set_cache_size(bytes);
    }
    let db = builder
        .create_file(file)
        .map_err(|e| format!("create database: {e}"))?;

    let txn = db
        .begin_write()
        .map_err(|e| format!("begin setup transaction: {e}"))?;
    {
        txn.open_table(OBJECTS)
            .map_err(|e| format!("open object table: {e}"))?;

        let mut meta = txn
            .open_table(META)
            .map_err(|e| format!("open meta table: {e}"))?;
        let recorded = meta
            .get(LAYOUT_KEY)
            .map_err(|e| format!("read value layout: {e}"))?
            .map(|guard| guard.value());
        match recorded {
            None => {
                meta.insert(LAYOUT_KEY, layout.code())
                    .map_err(|e| format!("record value layout: {e}"))?;
            }
            Some(code) if code == layout.code() => {}
            Some(code) => {
                return Err(format!(
                    "file uses value layout {code}, this backend requires layout {}",
                    layout.code()
                ));
            }
        }
    }
    txn.commit()
        .map_err(|e| format!("commit setup transaction: {e}"))?;

    Ok(db)
}

fn open_store_file(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}
