use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Largest payload the engine can hold once the tag byte is added.
pub const DEFAULT_MAX_OBJECT_SIZE: u64 = u32::MAX as u64 - 1;

/// Permissions for a newly created store file.
pub const DEFAULT_FILE_MODE: u32 = 0o664;

/// When a committed write transaction reaches stable storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityMode {
    /// `fsync` on every commit (safest, highest latency).
    #[default]
    Immediate,
    /// Commits become durable with a later immediate commit or clean close.
    Eventual,
}

impl From<DurabilityMode> for redb::Durability {
    fn from(mode: DurabilityMode) -> Self {
        match mode {
            DurabilityMode::Immediate => redb::Durability::Immediate,
            DurabilityMode::Eventual => redb::Durability::Eventual,
        }
    }
}

/// Configuration for opening an object store environment.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// durability = "eventual"
/// max_object_size = 104857600
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Engine page cache size in bytes. `None` keeps the engine default.
    pub cache_size: Option<usize>,
    /// Durability applied to every write transaction.
    pub durability: DurabilityMode,
    /// Writes with a larger payload are rejected before touching the engine.
    pub max_object_size: u64,
    /// Unix permission bits for a newly created store file.
    pub file_mode: u32,
    /// Create missing parent directories of the store file.
    pub create_parent_dirs: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_size: None,
            durability: DurabilityMode::default(),
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            file_mode: DEFAULT_FILE_MODE,
            create_parent_dirs: true,
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
