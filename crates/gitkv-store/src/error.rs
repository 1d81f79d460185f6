use std::path::PathBuf;

use gitkv_crypto::HasherError;
use gitkv_types::{ObjectId, ObjectType};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found. Expected during lookups; not a
    /// failure of the store.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Any transaction, table, get, put or commit failure from the engine.
    #[error("storage engine error: {0}")]
    Engine(#[from] redb::Error),

    /// A `for_each` visitor asked to stop early.
    #[error("iteration stopped by visitor")]
    UserAborted,

    /// The environment could not be created, opened or initialized.
    #[error("cannot open object store at {path}: {reason}")]
    SetupFailure { path: PathBuf, reason: String },

    /// The backend has been closed, or was never usable.
    #[error("backend is closed or unusable")]
    BackendUnavailable,

    /// The object kind cannot be written as a standalone object.
    #[error("object type {0} cannot be stored as a standalone object")]
    InvalidObjectType(ObjectType),

    /// The payload exceeds the configured maximum object size.
    #[error("object of {size} bytes exceeds the maximum of {max} bytes")]
    ObjectTooLarge { size: u64, max: u64 },

    /// The stored value cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A stored key does not have the width of an object ID.
    #[error("corrupt key of {len} bytes in object table")]
    CorruptKey { len: usize },

    /// `begin` was called while an outer transaction is already open.
    #[error("an outer transaction is already active")]
    TransactionActive,

    /// `commit` or `rollback` was called with no outer transaction open.
    #[error("no outer transaction is active")]
    NoActiveTransaction,

    /// The backend does not implement the requested capability.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error outside the engine (config files, directories).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

macro_rules! engine_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(e: $ty) -> Self {
                    Self::Engine(e.into())
                }
            }
        )*
    };
}

engine_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<HasherError> for StoreError {
    fn from(e: HasherError) -> Self {
        match e {
            HasherError::NotLoose(object_type) => Self::InvalidObjectType(object_type),
        }
    }
}
