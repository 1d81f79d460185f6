use std::path::Path;

use redb::WriteTransaction;
use tracing::{debug, warn};

use gitkv_types::{ObjectId, ObjectType};

use crate::accessor::RecordAccessor;
use crate::config::StoreConfig;
use crate::env::Environment;
use crate::error::{StoreError, StoreResult};
use crate::iter::Visitor;
use crate::layout::ValueLayout;
use crate::object::{ObjectHeader, RawObject};
use crate::traits::{OdbBackend, TransactionCoordinator, TxState};

/// Backend with explicit transaction control.
///
/// Values carry the type tag before the payload
/// ([`ValueLayout::TagPrefix`]), so headers are read without touching the
/// payload.
///
/// While idle, every operation runs in its own engine transaction. After
/// [`TransactionCoordinator::begin`], operations run inside the open outer
/// transaction: their writes are visible to later operations on this
/// backend at once, and reach the file only on
/// [`TransactionCoordinator::commit`]. Independent readers (another handle
/// on the same file) keep seeing the last committed state until then.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use gitkv_store::{OdbBackend, StoreConfig, TransactionCoordinator, TransactionalBackend};
/// use gitkv_types::ObjectType;
///
/// let mut backend = TransactionalBackend::open(Path::new("objects.db"), &StoreConfig::default())?;
/// backend.begin()?;
/// let id = backend.write(b"hello", ObjectType::Blob)?;
/// backend.commit()?;
/// assert!(backend.exists(&id));
/// # Ok::<(), gitkv_store::StoreError>(())
/// ```
pub struct TransactionalBackend {
    env: Environment,
    outer: Option<WriteTransaction>,
    max_object_size: u64,
}

impl TransactionalBackend {
    /// Value layout of files written by this backend.
    pub const LAYOUT: ValueLayout = ValueLayout::TagPrefix;

    /// Open or create the store file at `path`.
    pub fn open(path: &Path, config: &StoreConfig) -> StoreResult<Self> {
        let env = Environment::open(path, Self::LAYOUT, config)?;
        Ok(Self {
            env,
            outer: None,
            max_object_size: config.max_object_size,
        })
    }

    /// The underlying environment.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Discard any open outer transaction, then close the store file.
    /// Idempotent.
    pub fn close(&mut self) {
        if self.outer.is_some() {
            warn!(path = %self.env.path().display(), "closing with an open transaction; rolling back");
            self.abort_outer();
        }
        self.env.close();
    }

    fn accessor(&self) -> RecordAccessor<'_> {
        RecordAccessor::new(&self.env, self.outer.as_ref(), self.max_object_size)
    }

    fn abort_outer(&mut self) {
        if let Some(txn) = self.outer.take() {
            if let Err(e) = txn.abort() {
                warn!(error = %e, "aborting outer transaction failed");
            }
        }
    }
}

impl Drop for TransactionalBackend {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TransactionalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalBackend")
            .field("env", &self.env)
            .field("state", &self.state())
            .field("max_object_size", &self.max_object_size)
            .finish()
    }
}

impl OdbBackend for TransactionalBackend {
    fn read(&self, id: &ObjectId) -> StoreResult<RawObject> {
        self.accessor().read(id)
    }

    fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        self.accessor().read_header(id)
    }

    fn write(&self, data: &[u8], object_type: ObjectType) -> StoreResult<ObjectId> {
        self.accessor().write(data, object_type)
    }

    fn exists(&self, id: &ObjectId) -> bool {
        self.accessor().exists(id)
    }

    fn for_each(&self, visitor: &mut Visitor<'_>) -> StoreResult<()> {
        self.accessor().for_each(visitor)
    }

    fn is_usable(&self) -> bool {
        self.env.is_open()
    }

    fn coordinator(&mut self) -> Option<&mut dyn TransactionCoordinator> {
        Some(self)
    }
}

impl TransactionCoordinator for TransactionalBackend {
    fn begin(&mut self) -> StoreResult<()> {
        if self.outer.is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.outer = Some(self.env.begin_write()?);
        debug!(path = %self.env.path().display(), "outer transaction started");
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        let txn = self.outer.take().ok_or(StoreError::NoActiveTransaction)?;
        txn.commit()?;
        debug!(path = %self.env.path().display(), "outer transaction committed");
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if self.outer.is_none() {
            return Err(StoreError::NoActiveTransaction);
        }
        self.abort_outer();
        debug!(path = %self.env.path().display(), "outer transaction rolled back");
        Ok(())
    }

    fn state(&self) -> TxState {
        if self.outer.is_some() {
            TxState::Active
        } else {
            TxState::Idle
        }
    }
}
