use gitkv_types::{ObjectId, ObjectType};

use crate::error::StoreResult;
use crate::iter::Visitor;
use crate::object::{ObjectHeader, RawObject};

/// A pluggable object database backend.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The ID is computed by the backend
///   from the payload and kind; callers never supply it.
/// - A missing object is reported as `StoreError::NotFound`, never as a
///   generic failure.
/// - Reads hand out owned copies; engine memory never escapes.
/// - Engine errors are propagated on first occurrence and never retried.
pub trait OdbBackend {
    /// Read an object by its content-addressed ID.
    fn read(&self, id: &ObjectId) -> StoreResult<RawObject>;

    /// Size and kind of an object.
    ///
    /// Default implementation reads the whole object and drops the payload.
    /// Backends override it when they can skip the copy.
    fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        self.read(id).map(|obj| obj.header())
    }

    /// Hash and store a payload, returning its ID.
    ///
    /// Writing the same payload and kind again yields the same ID and leaves
    /// the stored object unchanged.
    fn write(&self, data: &[u8], object_type: ObjectType) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> bool;

    /// Visit every stored object ID.
    ///
    /// Returns `StoreError::UserAborted` if the visitor breaks early.
    fn for_each(&self, visitor: &mut Visitor<'_>) -> StoreResult<()>;

    /// `false` if the backend was closed or never finished opening, in which
    /// case it must not be registered with a dispatcher.
    fn is_usable(&self) -> bool {
        true
    }

    /// Explicit transaction control, if this backend supports it.
    fn coordinator(&mut self) -> Option<&mut dyn TransactionCoordinator> {
        None
    }
}

/// State of a backend's outer transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    /// No outer transaction; every call commits on its own.
    Idle,
    /// An outer transaction is open; calls nest inside it.
    Active,
}

/// Begin/commit/rollback of an outer transaction bound to one backend.
///
/// Only one outer transaction may be open per backend. While it is open
/// every backend operation runs as a child of it: child writes are visible
/// to later calls straight away and become durable only when the outer
/// transaction commits.
pub trait TransactionCoordinator {
    /// Open the outer transaction. Fails with
    /// `StoreError::TransactionActive` if one is already open.
    fn begin(&mut self) -> StoreResult<()>;

    /// Commit the outer transaction and return to [`TxState::Idle`], passing
    /// the engine's commit result through.
    fn commit(&mut self) -> StoreResult<()>;

    /// Discard the outer transaction and return to [`TxState::Idle`].
    fn rollback(&mut self) -> StoreResult<()>;

    fn state(&self) -> TxState;
}
