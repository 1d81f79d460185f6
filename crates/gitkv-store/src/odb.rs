use std::path::Path;

use tracing::debug;

use gitkv_types::{ObjectId, ObjectType};

use crate::backend::KvBackend;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::iter::Visitor;
use crate::object::{ObjectHeader, RawObject};
use crate::traits::{OdbBackend, TransactionCoordinator, TxState};
use crate::transactional::TransactionalBackend;

/// Priority used by the `add_*_backend` helpers.
pub const DEFAULT_PRIORITY: i32 = 100;

struct Registered {
    priority: i32,
    backend: Box<dyn OdbBackend>,
}

/// A set of backends consulted in priority order, highest first.
///
/// Reads fall through backends that do not have the object. Writes and
/// transaction control go to the highest-priority backend only.
#[derive(Default)]
pub struct ObjectDatabase {
    backends: Vec<Registered>,
}

impl ObjectDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend. Backends with equal priority keep insertion
    /// order.
    pub fn add_backend(&mut self, backend: Box<dyn OdbBackend>, priority: i32) -> StoreResult<()> {
        if !backend.is_usable() {
            return Err(StoreError::BackendUnavailable);
        }
        let at = self
            .backends
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(self.backends.len());
        self.backends.insert(at, Registered { priority, backend });
        debug!(priority, position = at, "backend registered");
        Ok(())
    }

    /// Open a [`TransactionalBackend`] at `path` and register it at
    /// [`DEFAULT_PRIORITY`].
    pub fn add_transactional_backend(&mut self, path: &Path, config: &StoreConfig) -> StoreResult<()> {
        let backend = TransactionalBackend::open(path, config)?;
        self.add_backend(Box::new(backend), DEFAULT_PRIORITY)
    }

    /// Open a [`KvBackend`] at `path` and register it at
    /// [`DEFAULT_PRIORITY`].
    pub fn add_kv_backend(&mut self, path: &Path, config: &StoreConfig) -> StoreResult<()> {
        let backend = KvBackend::open(path, config)?;
        self.add_backend(Box::new(backend), DEFAULT_PRIORITY)
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn read(&self, id: &ObjectId) -> StoreResult<RawObject> {
        self.first_found(id, |backend| backend.read(id))
    }

    pub fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        self.first_found(id, |backend| backend.read_header(id))
    }

    pub fn write(&self, data: &[u8], object_type: ObjectType) -> StoreResult<ObjectId> {
        self.primary()?.write(data, object_type)
    }

    pub fn exists(&self, id: &ObjectId) -> bool {
        self.backends.iter().any(|r| r.backend.exists(id))
    }

    /// Visit the IDs of every backend in priority order. An ID stored in
    /// more than one backend is visited once per backend.
    pub fn for_each(&self, visitor: &mut Visitor<'_>) -> StoreResult<()> {
        for registered in &self.backends {
            registered.backend.for_each(visitor)?;
        }
        Ok(())
    }

    pub fn transaction_begin(&mut self) -> StoreResult<()> {
        self.coordinator()?.begin()
    }

    pub fn transaction_commit(&mut self) -> StoreResult<()> {
        self.coordinator()?.commit()
    }

    pub fn transaction_rollback(&mut self) -> StoreResult<()> {
        self.coordinator()?.rollback()
    }

    /// State of the primary backend's outer transaction, if it has a
    /// coordinator.
    pub fn transaction_state(&mut self) -> Option<TxState> {
        self.coordinator().ok().map(|c| c.state())
    }

    fn primary(&self) -> StoreResult<&dyn OdbBackend> {
        self.backends
            .first()
            .map(|r| r.backend.as_ref())
            .ok_or(StoreError::BackendUnavailable)
    }

    fn coordinator(&mut self) -> StoreResult<&mut dyn TransactionCoordinator> {
        let registered = self
            .backends
            .first_mut()
            .ok_or(StoreError::BackendUnavailable)?;
        registered
            .backend
            .coordinator()
            .ok_or(StoreError::Unsupported("transactions"))
    }

    fn first_found<T>(
        &self,
        id: &ObjectId,
        mut op: impl FnMut(&dyn OdbBackend) -> StoreResult<T>,
    ) -> StoreResult<T> {
        for registered in &self.backends {
            match op(registered.backend.as_ref()) {
                Err(e) if e.is_not_found() => continue,
                other => return other,
            }
        }
        Err(StoreError::NotFound(*id))
    }
}

impl std::fmt::Debug for ObjectDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let priorities: Vec<i32> = self.backends.iter().map(|r| r.priority).collect();
        f.debug_struct("ObjectDatabase")
            .field("priorities", &priorities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;

    use super::*;
    use crate::memory::InMemoryBackend;

    /// Backend whose every lookup fails with an engine-independent error.
    struct Broken;

    impl OdbBackend for Broken {
        fn read(&self, _id: &ObjectId) -> StoreResult<RawObject> {
            Err(StoreError::Unsupported("read"))
        }

        fn write(&self, _data: &[u8], _object_type: ObjectType) -> StoreResult<ObjectId> {
            Err(StoreError::Unsupported("write"))
        }

        fn exists(&self, _id: &ObjectId) -> bool {
            false
        }

        fn for_each(&self, _visitor: &mut Visitor<'_>) -> StoreResult<()> {
            Ok(())
        }
    }

    fn memory_with(objects: &[&[u8]]) -> Box<InMemoryBackend> {
        let backend = InMemoryBackend::new();
        for data in objects {
            backend.write(data, ObjectType::Blob).unwrap();
        }
        Box::new(backend)
    }

    #[test]
    fn empty_database() {
        let mut odb = ObjectDatabase::new();
        assert!(odb.is_empty());
        let id = ObjectId::from_hash([3; 20]);
        assert!(odb.read(&id).unwrap_err().is_not_found());
        assert!(!odb.exists(&id));
        assert!(matches!(
            odb.write(b"x", ObjectType::Blob),
            Err(StoreError::BackendUnavailable)
        ));
        assert!(matches!(
            odb.transaction_begin(),
            Err(StoreError::BackendUnavailable)
        ));
        assert_eq!(odb.transaction_state(), None);
    }

    #[test]
    fn reads_fall_through_to_lower_priority() {
        let mut odb = ObjectDatabase::new();
        odb.add_backend(memory_with(&[b"high"]), 200).unwrap();
        odb.add_backend(memory_with(&[b"low"]), 10).unwrap();

        let low = gitkv_crypto::ContentHasher::hash(ObjectType::Blob, b"low").unwrap();
        assert_eq!(odb.read(&low).unwrap().data, b"low");
        assert_eq!(odb.read_header(&low).unwrap().len, 3);
        assert!(odb.exists(&low));
    }

    #[test]
    fn non_not_found_errors_stop_the_search() {
        let mut odb = ObjectDatabase::new();
        odb.add_backend(Box::new(Broken), 200).unwrap();
        odb.add_backend(memory_with(&[b"low"]), 10).unwrap();

        let low = gitkv_crypto::ContentHasher::hash(ObjectType::Blob, b"low").unwrap();
        assert!(matches!(odb.read(&low), Err(StoreError::Unsupported("read"))));
    }

    #[test]
    fn writes_go_to_highest_priority() {
        let mut odb = ObjectDatabase::new();
        odb.add_backend(Box::new(Broken), 10).unwrap();
        odb.add_backend(Box::new(InMemoryBackend::new()), 50).unwrap();
        let id = odb.write(b"routed", ObjectType::Blob).unwrap();
        assert!(odb.exists(&id));
        assert_eq!(format!("{odb:?}"), "ObjectDatabase { priorities: [50, 10] }");
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let mut odb = ObjectDatabase::new();
        odb.add_backend(Box::new(InMemoryBackend::new()), 100).unwrap();
        odb.add_backend(Box::new(Broken), 100).unwrap();
        assert!(odb.write(b"first wins", ObjectType::Blob).is_ok());
    }

    #[test]
    fn unusable_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend =
            KvBackend::open(&dir.path().join("objects.db"), &StoreConfig::default()).unwrap();
        backend.close();

        let mut odb = ObjectDatabase::new();
        assert!(matches!(
            odb.add_backend(Box::new(backend), DEFAULT_PRIORITY),
            Err(StoreError::BackendUnavailable)
        ));
        assert!(odb.is_empty());
    }

    #[test]
    fn for_each_walks_all_backends_and_stops_on_abort() {
        let mut odb = ObjectDatabase::new();
        odb.add_backend(memory_with(&[b"a", b"b"]), 2).unwrap();
        odb.add_backend(memory_with(&[b"c"]), 1).unwrap();

        let mut seen = 0;
        odb.for_each(&mut |_| {
            seen += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(seen, 3);

        let mut seen = 0;
        let err = odb
            .for_each(&mut |_| {
                seen += 1;
                ControlFlow::Break(())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::UserAborted));
        assert_eq!(seen, 1);
    }

    #[test]
    fn transactions_need_a_coordinator() {
        let mut odb = ObjectDatabase::new();
        odb.add_backend(Box::new(InMemoryBackend::new()), DEFAULT_PRIORITY)
            .unwrap();
        assert!(matches!(
            odb.transaction_begin(),
            Err(StoreError::Unsupported(_))
        ));
        assert_eq!(odb.transaction_state(), None);
    }

    #[test]
    fn transactional_backend_through_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");
        let mut odb = ObjectDatabase::new();
        odb.add_transactional_backend(&path, &StoreConfig::default())
            .unwrap();

        odb.transaction_begin().unwrap();
        assert_eq!(odb.transaction_state(), Some(TxState::Active));
        let dropped = odb.write(b"dropped", ObjectType::Blob).unwrap();
        odb.transaction_rollback().unwrap();
        assert!(!odb.exists(&dropped));

        odb.transaction_begin().unwrap();
        let kept = odb.write(b"kept", ObjectType::Blob).unwrap();
        odb.transaction_commit().unwrap();
        assert_eq!(odb.transaction_state(), Some(TxState::Idle));
        drop(odb);

        let reopened = TransactionalBackend::open(&path, &StoreConfig::default()).unwrap();
        assert!(reopened.exists(&kept));
        assert!(!reopened.exists(&dropped));
    }

    #[test]
    fn kv_backend_through_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut odb = ObjectDatabase::new();
        odb.add_kv_backend(&dir.path().join("objects.db"), &StoreConfig::default())
            .unwrap();
        let id = odb.write(b"hello", ObjectType::Blob).unwrap();
        assert_eq!(odb.read_header(&id).unwrap().len, 5);
        assert!(matches!(
            odb.transaction_commit(),
            Err(StoreError::Unsupported(_))
        ));
    }

    #[test]
    fn setup_failure_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut odb = ObjectDatabase::new();
        let err = odb
            .add_transactional_backend(dir.path(), &StoreConfig::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::SetupFailure { .. }));
        assert!(odb.is_empty());
    }
}
