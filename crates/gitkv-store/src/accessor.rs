use redb::{ReadOnlyTable, ReadTransaction, ReadableTable, Table, WriteTransaction};
use tracing::warn;

use gitkv_crypto::ContentHasher;
use gitkv_types::{ObjectId, ObjectType};

use crate::env::{Environment, OBJECTS};
use crate::error::{StoreError, StoreResult};
use crate::layout::ValueLayout;
use crate::object::{ObjectHeader, RawObject};

/// Per-call record operations shared by both backend variants.
///
/// An accessor is built for each call from the environment and, when the
/// transactional backend has one open, a borrow of its outer transaction.
/// With an outer transaction every operation runs as a child of it;
/// without one, each operation opens and finishes its own transaction.
pub(crate) struct RecordAccessor<'a> {
    env: &'a Environment,
    outer: Option<&'a WriteTransaction>,
    max_object_size: u64,
}

impl<'a> RecordAccessor<'a> {
    pub(crate) fn new(
        env: &'a Environment,
        outer: Option<&'a WriteTransaction>,
        max_object_size: u64,
    ) -> Self {
        Self {
            env,
            outer,
            max_object_size,
        }
    }

    fn layout(&self) -> ValueLayout {
        self.env.layout()
    }

    /// Hash the payload and store it under its ID.
    ///
    /// An existing value under the same ID is overwritten in place; content
    /// addressing makes it byte-identical.
    pub(crate) fn write(&self, data: &[u8], object_type: ObjectType) -> StoreResult<ObjectId> {
        let id = ContentHasher::hash(object_type, data)?;

        let size = data.len() as u64;
        if size > self.max_object_size {
            return Err(StoreError::ObjectTooLarge {
                size,
                max: self.max_object_size,
            });
        }
        let value_len = u32::try_from(ValueLayout::encoded_len(data.len())).map_err(|_| {
            StoreError::ObjectTooLarge {
                size,
                max: u64::from(u32::MAX - 1),
            }
        })?;

        let scope = self.write_scope()?;
        if let Err(e) = reserve_and_fill(scope.txn(), &id, value_len, self.layout(), object_type, data)
        {
            scope.abort();
            return Err(e);
        }
        scope.commit()?;
        Ok(id)
    }

    /// Read an object, copying its payload out of the engine.
    pub(crate) fn read(&self, id: &ObjectId) -> StoreResult<RawObject> {
        let scope = self.read_scope()?;
        let table = scope.open_table()?;
        let layout = self.layout();
        let decoded = table
            .get_with(id, |value| {
                layout
                    .decode(value)
                    .map(|(object_type, payload)| RawObject::new(object_type, payload.to_vec()))
            })?
            .ok_or(StoreError::NotFound(*id))?;
        decoded.map_err(|e| StoreError::CorruptObject {
            id: *id,
            reason: e.to_string(),
        })
    }

    /// Size and kind of an object, without copying the payload.
    pub(crate) fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        let scope = self.read_scope()?;
        let table = scope.open_table()?;
        let layout = self.layout();
        table
            .get_with(id, |value| layout.decode_header(value))?
            .ok_or(StoreError::NotFound(*id))?
            .map_err(|e| StoreError::CorruptObject {
                id: *id,
                reason: e.to_string(),
            })
    }

    /// `false` only when the key is definitely absent.
    ///
    /// Engine failures count as present, so a caller never concludes an
    /// object is missing from a store it could not consult.
    pub(crate) fn exists(&self, id: &ObjectId) -> bool {
        let found = self.read_scope().and_then(|scope| {
            let table = scope.open_table()?;
            let found = table.get_with(id, |_| ())?;
            Ok(found)
        });
        match found {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(%id, error = %e, "existence check failed; reporting object as present");
                true
            }
        }
    }

    /// Open a read scope for the iterator.
    pub(crate) fn read_scope(&self) -> StoreResult<ReadScope<'a>> {
        match self.outer {
            Some(outer) => Ok(ReadScope::Child(outer)),
            None => Ok(ReadScope::Independent(self.env.begin_read()?)),
        }
    }

    fn write_scope(&self) -> StoreResult<WriteScope<'a>> {
        match self.outer {
            Some(outer) => Ok(WriteScope::Child(outer)),
            None => Ok(WriteScope::Independent(self.env.begin_write()?)),
        }
    }
}

fn reserve_and_fill(
    txn: &WriteTransaction,
    id: &ObjectId,
    value_len: u32,
    layout: ValueLayout,
    object_type: ObjectType,
    data: &[u8],
) -> StoreResult<()> {
    let mut table = txn.open_table(OBJECTS)?;
    let mut slot = table.insert_reserve(id.as_bytes().as_slice(), value_len)?;
    layout.encode_into(slot.as_mut(), object_type, data);
    Ok(())
}

/// Transaction a read runs in. Never committed; dropping it releases the
/// snapshot (independent) or the table borrow (child).
pub(crate) enum ReadScope<'a> {
    Independent(ReadTransaction),
    Child(&'a WriteTransaction),
}

impl ReadScope<'_> {
    pub(crate) fn open_table(&self) -> StoreResult<TableView<'_>> {
        match self {
            Self::Independent(txn) => Ok(TableView::Snapshot(txn.open_table(OBJECTS)?)),
            Self::Child(txn) => Ok(TableView::Child(txn.open_table(OBJECTS)?)),
        }
    }
}

/// Transaction a write runs in.
enum WriteScope<'a> {
    Independent(WriteTransaction),
    Child(&'a WriteTransaction),
}

impl WriteScope<'_> {
    fn txn(&self) -> &WriteTransaction {
        match self {
            Self::Independent(txn) => txn,
            Self::Child(txn) => txn,
        }
    }

    /// Independent: durable commit. Child: the write simply stays part of the
    /// outer transaction and becomes durable when that commits.
    fn commit(self) -> StoreResult<()> {
        match self {
            Self::Independent(txn) => Ok(txn.commit()?),
            Self::Child(_) => Ok(()),
        }
    }

    /// Independent: discard everything. Child: reservation is the last
    /// fallible step and a failed reservation leaves the table unchanged, so
    /// there is nothing to undo and the outer transaction stays usable.
    fn abort(self) {
        if let Self::Independent(txn) = self {
            if let Err(e) = txn.abort() {
                warn!(error = %e, "aborting write transaction failed");
            }
        }
    }
}

/// The object table as seen from either kind of read scope.
pub(crate) enum TableView<'txn> {
    Snapshot(ReadOnlyTable<&'static [u8], &'static [u8]>),
    Child(Table<'txn, &'static [u8], &'static [u8]>),
}

impl TableView<'_> {
    /// Look up `id` and map the stored value while it is still borrowed.
    pub(crate) fn get_with<R>(
        &self,
        id: &ObjectId,
        f: impl FnOnce(&[u8]) -> R,
    ) -> StoreResult<Option<R>> {
        let key = id.as_bytes().as_slice();
        let found = match self {
            Self::Snapshot(table) => table.get(key)?.map(|guard| f(guard.value())),
            Self::Child(table) => table.get(key)?.map(|guard| f(guard.value())),
        };
        Ok(found)
    }

    /// Visit every key in order until `visit` returns `false`. Returns
    /// `false` if the visit was cut short.
    pub(crate) fn visit_keys(
        &self,
        mut visit: impl FnMut(&[u8]) -> StoreResult<bool>,
    ) -> StoreResult<bool> {
        match self {
            Self::Snapshot(table) => {
                for entry in table.iter()? {
                    let (key, _) = entry?;
                    if !visit(key.value())? {
                        return Ok(false);
                    }
                }
            }
            Self::Child(table) => {
                for entry in table.iter()? {
                    let (key, _) = entry?;
                    if !visit(key.value())? {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn temp_env(layout: ValueLayout) -> (tempfile::TempDir, Environment) {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(&dir.path().join("objects.db"), layout, &StoreConfig::default())
            .unwrap();
        (dir, env)
    }

    #[test]
    fn write_stores_layout_encoded_value() {
        let (_dir, env) = temp_env(ValueLayout::TagPrefix);
        let accessor = RecordAccessor::new(&env, None, u64::MAX);
        let id = accessor.write(b"hello", ObjectType::Blob).unwrap();
        assert_eq!(env.raw_value(id.as_bytes()).unwrap(), b"\x03hello");
    }

    #[test]
    fn suffix_environment_stores_tag_last() {
        let (_dir, env) = temp_env(ValueLayout::TagSuffix);
        let accessor = RecordAccessor::new(&env, None, u64::MAX);
        let id = accessor.write(b"hello", ObjectType::Blob).unwrap();
        assert_eq!(env.raw_value(id.as_bytes()).unwrap(), b"hello\x03");
    }

    #[test]
    fn oversized_payload_is_rejected_before_the_engine() {
        let (_dir, env) = temp_env(ValueLayout::TagPrefix);
        let accessor = RecordAccessor::new(&env, None, 4);
        let err = accessor.write(b"hello", ObjectType::Blob).unwrap_err();
        assert!(matches!(err, StoreError::ObjectTooLarge { size: 5, max: 4 }));
        let id = ContentHasher::hash(ObjectType::Blob, b"hello").unwrap();
        assert!(env.raw_value(id.as_bytes()).is_none());
    }

    #[test]
    fn corrupt_value_is_reported() {
        let (_dir, env) = temp_env(ValueLayout::TagPrefix);
        let id = ObjectId::from_hash([9u8; 20]);
        let txn = env.begin_write().unwrap();
        {
            let mut table = txn.open_table(OBJECTS).unwrap();
            table.insert(id.as_bytes().as_slice(), [0xeeu8].as_slice()).unwrap();
        }
        txn.commit().unwrap();

        let accessor = RecordAccessor::new(&env, None, u64::MAX);
        assert!(matches!(
            accessor.read(&id),
            Err(StoreError::CorruptObject { .. })
        ));
        assert!(matches!(
            accessor.read_header(&id),
            Err(StoreError::CorruptObject { .. })
        ));
        assert!(accessor.exists(&id));
    }

    #[test]
    fn closed_environment_fails_reads_and_reports_present() {
        let (_dir, mut env) = temp_env(ValueLayout::TagPrefix);
        env.close();
        let accessor = RecordAccessor::new(&env, None, u64::MAX);
        let id = ObjectId::null();
        assert!(matches!(
            accessor.read(&id),
            Err(StoreError::BackendUnavailable)
        ));
        assert!(matches!(
            accessor.write(b"x", ObjectType::Blob),
            Err(StoreError::BackendUnavailable)
        ));
        assert!(accessor.exists(&id));
    }

    #[test]
    fn child_writes_are_visible_to_child_reads_only() {
        let (_dir, env) = temp_env(ValueLayout::TagPrefix);
        let outer = env.begin_write().unwrap();
        let id = {
            let child = RecordAccessor::new(&env, Some(&outer), u64::MAX);
            let id = child.write(b"pending", ObjectType::Blob).unwrap();
            assert_eq!(child.read(&id).unwrap().data, b"pending");
            id
        };

        let independent = RecordAccessor::new(&env, None, u64::MAX);
        assert!(matches!(independent.read(&id), Err(StoreError::NotFound(_))));

        outer.commit().unwrap();
        assert_eq!(independent.read(&id).unwrap().data, b"pending");
    }
}
