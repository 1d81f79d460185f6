use std::collections::BTreeMap;
use std::sync::RwLock;

use gitkv_types::{ObjectId, ObjectType};

use crate::error::{StoreError, StoreResult};
use crate::iter::Visitor;
use crate::object::RawObject;
use crate::traits::OdbBackend;

/// In-memory, `BTreeMap`-based object backend.
///
/// Intended for tests and as a scratch layer in an object database. All
/// objects are held behind a `RwLock`; reads clone the stored object.
/// Iteration visits IDs in the same order as the on-disk backends.
pub struct InMemoryBackend {
    objects: RwLock<BTreeMap<ObjectId, RawObject>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.len() as u64)
            .sum()
    }

    /// Remove all objects.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OdbBackend for InMemoryBackend {
    fn read(&self, id: &ObjectId) -> StoreResult<RawObject> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    fn write(&self, data: &[u8], object_type: ObjectType) -> StoreResult<ObjectId> {
        let object = RawObject::new(object_type, data.to_vec());
        let id = object.compute_id()?;
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(id).or_insert(object);
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(id)
    }

    fn for_each(&self, visitor: &mut Visitor<'_>) -> StoreResult<()> {
        // Snapshot the keys so the visitor may call back into this backend.
        let ids: Vec<ObjectId> = self
            .objects
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect();
        for id in &ids {
            if visitor(id).is_break() {
                return Err(StoreError::UserAborted);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("object_count", &self.len())
            .finish()
    }
}
