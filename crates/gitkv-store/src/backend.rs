use std::path::Path;

use gitkv_types::{ObjectId, ObjectType};

use crate::accessor::RecordAccessor;
use crate::config::StoreConfig;
use crate::env::Environment;
use crate::error::StoreResult;
use crate::iter::Visitor;
use crate::layout::ValueLayout;
use crate::object::RawObject;
use crate::traits::OdbBackend;

/// Plain key-value backend: every call runs in its own transaction.
///
/// Values carry the type tag after the payload ([`ValueLayout::TagSuffix`]).
/// There is no `read_header` shortcut; the trait default reads the object
/// and drops the payload.
#[derive(Debug)]
pub struct KvBackend {
    env: Environment,
    max_object_size: u64,
}

impl KvBackend {
    /// Value layout of files written by this backend.
    pub const LAYOUT: ValueLayout = ValueLayout::TagSuffix;

    /// Open or create the store file at `path`.
    pub fn open(path: &Path, config: &StoreConfig) -> StoreResult<Self> {
        let env = Environment::open(path, Self::LAYOUT, config)?;
        Ok(Self {
            env,
            max_object_size: config.max_object_size,
        })
    }

    /// The underlying environment.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Close the store file. Idempotent; later calls fail with
    /// `StoreError::BackendUnavailable`.
    pub fn close(&mut self) {
        self.env.close();
    }

    fn accessor(&self) -> RecordAccessor<'_> {
        RecordAccessor::new(&self.env, None, self.max_object_size)
    }
}

impl OdbBackend for KvBackend {
    fn read(&self, id: &ObjectId) -> StoreResult<RawObject> {
        self.accessor().read(id)
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
}
