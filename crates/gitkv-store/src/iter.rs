use std::ops::ControlFlow;

use gitkv_types::ObjectId;

use crate::accessor::RecordAccessor;
use crate::error::{StoreError, StoreResult};

/// Callback invoked once per stored object ID.
pub type Visitor<'v> = dyn FnMut(&ObjectId) -> ControlFlow<()> + 'v;

impl RecordAccessor<'_> {
    /// Walk every key in the object table in key order.
    ///
    /// Only keys are handed to the visitor; values are never decoded. A
    /// `Break` from the visitor ends the walk with [`StoreError::UserAborted`]
    /// so callers can tell a deliberate stop from a failure.
    pub(crate) fn for_each(&self, visitor: &mut Visitor<'_>) -> StoreResult<()> {
        let scope = self.read_scope()?;
        let table = scope.open_table()?;
        let completed = table.visit_keys(|key| {
            let id = ObjectId::from_slice(key)
                .map_err(|_| StoreError::CorruptKey { len: key.len() })?;
            Ok(visitor(&id).is_continue())
        })?;
        if completed {
            Ok(())
        } else {
            Err(StoreError::UserAborted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::env::{Environment, OBJECTS};
    use crate::layout::ValueLayout;
    use gitkv_types::ObjectType;

    fn temp_env() -> (tempfile::TempDir, Environment) {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(
            &dir.path().join("objects.db"),
            ValueLayout::TagPrefix,
            &StoreConfig::default(),
        )
        .unwrap();
        (dir, env)
    }

    #[test]
    fn empty_store_visits_nothing() {
        let (_dir, env) = temp_env();
        let accessor = RecordAccessor::new(&env, None, u64::MAX);
        let mut seen = 0;
        accessor
            .for_each(&mut |_| {
                seen += 1;
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(seen, 0);
    }

    #[test]
    fn keys_are_visited_in_order() {
        let (_dir, env) = temp_env();
        let accessor = RecordAccessor::new(&env, None, u64::MAX);
        for i in 0..10u8 {
            accessor.write(&[i], ObjectType::Blob).unwrap();
        }
        let mut ids = Vec::new();
        accessor
            .for_each(&mut |id| {
                ids.push(*id);
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(ids.len(), 10);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn break_reports_user_aborted() {
        let (_dir, env) = temp_env();
        let accessor = RecordAccessor::new(&env, None, u64::MAX);
        for i in 0..5u8 {
            accessor.write(&[i], ObjectType::Blob).unwrap();
        }
        let mut seen = 0;
        let err = accessor
            .for_each(&mut |_| {
                seen += 1;
                if seen == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::UserAborted));
        assert_eq!(seen, 2);

        // The read scope was released: a write still goes through.
        accessor.write(b"after", ObjectType::Blob).unwrap();
    }

    #[test]
    fn malformed_key_stops_iteration() {
        let (_dir, env) = temp_env();
        let txn = env.begin_write().unwrap();
        {
            let mut table = txn.open_table(OBJECTS).unwrap();
            table.insert(b"short".as_slice(), b"\x03x".as_slice()).unwrap();
        }
        txn.commit().unwrap();

        let accessor = RecordAccessor::new(&env, None, u64::MAX);
        let err = accessor
            .for_each(&mut |_| ControlFlow::Continue(()))
            .unwrap_err();
        assert!(matches!(err, StoreError::CorruptKey { len: 5 }));
    }
}
