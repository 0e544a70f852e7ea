//! In-memory fake for the ref store (testing only)
//!
//! Provides `MemoryRefStore`, which satisfies the [`RefStore`] contract
//! without any external dependencies.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

/// In-memory ref store backed by a `HashMap<id, bytes>` and a `BTreeMap<ref, id>`.
#[derive(Debug, Default)]
pub struct MemoryRefStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    refs: Mutex<BTreeMap<String, ObjectId>>,
}

impl MemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl RefStore for MemoryRefStore {
    async fn put_object(&self, data: &[u8]) -> StorageResult<ObjectId> {
        let id = ObjectId::for_bytes(data);
        let mut objects = self.objects.lock().unwrap();
        objects
            .entry(id.as_str().to_string())
            .or_insert_with(|| data.to_vec());
        Ok(id)
    }

    async fn get_object(&self, id: &ObjectId) -> StorageResult<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                id: id.as_str().to_string(),
            })
    }

    async fn contains_object(&self, id: &ObjectId) -> StorageResult<bool> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.contains_key(id.as_str()))
    }

    async fn read_ref(&self, name: &str) -> StorageResult<Option<ObjectId>> {
        validate_ref_name(name)?;
        let refs = self.refs.lock().unwrap();
        Ok(refs.get(name).cloned())
    }

    async fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&ObjectId>,
        new: Option<&ObjectId>,
    ) -> StorageResult<()> {
        validate_ref_name(name)?;
        if let Some(target) = new {
            if !self.contains_object(target).await? {
                return Err(StorageError::ObjectNotFound {
                    id: target.as_str().to_string(),
                });
            }
        }

        let mut refs = self.refs.lock().unwrap();
        let actual = refs.get(name);
        if actual != expected {
            return Err(StorageError::LockFailure {
                ref_name: name.to_string(),
                expected: describe_target(expected),
                actual: describe_target(actual),
            });
        }
        match new {
            Some(target) => {
                refs.insert(name.to_string(), target.clone());
            }
            None => {
                refs.remove(name);
            }
        }
        Ok(())
    }

    async fn list_refs(&self, prefix: &str) -> StorageResult<Vec<(String, ObjectId)>> {
        let refs = self.refs.lock().unwrap();
        Ok(refs
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, id)| (name.clone(), id.clone()))
            .collect())
    }
}
