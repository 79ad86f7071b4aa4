//! DashMap-backed object store for embedding and tests.

use super::{ObjectStatus, ObjectStore};
use crate::models::ObjectId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Slot {
    Ready(Arc<Vec<u8>>),
    Lost,
}

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<ObjectId, Slot>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the value of `object_id`, replacing a lost marker
    pub fn put(&self, object_id: ObjectId, data: Vec<u8>) {
        self.objects.insert(object_id, Slot::Ready(Arc::new(data)));
    }

    /// Evict every copy of `object_id`
    pub fn mark_lost(&self, object_id: ObjectId) {
        self.objects.insert(object_id, Slot::Lost);
    }

    pub fn remove(&self, object_id: &ObjectId) {
        self.objects.remove(object_id);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn status(&self, object_id: &ObjectId) -> ObjectStatus {
        match self.objects.get(object_id).map(|slot| slot.value().clone()) {
            Some(Slot::Ready(data)) => ObjectStatus::Ready(data.as_ref().clone()),
            Some(Slot::Lost) => ObjectStatus::Lost,
            None => ObjectStatus::Pending,
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn fetch(&self, object_id: &ObjectId) -> ObjectStatus {
        self.status(object_id)
    }
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn fetch(&self, object_id: &ObjectId) -> ObjectStatus {
        (**self).fetch(object_id).await
    }
}
