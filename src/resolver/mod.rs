//! # Argument Resolver
//!
//! Turns a [`TaskArg`] into the value a task body consumes.
//!
//! ## Overview
//!
//! Inline arguments are JSON documents and decode without touching the store.
//! Reference arguments fetch every listed object from an [`ObjectStore`].
//! A single resolution pass reports the worst outcome across the ids: a lost
//! object wins over a pending one, since waiting cannot recover it.
//!
//! [`ArgumentResolver::resolve_when_available`] polls until every object is
//! ready. Dropping the returned future cancels the wait; resolution never
//! mutates the store.

pub mod memory;

use crate::config::ResolverConfig;
use crate::constants::profile_events;
use crate::error::{ControlPlaneError, Result};
use crate::models::{ObjectId, TaskArg};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::time::Duration;
use tracing::{debug, warn};

pub use memory::InMemoryObjectStore;

/// State of one object as seen by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStatus {
    Ready(Vec<u8>),
    /// Not produced yet
    Pending,
    /// Produced once but no copy survives
    Lost,
}

/// Read access to the distributed object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, object_id: &ObjectId) -> ObjectStatus;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPayload {
    pub id: ObjectId,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Inline(serde_json::Value),
    /// One payload per referenced id, in argument order
    Objects(Vec<ObjectPayload>),
}

impl ResolvedValue {
    /// Payload of a single-reference argument
    pub fn single_object(&self) -> Option<&ObjectPayload> {
        match self {
            Self::Objects(objects) if objects.len() == 1 => objects.first(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ArgumentResolver<S: ObjectStore> {
    store: S,
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl<S: ObjectStore> ArgumentResolver<S> {
    pub fn new(store: S, config: &ResolverConfig) -> Self {
        Self {
            store,
            poll_interval: config.poll_interval().max(Duration::from_millis(1)),
            max_wait: config.max_wait(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `arg` in a single pass
    pub async fn resolve(&self, arg: &TaskArg) -> Result<ResolvedValue> {
        match arg {
            TaskArg::ByValue(data) => {
                let value = serde_json::from_slice(data).map_err(|e| {
                    ControlPlaneError::MalformedArgument(format!(
                        "inline argument is not valid JSON: {e}"
                    ))
                })?;
                Ok(ResolvedValue::Inline(value))
            }
            TaskArg::ByReference(ids) => {
                if ids.is_empty() {
                    return Err(ControlPlaneError::MalformedArgument(
                        "pass-by-reference argument has no object ids".to_string(),
                    ));
                }

                let statuses =
                    futures::future::join_all(ids.iter().map(|id| self.store.fetch(id))).await;

                let mut first_pending = None;
                let mut objects = Vec::with_capacity(ids.len());
                for (id, status) in ids.iter().zip(statuses) {
                    match status {
                        ObjectStatus::Lost => {
                            warn!(
                                event = profile_events::ARGUMENT_RESOLVE,
                                object_id = %id,
                                "Argument object lost"
                            );
                            return Err(ControlPlaneError::ObjectLost { object_id: *id });
                        }
                        ObjectStatus::Pending => {
                            first_pending.get_or_insert(*id);
                        }
                        ObjectStatus::Ready(data) => objects.push(ObjectPayload { id: *id, data }),
                    }
                }

                match first_pending {
                    Some(object_id) => Err(ControlPlaneError::ObjectUnavailable { object_id }),
                    None => Ok(ResolvedValue::Objects(objects)),
                }
            }
        }
    }

    /// Resolve `arg`, waiting for pending objects.
    ///
    /// Gives up with `ObjectUnavailable` once `max_wait` elapses, if set.
    pub async fn resolve_when_available(&self, arg: &TaskArg) -> Result<ResolvedValue> {
        match self.max_wait {
            Some(max_wait) => match tokio::time::timeout(max_wait, self.poll(arg)).await {
                Ok(result) => result,
                Err(_) => {
                    // Report the object still missing after the deadline.
                    match self.resolve(arg).await {
                        Err(ControlPlaneError::ObjectUnavailable { object_id }) => {
                            debug!(
                                object_id = %object_id,
                                max_wait_ms = max_wait.as_millis() as u64,
                                "Gave up waiting for argument object"
                            );
                            Err(ControlPlaneError::ObjectUnavailable { object_id })
                        }
                        other => other,
                    }
                }
            },
            None => self.poll(arg).await,
        }
    }

    async fn poll(&self, arg: &TaskArg) -> Result<ResolvedValue> {
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            match self.resolve(arg).await {
                Err(ControlPlaneError::ObjectUnavailable { object_id }) => {
                    if attempts == 1 {
                        debug!(object_id = %object_id, "Waiting for argument object");
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                other => return other,
            }
        }
    }

    /// Resolve every argument of a task, preserving order
    pub async fn resolve_all(&self, args: &[TaskArg]) -> Result<Vec<ResolvedValue>> {
        try_join_all(args.iter().map(|arg| self.resolve_when_available(arg))).await
    }
}
