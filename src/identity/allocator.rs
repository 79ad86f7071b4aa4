//! # Identity Allocator
//!
//! Mints and derives every identifier in the control plane.
//!
//! ## Overview
//!
//! - **Derived ids** (tasks, actor handles, return objects) are name-based
//!   UUIDs computed from their lineage. Re-submitting the same call from the
//!   same parent position yields the same [`TaskId`], which is what lets the
//!   scheduler detect duplicates without a central sequence.
//! - **Minted ids** (jobs, actors) come from an [`IdSource`]. Actor ids are
//!   tracked per job and a colliding draw is retried a bounded number of
//!   times before allocation fails.

use crate::config::IdentityConfig;
use crate::error::{ControlPlaneError, Result};
use crate::models::{ActorCreationId, ActorHandleId, ActorId, JobId, TaskId};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Source of fresh, unstructured identifiers
pub trait IdSource: Send + Sync + std::fmt::Debug {
    fn next_uuid(&self) -> Uuid;
}

/// Random (v4) identifiers
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
    fn next_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// The pair of ids naming a newly created actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorIds {
    pub actor_creation_id: ActorCreationId,
    pub actor_id: ActorId,
}

#[derive(Debug)]
pub struct IdentityAllocator {
    source: Arc<dyn IdSource>,
    max_mint_attempts: u32,
    minted_actors: DashMap<JobId, DashSet<Uuid>>,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new(&IdentityConfig::default())
    }
}

impl IdentityAllocator {
    pub fn new(config: &IdentityConfig) -> Self {
        Self::with_source(config, Arc::new(RandomIdSource))
    }

    pub fn with_source(config: &IdentityConfig, source: Arc<dyn IdSource>) -> Self {
        Self {
            source,
            max_mint_attempts: config.max_mint_attempts.max(1),
            minted_actors: DashMap::new(),
        }
    }

    pub fn mint_job_id(&self) -> JobId {
        JobId::from_uuid(self.source.next_uuid())
    }

    /// Id of the task at `parent_counter` among the children of `parent_task_id`
    pub fn task_id(&self, job_id: JobId, parent_task_id: TaskId, parent_counter: u64) -> TaskId {
        derive_task_id(job_id, parent_task_id, parent_counter)
    }

    /// Root task of a driver; its parent is the nil task
    pub fn driver_task_id(&self, job_id: JobId) -> TaskId {
        derive_task_id(job_id, TaskId::nil(), 0)
    }

    /// Mint ids for a new actor, unique within `job_id`.
    ///
    /// The actor is named by its creation: both ids share one UUID.
    pub fn mint_actor(&self, job_id: JobId) -> Result<ActorIds> {
        let minted = self.minted_actors.entry(job_id).or_default();
        for attempt in 1..=self.max_mint_attempts {
            let candidate = self.source.next_uuid();
            if candidate.is_nil() || !minted.insert(candidate) {
                debug!(job_id = %job_id, attempt, "Actor id draw collided, retrying");
                continue;
            }
            let actor_creation_id = ActorCreationId::from_uuid(candidate);
            return Ok(ActorIds {
                actor_creation_id,
                actor_id: ActorId::from(actor_creation_id),
            });
        }

        error!(
            job_id = %job_id,
            attempts = self.max_mint_attempts,
            "Actor identifier space exhausted"
        );
        Err(ControlPlaneError::Allocation(format!(
            "no unused actor id for job {job_id} after {} attempts",
            self.max_mint_attempts
        )))
    }

    pub fn root_handle_id(&self, actor_id: ActorId) -> ActorHandleId {
        ActorHandleId::from_uuid(Uuid::new_v5(actor_id.as_uuid(), b"root-handle"))
    }

    /// Id of the `fork_index`-th handle forked from `parent`
    pub fn forked_handle_id(&self, parent: ActorHandleId, fork_index: u64) -> ActorHandleId {
        ActorHandleId::from_uuid(Uuid::new_v5(parent.as_uuid(), &fork_index.to_be_bytes()))
    }

    /// Forget the actor ids minted for a finished job
    pub fn release_job(&self, job_id: JobId) {
        self.minted_actors.remove(&job_id);
    }

    pub fn minted_actor_count(&self, job_id: JobId) -> usize {
        self.minted_actors.get(&job_id).map_or(0, |set| set.len())
    }
}

fn derive_task_id(job_id: JobId, parent_task_id: TaskId, parent_counter: u64) -> TaskId {
    let mut name = [0u8; 24];
    name[..16].copy_from_slice(job_id.as_uuid().as_bytes());
    name[16..].copy_from_slice(&parent_counter.to_be_bytes());
    TaskId::from_uuid(Uuid::new_v5(parent_task_id.as_uuid(), &name))
}
