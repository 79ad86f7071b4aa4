//! # Actor Handle Lineage Tracker
//!
//! Owns the submission counter of every actor handle and the fork protocol.
//!
//! ## Overview
//!
//! - Each handle hands out counters `0, 1, 2, …` through an atomic
//!   read-increment-return under the handle's own lock. Counters are never
//!   reset or reused, including across actor reconstruction.
//! - Forking a handle creates a sibling handle starting at counter 0 and
//!   records it in the actor's pending-fork set. The next submission through
//!   the forking handle drains the set via [`ActorLineageTracker::announce`],
//!   so each fork is announced exactly once.
//! - Each actor carries a reconstruction budget. Once it is spent the actor
//!   is dead and every handle to it is stale.
//!
//! Lock order is actor pending-fork set, then handle counters. Submissions
//! only ever take the handle lock.

use crate::constants::profile_events;
use crate::error::{ControlPlaneError, Result};
use crate::identity::IdentityAllocator;
use crate::logging::log_lineage_operation;
use crate::models::{ActorCreationSpec, ActorHandleId, ActorId, JobId, ObjectId, TaskId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-task submission state of a caller that spawns child tasks
#[derive(Debug)]
pub struct SubmitterContext {
    job_id: JobId,
    current_task_id: TaskId,
    next_child: AtomicU64,
}

/// Lineage of one child task: its id and its position under its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildTask {
    pub task_id: TaskId,
    pub parent_task_id: TaskId,
    pub parent_counter: u64,
}

impl SubmitterContext {
    pub fn new(job_id: JobId, current_task_id: TaskId) -> Self {
        Self {
            job_id,
            current_task_id,
            next_child: AtomicU64::new(0),
        }
    }

    /// Context of a driver program, rooted at the job's driver task
    pub fn for_driver(allocator: &IdentityAllocator, job_id: JobId) -> Self {
        Self::new(job_id, allocator.driver_task_id(job_id))
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn current_task_id(&self) -> TaskId {
        self.current_task_id
    }

    pub fn submitted_children(&self) -> u64 {
        self.next_child.load(Ordering::Acquire)
    }

    /// Reserve the next child position and derive its task id
    pub fn next_child(&self, allocator: &IdentityAllocator) -> ChildTask {
        let parent_counter = self.next_child.fetch_add(1, Ordering::AcqRel);
        ChildTask {
            task_id: allocator.task_id(self.job_id, self.current_task_id, parent_counter),
            parent_task_id: self.current_task_id,
            parent_counter,
        }
    }
}

/// Result of submitting one method call through a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorSubmission {
    pub job_id: JobId,
    pub task: ChildTask,
    pub actor_id: ActorId,
    pub actor_handle_id: ActorHandleId,
    pub actor_counter: u64,
}

/// Where a forked handle branched off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleOrigin {
    pub parent: ActorHandleId,
    /// The parent's next counter at the time of the fork
    pub parent_counter: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionDecision {
    Reconstruct { remaining: u32 },
    Dead,
}

#[derive(Debug)]
struct PendingFork {
    parent: ActorHandleId,
    child: ActorHandleId,
}

#[derive(Debug)]
struct ActorLineage {
    actor_id: ActorId,
    job_id: JobId,
    root_handle: ActorHandleId,
    creation_dummy_object_id: ObjectId,
    max_reconstructions: u32,
    reconstructions: Mutex<u32>,
    dead: AtomicBool,
    pending_forks: Mutex<Vec<PendingFork>>,
}

impl ActorLineage {
    fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default)]
struct HandleCounters {
    next_counter: u64,
    forks: u64,
}

#[derive(Debug)]
struct HandleState {
    handle_id: ActorHandleId,
    actor: Arc<ActorLineage>,
    origin: Option<HandleOrigin>,
    counters: Mutex<HandleCounters>,
}

#[derive(Debug)]
pub struct ActorLineageTracker {
    allocator: Arc<IdentityAllocator>,
    actors: DashMap<ActorId, Arc<ActorLineage>>,
    handles: DashMap<ActorHandleId, Arc<HandleState>>,
}

impl ActorLineageTracker {
    pub fn new(allocator: Arc<IdentityAllocator>) -> Self {
        Self {
            allocator,
            actors: DashMap::new(),
            handles: DashMap::new(),
        }
    }

    pub fn allocator(&self) -> &Arc<IdentityAllocator> {
        &self.allocator
    }

    /// Register the actor created by `creation` and return its root handle.
    ///
    /// Registering the same actor again returns the existing root handle.
    pub fn register_actor(&self, creation: &ActorCreationSpec, job_id: JobId) -> ActorHandleId {
        let actor_id = creation.actor_id();
        if let Some(existing) = self.actors.get(&actor_id) {
            return existing.root_handle;
        }

        let root_handle = self.allocator.root_handle_id(actor_id);
        let lineage = self
            .actors
            .entry(actor_id)
            .or_insert_with(|| {
                Arc::new(ActorLineage {
                    actor_id,
                    job_id,
                    root_handle,
                    creation_dummy_object_id: creation.actor_creation_dummy_object_id,
                    max_reconstructions: creation.max_actor_reconstructions,
                    reconstructions: Mutex::new(0),
                    dead: AtomicBool::new(false),
                    pending_forks: Mutex::new(Vec::new()),
                })
            })
            .clone();

        self.handles.entry(root_handle).or_insert_with(|| {
            Arc::new(HandleState {
                handle_id: root_handle,
                actor: lineage,
                origin: None,
                counters: Mutex::new(HandleCounters::default()),
            })
        });

        info!(
            actor_id = %actor_id,
            job_id = %job_id,
            root_handle = %root_handle,
            max_reconstructions = creation.max_actor_reconstructions,
            "Actor registered"
        );
        root_handle
    }

    /// Fork `handle` into a new sibling handle starting at counter 0
    pub fn fork(&self, handle: ActorHandleId) -> Result<ActorHandleId> {
        let state = self.live_handle(handle)?;
        let actor = Arc::clone(&state.actor);

        let mut pending = actor.pending_forks.lock();
        let (child, origin) = {
            let mut counters = state.counters.lock();
            let child = self.allocator.forked_handle_id(handle, counters.forks);
            counters.forks += 1;
            (
                child,
                HandleOrigin {
                    parent: handle,
                    parent_counter: counters.next_counter,
                },
            )
        };

        self.handles.insert(
            child,
            Arc::new(HandleState {
                handle_id: child,
                actor: Arc::clone(&actor),
                origin: Some(origin),
                counters: Mutex::new(HandleCounters::default()),
            }),
        );
        pending.push(PendingFork {
            parent: handle,
            child,
        });
        drop(pending);

        log_lineage_operation("fork", actor.actor_id, Some(child), Some(origin.parent_counter));
        Ok(child)
    }

    /// Assign the next counter of `handle` to a new method call
    pub fn submit(&self, handle: ActorHandleId, ctx: &SubmitterContext) -> Result<ActorSubmission> {
        let state = self.live_handle(handle)?;

        let actor_counter = {
            let mut counters = state.counters.lock();
            let counter = counters.next_counter;
            counters.next_counter += 1;
            counter
        };
        let task = ctx.next_child(&self.allocator);

        log_lineage_operation("submit", state.actor.actor_id, Some(handle), Some(actor_counter));
        Ok(ActorSubmission {
            job_id: ctx.job_id(),
            task,
            actor_id: state.actor.actor_id,
            actor_handle_id: state.handle_id,
            actor_counter,
        })
    }

    /// Drain the forks made from `handle` that have not been announced yet
    pub fn announce(&self, handle: ActorHandleId) -> Result<Vec<ActorHandleId>> {
        let state = self.live_handle(handle)?;
        let mut pending = state.actor.pending_forks.lock();

        let mut announced = Vec::new();
        pending.retain(|fork| {
            if fork.parent == handle {
                announced.push(fork.child);
                false
            } else {
                true
            }
        });

        if !announced.is_empty() {
            debug!(
                handle_id = %handle,
                count = announced.len(),
                "Announcing forked actor handles"
            );
        }
        Ok(announced)
    }

    /// Spend one unit of the actor's reconstruction budget after a failure
    pub fn record_actor_failure(&self, actor_id: ActorId) -> Result<ReconstructionDecision> {
        let actor = self
            .actors
            .get(&actor_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                ControlPlaneError::stale_handle(
                    self.allocator.root_handle_id(actor_id),
                    Some(actor_id),
                    "unknown actor",
                )
            })?;

        if actor.is_dead() {
            return Ok(ReconstructionDecision::Dead);
        }

        let mut used = actor.reconstructions.lock();
        if *used < actor.max_reconstructions {
            *used += 1;
            let remaining = actor.max_reconstructions - *used;
            info!(
                event = profile_events::ACTOR_RECONSTRUCT,
                actor_id = %actor_id,
                attempt = *used,
                remaining,
                "Reconstructing actor"
            );
            Ok(ReconstructionDecision::Reconstruct { remaining })
        } else {
            actor.dead.store(true, Ordering::Release);
            warn!(
                actor_id = %actor_id,
                max_reconstructions = actor.max_reconstructions,
                "Actor exceeded its reconstruction budget and is permanently dead"
            );
            Ok(ReconstructionDecision::Dead)
        }
    }

    /// Drop the lineage of every actor created by `job_id`: the actors,
    /// all of their handles and any unannounced forks. Handles of released
    /// actors are stale afterwards. Returns the number of actors released.
    pub fn release_job(&self, job_id: JobId) -> usize {
        let released: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|actor| actor.job_id == job_id)
            .map(|actor| actor.actor_id)
            .collect();
        if released.is_empty() {
            return 0;
        }

        for actor_id in &released {
            if let Some((_, actor)) = self.actors.remove(actor_id) {
                actor.pending_forks.lock().clear();
            }
        }
        let mut dropped_handles = 0usize;
        self.handles.retain(|_, state| {
            let keep = !released.contains(&state.actor.actor_id);
            if !keep {
                dropped_handles += 1;
            }
            keep
        });

        info!(
            job_id = %job_id,
            actors = released.len(),
            handles = dropped_handles,
            "Released actor lineage of finished job"
        );
        released.len()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn is_dead(&self, actor_id: ActorId) -> bool {
        self.actors
            .get(&actor_id)
            .is_some_and(|actor| actor.is_dead())
    }

    pub fn remaining_reconstructions(&self, actor_id: ActorId) -> Option<u32> {
        let actor = self.actors.get(&actor_id)?;
        let used = *actor.reconstructions.lock();
        Some(actor.max_reconstructions.saturating_sub(used))
    }

    pub fn root_handle(&self, actor_id: ActorId) -> Option<ActorHandleId> {
        self.actors.get(&actor_id).map(|actor| actor.root_handle)
    }

    pub fn actor_of(&self, handle: ActorHandleId) -> Option<ActorId> {
        self.handles.get(&handle).map(|state| state.actor.actor_id)
    }

    pub fn job_of(&self, actor_id: ActorId) -> Option<JobId> {
        self.actors.get(&actor_id).map(|actor| actor.job_id)
    }

    pub fn creation_dummy_object(&self, actor_id: ActorId) -> Option<ObjectId> {
        self.actors
            .get(&actor_id)
            .map(|actor| actor.creation_dummy_object_id)
    }

    pub fn handle_origin(&self, handle: ActorHandleId) -> Option<HandleOrigin> {
        self.handles.get(&handle).and_then(|state| state.origin)
    }

    /// Counter the next submission through `handle` will receive
    pub fn handle_counter(&self, handle: ActorHandleId) -> Option<u64> {
        self.handles
            .get(&handle)
            .map(|state| state.counters.lock().next_counter)
    }

    fn live_handle(&self, handle: ActorHandleId) -> Result<Arc<HandleState>> {
        let state = self
            .handles
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ControlPlaneError::stale_handle(handle, None, "unknown actor handle"))?;

        if state.actor.is_dead() {
            return Err(ControlPlaneError::stale_handle(
                handle,
                Some(state.actor.actor_id),
                "actor exceeded max_actor_reconstructions and is dead",
            ));
        }
        Ok(state)
    }
}
