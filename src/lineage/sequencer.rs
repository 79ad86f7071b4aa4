//! Receiver-side ordering of method calls arriving at one actor.
//!
//! Calls are released per handle in counter order. The root handle is known
//! from the start; a forked handle becomes known only when a released call
//! announces it. Calls below a handle's expected counter are replays and are
//! discarded.

use crate::error::{ControlPlaneError, Result};
use crate::models::{ActorHandleId, ActorId, TaskSpec};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Calls buffered per handle that has not been announced yet
pub const DEFAULT_UNANNOUNCED_LIMIT: usize = 1024;

#[derive(Debug)]
pub struct ActorSequencer {
    actor_id: ActorId,
    expected: HashMap<ActorHandleId, u64>,
    buffered: BTreeMap<ActorHandleId, BTreeMap<u64, TaskSpec>>,
    unannounced_limit: usize,
    discarded: u64,
}

impl ActorSequencer {
    pub fn new(actor_id: ActorId, root_handle: ActorHandleId) -> Self {
        Self {
            actor_id,
            expected: HashMap::from([(root_handle, 0)]),
            buffered: BTreeMap::new(),
            unannounced_limit: DEFAULT_UNANNOUNCED_LIMIT,
            discarded: 0,
        }
    }

    pub fn with_unannounced_limit(mut self, limit: usize) -> Self {
        self.unannounced_limit = limit;
        self
    }

    /// Offer one arriving call; returns the calls that are now runnable, in
    /// execution order.
    pub fn push(&mut self, spec: TaskSpec) -> Result<Vec<TaskSpec>> {
        let invocation = spec.actor_task().ok_or_else(|| {
            ControlPlaneError::invalid_spec(format!(
                "task {} is not an actor method invocation",
                spec.task_id()
            ))
        })?;
        if invocation.actor_id != self.actor_id {
            return Err(ControlPlaneError::invalid_spec(format!(
                "task {} targets actor {}, not {}",
                spec.task_id(),
                invocation.actor_id,
                self.actor_id
            )));
        }

        let handle = invocation.actor_handle_id;
        let counter = invocation.actor_counter;
        let expected = self.expected.get(&handle).copied();
        let stale = expected.is_some_and(|expected| counter < expected);
        let duplicate = self
            .buffered
            .get(&handle)
            .is_some_and(|queue| queue.contains_key(&counter));
        if stale || duplicate {
            self.discarded += 1;
            warn!(
                actor_id = %self.actor_id,
                handle_id = %handle,
                counter,
                "Discarding duplicate or stale actor call"
            );
            return Ok(Vec::new());
        }

        let queue = self.buffered.entry(handle).or_default();
        if expected.is_none() && queue.len() >= self.unannounced_limit {
            if queue.is_empty() {
                self.buffered.remove(&handle);
            }
            return Err(ControlPlaneError::stale_handle(
                handle,
                Some(self.actor_id),
                format!(
                    "{} calls already buffered for unannounced handle",
                    self.unannounced_limit
                ),
            ));
        }
        queue.insert(counter, spec);

        Ok(self.release())
    }

    fn release(&mut self) -> Vec<TaskSpec> {
        let mut ready = Vec::new();
        loop {
            let mut progressed = false;
            for (handle, queue) in self.buffered.iter_mut() {
                let Some(expected) = self.expected.get_mut(handle) else {
                    continue;
                };
                while let Some(spec) = queue.remove(&*expected) {
                    *expected += 1;
                    progressed = true;
                    ready.push(spec);
                }
            }
            if !progressed {
                break;
            }
            // Calls released in this pass may announce new handles.
            for spec in &ready {
                if let Some(invocation) = spec.actor_task() {
                    for announced in &invocation.new_actor_handles {
                        if !self.expected.contains_key(announced) {
                            debug!(
                                actor_id = %self.actor_id,
                                handle_id = %announced,
                                "Actor handle announced"
                            );
                            self.expected.insert(*announced, 0);
                        }
                    }
                }
            }
        }
        self.buffered.retain(|_, queue| !queue.is_empty());
        ready
    }

    pub fn is_known(&self, handle: ActorHandleId) -> bool {
        self.expected.contains_key(&handle)
    }

    pub fn expected_counter(&self, handle: ActorHandleId) -> Option<u64> {
        self.expected.get(&handle).copied()
    }

    /// Calls buffered behind a counter gap or an unannounced handle
    pub fn pending(&self) -> usize {
        self.buffered.values().map(BTreeMap::len).sum()
    }

    /// Handles with at least one buffered call
    pub fn buffered_handles(&self) -> usize {
        self.buffered.len()
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityAllocator;
    use crate::lineage::{ActorLineageTracker, SubmitterContext};
    use crate::models::{ActorCreationSpec, ObjectId, TaskId};
    use crate::orchestration::TaskSpecBuilder;
    use std::sync::Arc;

    struct Fixture {
        tracker: ActorLineageTracker,
        ctx: SubmitterContext,
        actor_id: ActorId,
        root: ActorHandleId,
    }

    impl Fixture {
        fn new() -> Self {
            let allocator = Arc::new(IdentityAllocator::default());
            let job = allocator.mint_job_id();
            let ids = allocator.mint_actor(job).unwrap();
            let ctx = SubmitterContext::for_driver(&allocator, job);
            let tracker = ActorLineageTracker::new(allocator);
            let creation = ActorCreationSpec {
                actor_creation_id: ids.actor_creation_id,
                actor_creation_dummy_object_id: ObjectId::dummy_for(TaskId::nil()),
                max_actor_reconstructions: 0,
                dynamic_worker_options: vec![],
            };
            let root = tracker.register_actor(&creation, job);
            Self {
                tracker,
                ctx,
                actor_id: ids.actor_id,
                root,
            }
        }

        fn call(&self, handle: ActorHandleId) -> TaskSpec {
            let submission = self.tracker.submit(handle, &self.ctx).unwrap();
            TaskSpecBuilder::for_actor_submission(&submission)
                .function_descriptor(["Counter", "increment"])
                .build_with_lineage(&self.tracker)
                .unwrap()
        }
    }

    fn position(spec: &TaskSpec) -> (ActorHandleId, u64) {
        let invocation = spec.actor_task().unwrap();
        (invocation.actor_handle_id, invocation.actor_counter)
    }

    #[test]
    fn test_forked_handle_waits_for_announcement() {
        let f = Fixture::new();
        let h0 = f.call(f.root);
        let forked = f.tracker.fork(f.root).unwrap();
        let h1 = f.call(f.root);
        let f0 = f.call(forked);
        assert_eq!(h1.actor_task().unwrap().new_actor_handles, vec![forked]);

        let mut sequencer = ActorSequencer::new(f.actor_id, f.root);
        assert!(sequencer.push(f0).unwrap().is_empty());
        assert!(!sequencer.is_known(forked));
        assert!(sequencer.push(h1).unwrap().is_empty());
        assert_eq!(sequencer.pending(), 2);

        let released: Vec<_> = sequencer.push(h0).unwrap().iter().map(position).collect();
        assert_eq!(released, vec![(f.root, 0), (f.root, 1), (forked, 0)]);
        assert_eq!(sequencer.pending(), 0);
        assert_eq!(sequencer.expected_counter(forked), Some(1));
    }

    #[test]
    fn test_replays_are_discarded() {
        let f = Fixture::new();
        let first = f.call(f.root);
        let second = f.call(f.root);

        let mut sequencer = ActorSequencer::new(f.actor_id, f.root);
        assert_eq!(sequencer.push(first.clone()).unwrap().len(), 1);
        assert!(sequencer.push(first).unwrap().is_empty());

        assert!(sequencer.push(second.clone()).unwrap().len() == 1);
        assert!(sequencer.push(second).unwrap().is_empty());
        assert_eq!(sequencer.discarded(), 2);
    }

    #[test]
    fn test_duplicate_buffered_call_is_discarded() {
        let f = Fixture::new();
        let _first = f.call(f.root);
        let second = f.call(f.root);

        let mut sequencer = ActorSequencer::new(f.actor_id, f.root);
        assert!(sequencer.push(second.clone()).unwrap().is_empty());
        assert!(sequencer.push(second).unwrap().is_empty());
        assert_eq!(sequencer.pending(), 1);
        assert_eq!(sequencer.discarded(), 1);
    }

    #[test]
    fn test_rejects_other_actors_and_plain_tasks() {
        let f = Fixture::new();
        let call = f.call(f.root);
        let mut sequencer = ActorSequencer::new(ActorId::nil(), f.root);
        assert!(matches!(
            sequencer.push(call),
            Err(ControlPlaneError::InvalidTaskSpec(_))
        ));

        let plain = TaskSpecBuilder::for_child(f.ctx.job_id(), f.ctx.next_child(f.tracker.allocator()))
            .function_descriptor(["f"])
            .build()
            .unwrap();
        assert!(sequencer.push(plain).is_err());
    }

    #[test]
    fn test_stale_discard_leaves_no_buffer_entry() {
        let f = Fixture::new();
        let first = f.call(f.root);

        let mut sequencer = ActorSequencer::new(f.actor_id, f.root);
        assert_eq!(sequencer.push(first.clone()).unwrap().len(), 1);
        assert!(sequencer.push(first).unwrap().is_empty());
        assert_eq!(sequencer.buffered_handles(), 0);
        assert_eq!(sequencer.pending(), 0);
    }

    #[test]
    fn test_unannounced_handle_buffer_is_capped() {
        let f = Fixture::new();
        let forked = f.tracker.fork(f.root).unwrap();
        let announcing = f.call(f.root);
        let calls: Vec<TaskSpec> = (0..3).map(|_| f.call(forked)).collect();

        let mut sequencer = ActorSequencer::new(f.actor_id, f.root).with_unannounced_limit(2);
        assert!(sequencer.push(calls[0].clone()).unwrap().is_empty());
        assert!(sequencer.push(calls[1].clone()).unwrap().is_empty());
        let err = sequencer.push(calls[2].clone()).unwrap_err();
        assert!(matches!(
            err,
            ControlPlaneError::StaleHandle { handle_id, .. } if handle_id == forked
        ));
        assert_eq!(sequencer.pending(), 2);

        let released: Vec<_> = sequencer.push(announcing).unwrap().iter().map(position).collect();
        assert_eq!(released, vec![(f.root, 0), (forked, 0), (forked, 1)]);

        // known handles are not capped; the rejected call can be redelivered
        let released: Vec<_> = sequencer.push(calls[2].clone()).unwrap().iter().map(position).collect();
        assert_eq!(released, vec![(forked, 2)]);
        assert_eq!(sequencer.buffered_handles(), 0);
    }
}
