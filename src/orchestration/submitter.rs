//! # Task Submitter
//!
//! Ties identity, lineage and assembly together and hands finished specs to
//! a [`TaskSink`].
//!
//! ## Overview
//!
//! Callers describe a call with a [`TaskSpecBuilder`] template carrying only
//! the call itself (function, arguments, resources). The submitter fills in
//! the lineage fields, assembles the spec and passes it on.
//!
//! Actor calls are split in two phases. [`TaskSubmitter::prepare_actor_task`]
//! consumes a counter of the handle and returns the assembled spec;
//! [`TaskSubmitter::dispatch`] hands it to the sink. The template is fully
//! validated before the counter is taken, because a consumed counter that
//! never reaches the actor stalls every later call on that handle.

use crate::config::LineageConfig;
use crate::constants::profile_events;
use crate::error::{ControlPlaneError, Result};
use crate::events::{ProfileEventBatcher, ProfileSpan};
use crate::identity::IdentityAllocator;
use crate::lineage::{ActorLineageTracker, SubmitterContext};
use crate::logging::log_task_operation;
use crate::models::{ActorHandleId, ComponentKey, TaskId, TaskSpec};
use crate::orchestration::task_builder::TaskSpecBuilder;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// Receives assembled specs, typically the scheduler or the control store.
///
/// Implementations report failures as [`ControlPlaneError::Sink`].
#[async_trait]
pub trait TaskSink: Send + Sync {
    async fn submit(&self, spec: &TaskSpec) -> Result<()>;
}

/// A created actor: its creation task and the root handle to call it through
#[derive(Debug, Clone)]
pub struct CreatedActor {
    pub spec: TaskSpec,
    pub root_handle: ActorHandleId,
}

pub struct TaskSubmitter {
    tracker: Arc<ActorLineageTracker>,
    sink: Arc<dyn TaskSink>,
    lineage: LineageConfig,
    profiler: Option<(Arc<ProfileEventBatcher>, ComponentKey)>,
}

impl std::fmt::Debug for TaskSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSubmitter")
            .field("lineage", &self.lineage)
            .field("profiling", &self.profiler.as_ref().map(|(_, key)| key))
            .finish()
    }
}

impl TaskSubmitter {
    pub fn new(
        tracker: Arc<ActorLineageTracker>,
        sink: Arc<dyn TaskSink>,
        lineage: &LineageConfig,
    ) -> Self {
        Self {
            tracker,
            sink,
            lineage: lineage.clone(),
            profiler: None,
        }
    }

    /// Record submission timings under `component`
    pub fn with_profiler(mut self, batcher: Arc<ProfileEventBatcher>, component: ComponentKey) -> Self {
        self.profiler = Some((batcher, component));
        self
    }

    pub fn tracker(&self) -> &Arc<ActorLineageTracker> {
        &self.tracker
    }

    pub fn allocator(&self) -> &Arc<IdentityAllocator> {
        self.tracker.allocator()
    }

    /// Submit a normal task as the next child of `ctx`
    pub async fn submit_task(&self, ctx: &SubmitterContext, call: TaskSpecBuilder) -> Result<TaskSpec> {
        let _span = self.span(profile_events::TASK_SUBMIT);
        let child = ctx.next_child(self.allocator());
        let spec = call.with_child(ctx.job_id(), child).build()?;
        self.dispatch(&spec).await?;
        Ok(spec)
    }

    /// Submit the creation task of a new actor and register its lineage.
    ///
    /// `max_actor_reconstructions` falls back to the configured default.
    pub async fn create_actor(
        &self,
        ctx: &SubmitterContext,
        call: TaskSpecBuilder,
        max_actor_reconstructions: Option<u32>,
    ) -> Result<CreatedActor> {
        let _span = self.span(profile_events::TASK_SUBMIT);
        let ids = self.allocator().mint_actor(ctx.job_id())?;
        let child = ctx.next_child(self.allocator());
        let spec = call
            .with_child(ctx.job_id(), child)
            .actor_creation_id(ids.actor_creation_id)
            .max_actor_reconstructions(
                max_actor_reconstructions.unwrap_or(self.lineage.default_max_actor_reconstructions),
            )
            .build()?;
        let creation = spec
            .actor_creation()
            .ok_or_else(|| ControlPlaneError::invalid_spec("creation fields were not applied"))?;

        self.dispatch(&spec).await?;
        let root_handle = self.tracker.register_actor(creation, ctx.job_id());
        Ok(CreatedActor { spec, root_handle })
    }

    /// Assign the next counter of `handle` and assemble the call
    pub fn prepare_actor_task(
        &self,
        handle: ActorHandleId,
        ctx: &SubmitterContext,
        call: TaskSpecBuilder,
    ) -> Result<TaskSpec> {
        let actor_id = self.tracker.actor_of(handle).ok_or_else(|| {
            ControlPlaneError::stale_handle(handle, None, "unknown actor handle")
        })?;

        // Dry run with placeholder lineage; only lineage differs from the real build.
        call.clone()
            .job_id(ctx.job_id())
            .task_id(TaskId::nil())
            .parent(ctx.current_task_id(), 0)
            .actor_id(actor_id)
            .actor_handle_id(handle)
            .actor_counter(0)
            .build()?;

        let submission = self.tracker.submit(handle, ctx)?;
        call.with_actor_submission(&submission)
            .build_with_lineage(&self.tracker)
    }

    /// Hand an assembled spec to the sink
    pub async fn dispatch(&self, spec: &TaskSpec) -> Result<()> {
        if let Err(e) = self.sink.submit(spec).await {
            if let Some(invocation) = spec.actor_task() {
                error!(
                    task_id = %spec.task_id(),
                    actor_id = %invocation.actor_id,
                    handle_id = %invocation.actor_handle_id,
                    actor_counter = invocation.actor_counter,
                    error = %e,
                    "Actor call was assigned a counter but could not be dispatched"
                );
            }
            return Err(e);
        }
        log_task_operation("submit", spec.task_id(), spec.kind().name(), None);
        Ok(())
    }

    /// Submit one method call through `handle`
    pub async fn submit_actor_task(
        &self,
        handle: ActorHandleId,
        ctx: &SubmitterContext,
        call: TaskSpecBuilder,
    ) -> Result<TaskSpec> {
        let _span = self.span(profile_events::TASK_SUBMIT);
        let spec = self.prepare_actor_task(handle, ctx, call)?;
        self.dispatch(&spec).await?;
        Ok(spec)
    }

    /// Fork `handle` for passing to another worker
    pub fn fork_handle(&self, handle: ActorHandleId) -> Result<ActorHandleId> {
        let _span = self.span(profile_events::ACTOR_FORK);
        self.tracker.fork(handle)
    }

    fn span(&self, event_type: &str) -> Option<ProfileSpan<'_>> {
        self.profiler
            .as_ref()
            .map(|(batcher, component)| batcher.span(component, event_type))
    }
}
