use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use taskspec_core::config::LineageConfig;
use taskspec_core::events::{ProfileSink, ProfileSinkError};
use taskspec_core::lineage::{ActorLineageTracker, SubmitterContext};
use taskspec_core::models::{ProfileBatch, TaskSpec};
use taskspec_core::orchestration::{TaskSink, TaskSpecBuilder, TaskSubmitter};
use taskspec_core::{ControlPlaneError, IdentityAllocator, Result};

/// Sink that keeps every spec it receives
#[derive(Debug, Default)]
pub struct RecordingTaskSink {
    specs: Mutex<Vec<TaskSpec>>,
}

impl RecordingTaskSink {
    pub fn specs(&self) -> Vec<TaskSpec> {
        self.specs.lock().clone()
    }
}

#[async_trait]
impl TaskSink for RecordingTaskSink {
    async fn submit(&self, spec: &TaskSpec) -> Result<()> {
        self.specs.lock().push(spec.clone());
        Ok(())
    }
}

/// Profile sink that can be switched into a failing state
#[derive(Debug, Default)]
pub struct SwitchableProfileSink {
    failing: AtomicBool,
    batches: Mutex<Vec<ProfileBatch>>,
}

impl SwitchableProfileSink {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    pub fn batches(&self) -> Vec<ProfileBatch> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl ProfileSink for SwitchableProfileSink {
    async fn write(&self, batch: &ProfileBatch) -> std::result::Result<(), ProfileSinkError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(ProfileSinkError::Unavailable("profile table offline".into()));
        }
        self.batches.lock().push(batch.clone());
        Ok(())
    }
}

/// A driver with a submitter wired to a recording sink
pub struct Driver {
    pub ctx: SubmitterContext,
    pub submitter: TaskSubmitter,
    pub sink: Arc<RecordingTaskSink>,
}

impl Driver {
    pub fn new() -> Self {
        Self::with_lineage(&LineageConfig::default())
    }

    pub fn with_lineage(lineage: &LineageConfig) -> Self {
        let allocator = Arc::new(IdentityAllocator::default());
        let job = allocator.mint_job_id();
        let ctx = SubmitterContext::for_driver(&allocator, job);
        let tracker = Arc::new(ActorLineageTracker::new(allocator));
        let sink = Arc::new(RecordingTaskSink::default());
        let submitter = TaskSubmitter::new(tracker, Arc::clone(&sink) as Arc<dyn TaskSink>, lineage);
        Self {
            ctx,
            submitter,
            sink,
        }
    }

    pub fn tracker(&self) -> &Arc<ActorLineageTracker> {
        self.submitter.tracker()
    }
}

pub fn call(parts: &[&str]) -> TaskSpecBuilder {
    TaskSpecBuilder::new().function_descriptor(parts.iter().copied())
}

pub fn is_stale(result: &Result<TaskSpec>) -> bool {
    matches!(result, Err(ControlPlaneError::StaleHandle { .. }))
}
