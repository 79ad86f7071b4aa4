//! # Control-Plane Bootstrap
//!
//! Wires the allocator, lineage tracker, submitter and profiling pipeline
//! from one [`ControlPlaneConfig`].
//!
//! ## Key Features
//!
//! - **Logging**: Installs the structured subscriber from `logging` settings
//! - **Profiling**: Spawns a [`ProfileFlusher`] when profiling is enabled and a sink is given
//! - **Graceful Shutdown**: [`ControlPlaneHandle::shutdown`] delivers buffered profile events

use crate::config::ControlPlaneConfig;
use crate::error::Result;
use crate::events::{DeliveryReport, ProfileEventBatcher, ProfileFlusher, ProfileSink};
use crate::identity::IdentityAllocator;
use crate::lineage::{ActorLineageTracker, SubmitterContext};
use crate::logging::{get_environment, init_structured_logging};
use crate::models::{ComponentKey, JobId};
use crate::orchestration::submitter::{TaskSink, TaskSubmitter};
use std::sync::Arc;
use tracing::info;

/// Running control plane of one process
#[derive(Debug)]
pub struct ControlPlaneHandle {
    pub config: ControlPlaneConfig,
    pub allocator: Arc<IdentityAllocator>,
    pub tracker: Arc<ActorLineageTracker>,
    pub submitter: TaskSubmitter,
    pub batcher: Arc<ProfileEventBatcher>,
    flusher: Option<ProfileFlusher>,
}

impl ControlPlaneHandle {
    /// Build the control plane; must be called within a tokio runtime when
    /// profiling is enabled and `profile_sink` is set.
    pub fn bootstrap(
        config: ControlPlaneConfig,
        task_sink: Arc<dyn TaskSink>,
        profile_sink: Option<Arc<dyn ProfileSink>>,
        component: ComponentKey,
    ) -> Result<Self> {
        config.validate()?;
        init_structured_logging(&config.logging);

        let allocator = Arc::new(IdentityAllocator::new(&config.identity));
        let tracker = Arc::new(ActorLineageTracker::new(Arc::clone(&allocator)));
        let batcher = Arc::new(ProfileEventBatcher::new());

        let mut submitter = TaskSubmitter::new(Arc::clone(&tracker), task_sink, &config.lineage);
        let flusher = match profile_sink {
            Some(sink) if config.profiling.enabled => {
                submitter = submitter.with_profiler(Arc::clone(&batcher), component.clone());
                Some(ProfileFlusher::spawn(
                    Arc::clone(&batcher),
                    sink,
                    config.profiling.flush_interval(),
                ))
            }
            _ => None,
        };

        info!(
            environment = %get_environment(),
            component = %component,
            profiling = flusher.is_some(),
            "🚀 Control plane bootstrapped"
        );

        Ok(Self {
            config,
            allocator,
            tracker,
            submitter,
            batcher,
            flusher,
        })
    }

    /// Submission context for a new driver job
    pub fn start_driver(&self) -> (JobId, SubmitterContext) {
        let job_id = self.allocator.mint_job_id();
        let ctx = SubmitterContext::for_driver(&self.allocator, job_id);
        (job_id, ctx)
    }

    /// Drop the control state of a finished job: its actors' lineage and its
    /// actor mint record. Returns the number of actors released.
    pub fn release_job(&self, job_id: JobId) -> usize {
        let released = self.tracker.release_job(job_id);
        self.allocator.release_job(job_id);
        released
    }

    pub fn is_profiling(&self) -> bool {
        self.flusher.is_some()
    }

    /// Stop background work; returns the final profile delivery, if any
    pub async fn shutdown(self) -> Option<DeliveryReport> {
        let report = match self.flusher {
            Some(flusher) => Some(flusher.shutdown().await),
            None => None,
        };
        info!("🛑 Control plane shut down");
        report
    }
}
