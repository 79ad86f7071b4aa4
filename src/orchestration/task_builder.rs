//! # Task Specification Assembler
//!
//! Collects the fields of a task record and turns them into a validated
//! [`TaskSpec`] in one step.
//!
//! ## Overview
//!
//! Every field is optional on the builder, mirroring the flat record layout.
//! [`TaskSpecBuilder::build`] checks the assembly rules in a fixed order and
//! reports the first violation; nothing is constructed unless every rule
//! holds. [`TaskSpecBuilder::build_with_lineage`] additionally drains the
//! pending forks of the submitting handle into `new_actor_handles`, after all
//! validation has passed.
//!
//! ## Usage
//!
//! ```rust
//! use taskspec_core::identity::IdentityAllocator;
//! use taskspec_core::lineage::SubmitterContext;
//! use taskspec_core::orchestration::TaskSpecBuilder;
//!
//! # fn main() -> taskspec_core::Result<()> {
//! let allocator = IdentityAllocator::default();
//! let job = allocator.mint_job_id();
//! let ctx = SubmitterContext::for_driver(&allocator, job);
//!
//! let spec = TaskSpecBuilder::for_child(job, ctx.next_child(&allocator))
//!     .function_descriptor(["my_module", "my_function"])
//!     .resource("CPU", 1.0)?
//!     .build()?;
//!
//! assert_eq!(spec.required_placement_resources(), spec.required_resources());
//! # Ok(())
//! # }
//! ```

use crate::constants::{profile_events, Language};
use crate::error::{ControlPlaneError, Result};
use crate::lineage::{ActorLineageTracker, ActorSubmission, ChildTask};
use crate::models::{
    ActorCreationId, ActorCreationSpec, ActorHandleId, ActorId, ActorTaskSpec, FunctionDescriptor,
    JobId, ObjectId, ResourcePair, ResourceSet, TaskArg, TaskId, TaskKind, TaskSpec,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TaskSpecBuilder {
    job_id: Option<JobId>,
    task_id: Option<TaskId>,
    parent_task_id: Option<TaskId>,
    parent_counter: u64,
    actor_creation_id: Option<ActorCreationId>,
    actor_creation_dummy_object_id: Option<ObjectId>,
    max_actor_reconstructions: u32,
    actor_id: Option<ActorId>,
    actor_handle_id: Option<ActorHandleId>,
    actor_counter: Option<u64>,
    new_actor_handles: Vec<ActorHandleId>,
    args: Vec<TaskArg>,
    num_returns: i64,
    required_resources: Vec<ResourcePair>,
    required_placement_resources: Vec<ResourcePair>,
    language: Language,
    function_descriptor: Vec<String>,
    dynamic_worker_options: Vec<String>,
}

impl Default for TaskSpecBuilder {
    fn default() -> Self {
        Self {
            job_id: None,
            task_id: None,
            parent_task_id: None,
            parent_counter: 0,
            actor_creation_id: None,
            actor_creation_dummy_object_id: None,
            max_actor_reconstructions: 0,
            actor_id: None,
            actor_handle_id: None,
            actor_counter: None,
            new_actor_handles: Vec::new(),
            args: Vec::new(),
            num_returns: 1,
            required_resources: Vec::new(),
            required_placement_resources: Vec::new(),
            language: Language::Python,
            function_descriptor: Vec::new(),
            dynamic_worker_options: Vec::new(),
        }
    }
}

impl TaskSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with the lineage of a child task filled in
    pub fn for_child(job_id: JobId, child: ChildTask) -> Self {
        Self::new().with_child(job_id, child)
    }

    /// Builder for the method call assigned by `submission`
    pub fn for_actor_submission(submission: &ActorSubmission) -> Self {
        Self::new().with_actor_submission(submission)
    }

    pub fn with_child(self, job_id: JobId, child: ChildTask) -> Self {
        self.job_id(job_id)
            .task_id(child.task_id)
            .parent(child.parent_task_id, child.parent_counter)
    }

    pub fn with_actor_submission(self, submission: &ActorSubmission) -> Self {
        self.with_child(submission.job_id, submission.task)
            .actor_id(submission.actor_id)
            .actor_handle_id(submission.actor_handle_id)
            .actor_counter(submission.actor_counter)
    }

    pub fn job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn parent(mut self, parent_task_id: TaskId, parent_counter: u64) -> Self {
        self.parent_task_id = Some(parent_task_id);
        self.parent_counter = parent_counter;
        self
    }

    pub fn actor_creation_id(mut self, actor_creation_id: ActorCreationId) -> Self {
        self.actor_creation_id = Some(actor_creation_id);
        self
    }

    /// Defaults to [`ObjectId::dummy_for`] the task id when not set
    pub fn actor_creation_dummy_object_id(mut self, object_id: ObjectId) -> Self {
        self.actor_creation_dummy_object_id = Some(object_id);
        self
    }

    pub fn max_actor_reconstructions(mut self, max: u32) -> Self {
        self.max_actor_reconstructions = max;
        self
    }

    pub fn actor_id(mut self, actor_id: ActorId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn actor_handle_id(mut self, handle_id: ActorHandleId) -> Self {
        self.actor_handle_id = Some(handle_id);
        self
    }

    pub fn actor_counter(mut self, counter: u64) -> Self {
        self.actor_counter = Some(counter);
        self
    }

    pub fn new_actor_handles(mut self, handles: Vec<ActorHandleId>) -> Self {
        self.new_actor_handles = handles;
        self
    }

    pub fn arg(mut self, arg: TaskArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn args(mut self, args: Vec<TaskArg>) -> Self {
        self.args = args;
        self
    }

    pub fn num_returns(mut self, num_returns: i64) -> Self {
        self.num_returns = num_returns;
        self
    }

    /// Add one execution requirement; quantities are checked immediately,
    /// duplicate keys at build time
    pub fn resource(mut self, key: impl Into<String>, value: f64) -> Result<Self> {
        let pair = ResourcePair::new(key, value);
        check_quantity(&pair)?;
        self.required_resources.push(pair);
        Ok(self)
    }

    pub fn required_resources(mut self, resources: &ResourceSet) -> Self {
        self.required_resources = resources.to_pairs();
        self
    }

    pub fn required_resource_pairs(mut self, pairs: Vec<ResourcePair>) -> Self {
        self.required_resources = pairs;
        self
    }

    pub fn placement_resource(mut self, key: impl Into<String>, value: f64) -> Result<Self> {
        let pair = ResourcePair::new(key, value);
        check_quantity(&pair)?;
        self.required_placement_resources.push(pair);
        Ok(self)
    }

    pub fn required_placement_resources(mut self, resources: &ResourceSet) -> Self {
        self.required_placement_resources = resources.to_pairs();
        self
    }

    pub fn required_placement_resource_pairs(mut self, pairs: Vec<ResourcePair>) -> Self {
        self.required_placement_resources = pairs;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn function_descriptor<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.function_descriptor = parts.into_iter().map(Into::into).collect();
        self
    }

    pub fn dynamic_worker_options(mut self, options: Vec<String>) -> Self {
        self.dynamic_worker_options = options;
        self
    }

    /// Validate and assemble the spec
    pub fn build(self) -> Result<TaskSpec> {
        let job_id = self
            .job_id
            .ok_or_else(|| ControlPlaneError::invalid_spec("job_id is required"))?;
        let task_id = self
            .task_id
            .ok_or_else(|| ControlPlaneError::invalid_spec("task_id is required"))?;
        let parent_task_id = self
            .parent_task_id
            .ok_or_else(|| ControlPlaneError::invalid_spec("parent_task_id is required"))?;

        let has_creation_fields =
            self.actor_creation_id.is_some() || self.actor_creation_dummy_object_id.is_some();
        let has_invocation_fields = self.actor_id.is_some()
            || self.actor_handle_id.is_some()
            || self.actor_counter.is_some()
            || !self.new_actor_handles.is_empty();
        if has_creation_fields && has_invocation_fields {
            return Err(ControlPlaneError::invalid_spec(
                "actor-creation and actor-invocation fields are mutually exclusive",
            ));
        }

        if self.max_actor_reconstructions > 0 && !has_creation_fields {
            return Err(ControlPlaneError::invalid_spec(
                "max_actor_reconstructions is only valid on actor-creation tasks",
            ));
        }

        let function_descriptor = FunctionDescriptor::new(self.function_descriptor)?;

        let num_returns = u64::try_from(self.num_returns).map_err(|_| {
            ControlPlaneError::invalid_spec(format!(
                "num_returns must be non-negative, got {}",
                self.num_returns
            ))
        })?;

        if !self.dynamic_worker_options.is_empty() && !has_creation_fields {
            return Err(ControlPlaneError::invalid_spec(
                "dynamic_worker_options are only valid on actor-creation tasks",
            ));
        }

        let kind = if has_creation_fields {
            let actor_creation_id = self.actor_creation_id.ok_or_else(|| {
                ControlPlaneError::invalid_spec("actor-creation task is missing actor_creation_id")
            })?;
            let dummy = self
                .actor_creation_dummy_object_id
                .unwrap_or_else(|| ObjectId::dummy_for(task_id));
            if !dummy.is_dummy() {
                return Err(ControlPlaneError::invalid_spec(
                    "actor_creation_dummy_object_id must be a dummy object",
                ));
            }
            TaskKind::ActorCreation(ActorCreationSpec {
                actor_creation_id,
                actor_creation_dummy_object_id: dummy,
                max_actor_reconstructions: self.max_actor_reconstructions,
                dynamic_worker_options: self.dynamic_worker_options,
            })
        } else if has_invocation_fields {
            let (Some(actor_id), Some(actor_handle_id), Some(actor_counter)) =
                (self.actor_id, self.actor_handle_id, self.actor_counter)
            else {
                return Err(ControlPlaneError::invalid_spec(
                    "actor task needs actor_id, actor_handle_id and actor_counter",
                ));
            };
            TaskKind::ActorTask(ActorTaskSpec {
                actor_id,
                actor_handle_id,
                actor_counter,
                new_actor_handles: self.new_actor_handles,
            })
        } else {
            TaskKind::Normal
        };

        for arg in &self.args {
            arg.validate()?;
        }

        let required_resources = ResourceSet::try_from(self.required_resources)?;
        let placement = ResourceSet::try_from(self.required_placement_resources)?;
        let required_placement_resources = if placement.is_empty() {
            required_resources.clone()
        } else {
            placement
        };

        debug!(
            event = profile_events::TASK_ASSEMBLE,
            task_id = %task_id,
            kind = kind.name(),
            function = %function_descriptor,
            "Task spec assembled"
        );

        Ok(TaskSpec {
            job_id,
            task_id,
            parent_task_id,
            parent_counter: self.parent_counter,
            kind,
            args: self.args,
            num_returns,
            required_resources,
            required_placement_resources,
            language: self.language,
            function_descriptor,
        })
    }

    /// As [`build`](Self::build), then attach the forks pending on the
    /// submitting handle. The tracker is only touched once the spec is valid.
    pub fn build_with_lineage(self, tracker: &ActorLineageTracker) -> Result<TaskSpec> {
        let mut spec = self.build()?;
        if let TaskKind::ActorTask(invocation) = &mut spec.kind {
            match tracker.actor_of(invocation.actor_handle_id) {
                Some(actor_id) if actor_id == invocation.actor_id => {}
                Some(actor_id) => {
                    return Err(ControlPlaneError::invalid_spec(format!(
                        "handle {} belongs to actor {actor_id}, not {}",
                        invocation.actor_handle_id, invocation.actor_id
                    )));
                }
                None => {
                    return Err(ControlPlaneError::stale_handle(
                        invocation.actor_handle_id,
                        Some(invocation.actor_id),
                        "unknown actor handle",
                    ));
                }
            }
            let announced = tracker.announce(invocation.actor_handle_id)?;
            invocation.new_actor_handles.extend(announced);
        }
        Ok(spec)
    }
}

fn check_quantity(pair: &ResourcePair) -> Result<()> {
    if !pair.value.is_finite() || pair.value < 0.0 {
        return Err(ControlPlaneError::NegativeResourceQuantity {
            key: pair.key.clone(),
            value: pair.value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::resources::{CPU, GPU};
    use crate::identity::IdentityAllocator;
    use crate::lineage::SubmitterContext;
    use std::sync::Arc;

    fn plain() -> TaskSpecBuilder {
        let allocator = IdentityAllocator::default();
        let job = allocator.mint_job_id();
        let ctx = SubmitterContext::for_driver(&allocator, job);
        TaskSpecBuilder::for_child(job, ctx.next_child(&allocator)).function_descriptor(["f"])
    }

    #[test]
    fn test_plain_task() {
        let spec = plain().resource(CPU, 2.0).unwrap().build().unwrap();
        assert_eq!(spec.kind(), &TaskKind::Normal);
        assert_eq!(spec.num_returns(), 1);
        assert_eq!(spec.required_placement_resources().get(CPU), 2.0);
    }

    #[test]
    fn test_explicit_placement_kept() {
        let spec = plain()
            .resource(CPU, 2.0)
            .unwrap()
            .placement_resource(GPU, 1.0)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(spec.required_placement_resources().get(CPU), 0.0);
        assert_eq!(spec.required_placement_resources().get(GPU), 1.0);
    }

    #[test]
    fn test_creation_and_invocation_fields_conflict() {
        let err = plain()
            .actor_creation_id(ActorCreationId::nil())
            .actor_id(ActorId::nil())
            .build()
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::InvalidTaskSpec(msg) if msg.contains("mutually exclusive")));
    }

    #[test]
    fn test_empty_function_descriptor() {
        let err = plain().function_descriptor(Vec::<String>::new()).build().unwrap_err();
        assert!(matches!(err, ControlPlaneError::InvalidTaskSpec(msg) if msg.contains("function descriptor")));
    }

    #[test]
    fn test_negative_num_returns() {
        let err = plain().num_returns(-1).build().unwrap_err();
        assert!(matches!(err, ControlPlaneError::InvalidTaskSpec(msg) if msg.contains("num_returns")));
    }

    #[test]
    fn test_worker_options_only_on_creation() {
        let err = plain()
            .dynamic_worker_options(vec!["-Xmx1g".into()])
            .build()
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::InvalidTaskSpec(msg) if msg.contains("dynamic_worker_options")));

        let spec = plain()
            .actor_creation_id(ActorCreationId::nil())
            .dynamic_worker_options(vec!["-Xmx1g".into()])
            .build()
            .unwrap();
        let creation = spec.actor_creation().unwrap();
        assert_eq!(creation.dynamic_worker_options, vec!["-Xmx1g".to_string()]);
        assert_eq!(
            creation.actor_creation_dummy_object_id,
            ObjectId::dummy_for(spec.task_id())
        );
    }

    #[test]
    fn test_incomplete_invocation() {
        let err = plain().actor_id(ActorId::nil()).build().unwrap_err();
        assert!(matches!(err, ControlPlaneError::InvalidTaskSpec(_)));
    }

    #[test]
    fn test_nil_actor_id_is_an_actor_task() {
        let spec = plain()
            .actor_id(ActorId::nil())
            .actor_handle_id(ActorHandleId::nil())
            .actor_counter(0)
            .build()
            .unwrap();
        assert!(spec.is_actor_task());
    }

    #[test]
    fn test_duplicate_resource_key() {
        let err = plain()
            .resource(CPU, 1.0)
            .unwrap()
            .resource(CPU, 1.0)
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err, ControlPlaneError::DuplicateResourceKey { key: CPU.into() });
    }

    #[test]
    fn test_lineage_not_touched_on_invalid_spec() {
        let allocator = Arc::new(IdentityAllocator::default());
        let job = allocator.mint_job_id();
        let ids = allocator.mint_actor(job).unwrap();
        let tracker = ActorLineageTracker::new(Arc::clone(&allocator));
        let creation = ActorCreationSpec {
            actor_creation_id: ids.actor_creation_id,
            actor_creation_dummy_object_id: ObjectId::dummy_for(TaskId::nil()),
            max_actor_reconstructions: 0,
            dynamic_worker_options: vec![],
        };
        let root = tracker.register_actor(&creation, job);
        let forked = tracker.fork(root).unwrap();
        let ctx = SubmitterContext::for_driver(&allocator, job);

        let submission = tracker.submit(root, &ctx).unwrap();
        let invalid = TaskSpecBuilder::for_actor_submission(&submission).build_with_lineage(&tracker);
        assert!(invalid.is_err());

        let spec = TaskSpecBuilder::for_actor_submission(&submission)
            .function_descriptor(["Counter", "increment"])
            .build_with_lineage(&tracker)
            .unwrap();
        assert_eq!(spec.actor_task().unwrap().new_actor_handles, vec![forked]);
    }
}
