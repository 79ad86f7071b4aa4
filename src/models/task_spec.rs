//! # Task Specifications
//!
//! A [`TaskSpec`] fully describes one plain task, one actor-creation task or
//! one actor-method invocation. The three shapes share common fields and
//! differ in a [`TaskKind`] tag, so invalid field combinations cannot be
//! represented once a spec exists. Specs are produced by
//! [`TaskSpecBuilder`](crate::orchestration::TaskSpecBuilder), which enforces
//! every assembly rule.

use crate::constants::Language;
use crate::error::{ControlPlaneError, Result};
use crate::models::arg::TaskArg;
use crate::models::ids::{ActorCreationId, ActorHandleId, ActorId, JobId, ObjectId, TaskId};
use crate::models::resources::ResourceSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered, non-empty sequence of strings naming the callable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FunctionDescriptor(Vec<String>);

impl FunctionDescriptor {
    pub fn new<I, S>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() {
            return Err(ControlPlaneError::invalid_spec(
                "function descriptor must not be empty",
            ));
        }
        Ok(Self(parts))
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for FunctionDescriptor {
    type Error = ControlPlaneError;

    fn try_from(parts: Vec<String>) -> Result<Self> {
        Self::new(parts)
    }
}

impl From<FunctionDescriptor> for Vec<String> {
    fn from(descriptor: FunctionDescriptor) -> Self {
        descriptor.0
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Fields present only on actor-creation tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorCreationSpec {
    pub actor_creation_id: ActorCreationId,
    pub actor_creation_dummy_object_id: ObjectId,
    pub max_actor_reconstructions: u32,
    /// Substituted for `WORKER_OPTION_<n>` in the worker launch command
    pub dynamic_worker_options: Vec<String>,
}

impl ActorCreationSpec {
    pub fn actor_id(&self) -> ActorId {
        ActorId::from(self.actor_creation_id)
    }
}

/// Fields present only on actor-method invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorTaskSpec {
    pub actor_id: ActorId,
    pub actor_handle_id: ActorHandleId,
    pub actor_counter: u64,
    /// Handles forked from `actor_handle_id` since its previous submission
    pub new_actor_handles: Vec<ActorHandleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    Normal,
    ActorCreation(ActorCreationSpec),
    ActorTask(ActorTaskSpec),
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::ActorCreation(_) => "actor_creation",
            Self::ActorTask(_) => "actor_task",
        }
    }
}

/// Assembled, validated description of one task.
///
/// Deliberately not `Deserialize`: decoded records go through
/// [`TaskSpecRecord`](crate::wire::TaskSpecRecord) and the builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSpec {
    pub(crate) job_id: JobId,
    pub(crate) task_id: TaskId,
    pub(crate) parent_task_id: TaskId,
    pub(crate) parent_counter: u64,
    pub(crate) kind: TaskKind,
    pub(crate) args: Vec<TaskArg>,
    pub(crate) num_returns: u64,
    pub(crate) required_resources: ResourceSet,
    pub(crate) required_placement_resources: ResourceSet,
    pub(crate) language: Language,
    pub(crate) function_descriptor: FunctionDescriptor,
}

impl TaskSpec {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn parent_task_id(&self) -> TaskId {
        self.parent_task_id
    }

    pub fn parent_counter(&self) -> u64 {
        self.parent_counter
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn args(&self) -> &[TaskArg] {
        &self.args
    }

    pub fn num_returns(&self) -> u64 {
        self.num_returns
    }

    pub fn required_resources(&self) -> &ResourceSet {
        &self.required_resources
    }

    /// Effective placement requirement; already defaulted to
    /// [`required_resources`](Self::required_resources) when none was given.
    pub fn required_placement_resources(&self) -> &ResourceSet {
        &self.required_placement_resources
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn function_descriptor(&self) -> &FunctionDescriptor {
        &self.function_descriptor
    }

    pub fn actor_creation(&self) -> Option<&ActorCreationSpec> {
        match &self.kind {
            TaskKind::ActorCreation(creation) => Some(creation),
            _ => None,
        }
    }

    pub fn actor_task(&self) -> Option<&ActorTaskSpec> {
        match &self.kind {
            TaskKind::ActorTask(invocation) => Some(invocation),
            _ => None,
        }
    }

    pub fn is_actor_creation_task(&self) -> bool {
        self.actor_creation().is_some()
    }

    pub fn is_actor_task(&self) -> bool {
        self.actor_task().is_some()
    }

    /// Ids of the objects this task will produce, in return order
    pub fn return_ids(&self) -> Vec<ObjectId> {
        (0..self.num_returns)
            .map(|index| ObjectId::for_task_return(self.task_id, index))
            .collect()
    }

    /// Every object id the task depends on, in argument order
    pub fn dependencies(&self) -> Vec<ObjectId> {
        self.args
            .iter()
            .flat_map(|arg| arg.object_ids().iter().copied())
            .collect()
    }

    /// Whether `available` can host this task right now
    pub fn fits_execution(&self, available: &ResourceSet) -> bool {
        self.required_resources.matches(available)
    }

    /// Whether a node with `available` capacity may be chosen for placement
    pub fn fits_placement(&self, available: &ResourceSet) -> bool {
        self.required_placement_resources.matches(available)
    }
}
