//! # Models
//!
//! Plain data types of the control plane: identifiers, arguments, resource
//! vectors, task specifications and profiling records.

pub mod arg;
pub mod ids;
pub mod profile;
pub mod resources;
pub mod task_spec;

pub use arg::TaskArg;
pub use ids::{
    ActorCreationId, ActorHandleId, ActorId, JobId, ObjectId, ObjectKind, TaskId,
};
pub use profile::{ComponentKey, ProfileBatch, ProfileEvent};
pub use resources::{ResourcePair, ResourceSet};
pub use task_spec::{ActorCreationSpec, ActorTaskSpec, FunctionDescriptor, TaskKind, TaskSpec};
