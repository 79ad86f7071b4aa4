#![allow(clippy::doc_markdown)] // Allow technical terms like UUID, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # TaskSpec Core
//!
//! Task identity and actor-handle lineage for a distributed, actor-capable
//! task execution system.
//!
//! ## Overview
//!
//! Every unit of work, whether a plain task, the creation of an actor or a
//! method call on one, is described by a [`TaskSpec`]. This crate owns the
//! parts of the control plane where ordering and identity bugs live:
//!
//! - **Identity**: task ids derived from their lineage, actor ids minted
//!   collision-free per job
//! - **Actor lineage**: per-handle submission counters, handle forking with
//!   exactly-once announcement, and the reconstruction budget
//! - **Assembly**: all-or-nothing validation of task records into the
//!   three-variant [`TaskKind`]
//! - **Resources**: validated resource vectors and capacity matching
//! - **Arguments**: asynchronous, cancellable resolution against an object store
//! - **Profiling**: lock-free event batching decoupled from the submission path
//!
//! ## Module Organization
//!
//! - [`identity`] - Identifier minting and derivation
//! - [`lineage`] - Actor handle counters, forks and receiver-side sequencing
//! - [`orchestration`] - Task spec assembly and submission
//! - [`resolver`] - Argument resolution
//! - [`events`] - Profile event batching and delivery
//! - [`models`] - Identifiers, arguments, resources and task specs
//! - [`wire`] - Serializable record layout
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use taskspec_core::identity::IdentityAllocator;
//! use taskspec_core::lineage::{ActorLineageTracker, SubmitterContext};
//! use taskspec_core::orchestration::TaskSpecBuilder;
//!
//! # fn main() -> taskspec_core::Result<()> {
//! let allocator = Arc::new(IdentityAllocator::default());
//! let job = allocator.mint_job_id();
//! let ctx = SubmitterContext::for_driver(&allocator, job);
//! let tracker = ActorLineageTracker::new(Arc::clone(&allocator));
//!
//! // Create an actor and call it through its root handle
//! let ids = allocator.mint_actor(job)?;
//! let creation = TaskSpecBuilder::for_child(job, ctx.next_child(&allocator))
//!     .actor_creation_id(ids.actor_creation_id)
//!     .function_descriptor(["counters", "Counter"])
//!     .build()?;
//! let root = tracker.register_actor(creation.actor_creation().unwrap(), job);
//!
//! let submission = tracker.submit(root, &ctx)?;
//! let call = TaskSpecBuilder::for_actor_submission(&submission)
//!     .function_descriptor(["counters", "Counter", "increment"])
//!     .build_with_lineage(&tracker)?;
//! assert_eq!(call.actor_task().unwrap().actor_counter, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod identity;
pub mod lineage;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod resolver;
pub mod wire;

pub use config::{ConfigLoader, ControlPlaneConfig};
pub use constants::Language;
pub use error::{ControlPlaneError, ErrorClass, Result};
pub use events::{ProfileEventBatcher, ProfileFlusher, ProfileSink};
pub use identity::IdentityAllocator;
pub use lineage::{ActorLineageTracker, ActorSequencer, SubmitterContext};
pub use models::{
    ActorCreationId, ActorHandleId, ActorId, JobId, ObjectId, ResourceSet, TaskArg, TaskId,
    TaskKind, TaskSpec,
};
pub use orchestration::{TaskSink, TaskSpecBuilder, TaskSubmitter};
pub use resolver::{ArgumentResolver, InMemoryObjectStore, ObjectStore};
