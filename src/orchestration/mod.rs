//! # Task Orchestration
//!
//! Submission-side assembly of task specifications.
//!
//! ## Core Components
//!
//! - **TaskSpecBuilder**: Validated, all-or-nothing assembly of a [`TaskSpec`](crate::models::TaskSpec)
//! - **TaskSubmitter**: Fills in lineage, assembles and hands specs to a [`TaskSink`]
//! - **ControlPlaneHandle**: Bootstraps the pieces above from one configuration
//! - **worker_options**: Renders dynamic worker options into a worker start command

pub mod bootstrap;
pub mod submitter;
pub mod task_builder;
pub mod worker_options;

pub use bootstrap::ControlPlaneHandle;
pub use submitter::{CreatedActor, TaskSink, TaskSubmitter};
pub use task_builder::TaskSpecBuilder;
pub use worker_options::{render_for_spec, render_worker_command};
