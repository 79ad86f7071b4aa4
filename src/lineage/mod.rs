//! # Actor Handle Lineage
//!
//! Submission-side counter and fork bookkeeping ([`ActorLineageTracker`]) and
//! receiver-side ordering of the resulting calls ([`ActorSequencer`]).

pub mod sequencer;
pub mod tracker;

pub use sequencer::ActorSequencer;
pub use tracker::{
    ActorLineageTracker, ActorSubmission, ChildTask, HandleOrigin, ReconstructionDecision,
    SubmitterContext,
};
