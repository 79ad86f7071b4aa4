//! # Profiling Events
//!
//! Per-component batching of profiling events and their periodic delivery to
//! the profile table.

pub mod flusher;
pub mod profile_batcher;

pub use flusher::ProfileFlusher;
pub use profile_batcher::{
    DeliveryReport, ProfileEventBatcher, ProfileSink, ProfileSinkError, ProfileSpan,
};
