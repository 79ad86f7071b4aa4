//! # Identity
//!
//! Identifier minting and derivation. See [`IdentityAllocator`].

pub mod allocator;

pub use allocator::{ActorIds, IdSource, IdentityAllocator, RandomIdSource};
