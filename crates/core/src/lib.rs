//! # Roost Core
//!
//! Domain types, traits, and error definitions for the Roost agent platform.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod memory;
pub mod profile;
pub mod task;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use memory::{MemoryDraft, MemoryFilter, MemoryRanker, MemoryRecord, MemoryStore};
pub use profile::{AgentProfile, ProfileSource};
pub use task::{TaskRef, TaskSource, TaskStatus};
pub use turn::{
    CapabilityProbe, RouteDecision, TurnEvent, TurnOutcome, TurnRequest, TurnStrategy,
};
