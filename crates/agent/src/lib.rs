//! Prompt assembly and turn routing for Roost agents.
//!
//! - [`prompt::PromptAssembler`] turns identity + memory + tasks into the
//!   model-facing system prompt, without ever failing the caller.
//! - [`router::RuntimeRouter`] routes each conversation turn between the
//!   tool-augmented runtime and the legacy chat path with a fail-safe
//!   fallback.
//! - [`events`] renders routed turns into the streaming wire protocol.

pub mod events;
pub mod prompt;
pub mod router;

pub use prompt::PromptAssembler;
pub use router::{ProfileCapabilityProbe, RuntimeRouter};
