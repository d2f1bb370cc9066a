//! Conversation turn contract — requests, strategies, routing, and the
//! wire events emitted to streaming clients.
//!
//! A turn enters the router, which picks between two executable
//! strategies: the tool-augmented runtime and the legacy chat path. Both
//! implement [`TurnStrategy`]; the router guarantees a fail-safe fallback
//! and re-evaluates capability on every turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ProfileError, TurnError};

/// A single conversation turn request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,

    /// Whether the caller wants incremental text chunks.
    #[serde(default)]
    pub stream: bool,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stream: false,
        }
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stream: true,
        }
    }
}

/// One tool call made while executing a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub input: serde_json::Value,
    pub result: serde_json::Value,
}

/// The final result of a strategy execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub response: String,
    pub iterations: u32,
    pub tool_calls: Vec<ToolInvocation>,
}

impl TurnOutcome {
    /// A plain text outcome with no tool activity.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            iterations: 1,
            tool_calls: Vec::new(),
        }
    }
}

/// Caller-supplied callback receiving incremental text chunks.
pub type ChunkSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Everything a strategy needs to execute one turn.
#[derive(Clone)]
pub struct TurnContext {
    pub request: TurnRequest,

    /// Present only for streaming callers.
    pub on_chunk: Option<ChunkSink>,

    /// Cooperative cancellation for the in-flight turn. Strategies should
    /// check this at loop boundaries.
    pub cancel: CancellationToken,
}

impl TurnContext {
    pub fn new(request: TurnRequest) -> Self {
        Self {
            request,
            on_chunk: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_chunk_sink(mut self, sink: ChunkSink) -> Self {
        self.on_chunk = Some(sink);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Emit a text chunk if the caller asked for streaming.
    pub fn emit(&self, chunk: &str) {
        if let Some(sink) = &self.on_chunk {
            sink(chunk);
        }
    }
}

impl std::fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("request", &self.request)
            .field("streaming", &self.on_chunk.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// An executable conversation-turn path.
#[async_trait]
pub trait TurnStrategy: Send + Sync {
    /// Strategy name used in logs and error reporting.
    fn name(&self) -> &str;

    async fn execute(
        &self,
        agent_id: Uuid,
        ctx: &TurnContext,
    ) -> std::result::Result<TurnOutcome, TurnError>;
}

/// Per-turn capability check deciding whether the agent may use the
/// tool-augmented runtime. Evaluated fresh on every turn — routing
/// decisions are never cached, so config changes apply on the next turn.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn tools_enabled(
        &self,
        agent_id: Uuid,
    ) -> std::result::Result<bool, ProfileError>;
}

/// Which strategy a turn was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTag {
    Runtime,
    Legacy,
}

impl StrategyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Runtime => "runtime",
            Self::Legacy => "legacy",
        }
    }
}

/// How the routed turn terminated (success cases only — failure is the
/// error path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteOutcome {
    Succeeded,
    FallbackUsed,
}

/// The ephemeral routing record for one turn. Created and discarded per
/// turn, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Capability verdict at turn start.
    pub tools_enabled: bool,

    /// The strategy that produced the final outcome.
    pub strategy: StrategyTag,

    pub outcome: RouteOutcome,
}

/// A successfully routed turn: the strategy outcome plus how it got there.
#[derive(Debug, Clone)]
pub struct RoutedTurn {
    pub outcome: TurnOutcome,
    pub decision: RouteDecision,
}

// ── Wire protocol ─────────────────────────────────────────────────────────

/// Events emitted to streaming clients.
///
/// A stream is zero or more `text` events followed by exactly one terminal
/// event (`done` or `error`). Once any event has been emitted, failures
/// must be delivered as a terminal `error` event — the stream can no
/// longer be converted into a conventional failure response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Partial response text.
    Text { content: String },

    /// Terminal success event.
    #[serde(rename_all = "camelCase")]
    Done {
        iterations: u32,
        tool_calls_count: usize,
    },

    /// Terminal failure event.
    Error { error: String },
}

impl TurnEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }
}

/// The non-streaming response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub success: bool,
    pub response: String,
    pub metadata: TurnMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnMetadata {
    pub iterations: u32,
    pub tool_calls_count: usize,
    pub tool_calls: Vec<ToolInvocation>,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            success: true,
            response: outcome.response,
            metadata: TurnMetadata {
                iterations: outcome.iterations,
                tool_calls_count: outcome.tool_calls.len(),
                tool_calls: outcome.tool_calls,
            },
        }
    }
}
