//! Bridge from routed turns to the client wire protocol.
//!
//! Non-streaming callers get a [`TurnResponse`] envelope (or the turn's
//! final error). Streaming callers get a sequence of [`TurnEvent`]s: zero
//! or more `text` events followed by exactly one terminal event. Once the
//! first event is on the wire, a failure can only be reported as a
//! terminal `error` event — the transport layer (SSE, WebSocket) forwards
//! events as-is and never has to convert mid-stream.

use roost_core::error::TurnError;
use roost_core::turn::{ChunkSink, TurnContext, TurnEvent, TurnRequest, TurnResponse};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::router::RuntimeRouter;

/// Execute a non-streaming turn and wrap the outcome in the response
/// envelope. Errors (both paths failed, cancelled) propagate to the
/// caller, which renders them as a conventional failure status.
pub async fn run_turn(
    router: &RuntimeRouter,
    agent_id: Uuid,
    request: TurnRequest,
    cancel: CancellationToken,
) -> Result<TurnResponse, TurnError> {
    let ctx = TurnContext::new(request).with_cancellation(cancel);
    let routed = router.dispatch(agent_id, &ctx).await?;

    debug!(
        %agent_id,
        strategy = routed.decision.strategy.as_str(),
        iterations = routed.outcome.iterations,
        "Turn complete"
    );
    Ok(TurnResponse::from(routed.outcome))
}

/// Execute a streaming turn, forwarding chunks and the terminal event to
/// `events`. Always terminates the stream with exactly one `done` or
/// `error` event; never returns an error to the caller.
pub async fn stream_turn(
    router: &RuntimeRouter,
    agent_id: Uuid,
    request: TurnRequest,
    events: mpsc::UnboundedSender<TurnEvent>,
    cancel: CancellationToken,
) {
    let chunk_events = events.clone();
    let sink: ChunkSink = Arc::new(move |chunk: &str| {
        // A closed receiver just means the client went away; the strategy
        // keeps running and the terminal event send is a no-op too.
        let _ = chunk_events.send(TurnEvent::Text {
            content: chunk.to_string(),
        });
    });

    let ctx = TurnContext::new(request)
        .with_chunk_sink(sink)
        .with_cancellation(cancel);

    let terminal = match router.dispatch(agent_id, &ctx).await {
        Ok(routed) => TurnEvent::Done {
            iterations: routed.outcome.iterations,
            tool_calls_count: routed.outcome.tool_calls.len(),
        },
        Err(e) => TurnEvent::Error {
            error: e.to_string(),
        },
    };

    let _ = events.send(terminal);
}
