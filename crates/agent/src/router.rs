//! Turn routing between the tool-augmented runtime and the legacy path.
//!
//! Routing rules, per conversation turn:
//! - The capability probe runs fresh every turn; nothing is cached, so
//!   enabling tools on an agent takes effect on its next turn.
//! - A probe error fails open to the legacy path. Evaluation problems must
//!   never block a response.
//! - If the runtime path throws, exactly one fallback attempt is made to
//!   the legacy path — sequentially, never speculatively, so tool side
//!   effects cannot be duplicated.
//! - Only when the fallback also fails does the caller see an error.
//!
//! Each strategy execution is raced against the turn's cancellation token
//! and, when configured, a per-turn timeout. A runtime-path timeout counts
//! as a strategy failure and takes the normal single fallback;
//! cancellation ends the turn immediately without falling back.

use async_trait::async_trait;
use roost_core::error::{ProfileError, TurnError};
use roost_core::profile::ProfileSource;
use roost_core::turn::{
    CapabilityProbe, RouteDecision, RouteOutcome, RoutedTurn, StrategyTag, TurnContext,
    TurnOutcome, TurnStrategy,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capability probe backed by the agent's profile: tools are enabled when
/// the capability list is non-empty or the metadata flag is set.
pub struct ProfileCapabilityProbe {
    profiles: Arc<dyn ProfileSource>,
}

impl ProfileCapabilityProbe {
    pub fn new(profiles: Arc<dyn ProfileSource>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl CapabilityProbe for ProfileCapabilityProbe {
    async fn tools_enabled(&self, agent_id: Uuid) -> Result<bool, ProfileError> {
        let profile = self.profiles.profile(agent_id).await?;
        Ok(profile.map(|p| p.tools_enabled()).unwrap_or(false))
    }
}

/// Routes each conversation turn to a strategy and guarantees a fail-safe
/// fallback.
pub struct RuntimeRouter {
    probe: Arc<dyn CapabilityProbe>,
    runtime: Arc<dyn TurnStrategy>,
    legacy: Arc<dyn TurnStrategy>,
    turn_timeout: Option<Duration>,
}

impl RuntimeRouter {
    pub fn new(
        probe: Arc<dyn CapabilityProbe>,
        runtime: Arc<dyn TurnStrategy>,
        legacy: Arc<dyn TurnStrategy>,
    ) -> Self {
        Self {
            probe,
            runtime,
            legacy,
            turn_timeout: None,
        }
    }

    /// Apply a timeout to each strategy execution within a turn.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    /// Route and execute one conversation turn.
    pub async fn dispatch(
        &self,
        agent_id: Uuid,
        ctx: &TurnContext,
    ) -> Result<RoutedTurn, TurnError> {
        let tools_enabled = match self.probe.tools_enabled(agent_id).await {
            Ok(enabled) => enabled,
            Err(e) => {
                // Fail open: the legacy path is the safer default when the
                // capability check itself cannot be trusted.
                warn!(%agent_id, error = %e, "Capability probe failed, routing to legacy");
                false
            }
        };

        if !tools_enabled {
            debug!(%agent_id, "Routing to legacy path");
            let outcome = self.execute(self.legacy.as_ref(), agent_id, ctx).await?;
            return Ok(RoutedTurn {
                outcome,
                decision: RouteDecision {
                    tools_enabled,
                    strategy: StrategyTag::Legacy,
                    outcome: RouteOutcome::Succeeded,
                },
            });
        }

        debug!(%agent_id, "Routing to tool-augmented runtime");
        match self.execute(self.runtime.as_ref(), agent_id, ctx).await {
            Ok(outcome) => Ok(RoutedTurn {
                outcome,
                decision: RouteDecision {
                    tools_enabled,
                    strategy: StrategyTag::Runtime,
                    outcome: RouteOutcome::Succeeded,
                },
            }),
            Err(TurnError::Cancelled) => Err(TurnError::Cancelled),
            Err(e) => {
                info!(%agent_id, error = %e, "Runtime path failed, falling back to legacy");
                if ctx.cancel.is_cancelled() {
                    return Err(TurnError::Cancelled);
                }
                // One fallback attempt; a legacy failure propagates as the
                // turn's final error.
                let outcome = self.execute(self.legacy.as_ref(), agent_id, ctx).await?;
                Ok(RoutedTurn {
                    outcome,
                    decision: RouteDecision {
                        tools_enabled,
                        strategy: StrategyTag::Legacy,
                        outcome: RouteOutcome::FallbackUsed,
                    },
                })
            }
        }
    }

    async fn execute(
        &self,
        strategy: &dyn TurnStrategy,
        agent_id: Uuid,
        ctx: &TurnContext,
    ) -> Result<TurnOutcome, TurnError> {
        let name = strategy.name().to_string();

        match self.turn_timeout {
            Some(timeout) => {
                tokio::select! {
                    _ = ctx.cancel.cancelled() => Err(TurnError::Cancelled),
                    result = tokio::time::timeout(timeout, strategy.execute(agent_id, ctx)) => {
                        match result {
                            Ok(inner) => inner,
                            Err(_) => {
                                warn!(%agent_id, strategy = %name, timeout_secs = timeout.as_secs(), "Strategy timed out");
                                Err(TurnError::Timeout {
                                    strategy: name,
                                    timeout_secs: timeout.as_secs(),
                                })
                            }
                        }
                    }
                }
            }
            None => {
                tokio::select! {
                    _ = ctx.cancel.cancelled() => Err(TurnError::Cancelled),
                    result = strategy.execute(agent_id, ctx) => result,
                }
            }
        }
    }
}
