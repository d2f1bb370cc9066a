//! Agent profile — identity configuration consumed read-only by the core.
//!
//! Profiles are owned by the dashboard; this crate only reads them through
//! [`ProfileSource`]. Every field may be absent and absence must degrade
//! gracefully — a half-configured agent still gets a usable prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProfileError;

/// Metadata key that force-enables the tool-augmented runtime even when
/// the capability list is empty.
pub const ENABLE_TOOLS_KEY: &str = "enable_tools";

/// An agent's identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Short personality descriptor (e.g. an MBTI type).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,

    /// Free-text core-identity block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soul: Option<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Custom instruction template appended to the assembled prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AgentProfile {
    /// A minimal profile with every optional field absent.
    pub fn new(agent_id: Uuid) -> Self {
        Self {
            agent_id,
            name: None,
            role: None,
            personality: None,
            soul: None,
            capabilities: Vec::new(),
            prompt_template: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Whether this agent routes to the tool-augmented runtime:
    /// a non-empty capability list, or the explicit enable flag in
    /// metadata.
    pub fn tools_enabled(&self) -> bool {
        if !self.capabilities.is_empty() {
            return true;
        }
        self.metadata
            .get(ENABLE_TOOLS_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Agent")
    }

    pub fn display_role(&self) -> &str {
        self.role.as_deref().unwrap_or("AI Assistant")
    }
}

/// Read-only access to agent profiles.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the profile for `agent_id`. `Ok(None)` means the agent is
    /// unknown; `Err` means the source itself failed.
    async fn profile(
        &self,
        agent_id: Uuid,
    ) -> std::result::Result<Option<AgentProfile>, ProfileError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_profile_has_tools_disabled() {
        let profile = AgentProfile::new(Uuid::new_v4());
        assert!(!profile.tools_enabled());
    }

    #[test]
    fn capabilities_enable_tools() {
        let mut profile = AgentProfile::new(Uuid::new_v4());
        profile.capabilities = vec!["web_search".into()];
        assert!(profile.tools_enabled());
    }

    #[test]
    fn metadata_flag_enables_tools() {
        let mut profile = AgentProfile::new(Uuid::new_v4());
        profile.metadata = serde_json::json!({ "enable_tools": true });
        assert!(profile.tools_enabled());
    }

    #[test]
    fn non_boolean_flag_is_ignored() {
        let mut profile = AgentProfile::new(Uuid::new_v4());
        profile.metadata = serde_json::json!({ "enable_tools": "yes" });
        assert!(!profile.tools_enabled());

        profile.metadata = serde_json::json!({ "enable_tools": false });
        assert!(!profile.tools_enabled());
    }

    #[test]
    fn display_fallbacks() {
        let profile = AgentProfile::new(Uuid::new_v4());
        assert_eq!(profile.display_name(), "Agent");
        assert_eq!(profile.display_role(), "AI Assistant");
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let agent_id = Uuid::new_v4();
        let json = format!(r#"{{ "agent_id": "{agent_id}" }}"#);
        let profile: AgentProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(profile.agent_id, agent_id);
        assert!(profile.capabilities.is_empty());
        assert!(profile.soul.is_none());
    }
}
