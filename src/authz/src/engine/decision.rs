//! Permission decision types

use crate::types::ContextId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which context a query was evaluated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ContextScope {
    /// A specific context (`None` is the "no context" context)
    Context(ContextId),

    /// No context given; only matches through admin overrides
    Unscoped,
}

impl ContextScope {
    pub fn context_id(&self) -> Option<ContextId> {
        match self {
            ContextScope::Context(id) => Some(*id),
            ContextScope::Unscoped => None,
        }
    }
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextScope::Context(Some(id)) => write!(f, "context {}", id),
            ContextScope::Context(None) => write!(f, "no context"),
            ContextScope::Unscoped => write!(f, "any context"),
        }
    }
}

/// Why a decision came out the way it did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecisionReason {
    /// The context is listed for the action and resource type
    DirectGrant,

    /// Admin wildcard granted in the queried context
    ContextAdmin,

    /// Admin wildcard granted in the system context
    SystemAdmin,

    /// The action is granted in at least one context
    GrantedInSomeContext,

    /// Conditions are registered for the context but the list is empty
    VacuousConditions,

    /// A registered condition held for the instance
    ConditionMatched { condition: String, index: usize },

    /// Non-read action on a profile page outside the dashboard
    ProfilePageGuard,

    /// Non-read action on a legacy request/response object
    LegacyFamilyGuard,

    /// Conditions are registered but none held
    ConditionsFailed,

    /// Nothing grants the action
    NoGrant,
}

impl DecisionReason {
    /// Whether the decision was forced by a page guard
    pub fn is_guard(&self) -> bool {
        matches!(self, DecisionReason::ProfilePageGuard | DecisionReason::LegacyFamilyGuard)
    }

    /// Whether an admin override produced the decision
    pub fn is_admin_override(&self) -> bool {
        matches!(self, DecisionReason::ContextAdmin | DecisionReason::SystemAdmin)
    }
}

/// Outcome of one permission query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the action is allowed
    pub allowed: bool,

    /// Requested action
    pub action: String,

    /// Resource type the query resolved to
    pub resource_type: String,

    /// Context the query was evaluated in
    pub scope: ContextScope,

    /// Reason for the decision
    pub reason: DecisionReason,
}

impl AccessDecision {
    /// Create an allow decision
    pub fn allow(
        action: &str,
        resource_type: &str,
        scope: ContextScope,
        reason: DecisionReason,
    ) -> Self {
        Self {
            allowed: true,
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            scope,
            reason,
        }
    }

    /// Create a deny decision
    pub fn deny(
        action: &str,
        resource_type: &str,
        scope: ContextScope,
        reason: DecisionReason,
    ) -> Self {
        Self {
            allowed: false,
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            scope,
            reason,
        }
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} in {} ({:?})",
            if self.allowed { "ALLOW" } else { "DENY" },
            self.action,
            self.resource_type,
            self.scope,
            self.reason
        )
    }
}
