//! Permission grant set issued by the server once per session
//!
//! Wire shape:
//!
//! ```text
//! {
//!   "<action>": {
//!     "<resource type>": {
//!       "contexts": [1, null, ...],
//!       "conditions": { "<context id | null>": [ {"condition": .., "terms": ..}, ... ] }
//!     }
//!   }
//! }
//! ```

use crate::conditions::ConditionalGrant;
use crate::error::{AuthzError, Result};
use crate::types::{ContextId, ADMIN_ACTION, ALL_RESOURCES};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Grants of one action on one resource type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGrant {
    /// Contexts in which the action is granted unconditionally
    #[serde(default)]
    pub contexts: Vec<ContextId>,

    /// Per-context conditions evaluated against a live instance
    #[serde(default, with = "context_keys")]
    pub conditions: HashMap<ContextId, Vec<ConditionalGrant>>,
}

/// Everything the current session may do
///
/// Immutable once built; a refresh replaces the whole set (see
/// [`GrantStore`](crate::store::GrantStore)).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionGrantSet {
    actions: HashMap<String, HashMap<String, ResourceGrant>>,
}

impl PermissionGrantSet {
    /// An empty grant set; every query against it is denied
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a grant set by hand
    pub fn builder() -> GrantSetBuilder {
        GrantSetBuilder::default()
    }

    /// Parse the session grant payload
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| AuthzError::InvalidGrantPayload(e.to_string()))
    }

    /// Parse an already-decoded grant payload
    pub fn from_value(payload: Value) -> Result<Self> {
        serde_json::from_value(payload).map_err(|e| AuthzError::InvalidGrantPayload(e.to_string()))
    }

    /// Grant entry for `(action, resource_type)`, if any
    pub fn resource_grant(&self, action: &str, resource_type: &str) -> Option<&ResourceGrant> {
        self.actions.get(action)?.get(resource_type)
    }

    /// Unconditional contexts for `(action, resource_type)`; empty when missing
    pub fn contexts_for(&self, action: &str, resource_type: &str) -> &[ContextId] {
        self.resource_grant(action, resource_type)
            .map(|grant| grant.contexts.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `(action, resource_type)` is granted at `context_id`
    pub fn grants(&self, action: &str, resource_type: &str, context_id: ContextId) -> bool {
        self.contexts_for(action, resource_type).contains(&context_id)
    }

    /// Whether the admin wildcard grant covers `context_id`
    pub fn grants_admin(&self, context_id: ContextId) -> bool {
        self.grants(ADMIN_ACTION, ALL_RESOURCES, context_id)
    }

    /// Condition list registered for the triple, `None` when nothing is registered
    pub fn conditions_for(
        &self,
        action: &str,
        resource_type: &str,
        context_id: ContextId,
    ) -> Option<&[ConditionalGrant]> {
        self.resource_grant(action, resource_type)?
            .conditions
            .get(&context_id)
            .map(Vec::as_slice)
    }

    /// Whether `(action, resource_type)` is granted in at least one context
    pub fn has_any_context(&self, action: &str, resource_type: &str) -> bool {
        !self.contexts_for(action, resource_type).is_empty()
    }

    /// Actions present in the set
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Hand-assembles a [`PermissionGrantSet`], mostly for tests and tooling
#[derive(Debug, Default)]
pub struct GrantSetBuilder {
    actions: HashMap<String, HashMap<String, ResourceGrant>>,
}

impl GrantSetBuilder {
    fn entry(&mut self, action: &str, resource_type: &str) -> &mut ResourceGrant {
        self.actions
            .entry(action.to_string())
            .or_default()
            .entry(resource_type.to_string())
            .or_default()
    }

    /// Grant `action` on `resource_type` unconditionally in `contexts`
    pub fn grant(
        mut self,
        action: &str,
        resource_type: &str,
        contexts: impl IntoIterator<Item = ContextId>,
    ) -> Self {
        let grant = self.entry(action, resource_type);
        for context in contexts {
            if !grant.contexts.contains(&context) {
                grant.contexts.push(context);
            }
        }
        self
    }

    /// Grant the admin wildcard in `contexts`
    pub fn admin(self, contexts: impl IntoIterator<Item = ContextId>) -> Self {
        self.grant(ADMIN_ACTION, ALL_RESOURCES, contexts)
    }

    /// Register a condition list for the triple (may be empty)
    pub fn conditions(
        mut self,
        action: &str,
        resource_type: &str,
        context_id: ContextId,
        conditions: Vec<ConditionalGrant>,
    ) -> Self {
        self.entry(action, resource_type)
            .conditions
            .entry(context_id)
            .or_default()
            .extend(conditions);
        self
    }

    pub fn build(self) -> PermissionGrantSet {
        PermissionGrantSet {
            actions: self.actions,
        }
    }
}

/// Condition maps are keyed by context id, which JSON can only carry as an
/// object key: `"null"` or a decimal integer.
mod context_keys {
    use super::*;
    use serde::de::Error as _;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(
        map: &HashMap<ContextId, Vec<ConditionalGrant>>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let keyed: HashMap<String, &Vec<ConditionalGrant>> = map
            .iter()
            .map(|(context, conditions)| (format_key(*context), conditions))
            .collect();
        keyed.serialize(serializer)
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> std::result::Result<HashMap<ContextId, Vec<ConditionalGrant>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let keyed = HashMap::<String, Vec<ConditionalGrant>>::deserialize(deserializer)?;
        keyed
            .into_iter()
            .map(|(key, conditions)| {
                parse_key(&key)
                    .map(|context| (context, conditions))
                    .ok_or_else(|| D::Error::custom(format!("invalid context key '{}'", key)))
            })
            .collect()
    }

    fn format_key(context: ContextId) -> String {
        match context {
            Some(id) => id.to_string(),
            None => "null".to_string(),
        }
    }

    fn parse_key(key: &str) -> Option<ContextId> {
        if key == "null" {
            return Some(None);
        }
        key.parse::<i64>().ok().map(Some)
    }
}
