//! Multi-action permission checks
//!
//! Combines several actions with either a resource type in an explicit
//! context or a live resource instance:
//!
//! ```
//! use grc_authz::{Action, ContextSelector, PermissionCheck, PermissionEngine, PermissionGrantSet};
//!
//! let grants = PermissionGrantSet::builder()
//!     .grant("read", "Policy", [Some(1)])
//!     .grant("update", "Policy", [Some(1)])
//!     .build();
//! let engine = PermissionEngine::builder().grants(grants).build().unwrap();
//!
//! let allowed = PermissionCheck::new()
//!     .action(Action::Read)
//!     .action(Action::Update)
//!     .resource_type("Policy")
//!     .context(ContextSelector::Explicit(Some(1)))
//!     .evaluate(&engine)
//!     .unwrap();
//! assert!(allowed);
//! ```

use crate::engine::PermissionEngine;
use crate::error::{AuthzError, Result};
use crate::types::{Action, ContextId, Resource};
use tracing::debug;

/// How the context of a check is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSelector {
    /// This context exactly (`None` is the "no context" context)
    Explicit(ContextId),

    /// Allowed in at least one context
    Any,

    /// Decided by the instance, including its conditional grants
    ForInstance,
}

/// Builder for a check over one or more actions
///
/// Every action must pass for the check to pass.
#[derive(Default)]
pub struct PermissionCheck<'a> {
    actions: Vec<Action>,
    resource_type: Option<String>,
    resource: Option<&'a dyn Resource>,
    context: Option<ContextSelector>,
}

impl<'a> PermissionCheck<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action
    pub fn action(mut self, action: Action) -> Self {
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
        self
    }

    /// Add an action given by its wire tag
    pub fn action_tag(self, tag: &str) -> Result<Self> {
        Ok(self.action(tag.parse()?))
    }

    /// Check a resource type; requires [`context`](Self::context)
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Check a live instance; its type and context take precedence
    pub fn resource(mut self, resource: &'a dyn Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn context(mut self, context: ContextSelector) -> Self {
        self.context = Some(context);
        self
    }

    /// Run the check
    pub fn evaluate(&self, engine: &PermissionEngine) -> Result<bool> {
        if let Some(resource_type) = &self.resource_type {
            if self.context.is_none() {
                return Err(AuthzError::AmbiguousContextQuery(resource_type.clone()));
            }
        }
        if self.actions.is_empty() {
            return Err(AuthzError::MissingAction);
        }

        let (resource_type, context_id) = match self.resource {
            Some(resource) => (resource.type_name().to_string(), Some(resource.context_id())),
            None => {
                let Some(resource_type) = self.resource_type.clone() else {
                    return Err(AuthzError::InvalidInput(
                        "A check needs a resource or a resource type".to_string(),
                    ));
                };
                let context_id = match self.context {
                    Some(ContextSelector::Explicit(context_id)) => Some(context_id),
                    Some(ContextSelector::ForInstance) => {
                        return Err(AuthzError::AmbiguousContextQuery(resource_type));
                    }
                    _ => None,
                };
                (resource_type, context_id)
            }
        };

        for action in &self.actions {
            if !self.action_passes(engine, action.as_str(), &resource_type, context_id)? {
                debug!("Check failed on action '{}' for {}", action, resource_type);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn action_passes(
        &self,
        engine: &PermissionEngine,
        action: &str,
        resource_type: &str,
        context_id: Option<ContextId>,
    ) -> Result<bool> {
        if let Some(resource) = self.resource {
            if engine.is_allowed_for(action, resource)? {
                return Ok(true);
            }
        }

        if let Some(context_id) = context_id {
            if !engine.is_allowed(action, resource_type, context_id) {
                return Ok(false);
            }
        }

        match (self.context, self.resource) {
            (Some(ContextSelector::ForInstance), Some(resource)) => {
                engine.is_allowed_for(action, resource)
            }
            (Some(ContextSelector::Any), _) => Ok(engine.is_allowed_any(action, resource_type)),
            _ => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::ConditionalGrant;
    use crate::grants::PermissionGrantSet;
    use crate::session::StaticSession;
    use crate::types::{CurrentUser, ResourceInstance};
    use serde_json::json;
    use std::sync::Arc;

    fn engine(grants: PermissionGrantSet) -> PermissionEngine {
        PermissionEngine::builder()
            .grants(grants)
            .session(Arc::new(StaticSession::new(CurrentUser::new(5))))
            .build()
            .unwrap()
    }

    #[test]
    fn test_type_without_context_is_ambiguous() {
        let engine = engine(PermissionGrantSet::empty());
        let result = PermissionCheck::new()
            .action(Action::Read)
            .resource_type("Policy")
            .evaluate(&engine);
        assert!(matches!(result, Err(AuthzError::AmbiguousContextQuery(t)) if t == "Policy"));
    }

    #[test]
    fn test_missing_action() {
        let engine = engine(PermissionGrantSet::empty());
        let result = PermissionCheck::new()
            .resource_type("Policy")
            .context(ContextSelector::Explicit(None))
            .evaluate(&engine);
        assert!(matches!(result, Err(AuthzError::MissingAction)));
    }

    #[test]
    fn test_unknown_action_tag() {
        assert!(PermissionCheck::new().action_tag("approve").is_err());
        assert!(PermissionCheck::new().action_tag("delete").is_ok());
    }

    #[test]
    fn test_all_actions_must_pass() {
        let engine =
            engine(PermissionGrantSet::builder().grant("read", "Policy", [Some(1)]).build());

        let read_only = PermissionCheck::new()
            .action(Action::Read)
            .resource_type("Policy")
            .context(ContextSelector::Explicit(Some(1)));
        assert!(read_only.evaluate(&engine).unwrap());

        let read_and_update = PermissionCheck::new()
            .action(Action::Read)
            .action(Action::Update)
            .resource_type("Policy")
            .context(ContextSelector::Explicit(Some(1)));
        assert!(!read_and_update.evaluate(&engine).unwrap());
    }

    #[test]
    fn test_any_context() {
        let engine =
            engine(PermissionGrantSet::builder().grant("create", "Audit", [Some(8)]).build());
        let check = PermissionCheck::new()
            .action(Action::Create)
            .resource_type("Audit")
            .context(ContextSelector::Any);
        assert!(check.evaluate(&engine).unwrap());
    }

    #[test]
    fn test_for_instance_needs_a_resource() {
        let engine = engine(PermissionGrantSet::empty());
        let result = PermissionCheck::new()
            .action(Action::Update)
            .resource_type("Assessment")
            .context(ContextSelector::ForInstance)
            .evaluate(&engine);
        assert!(matches!(result, Err(AuthzError::AmbiguousContextQuery(_))));
    }

    #[test]
    fn test_instance_conditions() {
        let grants = PermissionGrantSet::builder()
            .conditions(
                "update",
                "Assessment",
                Some(2),
                vec![ConditionalGrant::contains("assignees", "$current_user")],
            )
            .build();
        let engine = engine(grants);

        let assigned = ResourceInstance::new("Assessment")
            .with_context(Some(2))
            .with_attribute("assignees", json!([{"id": 5}]));
        let unassigned = ResourceInstance::new("Assessment")
            .with_context(Some(2))
            .with_attribute("assignees", json!([{"id": 6}]));

        let check = |instance: &ResourceInstance| {
            PermissionCheck::new()
                .action(Action::Update)
                .resource(instance)
                .evaluate(&engine)
                .unwrap()
        };
        assert!(check(&assigned));
        assert!(!check(&unassigned));
    }
}
