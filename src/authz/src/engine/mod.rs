//! Permission evaluation engine
//!
//! Answers "may the current session perform `action` on this resource (or
//! resource type in this context)?" against the session's grant set.
//!
//! # Evaluation order
//!
//! ```text
//! query → page guards → direct grant → admin overrides → conditions → decision
//!             │              │               │                │
//!           deny           allow           allow        allow / deny
//! ```

pub mod decision;
pub mod metrics;

pub use decision::{AccessDecision, ContextScope, DecisionReason};
pub use metrics::{EngineMetrics, MetricsCollector};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::grants::PermissionGrantSet;
use crate::session::{PageProvider, PageState, PageView, SessionProvider, StaticSession};
use crate::store::GrantStore;
use crate::types::{ContextId, Resource, ADMIN_ACTION, ALL_RESOURCES, SYSTEM_CONTEXT};

use std::sync::Arc;
use tracing::{debug, info};

const READ_ACTION: &str = "read";

/// Main permission engine
///
/// Every query reads one grant snapshot plus the ambient page/session state
/// and leaves no residue; the engine can be shared across threads.
pub struct PermissionEngine {
    /// Session grant set, replaced wholesale on refresh
    store: Arc<GrantStore>,

    /// Resolves `$current_user`
    session: Arc<dyn SessionProvider>,

    /// Page-in-view signals consulted by the guards
    page: Arc<dyn PageProvider>,

    /// Decision counters
    metrics: MetricsCollector,

    /// Engine configuration
    config: EngineConfig,
}

impl PermissionEngine {
    /// Create an engine over `store` with the given ambient providers
    pub fn new(
        config: EngineConfig,
        store: Arc<GrantStore>,
        session: Arc<dyn SessionProvider>,
        page: Arc<dyn PageProvider>,
    ) -> Result<Self> {
        config.validate()?;

        info!(
            "PermissionEngine initialized with metrics={}, log_decisions={}",
            config.enable_metrics, config.log_decisions
        );

        Ok(Self {
            store,
            session,
            page,
            metrics: MetricsCollector::new(),
            config,
        })
    }

    /// Start building an engine
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// `is_allowed(action, resource_type, context_id)`
    pub fn is_allowed(&self, action: &str, resource_type: &str, context_id: ContextId) -> bool {
        self.explain(action, resource_type, context_id).allowed
    }

    /// Typed lookup with its reason
    pub fn explain(
        &self,
        action: &str,
        resource_type: &str,
        context_id: ContextId,
    ) -> AccessDecision {
        let grants = self.store.snapshot();
        let scope = ContextScope::Context(context_id);
        let decision = self.evaluate(&grants, action, resource_type, scope);
        self.finalize(decision)
    }

    /// `is_allowed_for(action, resource)`
    ///
    /// Fails only when a condition references an unknown permission variable.
    pub fn is_allowed_for<R>(&self, action: &str, resource: &R) -> Result<bool>
    where
        R: Resource + ?Sized,
    {
        Ok(self.explain_for(action, resource)?.allowed)
    }

    /// Instance lookup with its reason
    pub fn explain_for<R>(&self, action: &str, resource: &R) -> Result<AccessDecision>
    where
        R: Resource + ?Sized,
    {
        let grants = self.store.snapshot();
        let resource_type = resource.type_name();
        let context_id = resource.context_id();
        let scope = ContextScope::Context(context_id);

        let decision = self.evaluate(&grants, action, resource_type, scope);
        if decision.allowed || decision.reason.is_guard() {
            return Ok(self.finalize(decision));
        }

        let Some(conditions) = grants.conditions_for(action, resource_type, context_id) else {
            return Ok(self.finalize(decision));
        };

        if conditions.is_empty() {
            return Ok(self.finalize(AccessDecision::allow(
                action,
                resource_type,
                scope,
                DecisionReason::VacuousConditions,
            )));
        }

        let user = self.session.current_user();
        for (index, condition) in conditions.iter().enumerate() {
            let holds = match condition.evaluate(resource, user.as_ref()) {
                Ok(holds) => holds,
                Err(e) => {
                    self.metrics.record_error();
                    return Err(e);
                }
            };

            if holds {
                return Ok(self.finalize(AccessDecision::allow(
                    action,
                    resource_type,
                    scope,
                    DecisionReason::ConditionMatched {
                        condition: condition.kind().to_string(),
                        index,
                    },
                )));
            }
        }

        Ok(self.finalize(AccessDecision::deny(
            action,
            resource_type,
            scope,
            DecisionReason::ConditionsFailed,
        )))
    }

    /// `is_allowed_any(action, resource_type)`: allowed in at least one context
    pub fn is_allowed_any(&self, action: &str, resource_type: &str) -> bool {
        self.explain_any(action, resource_type).allowed
    }

    /// Any-context lookup with its reason
    pub fn explain_any(&self, action: &str, resource_type: &str) -> AccessDecision {
        let grants = self.store.snapshot();
        let decision = self.evaluate(&grants, action, resource_type, ContextScope::Unscoped);
        if decision.allowed || !grants.has_any_context(action, resource_type) {
            return self.finalize(decision);
        }

        self.finalize(AccessDecision::allow(
            action,
            resource_type,
            ContextScope::Unscoped,
            DecisionReason::GrantedInSomeContext,
        ))
    }

    /// True if `is_allowed_any` holds for at least one of `resource_types`
    pub fn any_allowed<'a, I>(&self, action: &str, resource_types: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        resource_types
            .into_iter()
            .any(|resource_type| self.is_allowed_any(action, resource_type))
    }

    /// Whether the session holds the admin wildcard in the system context
    pub fn is_system_admin(&self) -> bool {
        let grants = self.store.snapshot();
        let decision = self.evaluate(&grants, ADMIN_ACTION, ALL_RESOURCES, ContextScope::Unscoped);
        self.finalize(decision).allowed
    }

    /// Context id of the page object in view, `None` when there is none
    pub fn page_context_id(&self) -> ContextId {
        self.page.page_context_id()
    }

    /// Current grant snapshot
    pub fn grants(&self) -> Arc<PermissionGrantSet> {
        self.store.snapshot()
    }

    /// Swap in a new grant set (e.g. after a privilege change)
    pub fn refresh(&self, grants: PermissionGrantSet) {
        self.store.replace(grants);
    }

    /// Get engine metrics
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // Private helper methods

    fn evaluate(
        &self,
        grants: &PermissionGrantSet,
        action: &str,
        resource_type: &str,
        scope: ContextScope,
    ) -> AccessDecision {
        let view = self.page.page_view();

        if let Some(reason) = self.guard(action, resource_type, &view) {
            return AccessDecision::deny(action, resource_type, scope, reason);
        }

        match Self::match_grants(grants, action, resource_type, scope) {
            Some(reason) => AccessDecision::allow(action, resource_type, scope, reason),
            None => AccessDecision::deny(action, resource_type, scope, DecisionReason::NoGrant),
        }
    }

    /// Hard denials that apply regardless of grants
    fn guard(&self, action: &str, resource_type: &str, view: &PageView) -> Option<DecisionReason> {
        if action == READ_ACTION {
            return None;
        }
        let page = view.page.as_ref();

        // No edits on profile pages outside the dashboard
        let on_profile = page.is_some_and(|p| p.type_name == self.config.profile_type);
        if on_profile && !view.dashboard {
            return Some(DecisionReason::ProfilePageGuard);
        }

        // Legacy request/response objects are only editable from their audit,
        // program or person pages
        let legacy = self
            .config
            .legacy_family_markers
            .iter()
            .any(|marker| resource_type.contains(marker.as_str()));
        if legacy {
            let exempt = page.is_some_and(|p| {
                self.config
                    .legacy_exempt_page_types
                    .iter()
                    .any(|t| p.type_name.contains(t.as_str()))
            });
            if !exempt {
                return Some(DecisionReason::LegacyFamilyGuard);
            }
        }

        None
    }

    /// Steps b–e of the matching algorithm; `None` means no grant applies
    fn match_grants(
        grants: &PermissionGrantSet,
        action: &str,
        resource_type: &str,
        scope: ContextScope,
    ) -> Option<DecisionReason> {
        if let ContextScope::Context(context_id) = scope {
            if grants.grants(action, resource_type, context_id) {
                return Some(DecisionReason::DirectGrant);
            }
        }

        // Reserved admin permission
        if grants.grants_admin(Some(SYSTEM_CONTEXT)) {
            return Some(DecisionReason::SystemAdmin);
        }

        if let ContextScope::Context(context_id) = scope {
            if grants.grants_admin(context_id) {
                return Some(DecisionReason::ContextAdmin);
            }
        }

        // System admin
        if grants.grants_admin(Some(SYSTEM_CONTEXT)) {
            return Some(DecisionReason::SystemAdmin);
        }

        None
    }

    fn finalize(&self, decision: AccessDecision) -> AccessDecision {
        if self.config.enable_metrics {
            self.metrics.record_decision(&decision);
        }
        if self.config.log_decisions {
            debug!("Decision: {}", decision);
        }
        decision
    }
}

/// Assembles a [`PermissionEngine`]; unset parts fall back to an empty grant
/// set, an anonymous session and a blank page.
#[derive(Default)]
pub struct EngineBuilder {
    config: Option<EngineConfig>,
    store: Option<Arc<GrantStore>>,
    session: Option<Arc<dyn SessionProvider>>,
    page: Option<Arc<dyn PageProvider>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Serve `grants` from a fresh store
    pub fn grants(self, grants: PermissionGrantSet) -> Self {
        self.store(Arc::new(GrantStore::new(grants)))
    }

    /// Share an existing store
    pub fn store(mut self, store: Arc<GrantStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn page(mut self, page: Arc<dyn PageProvider>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn build(self) -> Result<PermissionEngine> {
        PermissionEngine::new(
            self.config.unwrap_or_default(),
            self.store.unwrap_or_default(),
            self.session.unwrap_or_else(|| Arc::new(StaticSession::anonymous())),
            self.page.unwrap_or_else(|| Arc::new(PageState::blank())),
        )
    }
}
