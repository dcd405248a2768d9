//! # GRC Permission Engine
//!
//! Evaluates a session's server-issued permission grants against
//! action/resource/context queries.
//!
//! ## Features
//!
//! - **Context-scoped grants** keyed by action and resource type
//! - **Admin overrides** per context and through the system context `0`
//! - **Conditional grants** (`contains`, `is`, `in`) over live instances
//! - **Page guards** for profile pages and legacy request/response objects
//! - **Copy-on-replace refresh** of the grant set
//!
//! ## Example
//!
//! ```rust
//! use grc_authz::{PermissionEngine, PermissionGrantSet};
//!
//! let grants = PermissionGrantSet::from_json(
//!     r#"{"read": {"Policy": {"contexts": [1, null]}}}"#,
//! )?;
//! let engine = PermissionEngine::builder().grants(grants).build()?;
//!
//! assert!(engine.is_allowed("read", "Policy", Some(1)));
//! assert!(!engine.is_allowed("read", "Policy", Some(2)));
//! assert!(!engine.is_allowed("update", "Policy", Some(1)));
//! # Ok::<(), grc_authz::AuthzError>(())
//! ```

pub mod check;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod grants;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use check::{ContextSelector, PermissionCheck};
pub use conditions::{ConditionalGrant, PermissionVariable};
pub use config::EngineConfig;
pub use engine::{
    AccessDecision, ContextScope, DecisionReason, EngineBuilder, EngineMetrics, PermissionEngine,
};
pub use error::{AuthzError, Result};
pub use grants::{GrantSetBuilder, PermissionGrantSet, ResourceGrant};
pub use session::{PageProvider, PageState, PageView, SessionProvider, StaticSession};
pub use store::GrantStore;
pub use types::{
    Action, AttributeReader, ContextId, CurrentUser, Identifiable, PageInstance, Resource,
    ResourceInstance, ADMIN_ACTION, ALL_RESOURCES, SYSTEM_CONTEXT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
