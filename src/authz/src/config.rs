//! Engine configuration loading and validation

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Permission engine configuration
///
/// Every field has a default, so an empty TOML document is a valid config.
///
/// ```toml
/// enable_metrics = true
/// log_decisions = false
/// profile_type = "Person"
/// legacy_family_markers = ["Request", "Response"]
/// legacy_exempt_page_types = ["Audit", "Program", "Person"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Count decisions in the engine's metrics collector
    pub enable_metrics: bool,

    /// Emit a `debug!` event for every decision
    pub log_decisions: bool,

    /// Page type on which only `read` is allowed outside dashboard mode
    pub profile_type: String,

    /// Substrings identifying the legacy request/response object families
    pub legacy_family_markers: Vec<String>,

    /// Page types on which legacy objects may still be changed (substring match)
    pub legacy_exempt_page_types: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_decisions: false,
            profile_type: "Person".to_string(),
            legacy_family_markers: vec!["Request".to_string(), "Response".to_string()],
            legacy_exempt_page_types: vec![
                "Audit".to_string(),
                "Program".to_string(),
                "Person".to_string(),
            ],
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML document and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)
            .map_err(|e| AuthzError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.profile_type.trim().is_empty() {
            return Err(AuthzError::Config("profile_type cannot be empty".to_string()));
        }

        // An empty marker would match every resource type
        if self.legacy_family_markers.iter().any(|m| m.is_empty()) {
            return Err(AuthzError::Config(
                "legacy_family_markers cannot contain empty strings".to_string(),
            ));
        }

        if self.legacy_exempt_page_types.iter().any(|t| t.is_empty()) {
            return Err(AuthzError::Config(
                "legacy_exempt_page_types cannot contain empty strings".to_string(),
            ));
        }

        Ok(())
    }
}
