//! # Permission check CLI
//!
//! Evaluates one permission query against a saved grant payload. Useful for
//! debugging why a session can or cannot do something.
//!
//! ```text
//! grc-authz-check --grants grants.json read Policy --context 1
//! grc-authz-check --grants grants.json --user-id 7 --resource assessment.json update
//! grc-authz-check --grants grants.json create Audit --any
//! ```
//!
//! Exits with 0 when the query is allowed and 1 when it is denied.

use anyhow::{bail, Context, Result};
use clap::Parser;
use grc_authz::{
    ContextId, CurrentUser, EngineConfig, PageInstance, PageState, PermissionEngine,
    PermissionGrantSet, ResourceInstance, StaticSession,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

/// Evaluate a permission query against a grant payload
#[derive(Parser)]
#[command(name = "grc-authz-check")]
#[command(about = "Evaluate a permission query against a session grant payload")]
#[command(version)]
struct Cli {
    /// Path to the JSON grant payload
    #[arg(short, long, env = "GRC_AUTHZ_GRANTS")]
    grants: PathBuf,

    /// Path to an engine configuration file (TOML)
    #[arg(short, long, env = "GRC_AUTHZ_CONFIG")]
    config: Option<PathBuf>,

    /// Id of the signed-in user, for `$current_user`
    #[arg(long)]
    user_id: Option<i64>,

    /// Type of the page object in view
    #[arg(long)]
    page_type: Option<String>,

    /// Context of the page object in view ("null" for none)
    #[arg(long, value_parser = parse_context, requires = "page_type")]
    page_context: Option<ContextArg>,

    /// The application is in dashboard mode
    #[arg(long)]
    dashboard: bool,

    /// JSON resource instance to check instead of a resource type
    #[arg(long, conflicts_with_all = ["resource_type", "context", "any"])]
    resource: Option<PathBuf>,

    /// Context to check in ("null" for the no-context context)
    #[arg(long, value_parser = parse_context, conflicts_with = "any")]
    context: Option<ContextArg>,

    /// Allowed in at least one context
    #[arg(long)]
    any: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Action to check (read, update, ...)
    action: String,

    /// Resource type to check
    resource_type: Option<String>,
}

/// A context id given on the command line
#[derive(Debug, Clone, Copy)]
struct ContextArg(ContextId);

fn parse_context(value: &str) -> std::result::Result<ContextArg, String> {
    match value {
        "null" | "none" => Ok(ContextArg(None)),
        other => other
            .parse::<i64>()
            .map(|id| ContextArg(Some(id)))
            .map_err(|_| format!("'{}' is not an integer or 'null'", other)),
    }
}

/// Filter used when `RUST_LOG` is unset
fn default_filter(verbose: bool) -> String {
    let log_level = if verbose { "debug" } else { "info" };
    format!("{},grc_authz={}", log_level, log_level)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.verbose).into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => EngineConfig::default(),
    };
    config.log_decisions |= cli.verbose;

    let payload = std::fs::read_to_string(&cli.grants)
        .with_context(|| format!("Failed to read grant payload {:?}", cli.grants))?;
    let grants = PermissionGrantSet::from_json(&payload).context("Failed to parse grant payload")?;
    info!("Loaded grants for {} actions", grants.actions().count());

    let session = match cli.user_id {
        Some(id) => StaticSession::new(CurrentUser::new(id)),
        None => StaticSession::anonymous(),
    };
    let page_context = cli.page_context.and_then(|ContextArg(id)| id);
    let page = PageState::new(
        cli.page_type
            .clone()
            .map(|page_type| PageInstance::new(page_type, page_context)),
        cli.dashboard,
    );

    let engine = PermissionEngine::builder()
        .config(config)
        .grants(grants)
        .session(Arc::new(session))
        .page(Arc::new(page))
        .build()
        .context("Failed to build permission engine")?;

    let decision = if let Some(path) = &cli.resource {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resource {:?}", path))?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).context("Failed to parse resource JSON")?;
        let instance = ResourceInstance::from_json(value)?;
        debug!("Checking instance of {}", instance.resource_type);
        engine.explain_for(&cli.action, &instance)?
    } else {
        let Some(resource_type) = &cli.resource_type else {
            bail!("A resource type or --resource is required");
        };
        if cli.any {
            engine.explain_any(&cli.action, resource_type)
        } else {
            let Some(ContextArg(context_id)) = cli.context else {
                bail!(
                    "If resource type '{}' is given, --context or --any must be explicit",
                    resource_type
                );
            };
            engine.explain(&cli.action, resource_type, context_id)
        }
    };

    println!("{}", decision);

    Ok(if decision.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
