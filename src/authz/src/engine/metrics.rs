//! Decision counters for engine observability

use super::decision::{AccessDecision, DecisionReason};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineMetrics {
    /// Total number of decisions
    pub total_decisions: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Number of denied decisions
    pub denied_decisions: u64,

    /// Denials forced by a page guard
    pub guard_denials: u64,

    /// Allows produced by an admin override
    pub admin_overrides: u64,

    /// Decisions that consulted conditional grants
    pub conditional_decisions: u64,

    /// Queries that failed with a configuration error
    pub error_count: u64,
}

impl EngineMetrics {
    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / self.total_decisions as f64
        }
    }
}

/// Lock-free decision counters
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    guard_denials: AtomicU64,
    admin_overrides: AtomicU64,
    conditional: AtomicU64,
    errors: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decision
    pub fn record_decision(&self, decision: &AccessDecision) {
        self.total.fetch_add(1, Ordering::Relaxed);

        if decision.allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }

        match &decision.reason {
            reason if reason.is_guard() => {
                self.guard_denials.fetch_add(1, Ordering::Relaxed);
            }
            reason if reason.is_admin_override() => {
                self.admin_overrides.fetch_add(1, Ordering::Relaxed);
            }
            DecisionReason::VacuousConditions
            | DecisionReason::ConditionMatched { .. }
            | DecisionReason::ConditionsFailed => {
                self.conditional.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Record a query that failed before producing a decision
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics
    pub fn snapshot(&self) -> EngineMetrics {
        EngineMetrics {
            total_decisions: self.total.load(Ordering::Relaxed),
            allowed_decisions: self.allowed.load(Ordering::Relaxed),
            denied_decisions: self.denied.load(Ordering::Relaxed),
            guard_denials: self.guard_denials.load(Ordering::Relaxed),
            admin_overrides: self.admin_overrides.load(Ordering::Relaxed),
            conditional_decisions: self.conditional.load(Ordering::Relaxed),
            error_count: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.total,
            &self.allowed,
            &self.denied,
            &self.guard_denials,
            &self.admin_overrides,
            &self.conditional,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
