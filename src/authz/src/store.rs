//! Session-scoped grant storage with copy-on-replace refresh

use crate::error::Result;
use crate::grants::PermissionGrantSet;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Holds the grant set of the current session
///
/// Readers take an `Arc` snapshot and evaluate against it; a refresh swaps
/// the whole set, so an evaluation in flight sees either the old or the new
/// set, never a mix.
#[derive(Debug)]
pub struct GrantStore {
    current: RwLock<Arc<PermissionGrantSet>>,
    generation: AtomicU64,
}

impl GrantStore {
    /// Create a store serving `grants`
    pub fn new(grants: PermissionGrantSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(grants)),
            generation: AtomicU64::new(0),
        }
    }

    /// Current grant set
    pub fn snapshot(&self) -> Arc<PermissionGrantSet> {
        self.current.read().clone()
    }

    /// Replace the grant set wholesale, returning the previous one
    pub fn replace(&self, grants: PermissionGrantSet) -> Arc<PermissionGrantSet> {
        let mut current = self.current.write();
        let previous = std::mem::replace(&mut *current, Arc::new(grants));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        drop(current);

        info!("Permission grants replaced (generation {})", generation);
        previous
    }

    /// Parse a session payload and swap it in
    ///
    /// A malformed payload leaves the current grants untouched.
    pub fn replace_from_json(&self, payload: &str) -> Result<Arc<PermissionGrantSet>> {
        let grants = PermissionGrantSet::from_json(payload)?;
        Ok(self.replace(grants))
    }

    /// Number of replacements since the store was created
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for GrantStore {
    fn default() -> Self {
        Self::new(PermissionGrantSet::empty())
    }
}
