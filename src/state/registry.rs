//! Run-scoped deduplication registry

use crate::url::{site_identity, SiteIdentity};
use std::collections::HashSet;

/// Set of website identities already dispatched to analysis in this run
///
/// Created empty at run start and dropped at run end; nothing is persisted.
/// Every operation normalizes its input with [`site_identity`], so surface
/// differences like scheme, case and trailing slash never defeat it.
///
/// Access is serial: the orchestrator owns the registry through the router
/// and processes one candidate at a time.
///
/// # Example
///
/// ```
/// use sponsor_scout::state::RunRegistry;
///
/// let mut registry = RunRegistry::new();
/// assert!(!registry.has_seen("acme-hr.com"));
/// registry.mark_seen("https://ACME-HR.com/");
/// assert!(registry.has_seen("acme-hr.com"));
/// ```
#[derive(Debug, Default)]
pub struct RunRegistry {
    seen: HashSet<SiteIdentity>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the website's identity is already registered
    pub fn has_seen(&self, website: &str) -> bool {
        self.seen.contains(&site_identity(website))
    }

    /// Registers the website's identity; marking twice is a no-op
    pub fn mark_seen(&mut self, website: &str) {
        self.seen.insert(site_identity(website));
    }

    /// Registers the website and reports whether it was new
    ///
    /// Returns `Ok(identity)` when this call registered it, `Err(identity)`
    /// when it was already present.
    pub fn check_and_mark(&mut self, website: &str) -> Result<SiteIdentity, SiteIdentity> {
        let identity = site_identity(website);
        if self.seen.insert(identity.clone()) {
            Ok(identity)
        } else {
            Err(identity)
        }
    }

    /// Number of distinct identities registered
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
