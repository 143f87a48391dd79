//! Process-wide proxy target cell.

use parking_lot::RwLock;

/// The configured upstream target domain. Empty means proxying is disabled.
///
/// Handlers read a snapshot once at the start of a request and never re-read
/// mid-request; writes are last-writer-wins. The value resets to disabled on
/// restart by construction.
#[derive(Default)]
pub struct ProxyTarget {
    domain: RwLock<String>,
}

impl ProxyTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, domain: &str) {
        *self.domain.write() = domain.trim().to_string();
    }

    pub fn get(&self) -> String {
        self.domain.read().clone()
    }

    pub fn clear(&self) {
        self.domain.write().clear();
    }

    pub fn is_configured(&self) -> bool {
        !self.domain.read().is_empty()
    }
}
