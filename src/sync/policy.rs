use serde::Deserialize;

/// When a toggle changes local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationPolicy {
    /// Nothing changes until the server answers; failures change nothing.
    Confirmed,
    /// Flip immediately, reconcile with the server's label, roll back on failure.
    Optimistic,
}

/// One policy per toggle kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyTable {
    pub like: MutationPolicy,
    pub comment_like: MutationPolicy,
    pub follow: MutationPolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            like: MutationPolicy::Confirmed,
            comment_like: MutationPolicy::Confirmed,
            follow: MutationPolicy::Optimistic,
        }
    }
}

impl MutationPolicy {
    pub fn is_optimistic(&self) -> bool {
        matches!(self, MutationPolicy::Optimistic)
    }
}
