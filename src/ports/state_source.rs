use serde_json::Value;
use tokio::sync::watch;

/// The page-global slot holding the prerendered state (`__PRERENDERED_STATE__`).
pub trait StateSource: Send + Sync {
    /// Current value of the slot, if anything was assigned.
    fn current(&self) -> Option<Value>;

    /// Reassignment feed. `None` when the slot cannot be observed and must be sampled instead.
    fn subscribe(&self) -> Option<watch::Receiver<Option<Value>>>;
}
