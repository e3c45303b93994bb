use serde_json::Value;
use tokio::sync::watch;

use crate::ports::state_source::StateSource;

/// In-process stand-in for the page's `window.__PRERENDERED_STATE__` global.
///
/// A non-configurable slot still holds values but hands out no subscriptions,
/// so observers have to sample it.
pub struct PageStateSlot {
    tx: watch::Sender<Option<Value>>,
    configurable: bool,
}

impl PageStateSlot {
    pub fn new(configurable: bool) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx, configurable }
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable
    }

    /// Replaces the slot value and wakes every subscriber.
    pub fn assign(&self, value: Value) {
        self.tx.send_replace(Some(value));
    }
}

impl StateSource for PageStateSlot {
    fn current(&self) -> Option<Value> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> Option<watch::Receiver<Option<Value>>> {
        self.configurable.then(|| self.tx.subscribe())
    }
}
