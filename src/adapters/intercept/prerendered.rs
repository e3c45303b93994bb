use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::extract::extract_embedded_offers;
use crate::domain::offer::OfferSource;
use crate::domain::payload::parse_payload;
use crate::ports::state_source::StateSource;
use crate::session::collector::{OfferCollector, RenderMode};

/// Feeds offers embedded in the page's prerendered state into the collector.
pub struct PrerenderedStateTap {
    source: Arc<dyn StateSource>,
    collector: Arc<OfferCollector>,
}

impl PrerenderedStateTap {
    pub fn new(source: Arc<dyn StateSource>, collector: Arc<OfferCollector>) -> Self {
        Self { source, collector }
    }

    /// Merges the offers of one state value. Returns how many ids were new.
    pub fn ingest(&self, state: Option<&Value>) -> usize {
        let Some(parsed) = parse_payload(state) else {
            return 0;
        };
        let offers = extract_embedded_offers(&parsed);
        if offers.is_empty() {
            return 0;
        }
        let added = self
            .collector
            .merge(&offers, OfferSource::Prerendered, RenderMode::Refresh);
        debug!(
            records = offers.len(),
            added = added.len(),
            "Prerendered state ingested"
        );
        added.len()
    }

    /// Reads the current value, then keeps following the slot in the background.
    ///
    /// Push is used whenever the source can be subscribed to; `sample_delays`
    /// only matter for sources that refuse subscriptions.
    pub fn install(self, sample_delays: &[Duration]) -> JoinHandle<()> {
        self.ingest(self.source.current().as_ref());

        match self.source.subscribe() {
            Some(rx) => {
                info!("Prerendered state tap following reassignments");
                tokio::spawn(self.follow(rx))
            }
            None => {
                info!(
                    samples = sample_delays.len(),
                    "Prerendered state slot not observable, sampling"
                );
                tokio::spawn(self.sample(sample_delays.to_vec()))
            }
        }
    }

    async fn follow(self, mut rx: tokio::sync::watch::Receiver<Option<Value>>) {
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            self.ingest(value.as_ref());
        }
        debug!("State slot dropped, tap stopped");
    }

    async fn sample(self, delays: Vec<Duration>) {
        let start = tokio::time::Instant::now();
        for delay in delays {
            tokio::time::sleep_until(start + delay).await;
            self.ingest(self.source.current().as_ref());
        }
    }
}
