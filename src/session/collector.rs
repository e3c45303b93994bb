use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error};

use crate::domain::map_scene::{MapMarker, MapScene, ViewPreferences, points_status};
use crate::domain::offer::{Offer, OfferSource};
use crate::domain::presentation::PriceRange;
use crate::domain::store::OfferStore;
use crate::ports::live_view::LiveView;

/// Whether a merge should refresh an open view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Refresh,
    /// The caller feeds the new offers to incremental insertion itself.
    Skip,
}

/// Offer store plus the render trigger that keeps the live view in sync with it.
pub struct OfferCollector {
    store: Mutex<OfferStore>,
    view: Arc<dyn LiveView>,
    preferences: Mutex<ViewPreferences>,
    marker_pace: Duration,
}

impl OfferCollector {
    pub fn new(
        view: Arc<dyn LiveView>,
        preferences: ViewPreferences,
        marker_pace: Duration,
    ) -> Self {
        Self {
            store: Mutex::new(OfferStore::new()),
            view,
            preferences: Mutex::new(preferences),
            marker_pace,
        }
    }

    fn store(&self) -> MutexGuard<'_, OfferStore> {
        // A panic inside a merge leaves the map itself consistent.
        self.store.lock().unwrap_or_else(|poisoned| {
            error!("Offer store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn prefs(&self) -> ViewPreferences {
        *self
            .preferences
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Upserts every usable record and returns the ones whose id was not stored before.
    pub fn merge(&self, records: &[Value], source: OfferSource, render: RenderMode) -> Vec<Offer> {
        let mut added = Vec::new();
        {
            let mut store = self.store();
            for raw in records {
                let Some(offer) = Offer::from_raw(raw, source) else {
                    continue;
                };
                debug!(source = %source, id = %offer.id, located = offer.is_located(), "Offer merged");
                if store.upsert(offer.clone()) {
                    added.push(offer);
                }
            }
        }

        if render == RenderMode::Refresh {
            self.refresh_view();
        }
        added
    }

    /// Full re-render from the whole store, only while the view is open.
    pub fn refresh_view(&self) {
        if self.view.is_open() {
            self.view.render(self.scene());
        }
    }

    pub fn scene(&self) -> MapScene {
        let prefs = self.prefs();
        let store = self.store();
        MapScene::build(store.iter(), prefs)
    }

    /// Adds the located subset of `added` to an open view one marker at a time.
    pub async fn insert_incrementally(&self, added: &[Offer]) {
        if added.is_empty() || !self.view.is_open() {
            return;
        }
        let markers: Vec<MapMarker> = {
            let prefs = self.prefs();
            let store = self.store();
            let range = PriceRange::from_offers(store.iter().filter(|o| o.is_located()));
            added
                .iter()
                .filter_map(|o| MapMarker::from_offer(o, range, prefs.price_coloring))
                .collect()
        };
        if markers.is_empty() {
            return;
        }

        for marker in markers {
            self.view.insert_marker(marker);
            tokio::time::sleep(self.marker_pace).await;
        }
        let located = self.store().located_count();
        self.view.set_status(&points_status(located));
    }

    pub fn open_view(&self) {
        self.view.open();
        self.refresh_view();
    }

    pub fn close_view(&self) {
        self.view.close();
    }

    pub fn set_status(&self, text: &str) {
        self.view.set_status(text);
    }

    pub fn preferences(&self) -> ViewPreferences {
        self.prefs()
    }

    /// Updates the display toggles and re-renders an open view.
    pub fn update_preferences(
        &self,
        grouping: Option<bool>,
        price_coloring: Option<bool>,
    ) -> ViewPreferences {
        let updated = {
            let mut prefs = self
                .preferences
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(g) = grouping {
                prefs.grouping = g;
            }
            if let Some(c) = price_coloring {
                prefs.price_coloring = c;
            }
            *prefs
        };
        self.refresh_view();
        updated
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Offer> {
        self.store().get(id).cloned()
    }

    pub fn offers(&self) -> Vec<Offer> {
        self.store().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingView;
    use serde_json::json;

    fn collector(view: &Arc<RecordingView>) -> OfferCollector {
        let view: Arc<dyn LiveView> = view.clone();
        OfferCollector::new(view, ViewPreferences::default(), Duration::ZERO)
    }

    #[test]
    fn second_merge_supersedes_and_is_not_new() {
        let view = Arc::new(RecordingView::closed());
        let c = collector(&view);
        let first = c.merge(&[json!({"id": 5, "map": {"lat": 52.1, "lon": 21.0}})], OfferSource::Observed, RenderMode::Refresh);
        let second = c.merge(&[json!({"id": "5", "map": {"lat": 52.2, "lon": 21.0}})], OfferSource::Prerendered, RenderMode::Refresh);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(c.len(), 1);
        let stored = c.get("5").unwrap();
        assert!((stored.geo.unwrap().lat - 52.2).abs() < f64::EPSILON);
        assert_eq!(stored.source, OfferSource::Prerendered);
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let view = Arc::new(RecordingView::closed());
        let c = collector(&view);
        let added = c.merge(
            &[json!(null), json!("str"), json!({"title": "no id"}), json!({"id": null}), json!({"id": 1})],
            OfferSource::Observed,
            RenderMode::Refresh,
        );
        assert_eq!(added.len(), 1);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn duplicate_within_one_call_is_new_once() {
        let view = Arc::new(RecordingView::closed());
        let c = collector(&view);
        let added = c.merge(&[json!({"id": 1}), json!({"id": 1, "v": 2})], OfferSource::Observed, RenderMode::Refresh);
        assert_eq!(added.len(), 1);
        assert_eq!(c.get("1").unwrap().raw["v"], 2);
    }

    #[test]
    fn closed_view_is_not_rendered() {
        let view = Arc::new(RecordingView::closed());
        let c = collector(&view);
        c.merge(&[json!({"id": 1})], OfferSource::Observed, RenderMode::Refresh);
        assert_eq!(view.render_count(), 0);
    }

    #[test]
    fn open_view_rerenders_on_merge_unless_skipped() {
        let view = Arc::new(RecordingView::closed());
        let c = collector(&view);
        c.open_view();
        assert_eq!(view.render_count(), 1);
        c.merge(&[json!({"id": 1, "map": {"lat": 1.0, "lon": 1.0}})], OfferSource::Observed, RenderMode::Refresh);
        assert_eq!(view.render_count(), 2);
        assert_eq!(view.last_scene().unwrap().markers.len(), 1);
        c.merge(&[json!({"id": 2})], OfferSource::Continuation(1), RenderMode::Skip);
        assert_eq!(view.render_count(), 2);
    }

    #[tokio::test]
    async fn incremental_insert_adds_located_only_and_sets_status() {
        let view = Arc::new(RecordingView::closed());
        let c = collector(&view);
        c.open_view();
        let added = c.merge(
            &[json!({"id": 1, "map": {"lat": 1.0, "lon": 1.0}}), json!({"id": 2})],
            OfferSource::Continuation(1),
            RenderMode::Skip,
        );
        c.insert_incrementally(&added).await;
        assert_eq!(view.inserted_ids(), vec!["1".to_string()]);
        assert_eq!(view.status().as_deref(), Some("Points on map: 1"));
    }

    #[tokio::test]
    async fn incremental_insert_is_noop_when_closed() {
        let view = Arc::new(RecordingView::closed());
        let c = collector(&view);
        let added = c.merge(&[json!({"id": 1, "map": {"lat": 1.0, "lon": 1.0}})], OfferSource::Continuation(1), RenderMode::Skip);
        c.insert_incrementally(&added).await;
        assert!(view.inserted_ids().is_empty());
        assert!(view.status().is_none());
    }

    #[test]
    fn preference_change_rerenders() {
        let view = Arc::new(RecordingView::closed());
        let c = collector(&view);
        c.open_view();
        let prefs = c.update_preferences(Some(true), None);
        assert!(prefs.grouping);
        assert!(prefs.price_coloring);
        assert_eq!(view.render_count(), 2);
        assert!(view.last_scene().unwrap().grouping);
    }
}
