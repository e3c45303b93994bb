use std::collections::HashMap;

use super::offer::Offer;

/// Latest known record per canonical id, iterated in first-insertion order.
#[derive(Debug, Default)]
pub struct OfferStore {
    entries: HashMap<String, Offer>,
    order: Vec<String>,
}

impl OfferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the whole record. Returns `true` when the id was not stored before.
    pub fn upsert(&mut self, offer: Offer) -> bool {
        let is_new = !self.entries.contains_key(&offer.id);
        if is_new {
            self.order.push(offer.id.clone());
        }
        self.entries.insert(offer.id.clone(), offer);
        is_new
    }

    pub fn get(&self, id: &str) -> Option<&Offer> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Offer> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn located_count(&self) -> usize {
        self.entries.values().filter(|o| o.is_located()).count()
    }
}
