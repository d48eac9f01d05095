// 📚 Taxon List - taxon_id-keyed collection with merge and difference
//
// One Taxon per taxon_id. Inserting an Observation or a Taxon under an
// existing id merges into it; otherwise a new entry is created.
// `merge` and `difference` are pure set operations over the id space.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::observation::Observation;
use crate::taxon::Taxon;

// ============================================================================
// INSERT ITEM
// ============================================================================

/// Anything a TaxonList can absorb
#[derive(Debug, Clone)]
pub enum TaxonItem {
    Observation(Observation),
    Taxon(Taxon),
}

impl TaxonItem {
    pub fn taxon_id(&self) -> i64 {
        match self {
            TaxonItem::Observation(o) => o.taxon_id,
            TaxonItem::Taxon(t) => t.taxon_id(),
        }
    }
}

impl From<Observation> for TaxonItem {
    fn from(observation: Observation) -> Self {
        TaxonItem::Observation(observation)
    }
}

impl From<Taxon> for TaxonItem {
    fn from(taxon: Taxon) -> Self {
        TaxonItem::Taxon(taxon)
    }
}

// ============================================================================
// TAXON LIST
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonList {
    taxa: BTreeMap<i64, Taxon>,
}

impl TaxonList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation or a whole taxon, merging on taxon_id
    pub fn insert(&mut self, item: impl Into<TaxonItem>) {
        match item.into() {
            TaxonItem::Observation(observation) => match self.taxa.get_mut(&observation.taxon_id) {
                Some(taxon) => {
                    taxon.absorb_observation(observation);
                }
                None => {
                    self.taxa
                        .insert(observation.taxon_id, Taxon::from_observation(observation));
                }
            },
            TaxonItem::Taxon(incoming) => match self.taxa.get_mut(&incoming.taxon_id()) {
                Some(taxon) => taxon.absorb_taxon(&incoming),
                None => {
                    self.taxa.insert(incoming.taxon_id(), incoming);
                }
            },
        }
    }

    /// Union of both lists; shared taxa are merged (self's names win)
    pub fn merge(&self, other: &TaxonList) -> TaxonList {
        let mut merged = self.clone();
        merged.merge_in(other);
        merged
    }

    /// In-place union, for running accumulations
    pub fn merge_in(&mut self, other: &TaxonList) {
        for taxon in other.taxa.values() {
            self.insert(taxon.clone());
        }
    }

    /// Taxa of self whose id does not occur in other, carried through whole
    pub fn difference(&self, other: &TaxonList) -> TaxonList {
        let taxa = self
            .taxa
            .iter()
            .filter(|(id, _)| !other.taxa.contains_key(id))
            .map(|(id, taxon)| (*id, taxon.clone()))
            .collect();
        TaxonList { taxa }
    }

    /// Keep only taxa matching a predicate
    pub fn filter<F>(&self, mut predicate: F) -> TaxonList
    where
        F: FnMut(&Taxon) -> bool,
    {
        let taxa = self
            .taxa
            .iter()
            .filter(|(_, taxon)| predicate(taxon))
            .map(|(id, taxon)| (*id, taxon.clone()))
            .collect();
        TaxonList { taxa }
    }

    pub fn get(&self, taxon_id: i64) -> Option<&Taxon> {
        self.taxa.get(&taxon_id)
    }

    /// Look up by an external key (CLI argument, config value, URL segment)
    pub fn lookup(&self, raw: &str) -> CoreResult<Option<&Taxon>> {
        let taxon_id: i64 = raw
            .trim()
            .parse()
            .map_err(|_| CoreError::InvalidKey(raw.to_string()))?;
        Ok(self.get(taxon_id))
    }

    pub fn contains(&self, taxon_id: i64) -> bool {
        self.taxa.contains_key(&taxon_id)
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Number of distinct taxa
    pub fn taxon_count(&self) -> usize {
        self.taxa.len()
    }

    /// Sum of member taxon sizes
    pub fn observation_count(&self) -> usize {
        self.taxa.values().map(Taxon::observation_count).sum()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.taxa.keys().copied()
    }

    /// Taxa in display order: scientific name, then group rank, then id
    pub fn iter(&self) -> std::vec::IntoIter<&Taxon> {
        let mut taxa: Vec<&Taxon> = self.taxa.values().collect();
        taxa.sort_by(|a, b| display_order(a, b));
        taxa.into_iter()
    }
}

fn display_order(a: &Taxon, b: &Taxon) -> Ordering {
    a.scientific_name
        .cmp(&b.scientific_name)
        .then_with(|| a.iconic_group.display_rank().cmp(&b.iconic_group.display_rank()))
        .then_with(|| a.taxon_id().cmp(&b.taxon_id()))
}

impl<'a> IntoIterator for &'a TaxonList {
    type Item = &'a Taxon;
    type IntoIter = std::vec::IntoIter<&'a Taxon>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Into<TaxonItem>> Extend<T> for TaxonList {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T: Into<TaxonItem>> FromIterator<T> for TaxonList {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = TaxonList::new();
        list.extend(iter);
        list
    }
}
