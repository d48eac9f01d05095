// 🗓️ Seasons - observations partitioned by season label
//
// Derived views (history, news, singletons, all-season union) are built on
// first use and cached until the next insert.
//
// Labels sort chronologically by construction, so a BTreeMap keyed by the
// label iterates oldest season first.
//
// An external_id lands in at most one bucket: the first insert wins, even
// when a later row carries the same id under a different date.

use serde::Serialize;
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::observation::Observation;
use crate::taxon_list::TaxonList;

// ============================================================================
// SEASON SUMMARY (one history line)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonSummary {
    pub season: String,
    pub observations: usize,
    pub taxa: usize,

    /// Taxa not seen in any earlier season
    pub news: usize,
}

// ============================================================================
// SEASONS
// ============================================================================

#[derive(Debug, Default)]
pub struct Seasons {
    buckets: BTreeMap<String, TaxonList>,
    seen: HashSet<u64>,
    all: OnceCell<TaxonList>,
    history: OnceCell<Vec<SeasonSummary>>,
    news: OnceCell<TaxonList>,
    singletons: OnceCell<TaxonList>,
}

impl Seasons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route an observation into its season bucket
    ///
    /// Returns false when the external_id was already placed in any season.
    pub fn insert(&mut self, observation: Observation) -> bool {
        if !self.seen.insert(observation.external_id) {
            debug!(
                external_id = observation.external_id,
                season = observation.season(),
                "ignoring repeated observation"
            );
            return false;
        }

        self.invalidate();
        self.buckets
            .entry(observation.season().to_string())
            .or_default()
            .insert(observation);
        true
    }

    fn invalidate(&mut self) {
        self.all.take();
        self.history.take();
        self.news.take();
        self.singletons.take();
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, season: &str) -> Option<&TaxonList> {
        self.buckets.get(season)
    }

    /// Buckets, oldest season first
    pub fn seasons(&self) -> impl Iterator<Item = (&str, &TaxonList)> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn last_season(&self) -> Option<&str> {
        self.buckets.keys().next_back().map(String::as_str)
    }

    /// Union over every season
    pub fn all(&self) -> &TaxonList {
        self.all.get_or_init(|| union_of(self.buckets.values()))
    }

    /// Per-season counts with the number of first-time taxa
    pub fn history(&self) -> &[SeasonSummary] {
        self.history.get_or_init(|| {
            let mut earlier = TaxonList::new();
            let mut rows = Vec::with_capacity(self.buckets.len());

            for (season, taxa) in &self.buckets {
                let news = taxa.difference(&earlier).taxon_count();
                rows.push(SeasonSummary {
                    season: season.clone(),
                    observations: taxa.observation_count(),
                    taxa: taxa.taxon_count(),
                    news,
                });
                earlier.merge_in(taxa);
            }
            rows
        })
    }

    /// Taxa of the last season that no other season has
    pub fn news(&self) -> &TaxonList {
        self.news.get_or_init(|| {
            let mut newest_first = self.buckets.values().rev();
            match newest_first.next() {
                Some(last) => last.difference(&union_of(newest_first)),
                None => TaxonList::new(),
            }
        })
    }

    /// Taxa seen in older seasons but not in the last `modern_window` ones
    pub fn lost(&self, modern_window: usize) -> CoreResult<TaxonList> {
        let available = self.buckets.len();
        if modern_window >= available {
            return Err(CoreError::InsufficientSeasons {
                window: modern_window,
                available,
            });
        }

        let split = available - modern_window;
        let older = union_of(self.buckets.values().take(split));
        let modern = union_of(self.buckets.values().skip(split));
        let lost = older.difference(&modern);

        debug!(
            older_seasons = split,
            modern_seasons = modern_window,
            lost = lost.taxon_count(),
            "computed lost taxa"
        );
        Ok(lost)
    }

    /// Taxa with exactly one observation across all seasons
    pub fn singletons(&self) -> &TaxonList {
        self.singletons
            .get_or_init(|| self.all().filter(|taxon| taxon.observation_count() == 1))
    }
}

impl Extend<Observation> for Seasons {
    fn extend<I: IntoIterator<Item = Observation>>(&mut self, iter: I) {
        for observation in iter {
            self.insert(observation);
        }
    }
}

impl FromIterator<Observation> for Seasons {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        let mut seasons = Seasons::new();
        seasons.extend(iter);
        seasons
    }
}

fn union_of<'a>(lists: impl IntoIterator<Item = &'a TaxonList>) -> TaxonList {
    let mut union = TaxonList::new();
    for list in lists {
        union.merge_in(list);
    }
    union
}
