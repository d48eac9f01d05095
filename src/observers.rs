// 👥 Observers - observations partitioned by observer login
// Ranking ties break on login ascending so output never depends on map order.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::observation::Observation;
use crate::taxon_list::TaxonList;

/// One row of the top-observers table
#[derive(Debug, Clone, Copy)]
pub struct RankedObserver<'a> {
    pub login: &'a str,
    pub taxa: &'a TaxonList,
}

/// Owned counts for a ranked observer, for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObserverSummary {
    pub login: String,
    pub taxa: usize,
    pub observations: usize,
}

impl RankedObserver<'_> {
    pub fn summary(&self) -> ObserverSummary {
        ObserverSummary {
            login: self.login.to_string(),
            taxa: self.taxa.taxon_count(),
            observations: self.taxa.observation_count(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Observers {
    by_login: BTreeMap<String, TaxonList>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, observation: Observation) {
        self.by_login
            .entry(observation.observer_login.clone())
            .or_default()
            .insert(observation);
    }

    pub fn get(&self, login: &str) -> Option<&TaxonList> {
        self.by_login.get(login)
    }

    pub fn len(&self) -> usize {
        self.by_login.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_login.is_empty()
    }

    /// Observers in login order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaxonList)> {
        self.by_login.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Observers with at least `min_taxon_count` taxa, most taxa first, at most `limit`
    ///
    /// Example:
    /// ```
    /// use inat_season::Observers;
    ///
    /// let observers = Observers::new();
    /// assert!(observers.top(10, 10).is_empty());
    /// ```
    pub fn top(&self, min_taxon_count: usize, limit: usize) -> Vec<RankedObserver<'_>> {
        let mut ranked: Vec<RankedObserver<'_>> = self
            .iter()
            .filter(|(_, taxa)| taxa.taxon_count() >= min_taxon_count)
            .map(|(login, taxa)| RankedObserver { login, taxa })
            .collect();

        ranked.sort_by(|a, b| {
            b.taxa
                .taxon_count()
                .cmp(&a.taxa.taxon_count())
                .then_with(|| a.login.cmp(b.login))
        });
        ranked.truncate(limit);
        ranked
    }
}

impl Extend<Observation> for Observers {
    fn extend<I: IntoIterator<Item = Observation>>(&mut self, iter: I) {
        for observation in iter {
            self.insert(observation);
        }
    }
}

impl FromIterator<Observation> for Observers {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        let mut observers = Observers::new();
        observers.extend(iter);
        observers
    }
}
