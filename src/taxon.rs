// 🦉 Taxon - every observation of one species-level identity
//
// Names are fill-forward: once known they are never replaced by a later
// merge that lacks them. Observations stay sorted by date and are unique
// by `external_id`, so feeding the same export twice changes nothing.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::observation::{IconicGroup, Observation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Taxon {
    /// Key shared by every member observation; fixed at construction
    taxon_id: i64,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub iconic_group: IconicGroup,

    /// Sorted by (observed_date, external_id)
    observations: Vec<Observation>,

    #[serde(skip)]
    seen: HashSet<u64>,
}

impl Taxon {
    pub fn from_observation(observation: Observation) -> Self {
        let mut taxon = Taxon {
            taxon_id: observation.taxon_id,
            scientific_name: observation.scientific_name.clone(),
            common_name: observation.common_name.clone(),
            iconic_group: observation.iconic_group.clone(),
            observations: Vec::new(),
            seen: HashSet::new(),
        };
        taxon.absorb_observation(observation);
        taxon
    }

    /// Add one observation; duplicates (same `external_id`) are ignored
    ///
    /// Returns whether the observation was new.
    pub fn add(&mut self, observation: Observation) -> CoreResult<bool> {
        self.check_id(observation.taxon_id)?;
        Ok(self.absorb_observation(observation))
    }

    /// Merge another taxon's names and observations into this one
    pub fn merge(&mut self, other: &Taxon) -> CoreResult<()> {
        self.check_id(other.taxon_id)?;
        self.absorb_taxon(other);
        Ok(())
    }

    pub fn taxon_id(&self) -> i64 {
        self.taxon_id
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    pub fn first_observed(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.observed_date())
    }

    pub fn last_observed(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.observed_date())
    }

    /// Most recent observation, used as the taxon's link
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Common name if known, scientific name otherwise
    pub fn display_name(&self) -> &str {
        self.common_name.as_deref().unwrap_or(&self.scientific_name)
    }

    fn check_id(&self, found: i64) -> CoreResult<()> {
        if found != self.taxon_id {
            return Err(CoreError::TaxonMismatch {
                expected: self.taxon_id,
                found,
            });
        }
        Ok(())
    }

    // ========================================================================
    // UNCHECKED MERGES (callers guarantee matching taxon_id)
    // ========================================================================

    pub(crate) fn absorb_observation(&mut self, observation: Observation) -> bool {
        if !self.seen.insert(observation.external_id) {
            return false;
        }

        self.fill_names(
            &observation.scientific_name,
            observation.common_name.as_deref(),
            &observation.iconic_group,
        );

        let key = (observation.observed_date(), observation.external_id);
        let pos = self
            .observations
            .partition_point(|o| (o.observed_date(), o.external_id) < key);
        self.observations.insert(pos, observation);
        true
    }

    pub(crate) fn absorb_taxon(&mut self, other: &Taxon) {
        self.fill_names(
            &other.scientific_name,
            other.common_name.as_deref(),
            &other.iconic_group,
        );
        for observation in &other.observations {
            self.absorb_observation(observation.clone());
        }
    }

    fn fill_names(&mut self, scientific: &str, common: Option<&str>, group: &IconicGroup) {
        if self.scientific_name.is_empty() && !scientific.is_empty() {
            self.scientific_name = scientific.to_string();
        }
        if self.common_name.is_none() {
            self.common_name = common.map(str::to_string);
        }
        if self.iconic_group == IconicGroup::Unknown && *group != IconicGroup::Unknown {
            self.iconic_group = group.clone();
        }
    }
}
