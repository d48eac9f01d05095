// 🔭 Observation - one sighting of one taxon by one observer on one day
// Immutable value. Identity for deduplication is `external_id`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::season::Period;

/// Display rank for groups outside the known table.
///
/// Kept at the legacy value rather than `KNOWN_GROUPS.len()`; only the
/// relative order matters, so anything above 11 sorts the same.
pub const OTHER_GROUP_RANK: u8 = 20;

// ============================================================================
// ICONIC GROUP
// ============================================================================

/// Coarse taxonomic group used for display ordering
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IconicGroup {
    Aves,
    Amphibia,
    Reptilia,
    Mammalia,
    Actinopterygii,
    Mollusca,
    Arachnida,
    Insecta,
    Plantae,
    Fungi,
    Protozoa,
    Unknown,
    Other(String),
}

const KNOWN_GROUPS: [IconicGroup; 12] = [
    IconicGroup::Aves,
    IconicGroup::Amphibia,
    IconicGroup::Reptilia,
    IconicGroup::Mammalia,
    IconicGroup::Actinopterygii,
    IconicGroup::Mollusca,
    IconicGroup::Arachnida,
    IconicGroup::Insecta,
    IconicGroup::Plantae,
    IconicGroup::Fungi,
    IconicGroup::Protozoa,
    IconicGroup::Unknown,
];

impl IconicGroup {
    /// Parse the `iconic_taxon_name` column; empty means Unknown
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            return IconicGroup::Unknown;
        }
        KNOWN_GROUPS
            .iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| IconicGroup::Other(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            IconicGroup::Aves => "Aves",
            IconicGroup::Amphibia => "Amphibia",
            IconicGroup::Reptilia => "Reptilia",
            IconicGroup::Mammalia => "Mammalia",
            IconicGroup::Actinopterygii => "Actinopterygii",
            IconicGroup::Mollusca => "Mollusca",
            IconicGroup::Arachnida => "Arachnida",
            IconicGroup::Insecta => "Insecta",
            IconicGroup::Plantae => "Plantae",
            IconicGroup::Fungi => "Fungi",
            IconicGroup::Protozoa => "Protozoa",
            IconicGroup::Unknown => "Unknown",
            IconicGroup::Other(name) => name,
        }
    }

    /// Position in the display table (birds first, unknown last)
    pub fn display_rank(&self) -> u8 {
        match self {
            IconicGroup::Other(_) => OTHER_GROUP_RANK,
            known => KNOWN_GROUPS
                .iter()
                .position(|g| g == known)
                .map(|i| i as u8)
                .unwrap_or(OTHER_GROUP_RANK),
        }
    }
}

impl From<String> for IconicGroup {
    fn from(name: String) -> Self {
        IconicGroup::from_name(&name)
    }
}

impl From<IconicGroup> for String {
    fn from(group: IconicGroup) -> Self {
        group.as_str().to_string()
    }
}

// ============================================================================
// QUALITY GRADE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QualityGrade {
    /// Community-confirmed; counts toward every statistic
    Research,

    /// Awaiting identification; only feeds the needs-id side list
    NeedsId,

    /// Casual and anything else; ignored
    Other(String),
}

impl QualityGrade {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "research" => QualityGrade::Research,
            "needs_id" | "needs-id" => QualityGrade::NeedsId,
            other => QualityGrade::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            QualityGrade::Research => "research",
            QualityGrade::NeedsId => "needs_id",
            QualityGrade::Other(name) => name,
        }
    }
}

impl From<String> for QualityGrade {
    fn from(name: String) -> Self {
        QualityGrade::from_name(&name)
    }
}

impl From<QualityGrade> for String {
    fn from(grade: QualityGrade) -> Self {
        grade.as_str().to_string()
    }
}

// ============================================================================
// RAW ROW (what the CSV export gives us)
// ============================================================================

/// One row of an iNaturalist-style export, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationRow {
    #[serde(rename = "id")]
    pub external_id: u64,

    #[serde(rename = "observed_on")]
    pub observed_on: String,

    #[serde(rename = "user_login")]
    pub observer_login: String,

    #[serde(rename = "quality_grade")]
    pub quality_grade: String,

    #[serde(rename = "url", default)]
    pub external_url: String,

    /// Empty for observations nobody has identified yet
    #[serde(rename = "taxon_id", default)]
    pub taxon_id: Option<i64>,

    #[serde(rename = "scientific_name", default)]
    pub scientific_name: String,

    #[serde(rename = "common_name", default)]
    pub common_name: String,

    #[serde(rename = "iconic_taxon_name", default)]
    pub iconic_taxon_name: String,
}

// ============================================================================
// OBSERVATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub taxon_id: i64,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub iconic_group: IconicGroup,
    pub observer_login: String,
    pub external_id: u64,
    pub external_url: String,
    pub quality_grade: QualityGrade,

    /// Private so the season label can never drift from the date
    observed_date: NaiveDate,

    /// Derived from `observed_date` at construction
    season: String,
}

impl Observation {
    /// Research-grade observation with the required fields; see `with_*` for the rest
    pub fn new(
        external_id: u64,
        taxon_id: i64,
        scientific_name: &str,
        observer_login: &str,
        observed_date: NaiveDate,
        period: &Period,
    ) -> Self {
        Observation {
            taxon_id,
            scientific_name: scientific_name.to_string(),
            common_name: None,
            iconic_group: IconicGroup::Unknown,
            observer_login: observer_login.to_string(),
            external_id,
            external_url: String::new(),
            observed_date,
            quality_grade: QualityGrade::Research,
            season: period.classify(observed_date),
        }
    }

    /// Validate a raw row. `Ok(None)` for rows without a taxon.
    pub fn from_row(row: ObservationRow, period: &Period) -> CoreResult<Option<Self>> {
        let Some(taxon_id) = row.taxon_id else {
            return Ok(None);
        };

        let observed_date = parse_date(&row.observed_on).ok_or_else(|| CoreError::MalformedDate {
            external_id: row.external_id,
            value: row.observed_on.clone(),
        })?;

        let common_name = Some(row.common_name.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Some(Observation {
            taxon_id,
            scientific_name: row.scientific_name.trim().to_string(),
            common_name,
            iconic_group: IconicGroup::from_name(&row.iconic_taxon_name),
            observer_login: row.observer_login,
            external_id: row.external_id,
            external_url: row.external_url,
            observed_date,
            quality_grade: QualityGrade::from_name(&row.quality_grade),
            season: period.classify(observed_date),
        }))
    }

    pub fn with_common_name(mut self, common_name: &str) -> Self {
        self.common_name = Some(common_name.to_string());
        self
    }

    pub fn with_group(mut self, group: IconicGroup) -> Self {
        self.iconic_group = group;
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.external_url = url.to_string();
        self
    }

    pub fn with_quality(mut self, grade: QualityGrade) -> Self {
        self.quality_grade = grade;
        self
    }

    pub fn is_research(&self) -> bool {
        self.quality_grade == QualityGrade::Research
    }

    pub fn observed_date(&self) -> NaiveDate {
        self.observed_date
    }

    /// Season label, fixed when the observation was built
    pub fn season(&self) -> &str {
        &self.season
    }
}

/// Accept plain dates and the datetime form some exports use
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, observed_on: &str, taxon_id: Option<i64>) -> ObservationRow {
        ObservationRow {
            external_id: id,
            observed_on: observed_on.to_string(),
            observer_login: "alice".to_string(),
            quality_grade: "research".to_string(),
            external_url: format!("https://www.inaturalist.org/observations/{}", id),
            taxon_id,
            scientific_name: " Turdus merula ".to_string(),
            common_name: "".to_string(),
            iconic_taxon_name: "Aves".to_string(),
        }
    }

    #[test]
    fn test_from_row_derives_season() {
        let period = Period::new(9, 8).unwrap();
        let obs = Observation::from_row(row(1, "2023-03-01", Some(12716)), &period)
            .unwrap()
            .unwrap();

        assert_eq!(obs.season(), "2022-2023");
        assert_eq!(obs.scientific_name, "Turdus merula");
        assert_eq!(obs.common_name, None);
        assert_eq!(obs.iconic_group, IconicGroup::Aves);
        assert!(obs.is_research());
    }

    #[test]
    fn test_from_row_accepts_datetime() {
        let obs = Observation::from_row(row(1, "2023-03-01 10:22:00 +0100", Some(1)), &Period::default())
            .unwrap()
            .unwrap();
        assert_eq!(obs.observed_date(), NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
    }

    #[test]
    fn test_from_row_malformed_date() {
        let err = Observation::from_row(row(7, "03/01/2023", Some(1)), &Period::default()).unwrap_err();
        assert_eq!(
            err,
            CoreError::MalformedDate {
                external_id: 7,
                value: "03/01/2023".to_string()
            }
        );
    }

    #[test]
    fn test_from_row_without_taxon_is_skipped() {
        let result = Observation::from_row(row(1, "2023-03-01", None), &Period::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_group_display_rank() {
        assert_eq!(IconicGroup::Aves.display_rank(), 0);
        assert_eq!(IconicGroup::Unknown.display_rank(), 11);
        assert_eq!(IconicGroup::from_name("Chromista").display_rank(), OTHER_GROUP_RANK);
        assert_eq!(IconicGroup::from_name(""), IconicGroup::Unknown);
        assert_eq!(IconicGroup::from_name("insecta"), IconicGroup::Insecta);
    }

    #[test]
    fn test_quality_grade_aliases() {
        assert_eq!(QualityGrade::from_name("needs_id"), QualityGrade::NeedsId);
        assert_eq!(QualityGrade::from_name("Needs-ID"), QualityGrade::NeedsId);
        assert_eq!(
            QualityGrade::from_name("casual"),
            QualityGrade::Other("casual".to_string())
        );
    }
}
