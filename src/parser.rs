// 📥 Observation Parser - CSV export → validated observations
//
// Splits rows by quality grade: research-grade rows feed every statistic,
// needs-id rows go to a side list, everything else is only counted.

use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::observation::{Observation, ObservationRow, QualityGrade};
use crate::season::Period;

/// Everything usable from one export file
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub research: Vec<Observation>,
    pub needs_id: Vec<Observation>,

    /// Rows of any other grade (casual, ...)
    pub ignored: usize,

    /// Rows without a taxon
    pub unidentified: usize,
}

impl Dataset {
    pub fn row_count(&self) -> usize {
        self.research.len() + self.needs_id.len() + self.ignored + self.unidentified
    }
}

/// Load an export file; dates are classified with `period`
pub fn load_observations(path: &Path, period: &Period) -> Result<Dataset> {
    let reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let dataset = read_rows(reader, period).with_context(|| format!("Failed to load {:?}", path))?;

    info!(
        file = %path.display(),
        research = dataset.research.len(),
        needs_id = dataset.needs_id.len(),
        ignored = dataset.ignored,
        unidentified = dataset.unidentified,
        "loaded observations"
    );
    Ok(dataset)
}

/// Parse CSV from any reader (used by tests and stdin-like sources)
pub fn parse_observations<R: io::Read>(input: R, period: &Period) -> Result<Dataset> {
    read_rows(csv::Reader::from_reader(input), period)
}

fn read_rows<R: io::Read>(mut reader: csv::Reader<R>, period: &Period) -> Result<Dataset> {
    let mut dataset = Dataset::default();

    for (index, result) in reader.deserialize::<ObservationRow>().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row = result.with_context(|| format!("Failed to deserialize row at line {}", line))?;
        let external_id = row.external_id;

        let Some(observation) = Observation::from_row(row, period)
            .with_context(|| format!("Bad observation at line {}", line))?
        else {
            debug!(external_id, line, "skipping observation without taxon");
            dataset.unidentified += 1;
            continue;
        };

        match observation.quality_grade {
            QualityGrade::Research => dataset.research.push(observation),
            QualityGrade::NeedsId => dataset.needs_id.push(observation),
            QualityGrade::Other(_) => dataset.ignored += 1,
        }
    }

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    const HEADER: &str =
        "id,observed_on,user_login,quality_grade,url,taxon_id,scientific_name,common_name,iconic_taxon_name\n";

    #[test]
    fn test_rows_split_by_grade() {
        let csv = format!(
            "{}{}{}{}{}",
            HEADER,
            "1,2023-04-01,alice,research,https://x/1,100,Bufo bufo,Common Toad,Amphibia\n",
            "2,2023-04-02,bob,needs_id,https://x/2,200,Rana,,Amphibia\n",
            "3,2023-04-03,bob,casual,https://x/3,300,Homo sapiens,Human,Mammalia\n",
            "4,2023-04-04,carol,needs_id,https://x/4,,,,\n",
        );

        let dataset = parse_observations(csv.as_bytes(), &Period::default()).unwrap();
        assert_eq!(dataset.research.len(), 1);
        assert_eq!(dataset.needs_id.len(), 1);
        assert_eq!(dataset.ignored, 1);
        assert_eq!(dataset.unidentified, 1);
        assert_eq!(dataset.row_count(), 4);

        let toad = &dataset.research[0];
        assert_eq!(toad.common_name.as_deref(), Some("Common Toad"));
        assert_eq!(toad.season(), "2023");
        assert_eq!(dataset.needs_id[0].common_name, None);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let csv = "id,extra,observed_on,user_login,quality_grade,url,taxon_id,scientific_name,common_name,iconic_taxon_name,place_guess\n\
                   1,x,2023-04-01,alice,research,u,100,Bufo bufo,,Amphibia,Somewhere\n";
        let dataset = parse_observations(csv.as_bytes(), &Period::default()).unwrap();
        assert_eq!(dataset.research.len(), 1);
    }

    #[test]
    fn test_malformed_date_aborts_with_line() {
        let csv = format!("{}{}", HEADER, "9,someday,alice,research,u,100,Bufo bufo,,Amphibia\n");
        let err = parse_observations(csv.as_bytes(), &Period::default()).unwrap_err();

        assert!(format!("{:#}", err).contains("line 2"));
        assert_eq!(
            err.downcast_ref::<CoreError>(),
            Some(&CoreError::MalformedDate {
                external_id: 9,
                value: "someday".to_string()
            })
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_observations(Path::new("/no/such/export.csv"), &Period::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open CSV file"));
    }
}
