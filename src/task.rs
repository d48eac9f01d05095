// 🏃 Task Runner - one config file in, one rendered report out
//
// A task owns every collection it builds. Several tasks run side by side
// on a rayon pool; the only thing they share is the console, which is
// locked for the whole of one report so outputs never interleave.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::{OutputFormat, TaskConfig};
use crate::observers::Observers;
use crate::parser::{load_observations, Dataset};
use crate::report::{entries, render_json, render_markdown, ComparisonReport, TaskReport, Totals};
use crate::seasons::Seasons;
use crate::taxon_list::TaxonList;

// ============================================================================
// ANALYSIS (the collections built from one record set)
// ============================================================================

#[derive(Debug, Default)]
pub struct Analysis {
    pub seasons: Seasons,
    pub observers: Observers,
    pub needs_id: TaxonList,

    /// Raw needs-id rows, before deduplication
    pub needs_id_rows: usize,
    pub research_rows: usize,
    pub ignored_rows: usize,
}

impl Analysis {
    pub fn build(dataset: Dataset) -> Self {
        let mut analysis = Analysis {
            research_rows: dataset.research.len(),
            needs_id_rows: dataset.needs_id.len(),
            ignored_rows: dataset.ignored + dataset.unidentified,
            ..Analysis::default()
        };

        for observation in dataset.research {
            // Observers only see rows the seasons accepted
            if analysis.seasons.insert(observation.clone()) {
                analysis.observers.insert(observation);
            }
        }
        analysis.needs_id.extend(dataset.needs_id);
        analysis
    }

    /// Research rows that collapsed into an existing observation
    pub fn duplicates(&self) -> usize {
        self.research_rows - self.seasons.all().observation_count()
    }

    /// Taxa seen only on needs-id rows
    pub fn needs_id_only(&self) -> TaxonList {
        self.needs_id.difference(self.seasons.all())
    }

    pub fn report(
        &self,
        config: &TaskConfig,
        comparisons: &[(String, TaxonList)],
    ) -> Result<TaskReport> {
        let all = self.seasons.all();
        let lost = self
            .seasons
            .lost(config.modern_window)
            .context("Failed to compute lost taxa")?;

        let comparisons = comparisons
            .iter()
            .map(|(name, theirs)| ComparisonReport {
                name: name.clone(),
                unique: entries(&all.difference(theirs)),
                wanted: entries(&theirs.difference(all)),
            })
            .collect();

        Ok(TaskReport {
            title: config.title.clone(),
            source: config.source.display().to_string(),
            period: config.period,
            last_season: self.seasons.last_season().map(str::to_string),
            modern_window: config.modern_window,
            totals: Totals {
                observations: all.observation_count(),
                taxa: all.taxon_count(),
                seasons: self.seasons.len(),
                observers: self.observers.len(),
                needs_id_rows: self.needs_id_rows,
                ignored_rows: self.ignored_rows,
                duplicates: self.duplicates(),
            },
            history: self.seasons.history().to_vec(),
            news: entries(self.seasons.news()),
            lost: entries(&lost),
            singletons: entries(self.seasons.singletons()),
            top_observers: self
                .observers
                .top(config.top_min_taxa, config.top_count)
                .iter()
                .map(|r| r.summary())
                .collect(),
            needs_id_only: entries(&self.needs_id_only()),
            comparisons,
        })
    }
}

// ============================================================================
// SINGLE TASK
// ============================================================================

/// Load, aggregate and report for one config
pub fn run_task(config: &TaskConfig) -> Result<TaskReport> {
    let dataset = load_observations(&config.source, &config.period)?;
    let analysis = Analysis::build(dataset);

    let comparisons = config
        .comparisons
        .iter()
        .map(|c| {
            let dataset = load_observations(&c.source, &config.period)
                .with_context(|| format!("Failed to load comparison set {:?}", c.name))?;
            let taxa: TaxonList = dataset.research.into_iter().collect();
            Ok((c.name.clone(), taxa))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = analysis.report(config, &comparisons)?;
    info!(
        title = %report.title,
        taxa = report.totals.taxa,
        seasons = report.totals.seasons,
        duplicates = report.totals.duplicates,
        "report ready"
    );
    Ok(report)
}

pub fn render(report: &TaskReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(report)),
        OutputFormat::Json => render_json(report),
    }
}

// ============================================================================
// RUNNER (many tasks)
// ============================================================================

/// Result of one config file
#[derive(Debug)]
pub struct TaskOutcome {
    pub config_path: PathBuf,
    pub result: Result<Option<PathBuf>>,
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct TaskRunner {
    pool: rayon::ThreadPool,
    format_override: Option<OutputFormat>,
    console: Mutex<Box<dyn Write + Send>>,
}

impl TaskRunner {
    /// `jobs = None` lets rayon pick the worker count
    pub fn new(jobs: Option<usize>, format_override: Option<OutputFormat>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.unwrap_or(0))
            .thread_name(|i| format!("season-task-{}", i))
            .build()
            .context("Failed to build worker pool")?;

        Ok(TaskRunner {
            pool,
            format_override,
            console: Mutex::new(Box::new(io::stdout())),
        })
    }

    /// Send console reports somewhere other than stdout
    pub fn with_console(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.console = Mutex::new(writer);
        self
    }

    /// Run every config; a failure never stops the other tasks
    pub fn run_all(&self, config_paths: &[PathBuf]) -> Vec<TaskOutcome> {
        self.pool.install(|| {
            config_paths
                .par_iter()
                .map(|path| {
                    let result = self.run_one(path);
                    if let Err(e) = &result {
                        error!(config = %path.display(), "task failed: {:#}", e);
                    }
                    TaskOutcome {
                        config_path: path.clone(),
                        result,
                    }
                })
                .collect()
        })
    }

    /// Returns the output file, or None when the report went to the console
    fn run_one(&self, config_path: &Path) -> Result<Option<PathBuf>> {
        let config = TaskConfig::load(config_path)?;
        let report = run_task(&config)?;
        let format = self.format_override.unwrap_or(config.format);
        let rendered = render(&report, format)?;

        match &config.output {
            Some(output) => {
                if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
                    fs::create_dir_all(dir)
                        .with_context(|| format!("Failed to create output directory {:?}", dir))?;
                }
                fs::write(output, rendered)
                    .with_context(|| format!("Failed to write report to {:?}", output))?;
                info!(output = %output.display(), "report written");
                Ok(Some(output.clone()))
            }
            None => {
                self.write_console(&rendered)?;
                Ok(None)
            }
        }
    }

    fn write_console(&self, rendered: &str) -> Result<()> {
        let mut console = self.console.lock().unwrap_or_else(|poisoned| {
            warn!("console lock poisoned by an earlier task; continuing");
            poisoned.into_inner()
        });
        writeln!(console, "{}", rendered).context("Failed to write report to console")?;
        console.flush().context("Failed to flush console")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;
    use crate::season::Period;
    use chrono::NaiveDate;
    use std::sync::Arc;

    /// Cloneable in-memory console
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn obs(id: u64, taxon_id: i64, year: i32, login: &str) -> Observation {
        Observation::new(
            id,
            taxon_id,
            &format!("Taxon {}", taxon_id),
            login,
            NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            &Period::default(),
        )
    }

    fn config(modern_window: usize) -> TaskConfig {
        TaskConfig::from_yaml(
            &format!("source: x.csv\nmodern_window: {}\ntop: {{ count: 1, min_taxa: 1 }}\n", modern_window),
            Path::new("."),
            "test",
        )
        .unwrap()
    }

    fn dataset() -> Dataset {
        Dataset {
            research: vec![
                obs(1, 10, 2021, "alice"),
                obs(2, 20, 2022, "bob"),
                obs(2, 20, 2022, "bob"),
                obs(3, 10, 2022, "alice"),
            ],
            needs_id: vec![obs(4, 30, 2022, "carol"), obs(5, 20, 2022, "carol")],
            ignored: 1,
            unidentified: 0,
        }
    }

    #[test]
    fn test_analysis_counts() {
        let analysis = Analysis::build(dataset());
        assert_eq!(analysis.duplicates(), 1);
        assert_eq!(analysis.needs_id_rows, 2);
        assert_eq!(analysis.needs_id_only().ids().collect::<Vec<_>>(), vec![30]);
        assert_eq!(analysis.observers.len(), 2);
    }

    #[test]
    fn test_report_with_comparison() {
        let analysis = Analysis::build(dataset());
        let theirs: TaxonList = vec![obs(9, 20, 2022, "dave"), obs(8, 40, 2022, "dave")]
            .into_iter()
            .collect();

        let report = analysis
            .report(&config(1), &[("Park".to_string(), theirs)])
            .unwrap();

        assert_eq!(report.totals.taxa, 2);
        assert_eq!(report.totals.observations, 3);
        assert_eq!(report.totals.ignored_rows, 1);
        assert_eq!(report.last_season.as_deref(), Some("2022"));
        assert!(report.lost.is_empty());
        assert_eq!(report.top_observers.len(), 1);
        assert_eq!(report.top_observers[0].login, "alice");

        let park = &report.comparisons[0];
        assert_eq!(park.unique.iter().map(|e| e.taxon_id).collect::<Vec<_>>(), vec![10]);
        assert_eq!(park.wanted.iter().map(|e| e.taxon_id).collect::<Vec<_>>(), vec![40]);
    }

    #[test]
    fn test_report_fails_without_older_seasons() {
        let analysis = Analysis::build(dataset());
        let err = analysis.report(&config(3), &[]).unwrap_err();
        assert!(format!("{:#}", err).contains("modern window of 3"));
    }

    #[test]
    fn test_runner_isolates_failures() {
        let runner = TaskRunner::new(Some(2), None).unwrap();
        let outcomes = runner.run_all(&[
            PathBuf::from("/missing/one.yaml"),
            PathBuf::from("/missing/two.yaml"),
        ]);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_ok()));
        assert_eq!(outcomes[1].config_path, PathBuf::from("/missing/two.yaml"));
    }

    #[test]
    fn test_needs_id_rows_counts_raw_rows() {
        let mut data = dataset();
        data.needs_id.push(obs(4, 30, 2022, "carol"));

        let analysis = Analysis::build(data);
        assert_eq!(analysis.needs_id.observation_count(), 2);

        let report = analysis.report(&config(1), &[]).unwrap();
        assert_eq!(report.totals.needs_id_rows, 3);
    }

    #[test]
    fn test_repeated_id_in_another_season_not_counted_twice() {
        let mut data = dataset();
        // Same id as an existing 2021 row, re-dated into 2022
        data.research.push(obs(1, 10, 2022, "erin"));

        let analysis = Analysis::build(data);
        assert_eq!(analysis.seasons.all().observation_count(), 3);
        assert_eq!(analysis.duplicates(), 2);
        assert!(analysis.observers.get("erin").is_none());
    }

    #[test]
    fn test_console_reports_written_whole() {
        let dir = tempfile::tempdir().unwrap();
        let header = "id,observed_on,user_login,quality_grade,url,taxon_id,scientific_name,common_name,iconic_taxon_name\n";

        let mut paths = Vec::new();
        for (i, title) in ["Garden", "Park", "Meadow"].iter().enumerate() {
            let csv = format!(
                "{}{},2022-05-01,alice,research,u,{},Taxon {},,Aves\n{},2023-05-01,bob,research,u,{},Taxon {},,Aves\n",
                header,
                i * 10 + 1,
                i + 100,
                i + 100,
                i * 10 + 2,
                i + 200,
                i + 200
            );
            fs::write(dir.path().join(format!("{}.csv", i)), csv).unwrap();

            let path = dir.path().join(format!("{}.yaml", i));
            fs::write(
                &path,
                format!("title: {}\nsource: {}.csv\nmodern_window: 1\n", title, i),
            )
            .unwrap();
            paths.push(path);
        }

        let buffer = SharedBuffer::default();
        let runner = TaskRunner::new(Some(3), None)
            .unwrap()
            .with_console(Box::new(buffer.clone()));
        let outcomes = runner.run_all(&paths);

        assert!(outcomes.iter().all(|o| matches!(o.result, Ok(None))));

        let written = buffer.contents();
        let mut expected_len = 0;
        for path in &paths {
            let config = TaskConfig::load(path).unwrap();
            let rendered = render(&run_task(&config).unwrap(), config.format).unwrap();
            assert!(written.contains(&format!("{}\n", rendered)));
            expected_len += rendered.len() + 1;
        }
        assert_eq!(written.len(), expected_len);
    }
}
