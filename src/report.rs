// 📝 Task Report - owned snapshot of every computed view, plus renderers
//
// The engine never formats anything; this module turns the views into
// Markdown or JSON once they are final.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;

use crate::observers::ObserverSummary;
use crate::season::Period;
use crate::seasons::SeasonSummary;
use crate::taxon::Taxon;
use crate::taxon_list::TaxonList;

// ============================================================================
// REPORT TYPES
// ============================================================================

/// One listed taxon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonEntry {
    pub taxon_id: i64,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub group: String,
    pub observations: usize,
    pub first_observed: Option<NaiveDate>,
    pub last_observed: Option<NaiveDate>,
    pub url: Option<String>,
}

impl From<&Taxon> for TaxonEntry {
    fn from(taxon: &Taxon) -> Self {
        TaxonEntry {
            taxon_id: taxon.taxon_id(),
            scientific_name: taxon.scientific_name.clone(),
            common_name: taxon.common_name.clone(),
            group: taxon.iconic_group.as_str().to_string(),
            observations: taxon.observation_count(),
            first_observed: taxon.first_observed(),
            last_observed: taxon.last_observed(),
            url: taxon
                .latest()
                .map(|o| o.external_url.clone())
                .filter(|u| !u.is_empty()),
        }
    }
}

/// Snapshot a TaxonList in display order
pub fn entries(list: &TaxonList) -> Vec<TaxonEntry> {
    list.iter().map(TaxonEntry::from).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub observations: usize,
    pub taxa: usize,
    pub seasons: usize,
    pub observers: usize,
    pub needs_id_rows: usize,
    pub ignored_rows: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    pub name: String,

    /// In our set, missing from theirs
    pub unique: Vec<TaxonEntry>,

    /// In their set, missing from ours
    pub wanted: Vec<TaxonEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub title: String,
    pub source: String,
    pub period: Period,
    pub last_season: Option<String>,
    pub modern_window: usize,
    pub totals: Totals,
    pub history: Vec<SeasonSummary>,
    pub news: Vec<TaxonEntry>,
    pub lost: Vec<TaxonEntry>,
    pub singletons: Vec<TaxonEntry>,
    pub top_observers: Vec<ObserverSummary>,
    pub needs_id_only: Vec<TaxonEntry>,
    pub comparisons: Vec<ComparisonReport>,
}

// ============================================================================
// RENDERING
// ============================================================================

/// Anchor ids for one rendered document; a fresh sequence per render call
#[derive(Debug, Default)]
pub struct AnchorSequence {
    next: usize,
}

impl AnchorSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{}-{}", prefix, self.next)
    }
}

pub fn render_json(report: &TaskReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

pub fn render_markdown(report: &TaskReport) -> String {
    let mut anchors = AnchorSequence::new();
    let mut toc = String::new();
    let mut body = String::new();

    let mut section = |title: &str, content: String| {
        let anchor = anchors.next_id("section");
        let _ = writeln!(toc, "- [{}](#{})", title, anchor);
        let _ = writeln!(body, "<a id=\"{}\"></a>\n## {}\n\n{}", anchor, title, content);
    };

    let t = &report.totals;
    section(
        "Summary",
        format!(
            "| | |\n|---|---:|\n| Observations | {} |\n| Taxa | {} |\n| Seasons | {} |\n| Observers | {} |\n| Needs-ID rows | {} |\n| Duplicate rows | {} |\n",
            t.observations, t.taxa, t.seasons, t.observers, t.needs_id_rows, t.duplicates
        ),
    );

    let mut history = String::from("| Season | Observations | Taxa | New |\n|---|---:|---:|---:|\n");
    for row in &report.history {
        let _ = writeln!(
            history,
            "| {} | {} | {} | {} |",
            row.season, row.observations, row.taxa, row.news
        );
    }
    section("History", history);

    let season = report.last_season.as_deref().unwrap_or("-");
    section(&format!("New in {}", season), taxon_table(&report.news));
    section(
        &format!("Not seen in the last {} season(s)", report.modern_window),
        taxon_table(&report.lost),
    );
    section("Observed once", taxon_table(&report.singletons));

    let mut top = String::from("| # | Observer | Taxa | Observations |\n|---:|---|---:|---:|\n");
    for (rank, observer) in report.top_observers.iter().enumerate() {
        let _ = writeln!(
            top,
            "| {} | {} | {} | {} |",
            rank + 1,
            escape_cell(&observer.login),
            observer.taxa,
            observer.observations
        );
    }
    section("Top observers", top);

    section("Only needing ID", taxon_table(&report.needs_id_only));

    for comparison in &report.comparisons {
        section(
            &format!("Not in {}", comparison.name),
            taxon_table(&comparison.unique),
        );
        section(
            &format!("Only in {}", comparison.name),
            taxon_table(&comparison.wanted),
        );
    }

    format!(
        "# {}\n\nSource: `{}`, months {}-{}\n\n{}\n{}",
        report.title,
        report.source,
        report.period.first_month,
        report.period.last_month,
        toc,
        body
    )
}

fn taxon_table(entries: &[TaxonEntry]) -> String {
    if entries.is_empty() {
        return "_None._\n".to_string();
    }

    let mut out = String::from("| Taxon | Common name | Group | Obs. | Last seen |\n|---|---|---|---:|---|\n");
    for e in entries {
        let scientific = escape_cell(&e.scientific_name);
        let name = match &e.url {
            Some(url) => format!("[*{}*]({})", scientific, url.replace('|', "%7C")),
            None => format!("*{}*", scientific),
        };
        let last = e.last_observed.map(|d| d.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            name,
            escape_cell(e.common_name.as_deref().unwrap_or("")),
            escape_cell(&e.group),
            e.observations,
            last
        );
    }
    out
}

/// Names come straight from user exports; keep them from breaking the table
fn escape_cell(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '|' | '*' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
