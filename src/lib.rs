// iNat Season - Core Library
// Seasonal and comparative statistics over biodiversity observation exports

pub mod error;
pub mod season;
pub mod observation;
pub mod taxon;
pub mod taxon_list;
pub mod seasons;
pub mod observers;
pub mod parser;
pub mod config;
pub mod report;
pub mod task;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use season::Period;
pub use observation::{
    IconicGroup, Observation, ObservationRow, QualityGrade, OTHER_GROUP_RANK,
};
pub use taxon::Taxon;
pub use taxon_list::{TaxonItem, TaxonList};
pub use seasons::{SeasonSummary, Seasons};
pub use observers::{ObserverSummary, Observers, RankedObserver};
pub use parser::{load_observations, parse_observations, Dataset};
pub use config::{Comparison, OutputFormat, TaskConfig};
pub use report::{
    render_json, render_markdown, AnchorSequence, ComparisonReport, TaskReport, TaxonEntry, Totals,
};
pub use task::{render, run_task, Analysis, TaskOutcome, TaskRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
