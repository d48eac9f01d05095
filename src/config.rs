// ⚙️ Task Configuration - one YAML file describes one report
//
// Relative paths inside the file resolve against the file's own directory,
// so a config and its exports can be moved around together.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::season::Period;

// ============================================================================
// RAW YAML SHAPE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    title: Option<String>,
    source: PathBuf,
    #[serde(default)]
    period: RawPeriod,
    #[serde(default, alias = "neighbours")]
    comparisons: Vec<RawComparison>,
    #[serde(default)]
    top: RawTop,
    #[serde(default = "default_modern_window")]
    modern_window: usize,
    output: Option<PathBuf>,
    #[serde(default)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPeriod {
    #[serde(default = "default_begin")]
    begin: u32,
    #[serde(default = "default_end")]
    end: u32,
}

impl Default for RawPeriod {
    fn default() -> Self {
        RawPeriod {
            begin: default_begin(),
            end: default_end(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawComparison {
    name: Option<String>,
    source: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTop {
    #[serde(default = "default_top")]
    count: usize,
    #[serde(default = "default_top")]
    min_taxa: usize,
}

impl Default for RawTop {
    fn default() -> Self {
        RawTop {
            count: default_top(),
            min_taxa: default_top(),
        }
    }
}

fn default_begin() -> u32 {
    1
}

fn default_end() -> u32 {
    12
}

fn default_top() -> usize {
    10
}

fn default_modern_window() -> usize {
    3
}

// ============================================================================
// VALIDATED CONFIG
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub name: String,
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    pub title: String,
    pub source: PathBuf,
    pub period: Period,
    pub comparisons: Vec<Comparison>,
    pub top_count: usize,
    pub top_min_taxa: usize,
    pub modern_window: usize,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
}

impl TaskConfig {
    /// Read and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let fallback_title = file_stem(path);

        Self::from_yaml(&content, base, &fallback_title)
            .with_context(|| format!("Invalid config file: {:?}", path))
    }

    /// Parse YAML text; relative paths are resolved against `base`
    pub fn from_yaml(content: &str, base: &Path, fallback_title: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content).context("Failed to parse config YAML")?;

        let period = Period::new(raw.period.begin, raw.period.end)?;

        if raw.modern_window == 0 {
            return Err(CoreError::Config("modern_window must be at least 1".to_string()).into());
        }

        let comparisons = raw
            .comparisons
            .into_iter()
            .map(|c| {
                let source = resolve(base, &c.source);
                Comparison {
                    name: c.name.unwrap_or_else(|| file_stem(&source)),
                    source,
                }
            })
            .collect();

        Ok(TaskConfig {
            title: raw.title.unwrap_or_else(|| fallback_title.to_string()),
            source: resolve(base, &raw.source),
            period,
            comparisons,
            top_count: raw.top.count,
            top_min_taxa: raw.top.min_taxa,
            modern_window: raw.modern_window,
            output: raw.output.map(|p| resolve(base, &p)),
            format: raw.format,
        })
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "observations".to_string())
}
