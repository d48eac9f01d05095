use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inat_season::{OutputFormat, TaskRunner};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Markdown,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Seasonal statistics for biodiversity observation exports
#[derive(Parser, Debug)]
#[command(name = "inat-season")]
#[command(version)]
struct Args {
    /// Task config files (YAML), one report each
    #[arg(default_value = "inat-season.yaml")]
    configs: Vec<PathBuf>,

    /// Number of tasks to run at once
    #[arg(short, long, env = "INAT_SEASON_JOBS")]
    jobs: Option<usize>,

    /// Output format for every task, overriding the configs
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.quiet { "inat_season=warn" } else { "inat_season=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Running {} task(s)", args.configs.len());

    let runner = TaskRunner::new(args.jobs, args.format.map(Into::into))?;
    let outcomes = runner.run_all(&args.configs);

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    for outcome in &outcomes {
        if let Ok(Some(output)) = &outcome.result {
            info!(
                "✓ {} → {}",
                outcome.config_path.display(),
                output.display()
            );
        }
    }

    if failed > 0 {
        eprintln!("❌ {} of {} task(s) failed", failed, outcomes.len());
        std::process::exit(1);
    }

    Ok(())
}
