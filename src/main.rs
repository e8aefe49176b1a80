// Entry point: parse the few path overrides, then do one full run.
use clap::Parser;
use crash_report::config::{Config, DEFAULT_BOUNDARIES, DEFAULT_INPUT};
use crash_report::error::AnalysisError;
use crash_report::regions::DEFAULT_NAME_PROPERTY;
use crash_report::temporal::ParsePolicy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "crash_report",
    about = "Summarize and chart a motor vehicle collision export"
)]
struct Cli {
    /// Collision CSV export
    #[arg(long, default_value = DEFAULT_INPUT)]
    input: PathBuf,
    /// GeoJSON FeatureCollection of region boundaries
    #[arg(long, default_value = DEFAULT_BOUNDARIES)]
    boundaries: PathBuf,
    /// Feature property holding the region name
    #[arg(long, default_value = DEFAULT_NAME_PROPERTY)]
    name_property: String,
    /// Directory for charts, CSV tables and summary.json
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Drop rows with unparseable dates/times instead of aborting
    #[arg(long)]
    skip_unparseable: bool,
    /// Rows shown per table preview
    #[arg(long, default_value_t = 3)]
    preview_rows: usize,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            input: cli.input,
            boundaries: cli.boundaries,
            name_property: cli.name_property,
            out_dir: cli.out_dir,
            parse_policy: if cli.skip_unparseable {
                ParsePolicy::Skip
            } else {
                ParsePolicy::Abort
            },
            preview_rows: cli.preview_rows,
        }
    }
}

fn main() -> Result<(), AnalysisError> {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    let config = Config::from(Cli::parse());
    log::debug!("{config:?}");
    match crash_report::run(&config) {
        Ok(outcome) => {
            log::info!(
                "Done: {} crashes summarized into {}",
                outcome.load.unique_rows,
                config.out_dir.display()
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Run aborted: {e}");
            Err(e)
        }
    }
}
