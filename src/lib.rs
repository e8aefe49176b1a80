// Crash report: load a city collision export once, then build the four
// descriptive tables (top contributing factors, crashes per region, crashes
// per month, crashes per hour of day) and render them.
pub mod config;
pub mod crs;
pub mod error;
pub mod factors;
pub mod loader;
pub mod output;
pub mod regions;
pub mod render;
pub mod reports;
pub mod temporal;
pub mod types;
pub mod util;

use config::{Config, FACTOR_CHART, HOURLY_CHART, MONTHLY_CHART, REGION_CHART, SUMMARY_FILE};
use error::AnalysisError;
use loader::LoadReport;
use regions::Boundaries;
use reports::Reports;

/// Everything a run computed, kept for the caller after the files are written.
#[derive(Debug)]
pub struct RunOutcome {
    pub load: LoadReport,
    pub reports: Reports,
}

/// Load, aggregate, then write every table and chart into `config.out_dir`.
///
/// All four tables are computed before the first file is written.
pub fn run(config: &Config) -> Result<RunOutcome, AnalysisError> {
    let (data, load) = loader::load_and_clean(&config.input)?;
    print_load_report(&load);
    let boundaries = Boundaries::load(&config.boundaries, &config.name_property)?;
    let reports = reports::generate_reports(&data, &boundaries, config.parse_policy)?;
    log::debug!("aggregated {} records", data.len());
    write_outputs(config, &boundaries, &load, &reports)?;
    Ok(RunOutcome { load, reports })
}

fn print_load_report(load: &LoadReport) {
    println!(
        "Processing dataset... ({} rows loaded, {} duplicates removed)",
        util::format_int(load.total_rows),
        util::format_int(load.duplicate_rows)
    );
    println!(
        "Found {} contributing factor columns.",
        util::format_int(load.factor_slots)
    );
    if load.invalid_coordinates > 0 {
        println!(
            "Note: {} rows have unusable coordinates.",
            util::format_int(load.invalid_coordinates)
        );
    }
    println!();
}

fn write_outputs(
    config: &Config,
    boundaries: &Boundaries,
    load: &LoadReport,
    reports: &Reports,
) -> Result<(), AnalysisError> {
    std::fs::create_dir_all(&config.out_dir).map_err(error::OutputError::from)?;
    let rows = config.preview_rows;

    let file = config.artifact(FACTOR_CHART, "csv");
    output::write_csv(&file, &reports.factors)?;
    render::factor_chart(&config.artifact(FACTOR_CHART, "svg"), &reports.factors)?;
    let mut top_first = reports.factors.clone();
    top_first.reverse();
    output::preview_table(1, "Top 10 Crash Contributory Factors", None, &top_first, rows);
    println!("(Full table exported to {})", file.display());

    let file = config.artifact(REGION_CHART, "csv");
    output::write_csv(&file, &reports.region_rows)?;
    render::region_map(
        &config.artifact(REGION_CHART, "svg"),
        boundaries,
        &reports.regions,
        &reports.region_rows,
    )?;
    output::preview_table(
        2,
        "Crash Distribution over Regions",
        Some("coordinates first, BOROUGH label as fallback"),
        &reports.region_rows,
        rows,
    );
    println!("(Full table exported to {})", file.display());

    let monthly_rows = reports.monthly.rows();
    let file = config.artifact(MONTHLY_CHART, "csv");
    output::write_csv(&file, &monthly_rows)?;
    render::monthly_chart(&config.artifact(MONTHLY_CHART, "svg"), &reports.monthly.points)?;
    output::preview_table(
        3,
        "Monthly Crash Incidents",
        Some("trailing incomplete month excluded"),
        &monthly_rows,
        rows,
    );
    println!("(Full table exported to {})", file.display());

    let hourly_rows = reports.hourly.rows();
    let file = config.artifact(HOURLY_CHART, "csv");
    output::write_csv(&file, &hourly_rows)?;
    render::hourly_chart(&config.artifact(HOURLY_CHART, "svg"), &reports.hourly.points)?;
    output::preview_table(4, "Hourly Crash Incidents", None, &hourly_rows, rows);
    println!("(Full table exported to {})", file.display());

    let summary = reports::generate_summary(load, reports);
    let file = config.out_dir.join(SUMMARY_FILE);
    output::write_json(&file, &summary)?;
    println!(
        "\nSummary Stats ({}): {} unique crashes, {} placed by coordinates, {} by label",
        file.display(),
        util::format_int(summary.unique_rows),
        util::format_int(summary.crashes_by_geometry),
        util::format_int(summary.crashes_by_label)
    );
    Ok(())
}
