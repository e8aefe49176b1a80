use crate::error::AnalysisError;
use crate::factors::{count_factors, top_factors, FACTOR_ALIASES, TOP_FACTORS};
use crate::loader::LoadReport;
use crate::regions::{assign_regions, Boundaries, RegionCounts};
use crate::temporal::{hour_label, hourly_counts, monthly_counts, ParsePolicy, TemporalSeries};
use crate::types::{Dataset, FactorCount, RegionCountRow, SummaryStats};
use chrono::NaiveDate;

/// The four summary tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Reports {
    pub factors: Vec<FactorCount>,
    pub distinct_factors: usize,
    pub regions: RegionCounts,
    pub region_rows: Vec<RegionCountRow>,
    pub monthly: TemporalSeries<NaiveDate>,
    pub hourly: TemporalSeries<u32>,
}

/// Run every aggregation over `data`. Nothing is written here, so a failure
/// in any of them leaves no partial output behind.
pub fn generate_reports(
    data: &Dataset,
    boundaries: &Boundaries,
    policy: ParsePolicy,
) -> Result<Reports, AnalysisError> {
    let factors = top_factors(data, &FACTOR_ALIASES, TOP_FACTORS);
    let distinct_factors = count_factors(data, &FACTOR_ALIASES).len();
    log::info!("{distinct_factors} distinct contributing factors");

    let regions = assign_regions(data, boundaries)?;
    let region_rows = regions.rows(boundaries);
    log::info!(
        "{} crashes placed in {} regions",
        regions.total(),
        regions.counts.len()
    );

    let monthly = monthly_counts(data, policy)?;
    let hourly = hourly_counts(data, policy)?;

    Ok(Reports {
        factors,
        distinct_factors,
        regions,
        region_rows,
        monthly,
        hourly,
    })
}

pub fn generate_summary(load: &LoadReport, reports: &Reports) -> SummaryStats {
    let month = |p: Option<&(NaiveDate, usize)>| p.map(|(d, _)| d.format("%Y-%m").to_string());
    SummaryStats {
        total_rows: load.total_rows,
        duplicate_rows: load.duplicate_rows,
        unique_rows: load.unique_rows,
        distinct_factors: reports.distinct_factors,
        crashes_by_geometry: reports.regions.by_geometry,
        crashes_by_label: reports.regions.by_label,
        unassigned: reports.regions.unassigned,
        first_month: month(reports.monthly.points.first()),
        last_month: month(reports.monthly.points.last()),
        peak_hour: reports.hourly.peak().map(hour_label),
        skipped_dates: reports.monthly.skipped,
        skipped_times: reports.hourly.skipped,
    }
}
