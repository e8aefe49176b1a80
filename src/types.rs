use serde::{Deserialize, Serialize};
use tabled::Tabled;

pub const COLLISION_ID: &str = "COLLISION_ID";
pub const CRASH_DATE: &str = "CRASH DATE";
pub const CRASH_TIME: &str = "CRASH TIME";
pub const FACTOR_PREFIX: &str = "CONTRIBUTING FACTOR VEHICLE ";

/// The fixed columns of one CSV row. Factor slots are variable in number and
/// are read by position instead (see `loader`).
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "COLLISION_ID")]
    pub collision_id: Option<String>,
    #[serde(rename = "CRASH DATE")]
    pub crash_date: Option<String>,
    #[serde(rename = "CRASH TIME")]
    pub crash_time: Option<String>,
    #[serde(rename = "LATITUDE", default)]
    pub latitude: Option<String>,
    #[serde(rename = "LONGITUDE", default)]
    pub longitude: Option<String>,
    #[serde(rename = "BOROUGH", default)]
    pub borough: Option<String>,
}

/// One de-duplicated crash. Date and time stay as text; parsing happens in
/// the temporal aggregation where the failure policy applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrashRecord {
    pub collision_id: Option<String>,
    pub crash_date: Option<String>,
    pub crash_time: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub borough: Option<String>,
    /// One entry per factor slot, in slot order.
    pub factors: Vec<Option<String>>,
}

impl CrashRecord {
    /// Records without an identifier are loaded but never counted.
    pub fn id(&self) -> Option<&str> {
        self.collision_id.as_deref()
    }

    /// `(longitude, latitude)` when both are present.
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

/// The cleaned table every aggregation reads.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<CrashRecord>,
    pub factor_slots: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn identified(&self) -> impl Iterator<Item = (&str, &CrashRecord)> {
        self.records.iter().filter_map(|r| r.id().map(|id| (id, r)))
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct FactorCount {
    #[serde(rename = "ContributingFactor")]
    #[tabled(rename = "ContributingFactor")]
    pub factor: String,
    #[serde(rename = "Crashes")]
    #[tabled(rename = "Crashes")]
    pub crashes: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct RegionCountRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Crashes")]
    #[tabled(rename = "Crashes")]
    pub crashes: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct MonthlyCountRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Crashes")]
    #[tabled(rename = "Crashes")]
    pub crashes: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct HourlyCountRow {
    #[serde(rename = "Hour")]
    #[tabled(rename = "Hour")]
    pub hour: String,
    #[serde(rename = "Crashes")]
    #[tabled(rename = "Crashes")]
    pub crashes: usize,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_rows: usize,
    pub duplicate_rows: usize,
    pub unique_rows: usize,
    pub distinct_factors: usize,
    pub crashes_by_geometry: usize,
    pub crashes_by_label: usize,
    pub unassigned: usize,
    pub first_month: Option<String>,
    pub last_month: Option<String>,
    pub peak_hour: Option<String>,
    pub skipped_dates: usize,
    pub skipped_times: usize,
}
