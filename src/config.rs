// Run configuration. Every field has a default so a bare invocation is the
// normal run; the CLI only overrides paths and the parse policy.
use crate::regions::DEFAULT_NAME_PROPERTY;
use crate::temporal::ParsePolicy;
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "Motor_Vehicle_Collisions_-_Crashes.csv";
pub const DEFAULT_BOUNDARIES: &str = "nybb.geojson";

pub const FACTOR_CHART: &str = "top_10_contributing_factors";
pub const REGION_CHART: &str = "boroughs_by_crashes";
pub const MONTHLY_CHART: &str = "crashes_over_time";
pub const HOURLY_CHART: &str = "crashes_by_time";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input: PathBuf,
    pub boundaries: PathBuf,
    /// Feature property holding the region name.
    pub name_property: String,
    pub out_dir: PathBuf,
    pub parse_policy: ParsePolicy,
    pub preview_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            boundaries: PathBuf::from(DEFAULT_BOUNDARIES),
            name_property: DEFAULT_NAME_PROPERTY.to_string(),
            out_dir: PathBuf::from("."),
            parse_policy: ParsePolicy::default(),
            preview_rows: 3,
        }
    }
}

impl Config {
    /// `<out_dir>/<stem>.<ext>`
    pub fn artifact(&self, stem: &str, ext: &str) -> PathBuf {
        self.out_dir.join(format!("{stem}.{ext}"))
    }
}
