// Error types for every stage of the pipeline.
//
// Each stage owns its own enum so callers can tell a bad input file from bad
// boundary data; `AnalysisError` is what `main` sees.
use std::path::PathBuf;

/// Failures while reading the crash table.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file is missing or unreadable.
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A row could not be read (ragged row, bad UTF-8, truncated quote).
    #[error("malformed row at line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: csv::Error,
    },

    /// A column every record needs is not in the header.
    #[error("required column {0:?} not found in header")]
    MissingColumn(String),

    /// Header only, or no row carries a collision id.
    #[error("{0} contains no usable data rows")]
    Empty(PathBuf),
}

/// Failures while loading the region boundary polygons.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    #[error("cannot read boundaries from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("boundaries are not valid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("boundaries must be a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    #[error("feature #{index} has no {property:?} property")]
    MissingName { index: usize, property: String },

    #[error("feature #{index} ({name}) has no polygon geometry")]
    InvalidGeometry { index: usize, name: String },

    #[error("unsupported coordinate reference system {0:?}")]
    UnsupportedCrs(String),

    #[error("boundary collection has no features")]
    Empty,
}

/// A date or time cell that does not match any accepted format.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("collision {id}: cannot parse crash date {value:?}")]
    Date { id: String, value: String },

    #[error("collision {id}: cannot parse crash time {value:?}")]
    Time { id: String, value: String },
}

/// A crash point fell inside polygons of more than one region.
#[derive(Debug, thiserror::Error)]
#[error("collision {id} at ({lon}, {lat}) lies in several regions: {regions:?}")]
pub struct JoinAmbiguityError {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub regions: Vec<String>,
}

/// Failures while writing tables, the summary, or charts.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chart rendering failed: {0}")]
    Render(String),
}

/// Anything that stops a run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    ReferenceData(#[from] ReferenceDataError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    JoinAmbiguity(#[from] JoinAmbiguityError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
