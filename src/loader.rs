use crate::error::LoadError;
use crate::types::{
    CrashRecord, Dataset, RawRow, COLLISION_ID, CRASH_DATE, CRASH_TIME, FACTOR_PREFIX,
};
use crate::util::{clean_text, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub duplicate_rows: usize,
    pub unique_rows: usize,
    pub invalid_coordinates: usize,
    pub factor_slots: usize,
}

/// Read the crash table at `path`, dropping rows that repeat an earlier row
/// field for field.
pub fn load_and_clean(path: impl AsRef<Path>) -> Result<(Dataset, LoadReport), LoadError> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    for required in [COLLISION_ID, CRASH_DATE, CRASH_TIME] {
        if !headers.iter().any(|h| h == required) {
            return Err(LoadError::MissingColumn(required.to_string()));
        }
    }
    let factor_columns = factor_columns(&headers);
    log::debug!(
        "{}: {} columns, {} contributing factor slots",
        path.display(),
        headers.len(),
        factor_columns.len()
    );

    let mut total_rows = 0usize;
    let mut invalid_coordinates = 0usize;
    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    let mut records: Vec<CrashRecord> = Vec::new();

    for result in rdr.records() {
        let raw = result.map_err(|source| LoadError::Malformed {
            line: source.position().map_or(0, |p| p.line()),
            source,
        })?;
        total_rows += 1;

        // Full-row equality: identical ids with different fields are kept.
        if !seen.insert(row_key(&raw)) {
            continue;
        }

        let line = raw.position().map_or(0, |p| p.line());
        let row: RawRow = raw
            .deserialize(Some(&headers))
            .map_err(|source| LoadError::Malformed { line, source })?;

        let latitude = parse_f64_safe(row.latitude.as_deref());
        let longitude = parse_f64_safe(row.longitude.as_deref());
        let lat_given = row.latitude.as_deref().is_some_and(|s| !s.trim().is_empty());
        let lon_given = row.longitude.as_deref().is_some_and(|s| !s.trim().is_empty());
        if (lat_given && latitude.is_none()) || (lon_given && longitude.is_none()) {
            invalid_coordinates += 1;
        }

        let factors = factor_columns
            .iter()
            .map(|&idx| clean_text(raw.get(idx).map(str::to_string)))
            .collect();

        records.push(CrashRecord {
            collision_id: clean_text(row.collision_id),
            crash_date: clean_text(row.crash_date),
            crash_time: clean_text(row.crash_time),
            latitude,
            longitude,
            borough: clean_text(row.borough),
            factors,
        });
    }

    // Rows without a collision id are never counted, so a file of only
    // those has nothing to report.
    if !records.iter().any(|r| r.id().is_some()) {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    if invalid_coordinates > 0 {
        log::warn!("{invalid_coordinates} rows have non-numeric coordinates; treated as missing");
    }

    let unique_rows = records.len();
    let report = LoadReport {
        total_rows,
        duplicate_rows: total_rows - unique_rows,
        unique_rows,
        invalid_coordinates,
        factor_slots: factor_columns.len(),
    };
    let dataset = Dataset {
        records,
        factor_slots: factor_columns.len(),
    };
    Ok((dataset, report))
}

/// One buffer per row: each field as its byte length then its bytes, so
/// `("ab", "c")` and `("a", "bc")` stay distinct.
fn row_key(record: &StringRecord) -> Vec<u8> {
    let bytes = record.as_byte_record();
    let mut key = Vec::with_capacity(bytes.as_slice().len() + 4 * bytes.len());
    for field in bytes {
        key.extend_from_slice(&(field.len() as u32).to_le_bytes());
        key.extend_from_slice(field);
    }
    key
}

/// Column indexes of the contributing factor slots, ordered by slot number.
fn factor_columns(headers: &StringRecord) -> Vec<usize> {
    let mut slots: Vec<(u32, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| {
            let slot = h.strip_prefix(FACTOR_PREFIX)?.trim().parse().ok()?;
            Some((slot, idx))
        })
        .collect();
    slots.sort_unstable();
    slots.into_iter().map(|(_, idx)| idx).collect()
}
