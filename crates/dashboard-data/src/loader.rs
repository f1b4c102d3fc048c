//! CSV loading for the site metrics table.
//!
//! The whole file is read into a [`Dataset`] once per session. Columns are
//! located by header name, so extra columns and any column order are fine.
//! Rows that cannot be interpreted are skipped with a warning instead of
//! failing the load; an unparseable `last_updated` becomes null.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{Dataset, Record, MAX_HOUR};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Columns every input file must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = Dataset::COLUMNS;

/// Display format for `last_updated`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Row counts gathered while loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_skipped: usize,
    /// Kept rows whose `last_updated` could not be parsed.
    pub null_timestamps: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read the CSV at `path` into a [`Dataset`].
pub fn read_dataset(path: &Path) -> Result<(Dataset, LoadReport)> {
    let file = File::open(path).map_err(|source| DashboardError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let result = read_dataset_from_reader(file, path)?;
    info!(
        "Loaded {} records from {} ({} skipped)",
        result.1.rows_kept,
        path.display(),
        result.1.rows_skipped
    );
    Ok(result)
}

/// Read CSV from any reader. `source` names the input in errors.
pub fn read_dataset_from_reader<R: Read>(reader: R, source: &Path) -> Result<(Dataset, LoadReport)> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(DashboardError::EmptyFile(source.to_path_buf()));
    }
    let columns = ColumnIndex::locate(&headers)?;

    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for (i, row) in rdr.records().enumerate() {
        report.rows_read += 1;
        // Header is line 1.
        let line = i + 2;
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping line {} of {}: {}", line, source.display(), e);
                report.rows_skipped += 1;
                continue;
            }
        };
        match columns.parse(&row) {
            Ok(record) => {
                if record.last_updated.is_none() {
                    report.null_timestamps += 1;
                }
                records.push(record);
            }
            Err(reason) => {
                warn!("Skipping line {} of {}: {}", line, source.display(), reason);
                report.rows_skipped += 1;
            }
        }
    }

    report.rows_kept = records.len();
    if records.is_empty() {
        return Err(DashboardError::EmptyFile(source.to_path_buf()));
    }
    if report.null_timestamps > 0 {
        debug!(
            "{} rows have an unparseable last_updated value",
            report.null_timestamps
        );
    }

    Ok((Dataset::new(records), report))
}

/// Normalise a timestamp to minute precision (`%Y-%m-%d %H:%M`).
///
/// Offsets are kept as written: the wall-clock time is displayed, not a
/// UTC conversion. Empty or unrecognised input yields `None`.
pub fn parse_last_updated(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let normalised = match s.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => s.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt.naive_local().format(TIMESTAMP_FORMAT).to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local().format(TIMESTAMP_FORMAT).to_string());
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.format(TIMESTAMP_FORMAT).to_string());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return Some(naive.format(TIMESTAMP_FORMAT).to_string());
    }

    None
}

// ── Column lookup ─────────────────────────────────────────────────────────────

struct ColumnIndex {
    provider: usize,
    site: usize,
    hour: usize,
    tph: usize,
    count: usize,
    delay: usize,
    updated: usize,
}

impl ColumnIndex {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| find(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DashboardError::MissingColumns(missing));
        }
        let at = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            provider: at("providercode"),
            site: at("sitecode"),
            hour: at("hour"),
            tph: at("tph_median"),
            count: at("ct_sum"),
            delay: at("avg_first_resp_delay_minute"),
            updated: at("last_updated"),
        })
    }

    fn parse(&self, row: &StringRecord) -> std::result::Result<Record, String> {
        let hour_raw = required(row, self.hour, "hour")?;
        let hour = parse_metric(hour_raw, "hour")?;
        if hour.fract() != 0.0 || hour > f64::from(MAX_HOUR) {
            return Err(format!("hour out of range: {}", hour_raw));
        }

        Ok(Record {
            provider_code: required(row, self.provider, "providercode")?.to_string(),
            site_code: required(row, self.site, "sitecode")?.to_string(),
            hour: hour as u8,
            tph_median: parse_metric(required(row, self.tph, "tph_median")?, "tph_median")?,
            ct_sum: parse_metric(required(row, self.count, "ct_sum")?, "ct_sum")?,
            avg_first_resp_delay_minute: parse_metric(
                required(row, self.delay, "avg_first_resp_delay_minute")?,
                "avg_first_resp_delay_minute",
            )?,
            last_updated: row.get(self.updated).and_then(parse_last_updated),
        })
    }
}

fn required<'a>(row: &'a StringRecord, idx: usize, name: &str) -> std::result::Result<&'a str, String> {
    match row.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("missing {}", name)),
    }
}

/// Parse a non-negative finite number.
fn parse_metric(raw: &str, name: &str) -> std::result::Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Ok(v) => Err(format!("invalid {}: {}", name, v)),
        Err(_) => Err(format!("invalid {}: {:?}", name, raw)),
    }
}

// ── DataLoader ────────────────────────────────────────────────────────────────

/// Load-once accessor for the session's dataset.
///
/// The first successful [`DataLoader::load`] reads the file; later calls
/// return the cached dataset without touching the disk. A failed load
/// leaves the cache empty so the next call retries.
#[derive(Debug)]
pub struct DataLoader {
    path: PathBuf,
    cache: Option<(Dataset, LoadReport)>,
}

impl DataLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    /// Build a loader around an already-loaded dataset.
    pub fn preloaded(path: impl Into<PathBuf>, dataset: Dataset) -> Self {
        let report = LoadReport {
            rows_read: dataset.len(),
            rows_kept: dataset.len(),
            rows_skipped: 0,
            null_timestamps: dataset.iter().filter(|r| r.last_updated.is_none()).count(),
        };
        Self {
            path: path.into(),
            cache: Some((dataset, report)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&mut self) -> Result<&Dataset> {
        let loaded = match self.cache.take() {
            Some(cached) => cached,
            None => read_dataset(&self.path)?,
        };
        let (dataset, _) = self.cache.insert(loaded);
        Ok(dataset)
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_some()
    }

    /// Counts from the last successful load.
    pub fn report(&self) -> Option<LoadReport> {
        self.cache.as_ref().map(|(_, report)| *report)
    }

    /// Drop the cached dataset so the next `load` re-reads the file.
    pub fn reset(&mut self) {
        self.cache = None;
    }
}
