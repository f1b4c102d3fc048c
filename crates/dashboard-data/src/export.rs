//! CSV export of filtered records and summary tables.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use dashboard_core::error::Result;
use dashboard_core::models::Dataset;
use tracing::info;

use crate::summary::{SummaryTable, Value};

/// File name prefix for exported filtered rows.
pub const FILTERED_PREFIX: &str = "filtered_site_metrics";
/// File name prefix for exported combination tables.
pub const COMBINATIONS_PREFIX: &str = "provider_site_combinations";

/// Write `dataset` as CSV with a header row, in record field order.
pub fn write_dataset<W: Write>(writer: W, dataset: &Dataset) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(Dataset::COLUMNS)?;
    for record in dataset {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `table` as CSV in its column order; nulls become empty fields.
pub fn write_summary<W: Write>(writer: W, table: &SummaryTable) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(Value::to_field))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parse a table written by [`write_summary`].
///
/// Fields are typed by [`Value::parse_field`]; the first `key_columns`
/// columns are treated as keys.
pub fn read_summary<R: Read>(reader: R, key_columns: usize) -> Result<SummaryTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut table = SummaryTable::new(columns, key_columns);
    for row in rdr.records() {
        let row = row?;
        table.push_row(row.iter().map(Value::parse_field).collect());
    }
    Ok(table)
}

pub fn dataset_to_csv_string(dataset: &Dataset) -> Result<String> {
    let mut buf = Vec::new();
    write_dataset(&mut buf, dataset)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn summary_to_csv_string(table: &SummaryTable) -> Result<String> {
    let mut buf = Vec::new();
    write_summary(&mut buf, table)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write `dataset` to `path`, creating parent directories as needed.
pub fn export_dataset(path: &Path, dataset: &Dataset) -> Result<PathBuf> {
    let file = create(path)?;
    write_dataset(file, dataset)?;
    info!("Exported {} records to {}", dataset.len(), path.display());
    Ok(path.to_path_buf())
}

/// Write `table` to `path`, creating parent directories as needed.
pub fn export_summary(path: &Path, table: &SummaryTable) -> Result<PathBuf> {
    let file = create(path)?;
    write_summary(file, table)?;
    info!("Exported {} rows to {}", table.len(), path.display());
    Ok(path.to_path_buf())
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// `<prefix>_%Y%m%d_%H%M%S.csv` for the given local time.
pub fn default_export_name(prefix: &str, now: NaiveDateTime) -> String {
    format!("{}_{}.csv", prefix, now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::combination_table;
    use chrono::NaiveDate;
    use dashboard_core::models::Record;
    use tempfile::TempDir;

    fn rec(p: &str, s: &str, hour: u8, tph: f64, updated: Option<&str>) -> Record {
        Record {
            provider_code: p.to_string(),
            site_code: s.to_string(),
            hour,
            tph_median: tph,
            ct_sum: 10.0,
            avg_first_resp_delay_minute: 2.5,
            last_updated: updated.map(str::to_string),
        }
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            rec("P1", "S1", 0, 100.0, Some("2025-06-23 17:45")),
            rec("P1", "S1", 1, 200.0, None),
            rec("P2", "S2", 0, 50.5, Some("2025-06-22 09:00")),
        ])
    }

    #[test]
    fn test_dataset_csv_header_and_nulls() {
        let text = dataset_to_csv_string(&sample()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "providercode,sitecode,hour,tph_median,ct_sum,avg_first_resp_delay_minute,last_updated"
        );
        assert_eq!(lines.len(), 4);
        assert!(lines[2].ends_with(','));
        assert!(lines[1].starts_with("P1,S1,0,"));
    }

    #[test]
    fn test_empty_dataset_still_has_header() {
        let text = dataset_to_csv_string(&Dataset::default()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_dataset_export_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("filtered.csv");
        export_dataset(&path, &sample()).unwrap();
        let (reloaded, report) = crate::loader::read_dataset(&path).unwrap();
        assert_eq!(reloaded, sample());
        assert_eq!(report.null_timestamps, 1);
    }

    #[test]
    fn test_combination_table_round_trip() {
        let combos = combination_table(&sample()).table;
        let text = summary_to_csv_string(&combos).unwrap();
        let parsed = read_summary(text.as_bytes(), combos.key_columns()).unwrap();
        assert!(parsed.same_contents(&combos));
        // single-record std is written as an empty field and read back as null
        assert_eq!(parsed.get(1, "TPH_StdDev"), Some(&Value::Null));
    }

    #[test]
    fn test_summary_export_to_path() {
        let dir = TempDir::new().unwrap();
        let combos = combination_table(&sample()).table;
        let path = export_summary(&dir.path().join("combos.csv"), &combos).unwrap();
        let parsed = read_summary(File::open(path).unwrap(), 2).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.columns().last().map(String::as_str), Some("Provider_Site"));
    }

    #[test]
    fn test_default_export_name() {
        let now = NaiveDate::from_ymd_opt(2025, 6, 23)
            .unwrap()
            .and_hms_opt(17, 5, 9)
            .unwrap();
        assert_eq!(
            default_export_name(FILTERED_PREFIX, now),
            "filtered_site_metrics_20250623_170509.csv"
        );
        assert_eq!(
            default_export_name(COMBINATIONS_PREFIX, now),
            "provider_site_combinations_20250623_170509.csv"
        );
    }
}
