//! Locating the site metrics file when no path is configured.

use std::path::{Path, PathBuf};

use dashboard_core::error::{DashboardError, Result};
use regex::Regex;
use tracing::{debug, warn};

/// File name prefix of site metrics exports.
pub const FILE_PREFIX: &str = "site_metrics";

/// Directories searched, in order, when no data path is given.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs_out = vec![PathBuf::from("data")];
    if let Some(home) = dirs::home_dir() {
        dirs_out.push(home.join(".site-dashboard").join("data"));
    }
    dirs_out
}

/// All `site_metrics*.csv` files under `dir`, sorted by path.
pub fn find_metric_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        debug!("Search directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_metric_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

fn is_metric_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.starts_with(FILE_PREFIX) && name.ends_with(".csv")
}

/// Resolve the data file: `explicit` when given, otherwise the
/// lexicographically greatest metrics file found under `search_dirs`.
///
/// The first directory containing any match wins.
pub fn resolve_data_path(explicit: Option<&Path>, search_dirs: &[PathBuf]) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(DashboardError::DataPathNotFound(path.to_path_buf()));
        }
        return Ok(path.to_path_buf());
    }

    for dir in search_dirs {
        if let Some(latest) = find_metric_files(dir).into_iter().max_by(|a, b| {
            a.file_name().cmp(&b.file_name())
        }) {
            debug!("Discovered data file {}", latest.display());
            return Ok(latest);
        }
    }

    let first = search_dirs.first().cloned().unwrap_or_else(|| PathBuf::from("data"));
    warn!("No {}*.csv file found in any search directory", FILE_PREFIX);
    Err(DashboardError::DataPathNotFound(first))
}

/// Human-readable coverage window encoded in the file name, e.g.
/// `site_metrics_final_20250610_to_20250623.csv` → `2025-06-10 → 2025-06-23`.
pub fn coverage_label(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let re = Regex::new(r"site_metrics(?:_final)?_(\d{4})(\d{2})(\d{2})_to_(\d{4})(\d{2})(\d{2})\.csv$").ok()?;
    let caps = re.captures(name)?;
    Some(format!(
        "{}-{}-{} → {}-{}-{}",
        &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], &caps[6]
    ))
}
