//! Selection resolution and row filtering.
//!
//! A [`RawSelection`] is what the user typed or picked; resolving it against
//! the dataset under a [`FilterMode`] fills in defaults and derives the
//! dependent side of the selection. Applying the resulting [`FilterSpec`]
//! keeps exactly the records matching all three predicates.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{Dataset, FilterMode, FilterSpec, RawSelection, Record};
use tracing::debug;

/// Sites pre-selected in Custom mode when the user has not chosen any.
pub const CUSTOM_SITE_DEFAULT_LIMIT: usize = 10;

/// Resolve `raw` into a complete [`FilterSpec`] for `mode`.
pub fn resolve_selection(dataset: &Dataset, mode: FilterMode, raw: &RawSelection) -> FilterSpec {
    let spec = match mode {
        FilterMode::ProviderFocus => resolve_provider_focus(dataset, raw),
        FilterMode::SiteFocus => resolve_site_focus(dataset, raw),
        FilterMode::Custom => resolve_custom(dataset, raw),
    };
    debug!(
        mode = %mode,
        providers = spec.selected_providers.len(),
        sites = spec.selected_sites.len(),
        hours = %spec.hour_range,
        "resolved selection"
    );
    spec
}

/// Chosen providers (default: the first provider); sites are every site
/// those providers operate.
pub fn resolve_provider_focus(dataset: &Dataset, raw: &RawSelection) -> FilterSpec {
    let selected_providers: BTreeSet<String> = match &raw.providers {
        Some(list) => list.iter().cloned().collect(),
        None => dataset.providers().into_iter().take(1).collect(),
    };
    let selected_sites = dataset.sites_for_providers(&selected_providers);
    FilterSpec {
        mode: FilterMode::ProviderFocus,
        selected_providers,
        selected_sites,
        hour_range: raw.hour_range,
    }
}

/// Chosen sites (default: the first site); providers are every provider
/// present at those sites.
pub fn resolve_site_focus(dataset: &Dataset, raw: &RawSelection) -> FilterSpec {
    let selected_sites: BTreeSet<String> = match &raw.sites {
        Some(list) => list.iter().cloned().collect(),
        None => dataset.sites().into_iter().take(1).collect(),
    };
    let selected_providers = dataset.providers_for_sites(&selected_sites);
    FilterSpec {
        mode: FilterMode::SiteFocus,
        selected_providers,
        selected_sites,
        hour_range: raw.hour_range,
    }
}

/// Both sides chosen independently. Defaults: every provider, and the first
/// [`CUSTOM_SITE_DEFAULT_LIMIT`] of their sites in lexicographic order.
pub fn resolve_custom(dataset: &Dataset, raw: &RawSelection) -> FilterSpec {
    let selected_providers: BTreeSet<String> = match &raw.providers {
        Some(list) => list.iter().cloned().collect(),
        None => dataset.providers().into_iter().collect(),
    };
    let selected_sites: BTreeSet<String> = match &raw.sites {
        Some(list) => list.iter().cloned().collect(),
        None => dataset
            .sites_for_providers(&selected_providers)
            .into_iter()
            .take(CUSTOM_SITE_DEFAULT_LIMIT)
            .collect(),
    };
    FilterSpec {
        mode: FilterMode::Custom,
        selected_providers,
        selected_sites,
        hour_range: raw.hour_range,
    }
}

/// Keep the records matching `spec`. Never fails; an empty selection simply
/// produces an empty dataset.
pub fn apply(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    let filtered = dataset.subset(|r| spec.matches(r));
    debug!(
        "filter kept {} of {} records",
        filtered.len(),
        dataset.len()
    );
    filtered
}

/// Like [`apply`], but reports an empty result as
/// [`DashboardError::EmptySelection`].
pub fn apply_non_empty(dataset: &Dataset, spec: &FilterSpec) -> Result<Dataset> {
    let filtered = apply(dataset, spec);
    if filtered.is_empty() {
        return Err(DashboardError::EmptySelection);
    }
    Ok(filtered)
}

/// A copy of `dataset` ordered by one of its columns (see
/// [`Dataset::COLUMNS`]). The sort is stable; null timestamps sort last.
pub fn sort_dataset(dataset: &Dataset, column: &str, ascending: bool) -> Result<Dataset> {
    let cmp: fn(&Record, &Record) -> Ordering = match column {
        "providercode" => |a, b| a.provider_code.cmp(&b.provider_code),
        "sitecode" => |a, b| a.site_code.cmp(&b.site_code),
        "hour" => |a, b| a.hour.cmp(&b.hour),
        "tph_median" => |a, b| a.tph_median.total_cmp(&b.tph_median),
        "ct_sum" => |a, b| a.ct_sum.total_cmp(&b.ct_sum),
        "avg_first_resp_delay_minute" => {
            |a, b| a.avg_first_resp_delay_minute.total_cmp(&b.avg_first_resp_delay_minute)
        }
        "last_updated" => |a, b| match (&a.last_updated, &b.last_updated) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        other => return Err(DashboardError::UnknownColumn(other.to_string())),
    };

    let mut records = dataset.records().to_vec();
    records.sort_by(|a, b| {
        let has_null = a.last_updated.is_none() || b.last_updated.is_none();
        if ascending || (column == "last_updated" && has_null) {
            cmp(a, b)
        } else {
            cmp(b, a)
        }
    });
    Ok(Dataset::new(records))
}

/// Short note describing what the mode derived, shown beside the controls.
///
/// `None` when there is nothing selected to describe.
pub fn selection_info(spec: &FilterSpec) -> Option<String> {
    match spec.mode {
        FilterMode::ProviderFocus if !spec.selected_providers.is_empty() => Some(format!(
            "Showing all {} sites for selected provider(s)",
            spec.selected_sites.len()
        )),
        FilterMode::SiteFocus if !spec.selected_sites.is_empty() => Some(format!(
            "Showing all {} providers for selected site(s)",
            spec.selected_providers.len()
        )),
        FilterMode::Custom => Some(format!(
            "{} providers, {} sites selected",
            spec.selected_providers.len(),
            spec.selected_sites.len()
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::provider_summary;
    use crate::summary::Value;
    use dashboard_core::models::HourRange;

    fn rec(p: &str, s: &str, hour: u8, tph: f64, ct: f64, delay: f64) -> Record {
        Record {
            provider_code: p.to_string(),
            site_code: s.to_string(),
            hour,
            tph_median: tph,
            ct_sum: ct,
            avg_first_resp_delay_minute: delay,
            last_updated: None,
        }
    }

    fn example() -> Dataset {
        Dataset::new(vec![
            rec("P1", "S1", 0, 100.0, 10.0, 2.0),
            rec("P1", "S1", 1, 200.0, 20.0, 3.0),
            rec("P2", "S2", 0, 50.0, 5.0, 1.0),
        ])
    }

    fn raw_providers(list: &[&str]) -> RawSelection {
        RawSelection {
            providers: Some(list.iter().map(|s| s.to_string()).collect()),
            ..RawSelection::default()
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_end_to_end_provider_focus() {
        let ds = example();
        let spec = resolve_selection(&ds, FilterMode::ProviderFocus, &raw_providers(&["P1"]));
        assert_eq!(spec.selected_sites, set(&["S1"]));

        let filtered = apply(&ds, &spec);
        assert_eq!(filtered.len(), 2);

        let summary = provider_summary(&filtered);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.get(0, "providercode"), Some(&Value::Text("P1".into())));
        assert_eq!(summary.get(0, "tph_median").and_then(Value::as_f64), Some(150.0));
        assert_eq!(summary.get(0, "ct_sum").and_then(Value::as_f64), Some(30.0));
        assert_eq!(
            summary.get(0, "avg_first_resp_delay_minute").and_then(Value::as_f64),
            Some(2.5)
        );
    }

    #[test]
    fn test_provider_focus_default_is_first_provider() {
        let ds = Dataset::new(vec![
            rec("P9", "S1", 0, 1.0, 1.0, 1.0),
            rec("P1", "S2", 0, 1.0, 1.0, 1.0),
        ]);
        let spec = resolve_provider_focus(&ds, &RawSelection::default());
        assert_eq!(spec.selected_providers, set(&["P9"]));
        assert_eq!(spec.selected_sites, set(&["S1"]));
    }

    #[test]
    fn test_provider_focus_closure_and_idempotence() {
        let ds = Dataset::new(vec![
            rec("P1", "S1", 0, 1.0, 1.0, 1.0),
            rec("P1", "S2", 3, 1.0, 1.0, 1.0),
            rec("P2", "S2", 0, 1.0, 1.0, 1.0),
            rec("P2", "S3", 0, 1.0, 1.0, 1.0),
        ]);
        let spec = resolve_provider_focus(&ds, &raw_providers(&["P1"]));
        let filtered = apply(&ds, &spec);
        let sites: BTreeSet<String> = filtered.iter().map(|r| r.site_code.clone()).collect();
        assert_eq!(sites, spec.selected_sites);

        let chosen: Vec<&str> = spec.selected_providers.iter().map(String::as_str).collect();
        let again = resolve_provider_focus(&ds, &raw_providers(&chosen));
        assert_eq!(again.selected_providers, spec.selected_providers);
        assert_eq!(again.selected_sites, spec.selected_sites);
        assert_eq!(again.selected_sites, set(&["S1", "S2"]));
    }

    #[test]
    fn test_site_focus_derives_providers() {
        let ds = Dataset::new(vec![
            rec("P1", "S2", 0, 1.0, 1.0, 1.0),
            rec("P2", "S2", 0, 1.0, 1.0, 1.0),
            rec("P3", "S3", 0, 1.0, 1.0, 1.0),
        ]);
        let spec = resolve_site_focus(&ds, &RawSelection::default());
        assert_eq!(spec.selected_sites, set(&["S2"]));
        assert_eq!(spec.selected_providers, set(&["P1", "P2"]));
        assert_eq!(
            selection_info(&spec).as_deref(),
            Some("Showing all 2 providers for selected site(s)")
        );
    }

    #[test]
    fn test_custom_default_sites_lexicographic_truncated() {
        let records: Vec<Record> = (0..12)
            .rev()
            .map(|i| rec("P1", &format!("S{:02}", i), 0, 1.0, 1.0, 1.0))
            .collect();
        let ds = Dataset::new(records);
        let spec = resolve_custom(&ds, &RawSelection::default());
        assert_eq!(spec.selected_providers, set(&["P1"]));
        assert_eq!(spec.selected_sites.len(), CUSTOM_SITE_DEFAULT_LIMIT);
        assert!(spec.selected_sites.contains("S00"));
        assert!(spec.selected_sites.contains("S09"));
        assert!(!spec.selected_sites.contains("S10"));
    }

    #[test]
    fn test_apply_subset_property() {
        let ds = example();
        let spec = FilterSpec {
            mode: FilterMode::Custom,
            selected_providers: set(&["P1", "P2"]),
            selected_sites: set(&["S1", "S2"]),
            hour_range: HourRange::new(0, 0).unwrap(),
        };
        let filtered = apply(&ds, &spec);
        assert_eq!(filtered.len(), 2);
        for r in &filtered {
            assert!(ds.records().contains(r));
            assert!(spec.matches(r));
        }
    }

    #[test]
    fn test_empty_selection_is_distinguishable() {
        let ds = example();
        let spec = resolve_provider_focus(&ds, &raw_providers(&[]));
        assert!(spec.selected_sites.is_empty());
        assert!(apply(&ds, &spec).is_empty());
        assert!(matches!(
            apply_non_empty(&ds, &spec),
            Err(DashboardError::EmptySelection)
        ));
        assert_eq!(selection_info(&spec), None);
    }

    #[test]
    fn test_sort_dataset_by_column() {
        let ds = example();
        let sorted = sort_dataset(&ds, "tph_median", false).unwrap();
        let values: Vec<f64> = sorted.iter().map(|r| r.tph_median).collect();
        assert_eq!(values, vec![200.0, 100.0, 50.0]);

        let sorted = sort_dataset(&ds, "hour", true).unwrap();
        let order: Vec<(u8, &str)> = sorted
            .iter()
            .map(|r| (r.hour, r.provider_code.as_str()))
            .collect();
        // stable: equal hours keep their original order
        assert_eq!(order, vec![(0, "P1"), (0, "P2"), (1, "P1")]);

        assert!(matches!(
            sort_dataset(&ds, "bogus", true),
            Err(DashboardError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_sort_dataset_null_timestamps_last() {
        let mut a = rec("P1", "S1", 0, 1.0, 1.0, 1.0);
        a.last_updated = Some("2025-06-10 08:00".to_string());
        let b = rec("P1", "S1", 1, 1.0, 1.0, 1.0);
        let mut c = rec("P1", "S1", 2, 1.0, 1.0, 1.0);
        c.last_updated = Some("2025-06-11 08:00".to_string());
        let ds = Dataset::new(vec![b, a, c]);
        for ascending in [true, false] {
            let sorted = sort_dataset(&ds, "last_updated", ascending).unwrap();
            assert_eq!(sorted.records()[2].hour, 1);
        }
        let desc = sort_dataset(&ds, "last_updated", false).unwrap();
        assert_eq!(desc.records()[0].hour, 2);
    }

    #[test]
    fn test_empty_dataset_defaults_are_empty() {
        let ds = Dataset::default();
        let spec = resolve_selection(&ds, FilterMode::ProviderFocus, &RawSelection::default());
        assert!(spec.selected_providers.is_empty());
        let spec = resolve_selection(&ds, FilterMode::Custom, &RawSelection::default());
        assert!(spec.selected_sites.is_empty());
    }
}
