// Filter layer - narrows the crime table by unit and year
//
// Crime-type selection travels with the filter but never drops rows: it only
// chooses which crime columns the crime-specific charts read.

use crate::config::DefaultSelection;
use crate::dataset::{CrimeRecord, CrimeType, Dataset};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    /// Clamp into `[min, max]`, falling back to the full bounds when nothing
    /// of this range overlaps them.
    pub fn clamp_to(&self, min: i32, max: i32) -> Self {
        let start = self.start.clamp(min, max);
        let end = self.end.clamp(min, max);
        if start > end || self.end < min || self.start > max {
            Self::new(min, max)
        } else {
            Self::new(start, end)
        }
    }
}

/// A resolved, dataset-consistent selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    pub units: BTreeSet<String>,
    pub years: YearRange,
    pub crimes: Vec<CrimeType>,
}

impl Filter {
    pub fn new(units: BTreeSet<String>, years: YearRange, crimes: Vec<CrimeType>) -> Self {
        Self { units, years, crimes }
    }

    /// Every unit, every year, every crime type.
    pub fn all(dataset: &Dataset) -> Self {
        let (min, max) = dataset.year_bounds();
        Self {
            units: dataset.units().iter().cloned().collect(),
            years: YearRange::new(min, max),
            crimes: CrimeType::ALL.to_vec(),
        }
    }

    /// Initial selection derived from configured defaults.
    ///
    /// Units missing from the dataset are dropped (all units if none remain),
    /// years are clamped to the dataset, unknown crime names are skipped.
    pub fn from_defaults(dataset: &Dataset, defaults: &DefaultSelection) -> Self {
        let mut units: BTreeSet<String> = defaults
            .units
            .iter()
            .filter(|u| dataset.has_unit(u))
            .cloned()
            .collect();
        if units.is_empty() {
            units = dataset.units().iter().cloned().collect();
        }

        let (min, max) = dataset.year_bounds();
        let years = YearRange::new(defaults.year_from, defaults.year_to).clamp_to(min, max);

        let crimes = defaults
            .crimes
            .iter()
            .filter_map(|name| match name.parse::<CrimeType>() {
                Ok(crime) => Some(crime),
                Err(_) => {
                    tracing::warn!(crime = %name, "ignoring unknown default crime type");
                    None
                }
            })
            .collect();

        Self {
            units,
            years,
            crimes: dedup(crimes),
        }
    }

    pub fn matches(&self, record: &CrimeRecord) -> bool {
        self.years.contains(record.year) && self.units.contains(&record.unit)
    }

    /// Rows passing the filter, in dataset order.
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> Vec<&'a CrimeRecord> {
        dataset.records().iter().filter(|r| self.matches(r)).collect()
    }

    /// Check that every value belongs to the dataset's domain.
    pub fn validate(&self, dataset: &Dataset) -> Result<()> {
        if let Some(unknown) = self.units.iter().find(|u| !dataset.has_unit(u)) {
            return Err(Error::UnknownUnit(unknown.clone()));
        }
        let (min, max) = dataset.year_bounds();
        if self.years.start > self.years.end || self.years.start < min || self.years.end > max {
            return Err(Error::InvalidYearRange {
                from: self.years.start,
                to: self.years.end,
                min,
                max,
            });
        }
        Ok(())
    }

    pub fn toggle_unit(&mut self, unit: &str) {
        if !self.units.remove(unit) {
            self.units.insert(unit.to_string());
        }
    }
}

fn dedup(crimes: Vec<CrimeType>) -> Vec<CrimeType> {
    let mut seen = BTreeSet::new();
    crimes.into_iter().filter(|c| seen.insert(*c)).collect()
}

/// Raw filter parameters as they arrive from a query string or the CLI.
///
/// `units` and `crimes` are comma-separated; `all` selects everything.
/// An absent field falls back to the configured default, while an empty
/// `units` selects nothing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterRequest {
    pub units: Option<String>,
    pub year_from: Option<String>,
    pub year_to: Option<String>,
    pub crimes: Option<String>,
}

impl FilterRequest {
    /// Resolve against `base`, the default selection built once by
    /// [`Filter::from_defaults`].
    pub fn resolve(&self, dataset: &Dataset, base: &Filter) -> Result<Filter> {
        let units = match self.units.as_deref() {
            None => base.units.clone(),
            Some(raw) if raw.trim().eq_ignore_ascii_case("all") => {
                dataset.units().iter().cloned().collect()
            }
            Some(raw) => split_list(raw).map(str::to_string).collect(),
        };

        let start = match self.year_from.as_deref() {
            Some(raw) => parse_year("year_from", raw)?,
            None => base.years.start,
        };
        let end = match self.year_to.as_deref() {
            Some(raw) => parse_year("year_to", raw)?,
            None => base.years.end,
        };

        let crimes = match self.crimes.as_deref() {
            None => base.crimes.clone(),
            Some(raw) if raw.trim().eq_ignore_ascii_case("all") => CrimeType::ALL.to_vec(),
            Some(raw) => dedup(
                split_list(raw)
                    .map(str::parse::<CrimeType>)
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        let filter = Filter::new(units, YearRange::new(start, end), crimes);
        filter.validate(dataset)?;
        Ok(filter)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_year(name: &'static str, raw: &str) -> Result<i32> {
    raw.trim().parse().map_err(|_| Error::InvalidParameter {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample_dataset;

    fn base(dataset: &Dataset) -> Filter {
        Filter::from_defaults(dataset, &DefaultSelection::default())
    }

    fn request(units: Option<&str>, from: Option<&str>, to: Option<&str>, crimes: Option<&str>) -> FilterRequest {
        FilterRequest {
            units: units.map(String::from),
            year_from: from.map(String::from),
            year_to: to.map(String::from),
            crimes: crimes.map(String::from),
        }
    }

    #[test]
    fn test_year_range_clamp() {
        assert_eq!(YearRange::new(2021, 2024).clamp_to(2021, 2023), YearRange::new(2021, 2023));
        assert_eq!(YearRange::new(2019, 2022).clamp_to(2021, 2023), YearRange::new(2021, 2022));
        assert_eq!(YearRange::new(2030, 2031).clamp_to(2021, 2023), YearRange::new(2021, 2023));
        assert!(YearRange::new(2021, 2022).contains(2022));
        assert!(!YearRange::new(2021, 2022).contains(2023));
    }

    #[test]
    fn test_defaults_resolve_against_dataset() {
        let dataset = sample_dataset();
        let filter = Filter::from_defaults(&dataset, &DefaultSelection::default());

        assert_eq!(filter.units, BTreeSet::from(["CMP".to_string(), "DMP".to_string()]));
        // default 2021-2024 clamped to the fixture's 2021-2023
        assert_eq!(filter.years, YearRange::new(2021, 2023));
        assert_eq!(
            filter.crimes,
            vec![
                CrimeType::Murder,
                CrimeType::Robbery,
                CrimeType::Narcotics,
                CrimeType::Theft,
                CrimeType::WomanChildRepression
            ]
        );
    }

    #[test]
    fn test_defaults_fall_back_to_all_units() {
        let dataset = sample_dataset();
        let defaults = DefaultSelection {
            units: vec!["SMP".to_string()],
            crimes: vec!["Murder".to_string(), "Jaywalking".to_string()],
            ..DefaultSelection::default()
        };
        let filter = Filter::from_defaults(&dataset, &defaults);
        assert_eq!(filter.units.len(), 3);
        assert_eq!(filter.crimes, vec![CrimeType::Murder]);
    }

    #[test]
    fn test_apply_filters_by_unit_and_year() {
        let dataset = sample_dataset();
        let filter = Filter::new(
            BTreeSet::from(["DMP".to_string()]),
            YearRange::new(2021, 2022),
            vec![],
        );

        let rows = filter.apply(&dataset);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.unit == "DMP" && r.year <= 2022));
        // dataset order preserved
        assert_eq!(rows[0].month, 1);
        assert_eq!(rows[1].month, 2);
        assert_eq!(rows[2].year, 2022);
    }

    #[test]
    fn test_crime_selection_does_not_drop_rows() {
        let dataset = sample_dataset();
        let mut filter = Filter::all(&dataset);
        let all_rows = filter.apply(&dataset).len();
        filter.crimes = vec![CrimeType::Smuggling];
        assert_eq!(filter.apply(&dataset).len(), all_rows);
    }

    #[test]
    fn test_empty_unit_selection_is_empty_result() {
        let dataset = sample_dataset();
        let filter = request(Some(""), None, None, None)
            .resolve(&dataset, &base(&dataset))
            .unwrap();
        assert!(filter.units.is_empty());
        assert!(filter.apply(&dataset).is_empty());
    }

    #[test]
    fn test_resolve_explicit_values() {
        let dataset = sample_dataset();
        let filter = request(Some("RMP, DMP"), Some("2022"), Some("2023"), Some("theft,Arms Act,Theft"))
            .resolve(&dataset, &base(&dataset))
            .unwrap();

        assert_eq!(filter.units, BTreeSet::from(["DMP".to_string(), "RMP".to_string()]));
        assert_eq!(filter.years, YearRange::new(2022, 2023));
        assert_eq!(filter.crimes, vec![CrimeType::Theft, CrimeType::ArmsAct]);
    }

    #[test]
    fn test_resolve_all_keyword() {
        let dataset = sample_dataset();
        let filter = request(Some("all"), None, None, Some("ALL"))
            .resolve(&dataset, &base(&dataset))
            .unwrap();
        assert_eq!(filter.units.len(), 3);
        assert_eq!(filter.crimes.len(), CrimeType::COUNT);
    }

    #[test]
    fn test_resolve_rejects_unknown_unit() {
        let dataset = sample_dataset();
        let err = request(Some("DMP,XYZ"), None, None, None)
            .resolve(&dataset, &base(&dataset))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownUnit(ref u) if u == "XYZ"));
    }

    #[test]
    fn test_resolve_rejects_unknown_crime() {
        let dataset = sample_dataset();
        let err = request(None, None, None, Some("Murder,Piracy"))
            .resolve(&dataset, &base(&dataset))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCrimeType(ref c) if c == "Piracy"));
    }

    #[test]
    fn test_resolve_rejects_bad_years() {
        let dataset = sample_dataset();
        let defaults = base(&dataset);

        let reversed = request(None, Some("2023"), Some("2021"), None).resolve(&dataset, &defaults);
        assert!(matches!(reversed, Err(Error::InvalidYearRange { .. })));

        let outside = request(None, Some("2019"), None, None).resolve(&dataset, &defaults);
        assert!(matches!(outside, Err(Error::InvalidYearRange { min: 2021, max: 2023, .. })));

        let garbage = request(None, Some("twenty"), None, None).resolve(&dataset, &defaults);
        assert!(matches!(garbage, Err(Error::InvalidParameter { name: "year_from", .. })));
    }

    #[test]
    fn test_toggle_unit() {
        let dataset = sample_dataset();
        let mut filter = Filter::from_defaults(&dataset, &DefaultSelection::default());
        filter.toggle_unit("RMP");
        assert!(filter.units.contains("RMP"));
        filter.toggle_unit("RMP");
        assert!(!filter.units.contains("RMP"));
    }
}
