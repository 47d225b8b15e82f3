// Aggregation layer - groups and sums filtered rows for the charts
//
// Every function takes the filtered rows as produced by `Filter::apply` and
// returns plain, ordered data; nothing here knows about charts or HTTP.

use crate::dataset::{CrimeRecord, CrimeType};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Crime types used by the distribution chart when none are selected.
pub const DEFAULT_DISTRIBUTION_CRIMES: [CrimeType; 5] = [
    CrimeType::Dacoity,
    CrimeType::Robbery,
    CrimeType::Murder,
    CrimeType::SpeedyTrial,
    CrimeType::Riot,
];

/// Crime types used by the trends chart when none are selected.
pub const DEFAULT_TREND_CRIMES: [CrimeType; 3] =
    [CrimeType::Murder, CrimeType::Robbery, CrimeType::Theft];

/// Headline numbers for the summary cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_cases: u64,
    /// Mean of per-month totals across distinct (year, month) pairs.
    pub avg_monthly: f64,
    /// Crime type with the largest total across all columns.
    pub peak_crime: Option<CrimeType>,
    pub unit_count: usize,
}

pub fn summarize(rows: &[&CrimeRecord]) -> Summary {
    let total_cases: u64 = rows.iter().map(|r| r.total_cases).sum();

    let mut per_month: HashMap<(i32, u32), u64> = HashMap::new();
    for row in rows {
        *per_month.entry((row.year, row.month)).or_default() += row.total_cases;
    }
    let avg_monthly = if per_month.is_empty() {
        0.0
    } else {
        per_month.values().sum::<u64>() as f64 / per_month.len() as f64
    };

    let units: BTreeSet<&str> = rows.iter().map(|r| r.unit.as_str()).collect();

    Summary {
        total_cases,
        avg_monthly,
        peak_crime: peak_crime(rows),
        unit_count: units.len(),
    }
}

/// Largest crime column; ties go to the earlier column, all-zero is `None`.
fn peak_crime(rows: &[&CrimeRecord]) -> Option<CrimeType> {
    let totals = crime_totals(rows, &CrimeType::ALL);
    let mut best: Option<(CrimeType, u64)> = None;
    for (crime, total) in totals {
        if total > 0 && best.map_or(true, |(_, max)| total > max) {
            best = Some((crime, total));
        }
    }
    best.map(|(crime, _)| crime)
}

/// Sum of each requested crime column, in the requested order.
pub fn crime_totals(rows: &[&CrimeRecord], crimes: &[CrimeType]) -> Vec<(CrimeType, u64)> {
    crimes
        .iter()
        .map(|crime| (*crime, rows.iter().map(|r| r.count(*crime)).sum::<u64>()))
        .collect()
}

/// Crime totals for the distribution chart, with its empty-selection default.
pub fn crime_distribution(rows: &[&CrimeRecord], crimes: &[CrimeType]) -> Vec<(CrimeType, u64)> {
    if crimes.is_empty() {
        crime_totals(rows, &DEFAULT_DISTRIBUTION_CRIMES)
    } else {
        crime_totals(rows, crimes)
    }
}

/// Total cases per month, ascending by date.
pub fn monthly_totals(rows: &[&CrimeRecord]) -> Vec<(NaiveDate, u64)> {
    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for row in rows {
        *by_date.entry(row.date).or_default() += row.total_cases;
    }
    by_date.into_iter().collect()
}

/// Units ranked by total cases, largest first, ties by name.
pub fn top_units(rows: &[&CrimeRecord], limit: usize) -> Vec<(String, u64)> {
    let mut by_unit: HashMap<&str, u64> = HashMap::new();
    for row in rows {
        *by_unit.entry(row.unit.as_str()).or_default() += row.total_cases;
    }

    let mut ranked: Vec<(String, u64)> = by_unit
        .into_iter()
        .map(|(unit, total)| (unit.to_string(), total))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Per-month totals for several crime types at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrimeTrends {
    pub dates: Vec<NaiveDate>,
    /// One series per crime, aligned with `dates`.
    pub series: Vec<(CrimeType, Vec<u64>)>,
}

pub fn crime_trends(rows: &[&CrimeRecord], crimes: &[CrimeType]) -> CrimeTrends {
    let crimes: &[CrimeType] = if crimes.is_empty() {
        &DEFAULT_TREND_CRIMES
    } else {
        crimes
    };

    let mut by_date: BTreeMap<NaiveDate, Vec<u64>> = BTreeMap::new();
    for row in rows {
        let sums = by_date
            .entry(row.date)
            .or_insert_with(|| vec![0; crimes.len()]);
        for (slot, crime) in sums.iter_mut().zip(crimes) {
            *slot += row.count(*crime);
        }
    }

    let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
    let series = crimes
        .iter()
        .enumerate()
        .map(|(i, crime)| (*crime, by_date.values().map(|sums| sums[i]).collect()))
        .collect();

    CrimeTrends { dates, series }
}

/// Mean total cases per row, grouped by calendar month. Only months that
/// occur in `rows` are returned.
pub fn seasonal_pattern(rows: &[&CrimeRecord]) -> Vec<(u32, f64)> {
    let mut by_month: BTreeMap<u32, (u64, u64)> = BTreeMap::new();
    for row in rows {
        let entry = by_month.entry(row.month).or_default();
        entry.0 += row.total_cases;
        entry.1 += 1;
    }
    by_month
        .into_iter()
        .map(|(month, (sum, n))| (month, sum as f64 / n as f64))
        .collect()
}

/// Total cases per year, ascending.
pub fn yearly_totals(rows: &[&CrimeRecord]) -> Vec<(i32, u64)> {
    let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
    for row in rows {
        *by_year.entry(row.year).or_default() += row.total_cases;
    }
    by_year.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultSelection;
    use crate::dataset::tests::sample_dataset;
    use crate::dataset::Dataset;
    use crate::filter::{Filter, YearRange};

    fn rows_for<'a>(dataset: &'a Dataset, units: &[&str], years: (i32, i32)) -> Vec<&'a CrimeRecord> {
        Filter::new(
            units.iter().map(|u| u.to_string()).collect(),
            YearRange::new(years.0, years.1),
            vec![],
        )
        .apply(dataset)
    }

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_summary_over_defaults() {
        let dataset = sample_dataset();
        let filter = Filter::from_defaults(&dataset, &DefaultSelection::default());
        let rows = filter.apply(&dataset);
        let summary = summarize(&rows);

        // DMP + CMP rows, 2021-2023 (7 rows)
        let expected: u64 = rows.iter().map(|r| r.total_cases).sum();
        assert_eq!(rows.len(), 7);
        assert_eq!(summary.total_cases, expected);
        assert_eq!(summary.unit_count, 2);
        assert_eq!(summary.peak_crime, Some(CrimeType::Theft));
    }

    #[test]
    fn test_avg_monthly_groups_by_year_and_month() {
        let dataset = sample_dataset();
        // 2021-01 has DMP and CMP rows, 2021-02 only DMP
        let rows = rows_for(&dataset, &["DMP", "CMP"], (2021, 2021));
        let summary = summarize(&rows);

        let jan = rows.iter().filter(|r| r.month == 1).map(|r| r.total_cases).sum::<u64>();
        let feb = rows.iter().filter(|r| r.month == 2).map(|r| r.total_cases).sum::<u64>();
        assert_eq!(summary.avg_monthly, (jan + feb) as f64 / 2.0);
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_cases, 0);
        assert_eq!(summary.avg_monthly, 0.0);
        assert_eq!(summary.peak_crime, None);
        assert_eq!(summary.unit_count, 0);
    }

    #[test]
    fn test_peak_crime_tie_goes_to_first_column() {
        let dataset = sample_dataset();
        // CMP 2022-03: base 1, murder 5, theft 5 -> tie between Murder and Theft
        let rows: Vec<&CrimeRecord> = dataset
            .records()
            .iter()
            .filter(|r| r.unit == "CMP" && r.year == 2022)
            .collect();
        assert_eq!(summarize(&rows).peak_crime, Some(CrimeType::Murder));
    }

    #[test]
    fn test_crime_distribution_defaults_to_first_five() {
        let dataset = sample_dataset();
        let rows = rows_for(&dataset, &["DMP"], (2021, 2023));

        let dist = crime_distribution(&rows, &[]);
        let crimes: Vec<CrimeType> = dist.iter().map(|(c, _)| *c).collect();
        assert_eq!(crimes, DEFAULT_DISTRIBUTION_CRIMES.to_vec());

        let murder = crime_distribution(&rows, &[CrimeType::Murder]);
        assert_eq!(murder, vec![(CrimeType::Murder, 10 + 12 + 8 + 9)]);
    }

    #[test]
    fn test_monthly_totals_sorted_and_summed() {
        let dataset = sample_dataset();
        let rows = rows_for(&dataset, &["DMP", "CMP", "RMP"], (2021, 2023));
        let monthly = monthly_totals(&rows);

        let dates: Vec<NaiveDate> = monthly.iter().map(|(d, _)| *d).collect();
        assert_eq!(
            dates,
            vec![date(2021, 1), date(2021, 2), date(2022, 1), date(2022, 3), date(2023, 12)]
        );
        let grand: u64 = monthly.iter().map(|(_, t)| t).sum();
        assert_eq!(grand, rows.iter().map(|r| r.total_cases).sum::<u64>());
    }

    #[test]
    fn test_top_units_ranking() {
        let dataset = sample_dataset();
        let rows = rows_for(&dataset, &["DMP", "CMP", "RMP"], (2021, 2023));

        let top = top_units(&rows, 10);
        let names: Vec<&str> = top.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(names, vec!["DMP", "CMP", "RMP"]);
        assert!(top[0].1 > top[1].1);

        assert_eq!(top_units(&rows, 1).len(), 1);
    }

    #[test]
    fn test_crime_trends_alignment() {
        let dataset = sample_dataset();
        let rows = rows_for(&dataset, &["DMP", "CMP"], (2021, 2021));

        let trends = crime_trends(&rows, &[CrimeType::Murder]);
        assert_eq!(trends.dates, vec![date(2021, 1), date(2021, 2)]);
        assert_eq!(trends.series, vec![(CrimeType::Murder, vec![14, 12])]);

        let defaults = crime_trends(&rows, &[]);
        let crimes: Vec<CrimeType> = defaults.series.iter().map(|(c, _)| *c).collect();
        assert_eq!(crimes, DEFAULT_TREND_CRIMES.to_vec());
        assert!(defaults.series.iter().all(|(_, v)| v.len() == defaults.dates.len()));
    }

    #[test]
    fn test_seasonal_pattern_is_mean_per_row() {
        let dataset = sample_dataset();
        let rows = rows_for(&dataset, &["DMP", "CMP"], (2021, 2023));
        let seasonal = seasonal_pattern(&rows);

        let months: Vec<u32> = seasonal.iter().map(|(m, _)| *m).collect();
        assert_eq!(months, vec![1, 2, 3, 12]);

        let january: Vec<u64> = rows.iter().filter(|r| r.month == 1).map(|r| r.total_cases).collect();
        let expected = january.iter().sum::<u64>() as f64 / january.len() as f64;
        assert_eq!(seasonal[0].1, expected);
    }

    #[test]
    fn test_yearly_totals() {
        let dataset = sample_dataset();
        let rows = rows_for(&dataset, &["RMP"], (2021, 2023));
        let yearly = yearly_totals(&rows);
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].0, 2022);
        assert_eq!(yearly[0].1, rows[0].total_cases);
    }
}
