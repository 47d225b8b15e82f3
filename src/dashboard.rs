// Dashboard composition - what each interaction sends back to the page
//
// A request carries a resolved `Filter`; this module runs filter → aggregate
// → render and packages the result as summary cards, tab content, control
// options or a per-unit profile.

use crate::aggregate::{self, Summary};
use crate::chart::{ChartKind, Figure};
use crate::dataset::{CrimeRecord, CrimeType, Dataset};
use crate::error::{Error, Result};
use crate::filter::{Filter, YearRange};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SUMMARY CARDS
// ============================================================================

/// The four headline cards, preformatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCards {
    pub total_cases: String,
    pub avg_monthly: String,
    pub peak_crime: String,
    pub units: String,
    /// Unformatted figures behind the cards.
    pub raw: Summary,
}

impl From<Summary> for SummaryCards {
    fn from(summary: Summary) -> Self {
        Self {
            total_cases: format_thousands(summary.total_cases as f64),
            avg_monthly: format_thousands(summary.avg_monthly),
            peak_crime: summary
                .peak_crime
                .map(|c| c.column().to_string())
                .unwrap_or_else(|| "-".to_string()),
            units: summary.unit_count.to_string(),
            raw: summary,
        }
    }
}

/// Round to a whole number and group digits with commas: 12345.6 → "12,346".
/// Halves round to even, so 12344.5 → "12,344".
pub fn format_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let negative = value < 0.0 && digits != "0";

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn summary_cards(dataset: &Dataset, filter: &Filter) -> SummaryCards {
    let rows = filter.apply(dataset);
    aggregate::summarize(&rows).into()
}

// ============================================================================
// TABS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Overview,
    Trends,
    Analysis,
    Data,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Overview, Tab::Trends, Tab::Analysis, Tab::Data];

    pub fn slug(&self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Trends => "trends",
            Tab::Analysis => "analysis",
            Tab::Data => "data",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview Dashboard",
            Tab::Trends => "Crime Trends",
            Tab::Analysis => "Crime Analysis",
            Tab::Data => "Raw Data",
        }
    }

    /// Charts shown on this tab, left to right.
    pub fn charts(&self) -> &'static [ChartKind] {
        match self {
            Tab::Overview => &[ChartKind::CrimeDistribution, ChartKind::MonthlyTrend],
            Tab::Trends => &[ChartKind::CrimeTrends],
            Tab::Analysis => &[ChartKind::SeasonalPatterns],
            Tab::Data => &[],
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Tab::Overview => Tab::Trends,
            Tab::Trends => Tab::Analysis,
            Tab::Analysis => Tab::Data,
            Tab::Data => Tab::Overview,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Tab::Overview => Tab::Data,
            Tab::Trends => Tab::Overview,
            Tab::Analysis => Tab::Trends,
            Tab::Data => Tab::Analysis,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Tab {
    type Err = Error;

    /// Accepts "overview" as well as the page's "tab-overview" ids.
    fn from_str(s: &str) -> Result<Self> {
        let slug = s.strip_prefix("tab-").unwrap_or(s);
        Tab::ALL
            .iter()
            .copied()
            .find(|tab| tab.slug() == slug)
            .ok_or_else(|| Error::UnknownTab(s.to_string()))
    }
}

/// Rows of the raw data tab, already stringified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    pub caption: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn from_records(records: &[&CrimeRecord], limit: usize) -> Self {
        let mut columns: Vec<String> = ["Unit", "Year", "Month"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        columns.extend(CrimeType::ALL.iter().map(|c| c.column().to_string()));
        columns.extend(["Total_Cases", "Date"].iter().map(|s| s.to_string()));

        let rows: Vec<Vec<String>> = records
            .iter()
            .take(limit)
            .map(|r| {
                let mut cells = vec![
                    r.unit.clone(),
                    r.year.to_string(),
                    r.month_name().to_string(),
                ];
                cells.extend(r.counts.iter().map(|(_, n)| n.to_string()));
                cells.push(r.total_cases.to_string());
                cells.push(r.date.to_string());
                cells
            })
            .collect();

        Self {
            caption: format!("Showing {} rows", rows.len()),
            columns,
            rows,
        }
    }
}

/// Everything one tab displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabContent {
    pub tab: Tab,
    pub title: &'static str,
    pub figures: Vec<Figure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<DataTable>,
}

pub fn render_tab(dataset: &Dataset, filter: &Filter, tab: Tab, max_rows: usize) -> TabContent {
    let rows = filter.apply(dataset);
    let figures = tab
        .charts()
        .iter()
        .map(|kind| kind.render(&rows, &filter.crimes))
        .collect();
    let table = (tab == Tab::Data).then(|| DataTable::from_records(&rows, max_rows));

    TabContent {
        tab,
        title: tab.title(),
        figures,
        table,
    }
}

pub fn render_chart(dataset: &Dataset, filter: &Filter, kind: ChartKind) -> Figure {
    let rows = filter.apply(dataset);
    kind.render(&rows, &filter.crimes)
}

// ============================================================================
// CONTROL OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrimeOption {
    pub value: CrimeType,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabOption {
    pub value: Tab,
    pub label: &'static str,
}

/// Values for populating the controls, plus their initial selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOptions {
    pub units: Vec<String>,
    pub year_min: i32,
    pub year_max: i32,
    pub year_marks: Vec<i32>,
    pub crimes: Vec<CrimeOption>,
    pub tabs: Vec<TabOption>,
    pub selected: Filter,
}

pub fn options(dataset: &Dataset, selected: &Filter) -> DashboardOptions {
    let (year_min, year_max) = dataset.year_bounds();
    DashboardOptions {
        units: dataset.units().to_vec(),
        year_min,
        year_max,
        year_marks: dataset.years().to_vec(),
        crimes: CrimeType::ALL
            .iter()
            .map(|c| CrimeOption {
                value: *c,
                label: c.label(),
            })
            .collect(),
        tabs: Tab::ALL
            .iter()
            .map(|t| TabOption {
                value: *t,
                label: t.title(),
            })
            .collect(),
        selected: selected.clone(),
    }
}

// ============================================================================
// UNIT PROFILE
// ============================================================================

/// One unit across the whole dataset period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitProfile {
    pub unit: String,
    pub summary: SummaryCards,
    pub yearly_totals: Vec<(i32, u64)>,
    pub crime_totals: Vec<(CrimeType, u64)>,
}

pub fn unit_profile(dataset: &Dataset, unit: &str) -> Result<UnitProfile> {
    if !dataset.has_unit(unit) {
        return Err(Error::UnknownUnit(unit.to_string()));
    }

    let (min, max) = dataset.year_bounds();
    let filter = Filter::new(
        std::iter::once(unit.to_string()).collect(),
        YearRange::new(min, max),
        CrimeType::ALL.to_vec(),
    );
    let rows = filter.apply(dataset);

    Ok(UnitProfile {
        unit: unit.to_string(),
        summary: aggregate::summarize(&rows).into(),
        yearly_totals: aggregate::yearly_totals(&rows),
        crime_totals: aggregate::crime_totals(&rows, &CrimeType::ALL),
    })
}
