// Rendering layer - aggregated rows → Plotly figure specifications
//
// The browser draws figures with plotly.js, so a figure here is just the
// `{ data, layout }` document Plotly expects, built from typed parts.

use crate::aggregate::{self, CrimeTrends};
use crate::dataset::{month_name, CrimeRecord, CrimeType};
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Plotly's qualitative Set3 palette, used for the pie slices.
pub const SET3: [&str; 12] = [
    "#8DD3C7", "#FFFFB3", "#BEBADA", "#FB8072", "#80B1D3", "#FDB462", "#B3DE69", "#FCCDE5",
    "#D9D9D9", "#BC80BD", "#CCEBC5", "#FFED6F",
];

pub const TOP_UNITS_LIMIT: usize = 10;

// ============================================================================
// FIGURE MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

/// Axis values: dates and labels go as strings, measurements as numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Values {
    Text(Vec<String>),
    Numbers(Vec<f64>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Text(v) => v.len(),
            Values::Numbers(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceType {
    Pie,
    Scatter,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub trace_type: TraceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Values>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Values>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textinfo: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

impl Trace {
    fn new(trace_type: TraceType) -> Self {
        Self {
            trace_type,
            name: None,
            x: None,
            y: None,
            labels: None,
            values: None,
            mode: None,
            orientation: None,
            textposition: None,
            textinfo: None,
            marker: None,
            line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// Discrete slice colours (pie).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<&'static str>>,
    /// Per-point values mapped through `colorscale` (bar).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showscale: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovermode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
}

impl Layout {
    fn new(title: &str, height: u32) -> Self {
        Self {
            title: Title {
                text: title.to_string(),
            },
            height,
            hovermode: None,
            xaxis: None,
            yaxis: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickvals: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticktext: Option<Vec<String>>,
    /// "reversed" keeps the largest bar on top.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autorange: Option<&'static str>,
}

impl Axis {
    fn titled(text: &str) -> Self {
        Self {
            title: Some(Title {
                text: text.to_string(),
            }),
            ..Self::default()
        }
    }
}

// ============================================================================
// CHARTS
// ============================================================================

/// The charts the dashboard can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    CrimeDistribution,
    MonthlyTrend,
    TopUnits,
    CrimeTrends,
    SeasonalPatterns,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::CrimeDistribution,
        ChartKind::MonthlyTrend,
        ChartKind::TopUnits,
        ChartKind::CrimeTrends,
        ChartKind::SeasonalPatterns,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ChartKind::CrimeDistribution => "crime-distribution",
            ChartKind::MonthlyTrend => "monthly-trend",
            ChartKind::TopUnits => "top-units",
            ChartKind::CrimeTrends => "crime-trends",
            ChartKind::SeasonalPatterns => "seasonal-patterns",
        }
    }

    /// Build this chart from filtered rows and the crime selection.
    pub fn render(&self, rows: &[&CrimeRecord], crimes: &[CrimeType]) -> Figure {
        match self {
            ChartKind::CrimeDistribution => {
                crime_pie_chart(&aggregate::crime_distribution(rows, crimes))
            }
            ChartKind::MonthlyTrend => monthly_trend_chart(&aggregate::monthly_totals(rows)),
            ChartKind::TopUnits => {
                top_units_chart(&aggregate::top_units(rows, TOP_UNITS_LIMIT))
            }
            ChartKind::CrimeTrends => crime_trends_chart(&aggregate::crime_trends(rows, crimes)),
            ChartKind::SeasonalPatterns => {
                seasonal_patterns_chart(&aggregate::seasonal_pattern(rows))
            }
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ChartKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ChartKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| Error::UnknownChart(s.to_string()))
    }
}

pub fn crime_pie_chart(totals: &[(CrimeType, u64)]) -> Figure {
    let mut trace = Trace::new(TraceType::Pie);
    trace.labels = Some(totals.iter().map(|(c, _)| c.column().to_string()).collect());
    trace.values = Some(totals.iter().map(|(_, t)| *t as f64).collect());
    trace.textposition = Some("inside");
    trace.textinfo = Some("percent+label");
    trace.marker = Some(Marker {
        colors: Some(SET3.iter().copied().cycle().take(totals.len()).collect()),
        color: None,
        colorscale: None,
        showscale: None,
    });

    Figure {
        data: vec![trace],
        layout: Layout::new("Crime Type Distribution", 400),
    }
}

pub fn monthly_trend_chart(monthly: &[(chrono::NaiveDate, u64)]) -> Figure {
    let mut trace = Trace::new(TraceType::Scatter);
    trace.name = Some("Total Cases".to_string());
    trace.mode = Some("lines");
    trace.x = Some(Values::Text(monthly.iter().map(|(d, _)| d.to_string()).collect()));
    trace.y = Some(Values::Numbers(monthly.iter().map(|(_, t)| *t as f64).collect()));

    let mut layout = Layout::new("Monthly Crime Trend", 400);
    layout.hovermode = Some("x unified");
    layout.xaxis = Some(Axis::titled("Date"));
    layout.yaxis = Some(Axis::titled("Total Cases"));

    Figure {
        data: vec![trace],
        layout,
    }
}

pub fn top_units_chart(units: &[(String, u64)]) -> Figure {
    let totals: Vec<f64> = units.iter().map(|(_, t)| *t as f64).collect();

    let mut trace = Trace::new(TraceType::Bar);
    trace.orientation = Some("h");
    trace.x = Some(Values::Numbers(totals.clone()));
    trace.y = Some(Values::Text(units.iter().map(|(u, _)| u.clone()).collect()));
    trace.marker = Some(Marker {
        colors: None,
        color: Some(totals),
        colorscale: Some("Viridis"),
        showscale: Some(true),
    });

    let mut layout = Layout::new("Top 10 Police Units", 400);
    layout.xaxis = Some(Axis::titled("Total Cases"));
    layout.yaxis = Some(Axis {
        autorange: Some("reversed"),
        ..Axis::titled("Unit")
    });

    Figure {
        data: vec![trace],
        layout,
    }
}

pub fn crime_trends_chart(trends: &CrimeTrends) -> Figure {
    let dates: Vec<String> = trends.dates.iter().map(|d| d.to_string()).collect();

    let data = trends
        .series
        .iter()
        .map(|(crime, counts)| {
            let mut trace = Trace::new(TraceType::Scatter);
            trace.name = Some(crime.column().to_string());
            trace.mode = Some("lines+markers");
            trace.x = Some(Values::Text(dates.clone()));
            trace.y = Some(Values::Numbers(counts.iter().map(|c| *c as f64).collect()));
            trace
        })
        .collect();

    let mut layout = Layout::new("Crime Trends Over Time", 500);
    layout.hovermode = Some("x unified");
    layout.xaxis = Some(Axis::titled("Date"));
    layout.yaxis = Some(Axis::titled("Cases"));

    Figure { data, layout }
}

pub fn seasonal_patterns_chart(seasonal: &[(u32, f64)]) -> Figure {
    let mut trace = Trace::new(TraceType::Scatter);
    trace.name = Some("Average Cases".to_string());
    trace.mode = Some("lines+markers");
    trace.line = Some(Line { width: 3 });
    trace.x = Some(Values::Numbers(seasonal.iter().map(|(m, _)| *m as f64).collect()));
    trace.y = Some(Values::Numbers(seasonal.iter().map(|(_, avg)| *avg).collect()));

    let mut layout = Layout::new("Seasonal Patterns", 400);
    layout.xaxis = Some(Axis {
        tickvals: Some((1..=12).collect()),
        ticktext: Some((1..=12).map(|m| month_name(m)[..3].to_string()).collect()),
        ..Axis::titled("Month")
    });
    layout.yaxis = Some(Axis::titled("Average Cases"));

    Figure {
        data: vec![trace],
        layout,
    }
}
