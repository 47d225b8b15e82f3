// Crime dataset - CSV → in-memory table
//
// One row per (police unit, year, month), one column per crime type.
// Loaded once at startup and never mutated afterwards.

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// CRIME TYPES
// ============================================================================

/// The crime categories reported per unit and month.
///
/// Order matters: it is the CSV column order and the tie-break order for
/// "peak crime".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CrimeType {
    Dacoity,
    Robbery,
    Murder,
    #[serde(rename = "Speedy_Trial")]
    SpeedyTrial,
    Riot,
    #[serde(rename = "Woman_Child_Repression")]
    WomanChildRepression,
    Kidnapping,
    #[serde(rename = "Police_Assault")]
    PoliceAssault,
    Burglary,
    Theft,
    #[serde(rename = "Other_Cases")]
    OtherCases,
    #[serde(rename = "Arms_Act")]
    ArmsAct,
    #[serde(rename = "Explosive_Act")]
    ExplosiveAct,
    Narcotics,
    Smuggling,
    #[serde(rename = "Recovery_Cases")]
    RecoveryCases,
}

impl CrimeType {
    pub const COUNT: usize = 16;

    pub const ALL: [CrimeType; CrimeType::COUNT] = [
        CrimeType::Dacoity,
        CrimeType::Robbery,
        CrimeType::Murder,
        CrimeType::SpeedyTrial,
        CrimeType::Riot,
        CrimeType::WomanChildRepression,
        CrimeType::Kidnapping,
        CrimeType::PoliceAssault,
        CrimeType::Burglary,
        CrimeType::Theft,
        CrimeType::OtherCases,
        CrimeType::ArmsAct,
        CrimeType::ExplosiveAct,
        CrimeType::Narcotics,
        CrimeType::Smuggling,
        CrimeType::RecoveryCases,
    ];

    /// CSV header for this crime type.
    pub fn column(&self) -> &'static str {
        match self {
            CrimeType::Dacoity => "Dacoity",
            CrimeType::Robbery => "Robbery",
            CrimeType::Murder => "Murder",
            CrimeType::SpeedyTrial => "Speedy_Trial",
            CrimeType::Riot => "Riot",
            CrimeType::WomanChildRepression => "Woman_Child_Repression",
            CrimeType::Kidnapping => "Kidnapping",
            CrimeType::PoliceAssault => "Police_Assault",
            CrimeType::Burglary => "Burglary",
            CrimeType::Theft => "Theft",
            CrimeType::OtherCases => "Other_Cases",
            CrimeType::ArmsAct => "Arms_Act",
            CrimeType::ExplosiveAct => "Explosive_Act",
            CrimeType::Narcotics => "Narcotics",
            CrimeType::Smuggling => "Smuggling",
            CrimeType::RecoveryCases => "Recovery_Cases",
        }
    }

    /// Human-readable label shown in controls and legends.
    pub fn label(&self) -> &'static str {
        match self {
            CrimeType::SpeedyTrial => "Speedy Trial",
            CrimeType::WomanChildRepression => "Woman & Child Repression",
            CrimeType::PoliceAssault => "Police Assault",
            CrimeType::OtherCases => "Other Cases",
            CrimeType::ArmsAct => "Arms Act",
            CrimeType::ExplosiveAct => "Explosive Act",
            CrimeType::RecoveryCases => "Recovery Cases",
            other => other.column(),
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for CrimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for CrimeType {
    type Err = Error;

    /// Accepts the column name or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        CrimeType::ALL
            .iter()
            .copied()
            .find(|crime| {
                crime.column().eq_ignore_ascii_case(needle)
                    || crime.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| Error::UnknownCrimeType(needle.to_string()))
    }
}

// ============================================================================
// CRIME RECORD
// ============================================================================

/// Per-crime counts for one row, indexed by [`CrimeType`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrimeCounts([u64; CrimeType::COUNT]);

impl CrimeCounts {
    pub fn get(&self, crime: CrimeType) -> u64 {
        self.0[crime.index()]
    }

    pub fn set(&mut self, crime: CrimeType, count: u64) {
        self.0[crime.index()] = count;
    }

    pub fn sum(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CrimeType, u64)> + '_ {
        CrimeType::ALL.iter().map(move |crime| (*crime, self.get(*crime)))
    }
}

impl Serialize for CrimeCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CrimeType::COUNT))?;
        for (crime, count) in self.iter() {
            map.serialize_entry(crime.column(), &count)?;
        }
        map.end()
    }
}

/// One police unit's figures for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrimeRecord {
    pub unit: String,
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    /// First day of the month.
    pub date: NaiveDate,
    pub counts: CrimeCounts,
    pub total_cases: u64,
}

impl CrimeRecord {
    pub fn new(unit: impl Into<String>, year: i32, month: u32, counts: CrimeCounts) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self {
            unit: unit.into(),
            year,
            month,
            date,
            total_cases: counts.sum(),
            counts,
        })
    }

    pub fn count(&self, crime: CrimeType) -> u64 {
        self.counts.get(crime)
    }

    /// Month name as written in the source data, e.g. "January".
    pub fn month_name(&self) -> &'static str {
        month_name(self.date.month())
    }
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "",
    }
}

/// Row exactly as it appears in the CSV. Counts stay textual so that bad
/// cells can be reported with their line and column.
#[derive(Debug, Deserialize)]
struct RawCrimeRow {
    #[serde(rename = "Unit")]
    unit: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "Dacoity")]
    dacoity: String,
    #[serde(rename = "Robbery")]
    robbery: String,
    #[serde(rename = "Murder")]
    murder: String,
    #[serde(rename = "Speedy_Trial")]
    speedy_trial: String,
    #[serde(rename = "Riot")]
    riot: String,
    #[serde(rename = "Woman_Child_Repression")]
    woman_child_repression: String,
    #[serde(rename = "Kidnapping")]
    kidnapping: String,
    #[serde(rename = "Police_Assault")]
    police_assault: String,
    #[serde(rename = "Burglary")]
    burglary: String,
    #[serde(rename = "Theft")]
    theft: String,
    #[serde(rename = "Other_Cases")]
    other_cases: String,
    #[serde(rename = "Arms_Act")]
    arms_act: String,
    #[serde(rename = "Explosive_Act")]
    explosive_act: String,
    #[serde(rename = "Narcotics")]
    narcotics: String,
    #[serde(rename = "Smuggling")]
    smuggling: String,
    #[serde(rename = "Recovery_Cases")]
    recovery_cases: String,
    // Optional: recomputed from the crime columns when the file lacks it
    #[serde(rename = "Total_Cases", default)]
    total_cases: Option<String>,
}

impl RawCrimeRow {
    fn into_record(self, line: u64) -> Result<CrimeRecord> {
        let unit = self.unit.trim().to_string();
        if unit.is_empty() {
            return Err(invalid(line, "Unit", &self.unit));
        }

        let year: i32 = self
            .year
            .trim()
            .parse()
            .map_err(|_| invalid(line, "Year", &self.year))?;
        let month = parse_month(&self.month).ok_or_else(|| invalid(line, "Month", &self.month))?;

        let cells = [
            (CrimeType::Dacoity, &self.dacoity),
            (CrimeType::Robbery, &self.robbery),
            (CrimeType::Murder, &self.murder),
            (CrimeType::SpeedyTrial, &self.speedy_trial),
            (CrimeType::Riot, &self.riot),
            (CrimeType::WomanChildRepression, &self.woman_child_repression),
            (CrimeType::Kidnapping, &self.kidnapping),
            (CrimeType::PoliceAssault, &self.police_assault),
            (CrimeType::Burglary, &self.burglary),
            (CrimeType::Theft, &self.theft),
            (CrimeType::OtherCases, &self.other_cases),
            (CrimeType::ArmsAct, &self.arms_act),
            (CrimeType::ExplosiveAct, &self.explosive_act),
            (CrimeType::Narcotics, &self.narcotics),
            (CrimeType::Smuggling, &self.smuggling),
            (CrimeType::RecoveryCases, &self.recovery_cases),
        ];

        let mut counts = CrimeCounts::default();
        for (crime, raw) in cells {
            counts.set(crime, parse_count(raw, line, crime.column())?);
        }

        let mut record = CrimeRecord::new(unit, year, month, counts)
            .ok_or_else(|| invalid(line, "Year", &self.year))?;

        if let Some(raw_total) = self.total_cases.as_deref() {
            if !raw_total.trim().is_empty() {
                record.total_cases = parse_count(raw_total, line, "Total_Cases")?;
            }
        }

        Ok(record)
    }
}

fn invalid(line: u64, column: &str, value: &str) -> Error {
    Error::InvalidValue {
        line,
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Month as a name ("January"), abbreviation ("jan") or number ("1").
pub fn parse_month(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Ok(number) = trimmed.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }
    trimmed
        .parse::<chrono::Month>()
        .ok()
        .map(|month| month.number_from_month())
}

/// Non-negative integer count. Empty cells count as zero and integral
/// floats ("12.0") are accepted.
fn parse_count(raw: &str, line: u64, column: &str) -> Result<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if let Ok(count) = trimmed.parse::<u64>() {
        return Ok(count);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => Ok(value as u64),
        _ => Err(invalid(line, column, raw)),
    }
}

// ============================================================================
// DATASET
// ============================================================================

/// The whole crime table plus its categorical domain.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<CrimeRecord>,
    units: Vec<String>,
    years: Vec<i32>,
}

impl Dataset {
    pub fn new(records: Vec<CrimeRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let units: BTreeSet<String> = records.iter().map(|r| r.unit.clone()).collect();
        let years: BTreeSet<i32> = records.iter().map(|r| r.year).collect();

        Ok(Self {
            records,
            units: units.into_iter().collect(),
            years: years.into_iter().collect(),
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let raw: RawCrimeRow = row.deserialize(Some(&headers))?;
            records.push(raw.into_record(line)?);
        }

        Self::new(records)
    }

    pub fn records(&self) -> &[CrimeRecord] {
        &self.records
    }

    /// Distinct units, sorted.
    pub fn units(&self) -> &[String] {
        &self.units
    }

    /// Distinct years, sorted.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn has_unit(&self, unit: &str) -> bool {
        self.units.binary_search_by(|u| u.as_str().cmp(unit)).is_ok()
    }

    /// First and last year present.
    pub fn year_bounds(&self) -> (i32, i32) {
        // new() rejects empty datasets, so both ends exist
        let first = self.years.first().copied().unwrap_or_default();
        let last = self.years.last().copied().unwrap_or_default();
        (first, last)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load the crime table from a CSV file.
pub fn load_csv(csv_path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(csv_path).map_err(|e| Error::DatasetOpen {
        path: csv_path.to_path_buf(),
        source: csv::Error::from(e),
    })?;

    let dataset = Dataset::from_reader(file)?;
    let (first, last) = dataset.year_bounds();
    tracing::info!(
        path = %csv_path.display(),
        records = dataset.len(),
        units = dataset.units().len(),
        "loaded crime data for {}-{}",
        first,
        last
    );

    Ok(dataset)
}
