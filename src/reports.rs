// src/reports.rs
//! Monthly cost levelling: sparse (year, month) samples -> dense chart series

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ClientResult;
use crate::models::MonthlyCost;

// ==================== SAMPLES & SERIES ====================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthSample {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

impl MonthSample {
    pub fn new(year: i32, month: u32, value: f64) -> Self {
        Self { year, month, value }
    }

    fn key(&self) -> (i32, u32) {
        (self.year, self.month)
    }
}

impl From<MonthlyCost> for MonthSample {
    fn from(row: MonthlyCost) -> Self {
        Self::new(row.year, row.month, row.total_cost.unwrap_or(0.0))
    }
}

impl From<&MonthlyCost> for MonthSample {
    fn from(row: &MonthlyCost) -> Self {
        Self::new(row.year, row.month, row.total_cost.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub value: f64,
}

/// One point per calendar month, ascending, without gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DenseSeries {
    pub points: Vec<SeriesPoint>,
}

/// The shape the chart surface accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl DenseSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    pub fn to_chart(&self) -> ChartSeries {
        ChartSeries {
            labels: self.points.iter().map(|p| p.label.clone()).collect(),
            values: self.points.iter().map(|p| p.value).collect(),
        }
    }
}

/// Short month name plus two-digit year, e.g. "Jan 24".
pub fn month_label(year: i32, month: u32) -> String {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(date) => date.format("%b %y").to_string(),
        None => format!("{:02}/{:02}", month, year.rem_euclid(100)),
    }
}

/// Longest series `level` emits; older months are cut from the front.
pub const MAX_SERIES_MONTHS: i64 = 12_000;

fn next_month((year, month): (i32, u32)) -> Option<(i32, u32)> {
    if month >= 12 {
        Some((year.checked_add(1)?, 1))
    } else {
        Some((year, month + 1))
    }
}

fn month_index((year, month): (i32, u32)) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

// only called with indices derived from representable years
fn from_month_index(index: i64) -> (i32, u32) {
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}

fn is_representable(sample: &MonthSample) -> bool {
    if !(1..=12).contains(&sample.month) {
        warn!(year = sample.year, month = sample.month, "dropping sample with invalid month");
        return false;
    }
    if !(NaiveDate::MIN.year()..=NaiveDate::MAX.year()).contains(&sample.year) {
        warn!(year = sample.year, month = sample.month, "dropping sample with out-of-range year");
        return false;
    }
    true
}

/// Fills every month between the earliest and latest sample, inclusive.
///
/// Duplicate (year, month) keys keep the last value seen. Months without a
/// sample are emitted with value 0, so a sparse response cannot compress the
/// chart's time axis. Samples with an invalid month or a year outside the
/// calendar range are dropped. A span longer than [`MAX_SERIES_MONTHS`] keeps
/// only its most recent months.
pub fn level(samples: &[MonthSample]) -> DenseSeries {
    let valid: Vec<&MonthSample> = samples.iter().filter(|s| is_representable(s)).collect();

    let (Some(mut min), Some(max)) = (
        valid.iter().map(|s| s.key()).min(),
        valid.iter().map(|s| s.key()).max(),
    ) else {
        return DenseSeries::default();
    };

    let mut by_month: HashMap<(i32, u32), f64> = HashMap::with_capacity(valid.len());
    for s in &valid {
        by_month.insert(s.key(), s.value);
    }

    let span = month_index(max) - month_index(min) + 1;
    if span > MAX_SERIES_MONTHS {
        warn!(months = span, kept = MAX_SERIES_MONTHS, "series span truncated");
        min = from_month_index(month_index(max) - MAX_SERIES_MONTHS + 1);
    }

    let mut points = Vec::with_capacity(span.min(MAX_SERIES_MONTHS) as usize);
    let mut cursor = Some(min);
    while let Some(key) = cursor.filter(|k| *k <= max) {
        let (year, month) = key;
        points.push(SeriesPoint {
            year,
            month,
            label: month_label(year, month),
            value: by_month.get(&key).copied().unwrap_or(0.0),
        });
        cursor = next_month(key);
    }

    debug!(samples = samples.len(), months = points.len(), "series levelled");
    DenseSeries { points }
}

pub fn level_monthly_cost(rows: &[MonthlyCost]) -> DenseSeries {
    let samples: Vec<MonthSample> = rows.iter().map(MonthSample::from).collect();
    level(&samples)
}

// ==================== WARRANTY WINDOW ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WarrantyWindow {
    #[default]
    Days30,
    Days60,
    Days90,
}

impl WarrantyWindow {
    pub const ALL: [WarrantyWindow; 3] = [WarrantyWindow::Days30, WarrantyWindow::Days60, WarrantyWindow::Days90];

    pub fn days(&self) -> u32 {
        match self {
            WarrantyWindow::Days30 => 30,
            WarrantyWindow::Days60 => 60,
            WarrantyWindow::Days90 => 90,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.days() == days)
    }

    pub fn deadline(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(i64::from(self.days()))
    }
}

// ==================== SURFACES ====================

/// Chart rendering collaborator.
pub trait ChartSurface {
    fn render(&mut self, series: &ChartSeries);
}

/// File-download collaborator.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn save(&self, bytes: Vec<u8>, filename: &str) -> ClientResult<()>;
}

/// `{prefix}_{YYYY-MM-DD}.csv`
pub fn export_filename(prefix: &str, today: NaiveDate) -> String {
    format!("{}_{}.csv", prefix, today.format("%Y-%m-%d"))
}
