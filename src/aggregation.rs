// Aggregation Pipeline
// Five independent projections over one filtered view. None of them reads
// another's output, and all are total over the empty view except the mean
// rating, which reports NoData.

use crate::dataset::TransactionRecord;
use crate::errors::{DashboardError, Result};
use chrono::{NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

pub const TOTAL_AMOUNT_LABEL: &str = "Total Purchase Amount";
pub const AVERAGE_RATING_LABEL: &str = "Average Rating";

/// Shown in place of an indicator value that does not exist.
pub const NO_DATA_DISPLAY: &str = "—";

// ============================================================================
// VIEW MODELS
// ============================================================================

/// Single-number indicator. `value` is None for the "no data" placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarIndicator {
    pub label: String,
    pub value: Option<f64>,
}

impl ScalarIndicator {
    pub fn new(label: &str, value: f64) -> Self {
        Self {
            label: label.to_string(),
            value: Some(value),
        }
    }

    pub fn no_data(label: &str) -> Self {
        Self {
            label: label.to_string(),
            value: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.value.is_some()
    }

    pub fn display_value(&self, precision: usize) -> String {
        match self.value {
            Some(v) => format!("{:.*}", precision, v),
            None => NO_DATA_DISPLAY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub week_start: NaiveDate,
    pub city: String,
    pub amount: f64,
}

/// Weekly purchase totals per city, ordered by week then city.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    pub points: Vec<TrendPoint>,
}

impl TimeSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cities present in the series, sorted.
    pub fn cities(&self) -> Vec<&str> {
        let mut cities: Vec<&str> = self.points.iter().map(|p| p.city.as_str()).collect();
        cities.sort_unstable();
        cities.dedup();
        cities
    }

    /// Points for one city, in week order.
    pub fn series_for<'a>(&'a self, city: &'a str) -> impl Iterator<Item = &'a TrendPoint> + 'a {
        self.points.iter().filter(move |p| p.city == city)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityGenderCount {
    pub city: String,
    pub gender: String,
    pub count: usize,
}

/// Order counts per (city, gender) pair present in the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedCounts {
    pub rows: Vec<CityGenderCount>,
}

impl GroupedCounts {
    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductLineCount {
    pub product_line: String,
    pub count: usize,
}

/// Purchase counts per product line present in the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryShares {
    pub rows: Vec<ProductLineCount>,
}

impl CategoryShares {
    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    /// Fraction of all counted purchases that fall in `row` (0.0 when empty).
    pub fn share_of(&self, row: &ProductLineCount) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            row.count as f64 / total as f64
        }
    }
}

// ============================================================================
// TREND SETTINGS
// ============================================================================

/// Bucketing policy for the weekly trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendSettings {
    /// First day of each calendar week bucket.
    pub week_start: Weekday,

    /// Discard the last (week, city) entry, which may be an incomplete week.
    pub drop_final_point: bool,
}

impl Default for TrendSettings {
    fn default() -> Self {
        // Monday-Sunday buckets, trailing entry dropped
        Self {
            week_start: Weekday::Mon,
            drop_final_point: true,
        }
    }
}

// ============================================================================
// AGGREGATIONS
// ============================================================================

/// Sum of `total`; 0.0 for an empty view.
pub fn total_amount(view: &[&TransactionRecord]) -> ScalarIndicator {
    let sum = view.iter().fold(0.0, |acc, r| acc + r.total);
    ScalarIndicator::new(TOTAL_AMOUNT_LABEL, sum)
}

/// Arithmetic mean of `rating`. Undefined (NoData) for an empty view.
pub fn mean_rating(view: &[&TransactionRecord]) -> Result<ScalarIndicator> {
    if view.is_empty() {
        return Err(DashboardError::NoData {
            aggregation: "mean rating",
        });
    }

    let sum = view.iter().fold(0.0, |acc, r| acc + r.rating);
    Ok(ScalarIndicator::new(
        AVERAGE_RATING_LABEL,
        sum / view.len() as f64,
    ))
}

/// Sum of `total` per (calendar week, city). Only pairs with data are
/// emitted. With `drop_final_point` the last entry in (week, city) order is
/// removed.
pub fn weekly_amount_by_city(view: &[&TransactionRecord], settings: &TrendSettings) -> TimeSeries {
    let mut groups: BTreeMap<(NaiveDate, &str), f64> = BTreeMap::new();

    for record in view {
        let key = (record.week_start(settings.week_start), record.city.as_str());
        *groups.entry(key).or_insert(0.0) += record.total;
    }

    let mut points: Vec<TrendPoint> = groups
        .into_iter()
        .map(|((week_start, city), amount)| TrendPoint {
            week_start,
            city: city.to_string(),
            amount,
        })
        .collect();

    if settings.drop_final_point {
        points.pop();
    }

    TimeSeries { points }
}

/// Count of sales per (city, gender), ordered by city then gender.
pub fn orders_by_city_gender(view: &[&TransactionRecord]) -> GroupedCounts {
    let mut groups: BTreeMap<(&str, &str), usize> = BTreeMap::new();

    for record in view {
        *groups
            .entry((record.city.as_str(), record.gender.as_str()))
            .or_insert(0) += 1;
    }

    let rows = groups
        .into_iter()
        .map(|((city, gender), count)| CityGenderCount {
            city: city.to_string(),
            gender: gender.to_string(),
            count,
        })
        .collect();

    GroupedCounts { rows }
}

/// Count of sales per product line, ordered by label.
pub fn product_line_shares(view: &[&TransactionRecord]) -> CategoryShares {
    let mut groups: BTreeMap<&str, usize> = BTreeMap::new();

    for record in view {
        *groups.entry(record.product_line.label()).or_insert(0) += 1;
    }

    let rows = groups
        .into_iter()
        .map(|(product_line, count)| ProductLineCount {
            product_line: product_line.to_string(),
            count,
        })
        .collect();

    CategoryShares { rows }
}
