use crate::errors::{DashboardError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

// ============================================================================
// PRODUCT LINE
// ============================================================================

/// Product category. The dataset ships six known lines; anything else is
/// kept verbatim so a new category never breaks loading.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductLine {
    ElectronicAccessories,
    FashionAccessories,
    FoodAndBeverages,
    HealthAndBeauty,
    HomeAndLifestyle,
    SportsAndTravel,
    Other(String),
}

impl ProductLine {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Electronic accessories" => ProductLine::ElectronicAccessories,
            "Fashion accessories" => ProductLine::FashionAccessories,
            "Food and beverages" => ProductLine::FoodAndBeverages,
            "Health and beauty" => ProductLine::HealthAndBeauty,
            "Home and lifestyle" => ProductLine::HomeAndLifestyle,
            "Sports and travel" => ProductLine::SportsAndTravel,
            other => ProductLine::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ProductLine::ElectronicAccessories => "Electronic accessories",
            ProductLine::FashionAccessories => "Fashion accessories",
            ProductLine::FoodAndBeverages => "Food and beverages",
            ProductLine::HealthAndBeauty => "Health and beauty",
            ProductLine::HomeAndLifestyle => "Home and lifestyle",
            ProductLine::SportsAndTravel => "Sports and travel",
            ProductLine::Other(label) => label,
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// TRANSACTION RECORD
// ============================================================================

/// One sale from the supermarket dataset.
/// Built once by the loader and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub invoice_id: String,
    pub branch: String,
    pub city: String,
    pub customer_type: String,
    pub gender: String,
    pub product_line: ProductLine,
    pub unit_price: f64,
    pub quantity: u32,
    pub tax: f64,
    pub total: f64,
    pub timestamp: NaiveDateTime,
    pub payment: String,
    pub cogs: f64,
    pub gross_margin_pct: f64,
    pub gross_income: f64,
    pub rating: f64,
}

impl TransactionRecord {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// First day of the calendar week containing this sale.
    pub fn week_start(&self, first_day: Weekday) -> NaiveDate {
        week_start_of(self.date(), first_day)
    }
}

/// Truncate a date to the first day of its week.
pub fn week_start_of(date: NaiveDate, first_day: Weekday) -> NaiveDate {
    let offset =
        (7 + date.weekday().num_days_from_monday() - first_day.num_days_from_monday()) % 7;
    date - Duration::days(i64::from(offset))
}

/// Row as it appears in the CSV file (column names are case-sensitive).
/// Date and Time stay as text until `into_record` validates them.
#[derive(Debug, Deserialize)]
struct RawSalesRow {
    #[serde(rename = "Invoice ID")]
    invoice_id: String,

    #[serde(rename = "Branch")]
    branch: String,

    #[serde(rename = "City")]
    city: String,

    #[serde(rename = "Customer type")]
    customer_type: String,

    #[serde(rename = "Gender")]
    gender: String,

    #[serde(rename = "Product line")]
    product_line: String,

    #[serde(rename = "Unit price")]
    unit_price: f64,

    #[serde(rename = "Quantity")]
    quantity: u32,

    #[serde(rename = "Tax 5%")]
    tax: f64,

    #[serde(rename = "Total")]
    total: f64,

    #[serde(rename = "Date")]
    date: String,

    #[serde(rename = "Time")]
    time: String,

    #[serde(rename = "Payment")]
    payment: String,

    #[serde(rename = "cogs")]
    cogs: f64,

    #[serde(rename = "gross margin percentage")]
    gross_margin_pct: f64,

    #[serde(rename = "gross income")]
    gross_income: f64,

    #[serde(rename = "Rating")]
    rating: f64,
}

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value.trim(), fmt).ok())
}

/// Highest value on the rating scale.
const MAX_RATING: f64 = 10.0;

fn malformed(line: u64, reason: String) -> DashboardError {
    DashboardError::MalformedRecord { line, reason }
}

fn require_text(line: u64, column: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(malformed(line, format!("{} is empty", column)));
    }
    Ok(())
}

/// Amounts must be finite and not negative.
fn require_amount(line: u64, column: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        let reason = format!("{} must be a non-negative number, got {}", column, value);
        return Err(malformed(line, reason));
    }
    Ok(())
}

impl RawSalesRow {
    fn validate(&self, line: u64) -> Result<()> {
        require_text(line, "Invoice ID", &self.invoice_id)?;
        require_text(line, "Gender", &self.gender)?;
        require_text(line, "City", &self.city)?;

        require_amount(line, "Unit price", self.unit_price)?;
        require_amount(line, "Tax 5%", self.tax)?;
        require_amount(line, "Total", self.total)?;
        require_amount(line, "cogs", self.cogs)?;
        require_amount(line, "gross margin percentage", self.gross_margin_pct)?;
        require_amount(line, "gross income", self.gross_income)?;

        if !(0.0..=MAX_RATING).contains(&self.rating) {
            return Err(malformed(
                line,
                format!("Rating must be between 0 and {}, got {}", MAX_RATING, self.rating),
            ));
        }

        Ok(())
    }

    fn into_record(self, line: u64) -> Result<TransactionRecord> {
        self.validate(line)?;

        let date = parse_date(&self.date)
            .ok_or_else(|| malformed(line, format!("invalid Date '{}'", self.date)))?;
        let time = parse_time(&self.time)
            .ok_or_else(|| malformed(line, format!("invalid Time '{}'", self.time)))?;

        Ok(TransactionRecord {
            invoice_id: self.invoice_id,
            branch: self.branch,
            city: self.city,
            customer_type: self.customer_type,
            gender: self.gender,
            product_line: ProductLine::from_label(&self.product_line),
            unit_price: self.unit_price,
            quantity: self.quantity,
            tax: self.tax,
            total: self.total,
            timestamp: date.and_time(time),
            payment: self.payment,
            cogs: self.cogs,
            gross_margin_pct: self.gross_margin_pct,
            gross_income: self.gross_income,
            rating: self.rating,
        })
    }
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<TransactionRecord>> {
    let file = std::fs::File::open(csv_path)?;
    load_csv_from_reader(file)
}

/// Parse sales rows from any reader. Stops at the first malformed row.
pub fn load_csv_from_reader<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut records = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut row = csv::StringRecord::new();

    while rdr.read_record(&mut row)? {
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        let raw: RawSalesRow = row
            .deserialize(Some(&headers))
            .map_err(|e| malformed(line, e.to_string()))?;

        if !seen_ids.insert(raw.invoice_id.clone()) {
            return Err(malformed(
                line,
                format!("duplicate Invoice ID '{}'", raw.invoice_id),
            ));
        }

        records.push(raw.into_record(line)?);
    }

    Ok(records)
}

// ============================================================================
// DATASET STORE
// ============================================================================

/// Immutable base collection of sales. Loaded once, then only read.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    records: Vec<TransactionRecord>,
}

impl DatasetStore {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    pub fn from_csv(csv_path: &Path) -> Result<Self> {
        let records = load_csv(csv_path)?;
        tracing::info!(
            path = %csv_path.display(),
            records = records.len(),
            "Loaded sales dataset"
        );
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Genders in order of first appearance.
    pub fn distinct_genders(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.gender.as_str()))
    }

    /// Cities in order of first appearance.
    pub fn distinct_cities(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.city.as_str()))
    }

    /// Earliest and latest sale date, or None for an empty store.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date()).min()?;
        let last = self.records.iter().map(|r| r.date()).max()?;
        Some((first, last))
    }
}

fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// TEST FIXTURES
// ============================================================================
