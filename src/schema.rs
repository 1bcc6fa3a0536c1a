use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A geographic coordinate extracted from the composite `Georeferenciado` text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting coordinates outside the valid
    /// latitude/longitude ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude {latitude} out of range [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude {longitude} out of range [-180, 180]"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A calendar year-month, the grouping key for monthly time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, String> {
        if !(1..=12).contains(&month) {
            return Err(format!("month {month} out of range [1, 12]"));
        }
        Ok(Self { year, month })
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The recognized source columns, in the vocabulary of the ledger file.
///
/// The first six are required for ingestion; the rest are picked up when the
/// header carries them and kept through export in their original position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Date,
    Product,
    Client,
    Units,
    Revenue,
    Geo,
    Cost,
    Category,
    City,
    Zone,
}

impl Column {
    /// The header name as it appears in the source file.
    pub fn source_name(&self) -> &'static str {
        match self {
            Column::Date => "FechaVta",
            Column::Product => "DescMaterial",
            Column::Client => "NombreComercial",
            Column::Units => "Unidades",
            Column::Revenue => "VtaFacturada",
            Column::Geo => "Georeferenciado",
            Column::Cost => "Costo",
            Column::Category => "DescGrArticulo",
            Column::City => "Ciudad",
            Column::Zone => "ZonaVenta",
        }
    }

    pub fn from_source_name(name: &str) -> Option<Self> {
        match name.trim() {
            "FechaVta" => Some(Column::Date),
            "DescMaterial" => Some(Column::Product),
            "NombreComercial" => Some(Column::Client),
            "Unidades" => Some(Column::Units),
            "VtaFacturada" => Some(Column::Revenue),
            "Georeferenciado" => Some(Column::Geo),
            "Costo" => Some(Column::Cost),
            "DescGrArticulo" => Some(Column::Category),
            "Ciudad" => Some(Column::City),
            "ZonaVenta" => Some(Column::Zone),
            _ => None,
        }
    }

    pub const REQUIRED: [Column; 6] = [
        Column::Date,
        Column::Product,
        Column::Client,
        Column::Units,
        Column::Revenue,
        Column::Geo,
    ];
}

/// One sales transaction, typed and validated at the parse boundary.
///
/// Created once at ingestion and never mutated afterward; all derived views
/// are separate owned values. `geo_raw` keeps the original composite text so
/// export reproduces the source byte for byte, while `geo` carries the
/// extracted coordinate when one was recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub product: String,
    pub client: String,
    pub units: u32,
    pub revenue: f64,
    pub cost: Option<f64>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub zone: Option<String>,
    pub geo_raw: String,
    pub geo: Option<GeoPoint>,
}

/// Criteria narrowing a record collection. An unset field means no
/// restriction on that dimension; within a set, membership is OR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub products: Option<BTreeSet<String>>,
    pub clients: Option<BTreeSet<String>>,
    pub categories: Option<BTreeSet<String>>,
    pub cities: Option<BTreeSet<String>>,
    pub zones: Option<BTreeSet<String>>,
}

/// Headline figures for a filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub total_units: u64,
    pub record_count: usize,
    /// `total_revenue / record_count`, or 0 for the empty set.
    pub average_ticket: f64,
}

/// Revenue and units summed over one observed month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: YearMonth,
    pub revenue: f64,
    pub units: u64,
}

/// The grouping key for top-N rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopDimension {
    Product,
    Client,
    Category,
    City,
    Zone,
}

impl TopDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopDimension::Product => "product",
            TopDimension::Client => "client",
            TopDimension::Category => "category",
            TopDimension::City => "city",
            TopDimension::Zone => "zone",
        }
    }
}

impl fmt::Display for TopDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a top-N ranking. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEntry {
    pub key: String,
    pub revenue: f64,
    pub rank: usize,
}

/// Margin figures over the records that carry a cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSummary {
    pub total_margin: f64,
    /// `total_margin` over the revenue of costed records, or 0 when that
    /// revenue is 0.
    pub margin_pct: f64,
    pub records_with_cost: usize,
}

/// Revenue summed over records whose coordinates round to the same bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCluster {
    /// Mean latitude of the member records.
    pub latitude: f64,
    /// Mean longitude of the member records.
    pub longitude: f64,
    pub revenue: f64,
    pub count: usize,
}
