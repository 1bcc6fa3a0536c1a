//! # Sales Ledger Analytics
//!
//! A library for ingesting semicolon-delimited pharmacy sales ledgers and
//! deriving the data a dashboard consumes: revenue/unit KPIs, monthly time
//! series, top-N rankings, margin totals, geo clusters, and geolocation
//! points extracted from a composite text field.
//!
//! ## Core Concepts
//!
//! - **Dataset**: the session-scoped ledger, parsed once from the source and
//!   read-only afterward. Row-level damage becomes ingestion warnings, not
//!   load failures; only an unusable header row aborts a load.
//! - **FilteredSet**: a borrowed view of the dataset matching the active
//!   [`FilterCriteria`], re-derived on every criteria change.
//! - **Derived views**: KPIs, time series, rankings and clusters are owned
//!   values computed on demand from the filtered set; all are pure.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_ledger_analytics::*;
//!
//! let dataset = Dataset::load_path("data/TblVenta.csv")?;
//! println!("{} rows skipped", dataset.warning_count());
//!
//! let filtered = dataset.filter(&FilterCriteria::default());
//! let kpis = filtered.kpis();
//! let monthly = filtered.time_series();
//! let top_products = filtered.top_n(TopDimension::Product, TOP_N_DEFAULT);
//! let csv = filtered.export()?;
//! ```

pub mod aggregate;
pub mod error;
pub mod export;
pub mod filter;
pub mod geo;
pub mod ingestion;
pub mod schema;

pub use aggregate::{MAX_CLUSTER_PRECISION, TOP_N_DEFAULT};
pub use error::{LedgerError, Result};
pub use ingestion::{IngestWarning, ParsedLedger, SkipReason, DELIMITER};
pub use schema::*;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info, warn};

/// The in-memory ledger for one session.
///
/// Owned by the caller; reload to pick up a changed source file. Records are
/// immutable after load and shared read-only by every derived view.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<SalesRecord>,
    columns: Vec<Column>,
    warnings: Vec<IngestWarning>,
}

impl Dataset {
    /// Reads and parses a ledger file in one synchronous pass.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("loading sales ledger from {}", path.as_ref().display());
        Self::from_reader(File::open(path)?)
    }

    /// Parses a ledger from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let ParsedLedger {
            records,
            columns,
            warnings,
        } = ingestion::parse_ledger(reader)?;

        info!(
            "loaded {} sales records ({} rows skipped)",
            records.len(),
            warnings.len()
        );
        if !warnings.is_empty() {
            warn!("{} rows could not be ingested", warnings.len());
        }

        Ok(Self {
            records,
            columns,
            warnings,
        })
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    /// Recognized source columns in their original header order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows skipped during ingestion, for user-visible reporting.
    pub fn warnings(&self) -> &[IngestWarning] {
        &self.warnings
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Narrows the ledger to the records matching `criteria`, preserving
    /// ledger order.
    pub fn filter(&self, criteria: &FilterCriteria) -> FilteredSet<'_> {
        FilteredSet {
            records: filter::apply(&self.records, criteria),
            columns: &self.columns,
        }
    }
}

/// The subset of a [`Dataset`] matching the active criteria.
///
/// Borrows the dataset; every analytic view is computed on demand from the
/// subset and owned by the caller.
#[derive(Debug, Clone)]
pub struct FilteredSet<'a> {
    records: Vec<&'a SalesRecord>,
    columns: &'a [Column],
}

impl<'a> FilteredSet<'a> {
    pub fn records(&self) -> &[&'a SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applies further criteria to this subset. Filtering is idempotent:
    /// refining with the criteria that produced this set is a no-op.
    pub fn refine(&self, criteria: &FilterCriteria) -> FilteredSet<'a> {
        FilteredSet {
            records: self
                .records
                .iter()
                .copied()
                .filter(|r| criteria.matches(r))
                .collect(),
            columns: self.columns,
        }
    }

    /// Headline figures; all zeros for the empty set.
    pub fn kpis(&self) -> KpiSummary {
        aggregate::kpis(&self.records)
    }

    /// Monthly revenue/units, chronological, observed months only.
    pub fn time_series(&self) -> Vec<TimeSeriesPoint> {
        aggregate::time_series(&self.records)
    }

    /// The `n` highest-revenue groups along `dimension`.
    pub fn top_n(&self, dimension: TopDimension, n: usize) -> Vec<TopEntry> {
        aggregate::top_n(&self.records, dimension, n)
    }

    /// Margin figures over the records carrying a cost.
    pub fn margin(&self) -> MarginSummary {
        aggregate::margin(&self.records)
    }

    /// Revenue grouped into coordinate buckets rounded to `precision`
    /// decimals.
    pub fn geo_clusters(&self, precision: u32) -> Result<Vec<GeoCluster>> {
        aggregate::geo_clusters(&self.records, precision)
    }

    /// Serializes the subset back to the `;`-delimited source format.
    pub fn export(&self) -> Result<String> {
        export::export(&self.records, self.columns)
    }

    /// Serializes the subset as JSON for consumers that want the typed
    /// records rather than the source format.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }
}
