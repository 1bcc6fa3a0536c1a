use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{LedgerError, Result};
use crate::schema::{
    GeoCluster, KpiSummary, MarginSummary, SalesRecord, TimeSeriesPoint, TopDimension, TopEntry,
    YearMonth,
};

/// Default ranking depth for top-N views.
pub const TOP_N_DEFAULT: usize = 10;

/// Upper bound on geo cluster rounding decimals; beyond this the buckets are
/// finer than the source coordinates resolve.
pub const MAX_CLUSTER_PRECISION: u32 = 6;

/// Sums revenue and units and derives the average ticket. Defined for the
/// empty set: every figure is 0.
pub fn kpis(records: &[&SalesRecord]) -> KpiSummary {
    let total_revenue: f64 = records.iter().map(|r| r.revenue).sum();
    let total_units: u64 = records.iter().map(|r| u64::from(r.units)).sum();
    let record_count = records.len();
    let average_ticket = if record_count > 0 {
        total_revenue / record_count as f64
    } else {
        0.0
    };

    KpiSummary {
        total_revenue,
        total_units,
        record_count,
        average_ticket,
    }
}

/// Groups records by calendar year-month and sums revenue and units per
/// group, in chronological order. Months with no records are omitted.
pub fn time_series(records: &[&SalesRecord]) -> Vec<TimeSeriesPoint> {
    let mut by_month: BTreeMap<YearMonth, (f64, u64)> = BTreeMap::new();
    for record in records {
        let entry = by_month.entry(YearMonth::from(record.date)).or_default();
        entry.0 += record.revenue;
        entry.1 += u64::from(record.units);
    }

    by_month
        .into_iter()
        .map(|(period, (revenue, units))| TimeSeriesPoint {
            period,
            revenue,
            units,
        })
        .collect()
}

fn dimension_key<'a>(record: &'a SalesRecord, dimension: TopDimension) -> Option<&'a str> {
    match dimension {
        TopDimension::Product => Some(&record.product),
        TopDimension::Client => Some(&record.client),
        TopDimension::Category => record.category.as_deref(),
        TopDimension::City => record.city.as_deref(),
        TopDimension::Zone => record.zone.as_deref(),
    }
}

/// Ranks the `n` highest-revenue groups along `dimension`, descending by
/// summed revenue with ascending-key tie-break. Records without a value for
/// an optional dimension do not form a group. Fewer groups than `n` returns
/// them all.
pub fn top_n(records: &[&SalesRecord], dimension: TopDimension, n: usize) -> Vec<TopEntry> {
    let mut by_key: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        if let Some(key) = dimension_key(record, dimension) {
            *by_key.entry(key).or_default() += record.revenue;
        }
    }

    // BTreeMap iterates keys ascending, so a stable sort by revenue keeps
    // the lexicographic tie-break.
    let mut entries: Vec<(&str, f64)> = by_key.into_iter().collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    entries.truncate(n);

    entries
        .into_iter()
        .enumerate()
        .map(|(i, (key, revenue))| TopEntry {
            key: key.to_string(),
            revenue,
            rank: i + 1,
        })
        .collect()
}

/// Margin figures over the records that carry a cost; records without one
/// are left out of both the margin and its revenue base.
pub fn margin(records: &[&SalesRecord]) -> MarginSummary {
    let mut total_margin = 0.0;
    let mut costed_revenue = 0.0;
    let mut records_with_cost = 0;
    for record in records {
        if let Some(cost) = record.cost {
            total_margin += record.revenue - cost;
            costed_revenue += record.revenue;
            records_with_cost += 1;
        }
    }

    let margin_pct = if costed_revenue != 0.0 {
        total_margin / costed_revenue
    } else {
        0.0
    };

    MarginSummary {
        total_margin,
        margin_pct,
        records_with_cost,
    }
}

/// Groups geolocated records into buckets of coordinates rounded to
/// `precision` decimals, summing revenue and averaging the member
/// coordinates. Records without an extracted point are omitted. Clusters
/// come back descending by revenue with a deterministic tie-break on the
/// bucket coordinates.
pub fn geo_clusters(records: &[&SalesRecord], precision: u32) -> Result<Vec<GeoCluster>> {
    if precision > MAX_CLUSTER_PRECISION {
        return Err(LedgerError::InvalidClusterPrecision(precision));
    }

    let scale = 10_f64.powi(precision as i32);
    let mut buckets: BTreeMap<(i64, i64), (f64, f64, f64, usize)> = BTreeMap::new();
    for record in records {
        if let Some(point) = record.geo {
            let key = (
                (point.latitude * scale).round() as i64,
                (point.longitude * scale).round() as i64,
            );
            let entry = buckets.entry(key).or_default();
            entry.0 += point.latitude;
            entry.1 += point.longitude;
            entry.2 += record.revenue;
            entry.3 += 1;
        }
    }

    let mut clusters: Vec<GeoCluster> = buckets
        .into_values()
        .map(|(lat_sum, lon_sum, revenue, count)| GeoCluster {
            latitude: lat_sum / count as f64,
            longitude: lon_sum / count as f64,
            revenue,
            count,
        })
        .collect();
    clusters.sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(Ordering::Equal));

    Ok(clusters)
}
