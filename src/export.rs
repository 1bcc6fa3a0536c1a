use std::io;

use csv::WriterBuilder;

use crate::error::{LedgerError, Result};
use crate::ingestion::DELIMITER;
use crate::schema::{Column, SalesRecord};

fn field_value(record: &SalesRecord, column: Column) -> String {
    match column {
        Column::Date => record.date.format("%d/%m/%Y").to_string(),
        Column::Product => record.product.clone(),
        Column::Client => record.client.clone(),
        Column::Units => record.units.to_string(),
        Column::Revenue => record.revenue.to_string(),
        Column::Geo => record.geo_raw.clone(),
        Column::Cost => record.cost.map(|c| c.to_string()).unwrap_or_default(),
        Column::Category => record.category.clone().unwrap_or_default(),
        Column::City => record.city.clone().unwrap_or_default(),
        Column::Zone => record.zone.clone().unwrap_or_default(),
    }
}

/// Serializes records back to the `;`-delimited source format.
///
/// `columns` is the dataset's original header order; the `Georeferenciado`
/// field is written from `geo_raw` verbatim, so re-ingesting the output
/// reproduces the exported records exactly. Fields containing the delimiter,
/// quotes or newlines are quoted by the writer.
pub fn export(records: &[&SalesRecord], columns: &[Column]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(Vec::new());

    writer.write_record(columns.iter().map(|c| c.source_name()))?;
    for record in records {
        writer.write_record(columns.iter().map(|c| field_value(record, *c)))?;
    }
    writer.flush()?;

    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| LedgerError::IoError(io::Error::new(io::ErrorKind::InvalidData, e)))
}
