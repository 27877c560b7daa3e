//! Parse InfluxDB annotated CSV query responses
//!
//! A Flux response is a sequence of tables. With the `datatype` annotation
//! enabled each table starts with a `#datatype,...` row followed by a header
//! row, then data rows:
//!
//! ```text
//! #datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,long,string,string,string
//! ,result,table,_start,_stop,_time,_value,_field,_measurement,date
//! ,_result,0,2024-01-01T00:00:00Z,2024-01-08T00:00:00Z,2024-01-01T00:00:00Z,20000,total_steps,health_data,2024-01-01
//! ```
//!
//! Tables with different `_value` types carry different annotations, which is
//! how integer and float fields are told apart.

use crate::error::{RelayError, Result};
use crate::health::MetricValue;

use super::StoredPoint;

/// Column positions for the table currently being read
struct TableLayout {
    time: usize,
    field: usize,
    value: usize,
    value_type: Option<String>,
}

/// Parse an annotated (or plain) CSV body into stored points
pub(crate) fn parse_points(body: &str) -> Result<Vec<StoredPoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut points = Vec::new();
    let mut datatypes: Option<Vec<String>> = None;
    let mut layout: Option<TableLayout> = None;

    let mut rows = reader.records();
    while let Some(row) = rows.next() {
        let row = row.map_err(csv_error)?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        let first = row.get(0).unwrap_or_default();

        let error_col = match layout {
            None => row.iter().position(|c| c == "error"),
            Some(_) => None,
        };
        if let Some(col) = error_col {
            let message = match rows.next() {
                Some(next) => next.map_err(csv_error)?.get(col).unwrap_or_default().to_string(),
                None => String::new(),
            };
            return Err(RelayError::store(format!("InfluxDB query error: {}", message)));
        }

        if first.starts_with('#') {
            if first == "#datatype" {
                datatypes = Some(row.iter().map(str::to_string).collect());
                layout = None;
            }
            continue;
        }

        if layout.is_none() {
            layout = Some(read_header(&row, datatypes.take())?);
            continue;
        }

        if is_header(&row) {
            // Unannotated responses repeat the header per table
            layout = Some(read_header(&row, None)?);
            continue;
        }

        let Some(table) = layout.as_ref() else { continue };
        let time = row.get(table.time).unwrap_or_default();
        let field = row.get(table.field).unwrap_or_default();
        let raw = row.get(table.value).unwrap_or_default();

        if time.is_empty() || field.is_empty() || raw.is_empty() {
            continue;
        }

        match parse_value(raw, table.value_type.as_deref()) {
            Some(value) => points.push(StoredPoint::new(time, field, value)),
            None => tracing::warn!(field, value = raw, "skipping non-numeric stored value"),
        }
    }

    Ok(points)
}

fn csv_error(e: csv::Error) -> RelayError {
    RelayError::store(format!("Failed to read query CSV: {}", e))
}

fn is_header(row: &csv::StringRecord) -> bool {
    row.iter().any(|c| c == "_time") && row.iter().any(|c| c == "_field")
}

fn read_header(row: &csv::StringRecord, datatypes: Option<Vec<String>>) -> Result<TableLayout> {
    let position = |name: &str| row.iter().position(|c| c == name);

    match (position("_time"), position("_field"), position("_value")) {
        (Some(time), Some(field), Some(value)) => Ok(TableLayout {
            time,
            field,
            value,
            value_type: datatypes.and_then(|types| types.get(value).cloned()),
        }),
        _ => Err(RelayError::store(format!(
            "Unexpected query CSV header: {}",
            row.iter().collect::<Vec<_>>().join(",")
        ))),
    }
}

fn parse_value(raw: &str, datatype: Option<&str>) -> Option<MetricValue> {
    match datatype {
        Some("long") | Some("unsignedLong") => raw.parse::<i64>().ok().map(MetricValue::Int),
        Some("double") => raw.parse::<f64>().ok().map(MetricValue::Float),
        _ => raw
            .parse::<i64>()
            .map(MetricValue::Int)
            .or_else(|_| raw.parse::<f64>().map(MetricValue::Float))
            .ok(),
    }
}
