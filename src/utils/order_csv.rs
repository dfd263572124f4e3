use chrono::NaiveDate;
use log::warn;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

use crate::query::parse_day;

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("skip row {line} (invalid date {date:?}): {row:?}")]
    InvalidDate {
        line: u64,
        date: String,
        row: Vec<String>,
    },
    #[error("row {line} could not be read: {reason}")]
    Unreadable { line: u64, reason: String },
}

/// A valid `orderID,date` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    pub order_id: String,
    pub date: NaiveDate,
}

pub fn read_order_rows(path: &Path) -> io::Result<Vec<OrderRow>> {
    let file = File::open(path)?;
    Ok(read_order_rows_from(file))
}

/// Reads `orderID,date` rows, skipping a header, short rows and blank cells.
/// Rows with an unparseable date are warned about and dropped.
pub fn read_order_rows_from<R: Read>(reader: R) -> Vec<OrderRow> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i as u64 + 1;
        match parse_record(i, line, record) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }
    rows
}

fn parse_record(
    index: usize,
    line: u64,
    record: Result<csv::StringRecord, csv::Error>,
) -> Result<Option<OrderRow>, InputError> {
    let record = record.map_err(|e| InputError::Unreadable {
        line,
        reason: e.to_string(),
    })?;
    if record.len() < 2 {
        return Ok(None);
    }
    let order_id = &record[0];
    let date = &record[1];
    if order_id.is_empty() || date.is_empty() {
        return Ok(None);
    }
    if index == 0 && is_header(order_id, date) {
        return Ok(None);
    }

    let date = parse_day(date).map_err(|_| InputError::InvalidDate {
        line,
        date: date.to_string(),
        row: record.iter().map(str::to_string).collect(),
    })?;

    Ok(Some(OrderRow {
        order_id: order_id.to_string(),
        date,
    }))
}

fn is_header(order_id: &str, date: &str) -> bool {
    matches!(
        order_id.to_lowercase().as_str(),
        "orderid" | "order_id" | "order id"
    ) || date.eq_ignore_ascii_case("date")
}
