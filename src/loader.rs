use crate::error::DashboardError;
use crate::types::{RawRow, SalesRecord};
use crate::util::{clean_text, parse_date_safe, parse_f64_safe};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Datelike;
use csv::{ReaderBuilder, StringRecord};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Header names the dashboard cannot run without, after whitespace trimming.
pub static REQUIRED_COLUMNS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    [
        "Order ID",
        "Customer Name",
        "Category",
        "Sub Category",
        "City",
        "Order Date",
        "Region",
        "Sales",
        "Discount",
        "Profit",
        "State",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub retained_rows: usize,
    /// Rows removed because Sales, Profit or Region was missing.
    pub dropped_rows: usize,
    /// Rows whose cells could not be decoded at all.
    pub malformed_rows: usize,
    /// Non-empty order dates that did not parse; the rows are kept.
    pub unparsed_dates: usize,
}

/// Raw sheet contents before any typing happens.
struct SourceTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    /// Rows the reader could not decode (e.g. invalid UTF-8).
    malformed_rows: usize,
}

/// Load the sales table at `path` and clean it.
///
/// Excel-family extensions go through calamine, everything else is read as
/// delimited text. Bad header sets are the only fatal data problem.
pub fn load_and_clean(path: &Path) -> Result<(Vec<SalesRecord>, LoadReport), DashboardError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let table = match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
        "tsv" | "txt" => read_delimited(path, b'\t')?,
        _ => read_delimited(path, b',')?,
    };
    info!(path = %path.display(), rows = table.rows.len(), "read source table");
    clean_rows(table)
}

/// Trim header names and fail if any required one is absent or appears
/// more than once.
pub fn normalize_headers(headers: &StringRecord) -> Result<StringRecord, DashboardError> {
    let trimmed: StringRecord = headers.iter().map(str::trim).collect();
    let present: BTreeSet<&str> = trimmed.iter().collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DashboardError::MissingColumns(missing));
    }
    let duplicated: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| trimmed.iter().filter(|h| h == *c).count() > 1)
        .map(|c| c.to_string())
        .collect();
    if !duplicated.is_empty() {
        return Err(DashboardError::DuplicateColumns(duplicated));
    }
    Ok(trimmed)
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<SourceTable, DashboardError> {
    let rdr = ReaderBuilder::new()
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;
    read_records(rdr)
}

fn read_records<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<SourceTable, DashboardError> {
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    let mut malformed_rows = 0usize;
    for result in rdr.records() {
        match result {
            Ok(r) => rows.push(r),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "skipping undecodable row");
                malformed_rows += 1;
            }
        }
    }
    Ok(SourceTable {
        headers,
        rows,
        malformed_rows,
    })
}

fn read_workbook(path: &Path) -> Result<SourceTable, DashboardError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DashboardError::EmptyWorkbook)??;

    let mut sheet_rows = range.rows();
    let headers: StringRecord = match sheet_rows.next() {
        Some(row) => row.iter().map(cell_to_string).collect(),
        None => StringRecord::new(),
    };
    let rows = sheet_rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Ok(SourceTable {
        headers,
        rows,
        malformed_rows: 0,
    })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        // `as_datetime` honours the workbook's 1900/1904 date system.
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}

fn clean_rows(table: SourceTable) -> Result<(Vec<SalesRecord>, LoadReport), DashboardError> {
    // Validation runs before a single row is looked at.
    let headers = normalize_headers(&table.headers)?;
    let rows = table.rows;

    let mut report = LoadReport {
        total_rows: rows.len() + table.malformed_rows,
        malformed_rows: table.malformed_rows,
        ..LoadReport::default()
    };
    let mut data: Vec<SalesRecord> = Vec::with_capacity(rows.len());

    for (idx, record) in rows.iter().enumerate() {
        let row: RawRow = match record.deserialize(Some(&headers)) {
            Ok(r) => r,
            Err(e) => {
                warn!(row = idx + 2, error = %e, "skipping undecodable row");
                report.malformed_rows += 1;
                continue;
            }
        };
        match clean_row(row, &mut report) {
            Some(r) => data.push(r),
            None => {
                debug!(row = idx + 2, "dropping row without sales, profit or region");
                report.dropped_rows += 1;
            }
        }
    }

    report.retained_rows = data.len();
    info!(
        total = report.total_rows,
        retained = report.retained_rows,
        dropped = report.dropped_rows,
        malformed = report.malformed_rows,
        unparsed_dates = report.unparsed_dates,
        "cleaned sales table"
    );
    Ok((data, report))
}

/// Type one raw row. Returns `None` when Sales, Profit or Region is missing.
fn clean_row(row: RawRow, report: &mut LoadReport) -> Option<SalesRecord> {
    let sales = parse_f64_safe(row.sales.as_deref());
    let profit = parse_f64_safe(row.profit.as_deref());
    let region = clean_text(row.region);
    let (Some(sales), Some(profit), Some(region)) = (sales, profit, region) else {
        return None;
    };

    let order_date = parse_date_safe(row.order_date.as_deref());
    if order_date.is_none() && clean_text(row.order_date).is_some() {
        report.unparsed_dates += 1;
    }

    Some(SalesRecord {
        order_id: clean_text(row.order_id),
        customer_name: clean_text(row.customer_name),
        category: clean_text(row.category),
        sub_category: clean_text(row.sub_category),
        city: clean_text(row.city),
        region,
        state: clean_text(row.state),
        order_date,
        year: order_date.map(|d| d.year()),
        month_name: order_date.map(|d| d.format("%B").to_string()),
        year_month: order_date.map(|d| d.format("%Y-%m").to_string()),
        sales,
        profit,
        discount: parse_f64_safe(row.discount.as_deref()),
    })
}
