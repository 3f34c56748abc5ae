//! Sales CSV parsing with delimiter auto-detection.
//!
//! Marketplace transaction reports carry preface lines before the real
//! header, so the header is located by content rather than by index: the
//! first line containing all required column tokens.

use csv::{ReaderBuilder, Terminator};

use crate::errors::{Error, Result, SalesError};
use crate::models::{Warning, WarningKind};

/// Required header tokens (case-insensitive, whitespace-tolerant).
/// `date/time` may alternatively appear as separate `date` and `time` columns.
const COL_DATE_TIME: &str = "date/time";
const COL_DATE: &str = "date";
const COL_TIME: &str = "time";
const COL_TYPE: &str = "type";
const COL_ORDER_ID: &str = "order id";
const COL_SKU: &str = "sku";
const COL_QUANTITY: &str = "quantity";
const COL_MARKETPLACE: &str = "marketplace";

/// One projected data row, still in raw string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesCsvRow {
    /// 1-based line number in the source file, for warnings
    pub line_number: usize,
    pub happened_at_raw: String,
    pub txn_type: String,
    pub order_id: String,
    pub sku: String,
    pub quantity_raw: String,
    pub marketplace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedSalesCsv {
    pub rows: Vec<SalesCsvRow>,
    pub warnings: Vec<Warning>,
}

pub fn parse_sales_csv(content: &[u8]) -> Result<ParsedSalesCsv> {
    let mut warnings = Vec::new();

    let content_str = decode_content(content, &mut warnings);
    let delimiter = detect_delimiter(&content_str);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false) // the header is located manually
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(content_str.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => records.push(record.iter().map(|s| s.to_string()).collect()),
            Err(e) => warnings.push(Warning::new(
                WarningKind::SkippedRow,
                format!("line {}: unparseable record: {}", idx + 1, e),
            )),
        }
    }

    let (header_index, columns) = locate_header(&records).ok_or_else(|| {
        Error::Sales(SalesError::InvalidCsv(
            "no header line with date/time, type, order id, sku and quantity columns".to_string(),
        ))
    })?;

    let mut rows = Vec::new();
    for (idx, record) in records.iter().enumerate().skip(header_index + 1) {
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let happened_at_raw = match columns.date_time {
            DateColumns::Combined(i) => cell(record, i),
            DateColumns::Split(date_i, time_i) => {
                format!("{} {}", cell(record, date_i), cell(record, time_i))
                    .trim()
                    .to_string()
            }
        };

        rows.push(SalesCsvRow {
            line_number: idx + 1,
            happened_at_raw,
            txn_type: cell(record, columns.txn_type),
            order_id: cell(record, columns.order_id),
            sku: cell(record, columns.sku),
            quantity_raw: cell(record, columns.quantity),
            marketplace: columns
                .marketplace
                .map(|i| cell(record, i))
                .filter(|v| !v.is_empty()),
        });
    }

    Ok(ParsedSalesCsv { rows, warnings })
}

fn cell(record: &[String], index: usize) -> String {
    record.get(index).map(|s| s.trim().to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
enum DateColumns {
    Combined(usize),
    Split(usize, usize),
}

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date_time: DateColumns,
    txn_type: usize,
    order_id: usize,
    sku: usize,
    quantity: usize,
    marketplace: Option<usize>,
}

/// Finds the first line carrying all required column tokens.
fn locate_header(records: &[Vec<String>]) -> Option<(usize, ColumnMap)> {
    for (idx, record) in records.iter().enumerate() {
        let cells: Vec<String> = record
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();

        let find = |token: &str| cells.iter().position(|c| c == token);

        let date_time = match find(COL_DATE_TIME) {
            Some(i) => DateColumns::Combined(i),
            None => match (find(COL_DATE), find(COL_TIME)) {
                (Some(d), Some(t)) => DateColumns::Split(d, t),
                _ => continue,
            },
        };

        let (txn_type, order_id, sku, quantity) = match (
            find(COL_TYPE),
            find(COL_ORDER_ID),
            find(COL_SKU),
            find(COL_QUANTITY),
        ) {
            (Some(t), Some(o), Some(s), Some(q)) => (t, o, s, q),
            _ => continue,
        };

        return Some((
            idx,
            ColumnMap {
                date_time,
                txn_type,
                order_id,
                sku,
                quantity,
                marketplace: find(COL_MARKETPLACE),
            },
        ));
    }
    None
}

/// Decodes content bytes to UTF-8, handling BOM if present.
fn decode_content(content: &[u8], warnings: &mut Vec<Warning>) -> String {
    let content_without_bom =
        if content.len() >= 3 && content[0] == 0xEF && content[1] == 0xBB && content[2] == 0xBF {
            &content[3..]
        } else {
            content
        };

    match std::str::from_utf8(content_without_bom) {
        Ok(s) => s.to_string(),
        Err(e) => {
            warnings.push(Warning::new(
                WarningKind::SkippedRow,
                format!(
                    "invalid UTF-8 at byte {}; some characters were replaced",
                    e.valid_up_to()
                ),
            ));
            String::from_utf8_lossy(content_without_bom).into_owned()
        }
    }
}

/// Auto-detects the delimiter by column-count consistency over the head lines.
fn detect_delimiter(content: &str) -> u8 {
    let delimiters = [b',', b';', b'\t'];
    let mut best_delimiter = b',';
    let mut best_score = 0usize;

    for delim in delimiters {
        let score = score_delimiter(content, delim as char);
        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    best_delimiter
}

fn score_delimiter(content: &str, delimiter: char) -> usize {
    let lines: Vec<&str> = content.lines().take(10).collect();
    if lines.is_empty() {
        return 0;
    }

    let counts: Vec<usize> = lines
        .iter()
        .map(|line| line.matches(delimiter).count())
        .collect();

    // Most lines should agree with the widest line's column count
    let max_count = counts.iter().copied().max().unwrap_or(0);
    if max_count == 0 {
        return 0;
    }
    let consistent = counts.iter().filter(|&&c| c == max_count).count();
    max_count * consistent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_csv() {
        let content = b"date/time,type,order id,sku,quantity\n\
            2025-01-10 08:00:00,Order,O1,A,10\n";

        let parsed = parse_sales_csv(content).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        let row = &parsed.rows[0];
        assert_eq!(row.happened_at_raw, "2025-01-10 08:00:00");
        assert_eq!(row.txn_type, "Order");
        assert_eq!(row.order_id, "O1");
        assert_eq!(row.sku, "A");
        assert_eq!(row.quantity_raw, "10");
        assert_eq!(row.marketplace, None);
    }

    #[test]
    fn test_preface_lines_before_header() {
        let content = b"Some report title\n\
            \"Includes Amazon Marketplace\"\n\
            date/time,type,order id,sku,quantity,marketplace\n\
            2025-01-10 08:00:00,Order,O1,A,10,US\n";

        let parsed = parse_sales_csv(content).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].marketplace.as_deref(), Some("US"));
    }

    #[test]
    fn test_header_case_and_whitespace_tolerant() {
        let content = b"Date/Time , TYPE ,Order Id, SKU ,Quantity\n\
            2025-01-10,Order,O1,A,3\n";

        let parsed = parse_sales_csv(content).unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn test_split_date_and_time_columns() {
        let content = b"date,time,type,order id,sku,quantity\n\
            2025-01-10,08:00:00,Order,O1,A,2\n";

        let parsed = parse_sales_csv(content).unwrap();
        assert_eq!(parsed.rows[0].happened_at_raw, "2025-01-10 08:00:00");
    }

    #[test]
    fn test_tab_delimited() {
        let content = b"date/time\ttype\torder id\tsku\tquantity\n\
            2025-01-10\tOrder\tO1\tA\t4\n";

        let parsed = parse_sales_csv(content).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].quantity_raw, "4");
    }

    #[test]
    fn test_utf8_bom() {
        let content = b"\xEF\xBB\xBFdate/time,type,order id,sku,quantity\n\
            2025-01-10,Order,O1,A,1\n";

        let parsed = parse_sales_csv(content).unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn test_missing_required_column_is_error() {
        let content = b"date/time,type,sku,quantity\n2025-01-10,Order,A,1\n";
        assert!(parse_sales_csv(content).is_err());
    }

    #[test]
    fn test_empty_lines_skipped() {
        let content = b"date/time,type,order id,sku,quantity\n\
            \n\
            2025-01-10,Order,O1,A,1\n\
            \n";

        let parsed = parse_sales_csv(content).unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }
}
