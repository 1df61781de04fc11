// Core services
pub mod materials;
pub mod stock_transactions;
pub mod suggestions;

/// Quotes a CSV field: wraps in double quotes and doubles embedded quotes.
pub(crate) fn csv_field(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// Joins already-quoted fields into a CSV row with a trailing newline.
pub(crate) fn csv_row(fields: &[String]) -> String {
    let mut row = fields.join(",");
    row.push('\n');
    row
}
