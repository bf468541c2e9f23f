// Parser for the GENESIS "ffcsv" (flat file CSV) export and the
// prettifying step that turns its code/label column pairs into a table
// keyed by readable labels.

use crate::table::Table;
use anyhow::{Context, Result};

const TIME_LABEL: &str = "Zeit_Label";
const TIME_VALUE: &str = "Zeit";
const ATTRIBUTE_SUFFIX: &str = "_Auspraegung_Label";
const VARIABLE_SUFFIX: &str = "_Merkmal_Label";

/// Cell markers GENESIS uses for suppressed, unknown or not applicable
/// values.
const MISSING_MARKERS: &[&str] = &["...", ".", "-", "/", "x"];

/// Parse a raw ffcsv body into its header and records, unchanged.
pub fn parse(raw: &str) -> Result<Table> {
    let raw = raw.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(raw.as_bytes());
    let columns = reader
        .headers()
        .context("Reading ffcsv header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Reading ffcsv record")?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Table::new(columns, rows)
}

/// Reshape a raw ffcsv table into display form:
/// the time column named after its label (`Jahr`), one column per
/// attribute named after its variable label, then the value columns named
/// by the middle part of `CODE__Label__Unit`.
pub fn prettify(raw: &Table) -> Result<Table> {
    let time_label = raw
        .column_index(TIME_LABEL)
        .context("ffcsv export has no Zeit_Label column")?;
    let time_value = raw
        .column_index(TIME_VALUE)
        .context("ffcsv export has no Zeit column")?;

    let first = raw.rows().first();
    let header_from = |idx: usize, fallback: &str| -> String {
        first
            .map(|r| r[idx].trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    };

    // (source column index, is value column)
    let mut picks: Vec<(usize, bool)> = vec![(time_value, false)];
    let mut columns = vec![header_from(time_label, TIME_VALUE)];

    for (idx, name) in raw.columns().iter().enumerate() {
        if let Some(prefix) = name.strip_suffix(ATTRIBUTE_SUFFIX) {
            let variable = format!("{}{}", prefix, VARIABLE_SUFFIX);
            let label = match raw.column_index(&variable) {
                Some(v) => header_from(v, name),
                None => name.clone(),
            };
            picks.push((idx, false));
            columns.push(label);
        }
    }

    for (idx, name) in raw.columns().iter().enumerate() {
        if !name.contains("__") || name.ends_with("__q") {
            continue;
        }
        let label = name.split("__").nth(1).unwrap_or(name).to_string();
        picks.push((idx, true));
        columns.push(label);
    }

    let rows = raw
        .rows()
        .iter()
        .map(|row| {
            picks
                .iter()
                .map(|&(idx, is_value)| {
                    if is_value {
                        normalize_value(&row[idx])
                    } else {
                        row[idx].trim().to_string()
                    }
                })
                .collect()
        })
        .collect();

    Table::new(columns, rows)
}

/// Missing markers become empty cells, German decimal commas become dots.
fn normalize_value(cell: &str) -> String {
    let cell = cell.trim();
    if MISSING_MARKERS.contains(&cell) {
        return String::new();
    }
    if cell.contains(',') {
        let dotted = cell.replace(',', ".");
        if dotted.parse::<f64>().is_ok() {
            return dotted;
        }
    }
    cell.to_string()
}
