// Table module: an in-memory, string-celled table as returned by the
// GENESIS API after prettifying. The pipeline only needs a handful of
// operations on it: tag, concatenate, sort by year, summarise, and write
// a semicolon separated file.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Time column produced by the prettified German export.
pub const YEAR_COLUMN: &str = "Jahr";
pub const STATE_COLUMN: &str = "Bundesland";
pub const GENDER_COLUMN: &str = "Geschlecht";
pub const AGE_GROUP_COLUMN: &str = "Altersgruppe";
/// Column added during the merge that records which table a row came from.
pub const SOURCE_COLUMN: &str = "Wohnort/Behandlungsort";

/// Field separator of the output file (standard for German data).
pub const DELIMITER: u8 = b';';

/// Column labels plus rows of string cells. Every row has exactly one
/// cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            anyhow::bail!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                columns.len()
            );
        }
        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &str> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| r[idx].as_str()))
    }

    /// Copy of this table with `column` set to `value` on every row. The
    /// column is appended if absent, overwritten otherwise.
    pub fn with_tag(&self, column: &str, value: &str) -> Table {
        let mut tagged = self.clone();
        match tagged.column_index(column) {
            Some(idx) => {
                for row in &mut tagged.rows {
                    row[idx] = value.to_string();
                }
            }
            None => {
                tagged.columns.push(column.to_string());
                for row in &mut tagged.rows {
                    row.push(value.to_string());
                }
            }
        }
        tagged
    }

    /// Stack tables vertically. The result has the union of all columns in
    /// order of first appearance; cells for columns a table lacks are empty.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Table {
        let tables: Vec<&Table> = tables.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        for t in &tables {
            for c in &t.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.len()).sum());
        for t in &tables {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| t.column_index(c)).collect();
            for row in &t.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|m| m.map(|i| row[i].clone()).unwrap_or_default())
                        .collect(),
                );
            }
        }

        Table { columns, rows }
    }

    /// Stable ascending sort on one column. Returns false (and leaves the
    /// table untouched) when the column does not exist.
    pub fn sort_by_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.rows.sort_by(|a, b| compare_cells(&a[idx], &b[idx]));
        true
    }

    pub fn summary(&self) -> Summary {
        let distinct = |name: &str| {
            self.column(name)
                .map(|cells| cells.collect::<HashSet<_>>().len())
        };
        let years = self.column(YEAR_COLUMN).and_then(|cells| {
            let mut cells = cells.filter(|c| !c.is_empty());
            let first = cells.next()?;
            let (min, max) = cells.fold((first, first), |(lo, hi), c| {
                (
                    if compare_cells(c, lo) == Ordering::Less { c } else { lo },
                    if compare_cells(c, hi) == Ordering::Greater { c } else { hi },
                )
            });
            Some((min.to_string(), max.to_string()))
        });

        Summary {
            rows: self.len(),
            columns: self.columns.clone(),
            years,
            states: distinct(STATE_COLUMN),
            genders: distinct(GENDER_COLUMN),
            age_groups: distinct(AGE_GROUP_COLUMN),
        }
    }

    /// Write a header row plus all rows, semicolon separated, UTF-8, no
    /// index column.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        Ok(())
    }

    /// Read a file written by [`Table::write_csv`].
    pub fn read_csv(path: &Path) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Table::new(columns, rows)
    }
}

/// Integers compare numerically and sort before anything else; the rest
/// compares lexically.
fn compare_cells(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Figures logged after the combined file has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub years: Option<(String, String)>,
    pub states: Option<usize>,
    pub genders: Option<usize>,
    pub age_groups: Option<usize>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows, columns {:?}", self.rows, self.columns)?;
        if let Some((min, max)) = &self.years {
            write!(f, ", years {}-{}", min, max)?;
        }
        if let Some(n) = self.states {
            write!(f, ", {} Bundesländer", n)?;
        }
        if let Some(n) = self.genders {
            write!(f, ", {} Geschlecht categories", n)?;
        }
        if let Some(n) = self.age_groups {
            write!(f, ", {} age groups", n)?;
        }
        Ok(())
    }
}
