// Fetch/merge/save flow. Each step turns its failures into a "no data" or
// "failed" result after logging, so the caller only has to look at the
// final `Outcome`.

use crate::api::{TableProvider, TableRequest};
use crate::table::{Table, SOURCE_COLUMN, YEAR_COLUMN};
use anyhow::Result;
use std::path::Path;
use tracing::{error, info};

pub const OUTPUT_FILE: &str = "GAC_Daten_Roh.csv";
pub const START_YEAR: &str = "2005";
pub const END_YEAR: &str = "2024";

/// One of the two hospital treatment tables and the tag its rows get.
#[derive(Debug, Clone, Copy)]
pub struct Source {
    pub code: &'static str,
    pub tag: &'static str,
}

/// Krankenhausbehandlungen nach Behandlungsort.
pub const BY_TREATMENT_LOCATION: Source = Source {
    code: "23131-0011",
    tag: "nach Behandlungsort",
};

/// Krankenhausbehandlungen nach Wohnort.
pub const BY_RESIDENCE_LOCATION: Source = Source {
    code: "23131-0012",
    tag: "nach Wohnort",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Saved,
    SaveFailed,
    NothingFetched,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Saved => 0,
            Outcome::SaveFailed | Outcome::NothingFetched => 1,
        }
    }
}

pub fn print_banner(title: &str) {
    println!("\n{}", "=".repeat(70));
    println!("{}", title);
    println!("{}", "=".repeat(70));
}

/// Fetch one table. Any error is logged with its cause chain and mapped
/// to `None`, which the caller treats as "no data".
pub fn fetch_table_data(
    provider: &dyn TableProvider,
    code: &str,
    start_year: &str,
    end_year: &str,
) -> Option<Table> {
    info!("Fetching data from table {} (years {}-{})", code, start_year, end_year);
    let req = TableRequest::new(code, start_year, end_year);

    match provider.fetch_table(&req) {
        Ok(Some(table)) => {
            info!("Fetched {} rows from table {}", table.len(), code);
            info!("Columns: {:?}", table.columns());
            Some(table)
        }
        Ok(None) => {
            error!("No data returned from table {}", code);
            None
        }
        Err(e) => {
            error!("Error fetching data from table {}: {:?}", code, e);
            None
        }
    }
}

/// Tag the present tables with their source and stack them, sorted by
/// year. `None` when both are absent.
pub fn combine(by_treatment: Option<&Table>, by_residence: Option<&Table>) -> Option<Table> {
    let tagged: Vec<Table> = [
        (by_treatment, BY_TREATMENT_LOCATION),
        (by_residence, BY_RESIDENCE_LOCATION),
    ]
    .into_iter()
    .filter_map(|(table, source)| {
        let table = table?;
        info!("{} data: {} rows", source.tag, table.len());
        Some(table.with_tag(SOURCE_COLUMN, source.tag))
    })
    .collect();

    if tagged.is_empty() {
        return None;
    }
    let mut combined = Table::concat(&tagged);
    combined.sort_by_column(YEAR_COLUMN);
    Some(combined)
}

/// Combine both tables and write them to `output`. Returns false when
/// there is nothing to write or writing fails; no file is created in the
/// former case.
pub fn combine_and_save(
    by_treatment: Option<&Table>,
    by_residence: Option<&Table>,
    output: &Path,
) -> bool {
    info!("Combining data from both tables");
    let Some(combined) = combine(by_treatment, by_residence) else {
        error!("No data to save");
        return false;
    };
    match save(&combined, output) {
        Ok(()) => true,
        Err(e) => {
            error!("Error combining and saving data: {:?}", e);
            false
        }
    }
}

fn save(combined: &Table, output: &Path) -> Result<()> {
    combined.write_csv(output)?;
    info!("Combined data saved to {}", output.display());
    info!("Data summary: {}", combined.summary());
    Ok(())
}

/// Fetch both tables in order, then merge and save if at least one of
/// them arrived.
pub fn fetch_and_save(provider: &dyn TableProvider, output: &Path) -> Outcome {
    print_banner("Fetching data from Genesis Destatis tables");

    let by_treatment =
        fetch_table_data(provider, BY_TREATMENT_LOCATION.code, START_YEAR, END_YEAR);
    let by_residence =
        fetch_table_data(provider, BY_RESIDENCE_LOCATION.code, START_YEAR, END_YEAR);

    if by_treatment.is_none() && by_residence.is_none() {
        return Outcome::NothingFetched;
    }

    print_banner("Saving data");
    if combine_and_save(by_treatment.as_ref(), by_residence.as_ref(), output) {
        Outcome::Saved
    } else {
        Outcome::SaveFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn years(values: &[&str]) -> Table {
        Table::new(
            vec!["Jahr".into(), "Wert".into()],
            values
                .iter()
                .map(|y| vec![y.to_string(), "1".to_string()])
                .collect(),
        )
        .unwrap()
    }

    struct FailingProvider;

    impl TableProvider for FailingProvider {
        fn fetch_table(&self, _req: &TableRequest) -> Result<Option<Table>> {
            anyhow::bail!("401 Unauthorized")
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Saved.exit_code(), 0);
        assert_eq!(Outcome::SaveFailed.exit_code(), 1);
        assert_eq!(Outcome::NothingFetched.exit_code(), 1);
    }

    #[test]
    fn test_fetch_error_becomes_none() {
        assert!(fetch_table_data(&FailingProvider, "23131-0011", "2005", "2024").is_none());
    }

    #[test]
    fn test_combine_counts_and_tags() {
        let a = years(&["2010", "2005"]);
        let b = years(&["2007", "2006", "2024"]);
        let combined = combine(Some(&a), Some(&b)).unwrap();
        assert_eq!(combined.len(), a.len() + b.len());

        let tags: Vec<&str> = combined.column(SOURCE_COLUMN).unwrap().collect();
        assert_eq!(tags.iter().filter(|t| **t == "nach Behandlungsort").count(), 2);
        assert_eq!(tags.iter().filter(|t| **t == "nach Wohnort").count(), 3);

        let sorted: Vec<i32> = combined
            .column(YEAR_COLUMN)
            .unwrap()
            .map(|y| y.parse().unwrap())
            .collect();
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_combine_single_input() {
        let b = years(&["2006"]);
        let combined = combine(None, Some(&b)).unwrap();
        assert_eq!(combined.len(), 1);
        assert!(combined.column(SOURCE_COLUMN).unwrap().all(|t| t == "nach Wohnort"));
    }

    #[test]
    fn test_combine_and_save_without_data_writes_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join(OUTPUT_FILE);
        assert!(!combine_and_save(None, None, &out));
        assert!(!out.exists());
    }

    #[test]
    fn test_combine_and_save_reports_write_failure() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("missing-dir").join(OUTPUT_FILE);
        assert!(!combine_and_save(Some(&years(&["2005"])), None, &out));
    }

    #[test]
    fn test_nothing_fetched_outcome() {
        let dir = tempdir().unwrap();
        let out = dir.path().join(OUTPUT_FILE);
        assert_eq!(fetch_and_save(&FailingProvider, &out), Outcome::NothingFetched);
        assert!(!out.exists());
    }
}
