use anyhow::Result;
use genesis_fetch::api::{TableProvider, TableRequest};
use genesis_fetch::ffcsv;
use genesis_fetch::pipeline::{fetch_and_save, Outcome, OUTPUT_FILE};
use genesis_fetch::table::{Table, SOURCE_COLUMN, YEAR_COLUMN};
use std::cell::RefCell;
use std::collections::HashMap;
use tempfile::tempdir;

const HEADER: &str = "Statistik_Code;Statistik_Label;Zeit_Code;Zeit_Label;Zeit;\
1_Merkmal_Code;1_Merkmal_Label;1_Auspraegung_Code;1_Auspraegung_Label;\
2_Merkmal_Code;2_Merkmal_Label;2_Auspraegung_Code;2_Auspraegung_Label;\
3_Merkmal_Code;3_Merkmal_Label;3_Auspraegung_Code;3_Auspraegung_Label;\
KHA001__Patienten__Anzahl";

fn export(rows: &[(&str, &str, &str, &str, &str)]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (year, state, gender, age, value) in rows {
        out.push_str(&format!(
            "23131;Krankenhausstatistik;JAHR;Jahr;{year};DLAND;Bundesland;00;{state};\
GES;Geschlecht;G;{gender};ALT;Altersgruppe;A;{age};{value}\n"
        ));
    }
    out
}

/// Serves canned ffcsv exports by table code and records the requests.
struct FakeGenesis {
    exports: HashMap<&'static str, String>,
    requests: RefCell<Vec<TableRequest>>,
}

impl FakeGenesis {
    fn new(exports: &[(&'static str, String)]) -> Self {
        Self {
            exports: exports.iter().cloned().collect(),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl TableProvider for FakeGenesis {
    fn fetch_table(&self, req: &TableRequest) -> Result<Option<Table>> {
        self.requests.borrow_mut().push(req.clone());
        match self.exports.get(req.name.as_str()) {
            Some(raw) => Ok(Some(ffcsv::prettify(&ffcsv::parse(raw)?)?)),
            None => anyhow::bail!("table {} unavailable", req.name),
        }
    }
}

fn treatment_export() -> String {
    export(&[
        ("2012", "Berlin", "männlich", "unter 15 Jahre", "4"),
        ("2005", "Bayern", "weiblich", "15 bis unter 20 Jahre", "7"),
        ("2024", "Hamburg", "weiblich", "unter 15 Jahre", "..."),
    ])
}

fn residence_export() -> String {
    export(&[
        ("2009", "Bremen", "männlich", "unter 15 Jahre", "2"),
        ("2005", "Berlin", "weiblich", "20 bis unter 25 Jahre", "11"),
    ])
}

#[test]
fn test_both_tables_are_merged_tagged_and_sorted() {
    let dir = tempdir().unwrap();
    let out = dir.path().join(OUTPUT_FILE);
    let genesis = FakeGenesis::new(&[
        ("23131-0011", treatment_export()),
        ("23131-0012", residence_export()),
    ]);

    assert_eq!(fetch_and_save(&genesis, &out), Outcome::Saved);

    let requests = genesis.requests.borrow();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].name, "23131-0011");
    assert_eq!(requests[1].name, "23131-0012");
    assert!(requests.iter().all(|r| r.start_year == "2005" && r.end_year == "2024"));

    let raw = std::fs::read_to_string(&out).unwrap();
    assert!(raw
        .lines()
        .next()
        .unwrap()
        .starts_with("Jahr;Bundesland;Geschlecht;Altersgruppe;Patienten;"));

    let written = Table::read_csv(&out).unwrap();
    assert_eq!(written.len(), 5);
    assert_eq!(
        written.columns(),
        &["Jahr", "Bundesland", "Geschlecht", "Altersgruppe", "Patienten", SOURCE_COLUMN]
    );

    let years: Vec<i32> = written
        .column(YEAR_COLUMN)
        .unwrap()
        .map(|y| y.parse().unwrap())
        .collect();
    assert!(years.windows(2).all(|w| w[0] <= w[1]));

    // every row keeps the tag of the table it came from
    let tag = written.column_index(SOURCE_COLUMN).unwrap();
    let state = written.column_index("Bundesland").unwrap();
    for row in written.rows() {
        let expected = match row[state].as_str() {
            "Bayern" | "Hamburg" => "nach Behandlungsort",
            "Bremen" => "nach Wohnort",
            "Berlin" if row[0] == "2012" => "nach Behandlungsort",
            "Berlin" => "nach Wohnort",
            other => panic!("unexpected state {}", other),
        };
        assert_eq!(row[tag], expected);
    }

    // suppressed value written as an empty cell
    let hamburg = written.rows().iter().find(|r| r[state] == "Hamburg").unwrap();
    assert_eq!(hamburg[4], "");

    let summary = written.summary();
    assert_eq!(summary.years, Some(("2005".into(), "2024".into())));
    assert_eq!(summary.states, Some(4));
    assert_eq!(summary.genders, Some(2));
    assert_eq!(summary.age_groups, Some(3));
}

#[test]
fn test_only_residence_table_available() {
    let dir = tempdir().unwrap();
    let out = dir.path().join(OUTPUT_FILE);
    let genesis = FakeGenesis::new(&[("23131-0012", residence_export())]);

    assert_eq!(fetch_and_save(&genesis, &out), Outcome::Saved);

    let written = Table::read_csv(&out).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written
        .column(SOURCE_COLUMN)
        .unwrap()
        .all(|t| t == "nach Wohnort"));
}

#[test]
fn test_no_tables_available_writes_nothing() {
    let dir = tempdir().unwrap();
    let out = dir.path().join(OUTPUT_FILE);
    let genesis = FakeGenesis::new(&[]);

    let outcome = fetch_and_save(&genesis, &out);
    assert_eq!(outcome, Outcome::NothingFetched);
    assert_eq!(outcome.exit_code(), 1);
    assert!(!out.exists());
}

#[test]
fn test_unwritable_output_fails() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("no-such-dir").join(OUTPUT_FILE);
    let genesis = FakeGenesis::new(&[("23131-0011", treatment_export())]);

    let outcome = fetch_and_save(&genesis, &out);
    assert_eq!(outcome, Outcome::SaveFailed);
    assert_eq!(outcome.exit_code(), 1);
}
