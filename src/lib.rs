// Library root
// -----------
// The `genesis-fetch` binary downloads two hospital treatment tables
// (ICD-10 F64) from the GENESIS-Online API of Destatis, tags them by
// source, merges them and writes `GAC_Daten_Roh.csv`. `genesis-setup`
// stores the API credentials interactively.
//
// Module responsibilities:
// - `config`: credentials and endpoint, persisted as TOML.
// - `api`: blocking HTTP client for the GENESIS REST API.
// - `ffcsv`: parsing and prettifying the flat file CSV export.
// - `table`: in-memory table, merge/sort/write operations.
// - `pipeline`: the fetch, merge and save flow.
// - `ui`: interactive credential prompts.
// - `logging`: tracing subscriber setup.
pub mod api;
pub mod config;
pub mod ffcsv;
pub mod logging;
pub mod pipeline;
pub mod table;
pub mod ui;
