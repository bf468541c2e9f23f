// Entrypoint for the fetcher.
// - Credential setup failures are reported but do not stop the run.
// - The exit code is 0 only when the combined file was written.

use genesis_fetch::{
    api::ApiClient,
    config::{self, Config, Credentials},
    logging,
    pipeline::{self, print_banner, Outcome, OUTPUT_FILE},
};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, warn};

fn main() -> ExitCode {
    logging::init_tracing();

    print_banner("Genesis Destatis Data Fetcher\nICD-10 F64: Störung der Geschlechtsidentität");

    let credentials = Credentials::from_env();
    if !credentials.is_complete() {
        warn!("Credentials not found in environment variables");
        warn!("Set GENESIS_USERNAME and GENESIS_PASSWORD, or run `genesis-setup`");
    }

    let config = match Config::default_path() {
        Ok(path) => {
            if !config::setup_credentials(&path, &credentials) {
                warn!("Continuing without credential setup");
            }
            Config::load_from(&path).unwrap_or_else(|e| {
                warn!("Using default configuration: {:#}", e);
                Config::default()
            })
        }
        Err(e) => {
            warn!("{:#}; continuing without credential setup", e);
            Config::default()
        }
    };

    let client = match ApiClient::from_config(&config.genesis) {
        Ok(client) => client,
        Err(e) => {
            error!("{:?}", e);
            return ExitCode::from(1);
        }
    };

    let outcome = pipeline::fetch_and_save(&client, Path::new(OUTPUT_FILE));
    match outcome {
        Outcome::Saved => print_banner("✓ Data fetching completed successfully!"),
        Outcome::SaveFailed => print_banner("✗ Failed to save data"),
        Outcome::NothingFetched => print_banner("✗ Failed to fetch data from Genesis tables"),
    }
    ExitCode::from(outcome.exit_code())
}
