// Interactive credential setup: prompts for the GENESIS username and
// password, checks them against the API and stores them in the config file
// the fetcher reads.

use genesis_fetch::{config::Config, logging, ui::setup_wizard};

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let path = Config::default_path()?;
    setup_wizard(&path)?;
    Ok(())
}
