// Configuration module: the GENESIS credentials and endpoint, persisted as
// TOML in the user's config directory. `setup_credentials` is the step the
// fetcher runs before talking to the API.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "https://www-genesis.destatis.de/genesisWS/rest/2020/";

const USERNAME_VAR: &str = "GENESIS_USERNAME";
const PASSWORD_VAR: &str = "GENESIS_PASSWORD";
const CONFIG_DIR_VAR: &str = "GENESIS_CONFIG_DIR";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub genesis: GenesisConfig,
}

/// Connection settings for the GENESIS-Online REST API.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GenesisConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

// Keep the password out of log output.
impl fmt::Debug for GenesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenesisConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Config {
    /// Load the config file, creating it with defaults if it does not
    /// exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let default_config = Self::default();
            default_config.save_to(path)?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// `$GENESIS_CONFIG_DIR/config.toml`, or
    /// `<platform config dir>/genesis-fetch/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_VAR).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir).join("config.toml"));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("genesis-fetch").join("config.toml"))
    }

    pub fn has_username(&self) -> bool {
        !self.genesis.username.trim().is_empty()
    }
}

/// Username/password pair as found in the environment. Empty values count
/// as missing.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            username: var(USERNAME_VAR),
            password: var(PASSWORD_VAR),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Store the given credentials (if both are present) and check that a
/// username is configured afterwards. Errors are logged and reported as
/// `false`; they never propagate.
pub fn setup_credentials(path: &Path, credentials: &Credentials) -> bool {
    match try_setup_credentials(path, credentials) {
        Ok(ok) => ok,
        Err(e) => {
            warn!("Error setting up credentials: {:#}", e);
            false
        }
    }
}

fn try_setup_credentials(path: &Path, credentials: &Credentials) -> Result<bool> {
    let mut config = Config::load_from(path)?;

    match (&credentials.username, &credentials.password) {
        (Some(username), Some(password)) => {
            config.genesis.username = username.clone();
            config.genesis.password = password.clone();
            config.save_to(path)?;
            info!("Credentials configured for Genesis API in {}", path.display());
        }
        _ => info!("No credentials provided, using existing configuration"),
    }

    if !config.has_username() {
        warn!("No username configured for Genesis API");
        warn!(
            "Set {} and {}, or run `genesis-setup` to store credentials in {}",
            USERNAME_VAR,
            PASSWORD_VAR,
            path.display()
        );
        return Ok(false);
    }
    Ok(true)
}
