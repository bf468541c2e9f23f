// API client module: a small blocking HTTP client for the GENESIS-Online
// REST API. Only two endpoints are used: the table export and the login
// check.

use crate::config::GenesisConfig;
use crate::ffcsv;
use crate::table::Table;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const BASE_URL_VAR: &str = "GENESIS_BASE_URL";

/// Failures reported by the API itself, as opposed to transport errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("GENESIS status {code} ({kind}): {content}")]
    Status {
        code: i64,
        kind: String,
        content: String,
    },
    #[error("login rejected: {0}")]
    LoginRejected(String),
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
}

/// Parameters for one table export. Years are inclusive, four digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRequest {
    pub name: String,
    pub start_year: String,
    pub end_year: String,
    pub language: String,
}

impl TableRequest {
    /// Request with German labels, which is what the prettified column
    /// names (`Jahr`, `Bundesland`, ...) rely on.
    pub fn new(name: &str, start_year: &str, end_year: &str) -> Self {
        Self {
            name: name.to_string(),
            start_year: start_year.to_string(),
            end_year: end_year.to_string(),
            language: "de".to_string(),
        }
    }
}

/// Anything that can hand back a prettified table for a request.
/// `Ok(None)` means the provider answered but had no data.
pub trait TableProvider {
    fn fetch_table(&self, req: &TableRequest) -> Result<Option<Table>>;
}

/// GENESIS status block attached to JSON responses.
#[derive(Deserialize, Debug)]
struct StatusBlock {
    #[serde(rename = "Code")]
    code: i64,
    #[serde(rename = "Content", default)]
    content: String,
    #[serde(rename = "Type", default)]
    kind: String,
}

#[derive(Deserialize, Debug)]
struct StatusResponse {
    #[serde(rename = "Status")]
    status: Option<StatusBlock>,
}

/// Blocking client holding the base URL and credentials. Credentials go
/// into request headers on every call.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl ApiClient {
    /// Build a client from the stored configuration. `GENESIS_BASE_URL`
    /// overrides the configured endpoint.
    pub fn from_config(config: &GenesisConfig) -> Result<Self> {
        let base_url = std::env::var(BASE_URL_VAR)
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| config.base_url.clone());
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    fn credential_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "username",
            HeaderValue::from_str(&self.username).context("Invalid characters in username")?,
        );
        headers.insert(
            "password",
            HeaderValue::from_str(&self.password).context("Invalid characters in password")?,
        );
        Ok(headers)
    }

    fn post(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<String> {
        let url = self.url(endpoint);
        debug!(%url, "POST");
        let res = self
            .client
            .post(&url)
            .headers(self.credential_headers()?)
            .form(form)
            .send()
            .with_context(|| format!("Failed to send request to {}", endpoint))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_else(|_| "".into());
            return Err(ApiError::Http { status, body }.into());
        }
        let body = res.text().context("Reading response body")?;
        Ok(body)
    }

    /// Ask the API whether the configured credentials are accepted.
    /// Returns the server's confirmation text.
    pub fn login_check(&self) -> Result<String> {
        let body = self.post("helloworld/logincheck", &[("language", "de")])?;
        Ok(login_status(&body)?)
    }

    /// Fetch the raw ffcsv export of a table. `None` when the API answers
    /// without table data.
    pub fn fetch_tablefile(&self, req: &TableRequest) -> Result<Option<String>> {
        let form = [
            ("name", req.name.as_str()),
            ("area", "all"),
            ("compress", "false"),
            ("transpose", "false"),
            ("startyear", req.start_year.as_str()),
            ("endyear", req.end_year.as_str()),
            ("format", "ffcsv"),
            ("job", "false"),
            ("language", req.language.as_str()),
        ];
        let body = self.post("data/tablefile", &form)?;
        Ok(interpret_body(body)?)
    }
}

impl TableProvider for ApiClient {
    fn fetch_table(&self, req: &TableRequest) -> Result<Option<Table>> {
        let Some(raw) = self.fetch_tablefile(req)? else {
            return Ok(None);
        };
        let table = ffcsv::parse(&raw)
            .and_then(|t| ffcsv::prettify(&t))
            .with_context(|| format!("Failed to read export of table {}", req.name))?;
        Ok(Some(table))
    }
}

/// The login check answers with `{"Status": "..."}`; only a success
/// message in German or English counts as accepted.
fn login_status(body: &str) -> Result<String, ApiError> {
    let json: serde_json::Value = serde_json::from_str(body.trim())
        .map_err(|_| ApiError::UnexpectedBody(body.chars().take(200).collect()))?;
    let message = json
        .get("Status")
        .and_then(|s| s.as_str())
        .unwrap_or_default()
        .to_string();
    let lower = message.to_lowercase();
    if lower.contains("erfolgreich") || lower.contains("successfully") {
        Ok(message)
    } else {
        Err(ApiError::LoginRejected(body.to_string()))
    }
}

/// Table exports come back as CSV text; everything else is a JSON status
/// message. Errors in that message become `ApiError::Status`, other
/// messages mean "no data".
fn interpret_body(body: String) -> Result<Option<String>, ApiError> {
    let trimmed = body.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !trimmed.starts_with('{') {
        return Ok(Some(body));
    }

    let parsed: StatusResponse = serde_json::from_str(trimmed)
        .map_err(|_| ApiError::UnexpectedBody(trimmed.chars().take(200).collect()))?;
    match parsed.status {
        Some(s) if s.kind == "Fehler" || s.kind == "Error" => Err(ApiError::Status {
            code: s.code,
            kind: s.kind,
            content: s.content,
        }),
        Some(s) => {
            warn!("GENESIS status {} ({}): {}", s.code, s.kind, s.content);
            Ok(None)
        }
        None => Ok(None),
    }
}
