use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::error::LookupError;

pub const POOL_USER_AGENT: &str = "PredictionPool/1.0 (fightpool)";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const BODY_SNIPPET_CHARS: usize = 220;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GET `url` with query pairs and return the body of a 2xx response.
///
/// 404 maps to `NotFound`, any other failure to `Network`.
pub fn get_text(
    url: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> std::result::Result<String, LookupError> {
    let client = http_client().map_err(|e| LookupError::network(format!("{e:#}")))?;
    let resp = client
        .get(url)
        .query(query)
        .timeout(timeout)
        .header(USER_AGENT, POOL_USER_AGENT)
        .header(ACCEPT, "application/json")
        .send()?;
    let status = resp.status();
    let body = resp.text()?;
    check_status(status, &body)?;
    Ok(body)
}

pub(crate) fn check_status(status: StatusCode, body: &str) -> std::result::Result<(), LookupError> {
    if status.is_success() {
        return Ok(());
    }
    let snippet = body_snippet(body);
    if status == StatusCode::NOT_FOUND {
        return Err(LookupError::not_found(format!("http {status}: {snippet}")));
    }
    Err(LookupError::network(format!("http {status}: {snippet}")))
}

pub(crate) fn body_snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(BODY_SNIPPET_CHARS)
        .collect()
}
