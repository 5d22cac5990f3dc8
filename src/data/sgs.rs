//! SGS (Banco Central do Brasil time-series API) integration.
//!
//! Two wire flavours:
//!
//! - **direct**: `GET {base}/dados/serie/bcdata.sgs.{code}/dados?formato=json&dataInicial=..&dataFinal=..`
//!   answers with a bare JSON array of `{"data": "dd/mm/yyyy", "valor": "0.42"}`.
//! - **proxy**: `GET {proxy}?serie=..&dataInicial=..&dataFinal=..` (the same-origin
//!   `/api/sgs` endpoint) answers with an envelope
//!   `{"serie", "dataInicial", "dataFinal", "dados": [...], "url"}` or, on failure,
//!   `{"error", "status", "detail"}`.
//!
//! Exactly one request per fetch: no retries.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{Settings, SourceMode};
use crate::data::source::{SGS_DATE_FMT, SeriesQuery, SeriesSource};
use crate::domain::RawObservation;
use crate::error::{AppError, EXIT_INPUT, ReadjustError};

/// Which endpoint shape the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Upstream SGS; the value is the API base URL.
    Direct(String),
    /// Same-origin proxy; the value is the full proxy endpoint URL.
    Proxy(String),
}

pub struct SgsClient {
    client: Client,
    endpoint: Endpoint,
    timeout: Duration,
}

impl SgsClient {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let endpoint = match settings.source {
            SourceMode::Direct => Endpoint::Direct(settings.sgs_url.clone()),
            SourceMode::Proxy => {
                let url = settings.proxy_url.clone().ok_or_else(|| {
                    AppError::new(
                        EXIT_INPUT,
                        "Proxy mode requires READJUST_PROXY_URL (or --proxy-url).",
                    )
                })?;
                Endpoint::Proxy(url)
            }
        };
        Self::new(endpoint, settings.timeout)
    }

    /// Full request URL (without query string) and query parameters for `query`.
    pub fn request_parts(&self, query: &SeriesQuery) -> (String, Vec<(&'static str, String)>) {
        match &self.endpoint {
            Endpoint::Direct(base) => (
                format!("{}/dados/serie/bcdata.sgs.{}/dados", base.trim_end_matches('/'), query.code),
                vec![
                    ("formato", "json".to_string()),
                    ("dataInicial", query.data_inicial()),
                    ("dataFinal", query.data_final()),
                ],
            ),
            Endpoint::Proxy(url) => (url.clone(), query.params()),
        }
    }
}

impl SeriesSource for SgsClient {
    fn fetch(&self, query: &SeriesQuery) -> Result<Vec<RawObservation>, ReadjustError> {
        let (url, params) = self.request_parts(query);
        validate_params(&params)?;
        debug!(%url, ?params, "requesting SGS series");

        let resp = self.client.get(&url).query(&params).send().map_err(|e| {
            if e.is_timeout() {
                ReadjustError::upstream(
                    None,
                    format!("request timed out after {}s", self.timeout.as_secs()),
                )
            } else {
                ReadjustError::upstream(e.status().map(|s| s.as_u16()), format!("request failed: {e}"))
            }
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| ReadjustError::upstream(Some(status.as_u16()), format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(match &self.endpoint {
                Endpoint::Proxy(_) => decode_proxy_error(status.as_u16(), &body),
                Endpoint::Direct(_) => ReadjustError::upstream(
                    Some(status.as_u16()),
                    format!("SGS request failed: {}", truncate(body.trim(), 200)),
                ),
            });
        }

        let rows = match &self.endpoint {
            Endpoint::Direct(_) => decode_direct(&body)?,
            Endpoint::Proxy(_) => decode_proxy(&body)?,
        };
        info!(series = %query.code, rows = rows.len(), "fetched SGS series");
        Ok(rows)
    }

    fn describe(&self) -> String {
        match &self.endpoint {
            Endpoint::Direct(base) => format!("SGS {base}"),
            Endpoint::Proxy(url) => format!("proxy {url}"),
        }
    }
}

/// Parameter checks the proxy applies before calling upstream.
pub fn validate_params(params: &[(&str, String)]) -> Result<(), ReadjustError> {
    let mut range: Vec<NaiveDate> = Vec::new();
    for (name, value) in params {
        match *name {
            "serie" => {
                if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ReadjustError::invalid_input(format!("Invalid series code '{value}'.")));
                }
            }
            "dataInicial" | "dataFinal" => {
                let well_formed = value.len() == 10
                    && value.char_indices().all(|(i, c)| match i {
                        2 | 5 => c == '/',
                        _ => c.is_ascii_digit(),
                    });
                let date = NaiveDate::parse_from_str(value, SGS_DATE_FMT).ok().filter(|_| well_formed);
                let Some(date) = date else {
                    return Err(ReadjustError::invalid_input(format!(
                        "`{name}` must be dd/mm/yyyy (got '{value}')."
                    )));
                };
                range.push(date);
            }
            _ => {}
        }
    }
    if let [start, end] = range.as_slice() {
        if end < start {
            return Err(ReadjustError::invalid_input("`dataFinal` precedes `dataInicial`."));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    dados: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct ProxyError {
    error: String,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    detail: Option<String>,
}

/// Decode a direct SGS body (a JSON array).
pub fn decode_direct(body: &str) -> Result<Vec<RawObservation>, ReadjustError> {
    serde_json::from_str(body)
        .map_err(|e| ReadjustError::upstream(None, format!("Failed to parse SGS response: {e}")))
}

/// Decode a successful proxy envelope.
pub fn decode_proxy(body: &str) -> Result<Vec<RawObservation>, ReadjustError> {
    let resp: ProxyResponse = serde_json::from_str(body)
        .map_err(|e| ReadjustError::upstream(None, format!("Failed to parse proxy response: {e}")))?;
    Ok(resp.dados)
}

/// Turn a non-success proxy answer into an upstream error, preferring the
/// upstream status the proxy reports over its own 502.
pub fn decode_proxy_error(http_status: u16, body: &str) -> ReadjustError {
    match serde_json::from_str::<ProxyError>(body) {
        Ok(err) => {
            let mut message = err.error;
            if let Some(detail) = err.detail.filter(|d| !d.trim().is_empty()) {
                message.push_str(": ");
                message.push_str(truncate(detail.trim(), 200));
            }
            ReadjustError::upstream(Some(err.status.unwrap_or(http_status)), message)
        }
        Err(_) => ReadjustError::upstream(
            Some(http_status),
            format!("proxy request failed: {}", truncate(body.trim(), 200)),
        ),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
