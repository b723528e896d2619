use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::entities::catalog::Catalog;
use crate::error::RxLabelError;
use crate::sources::openai::{LLM_API_KEY_ENV, LLM_BASE, LLM_BASE_ENV};
use crate::sources::openfda::{OPENFDA_BASE, OPENFDA_BASE_ENV};
use crate::sources::{env_base, env_secret};

const STATUS_OK: &str = "ok";
const STATUS_ERROR: &str = "error";
const STATUS_SKIPPED: &str = "skipped";

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub(crate) fn from_rows(rows: Vec<HealthRow>) -> Self {
        let checked = rows.iter().filter(|r| r.status != STATUS_SKIPPED);
        let total = checked.clone().count();
        let healthy = checked.filter(|r| r.status == STATUS_OK).count();
        Self {
            healthy,
            total,
            rows,
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# rxlabel Health Check\n\n");
        out.push_str("| Check | Status | Detail |\n");
        out.push_str("|-------|--------|--------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} checks healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

async fn check_one(request: reqwest::RequestBuilder, api: &str) -> HealthRow {
    let start = Instant::now();
    let resp = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await;

    match resp {
        Ok(resp) => {
            let status = resp.status();
            let elapsed = start.elapsed().as_millis();
            if status.is_success() {
                HealthRow {
                    api: api.to_string(),
                    status: STATUS_OK.into(),
                    latency: format!("{elapsed}ms"),
                }
            } else {
                HealthRow {
                    api: api.to_string(),
                    status: STATUS_ERROR.into(),
                    latency: format!("{elapsed}ms (HTTP {})", status.as_u16()),
                }
            }
        }
        Err(err) => {
            let reason = if err.is_timeout() {
                "timeout"
            } else if err.is_connect() {
                "connect"
            } else {
                "error"
            };
            HealthRow {
                api: api.to_string(),
                status: STATUS_ERROR.into(),
                latency: reason.into(),
            }
        }
    }
}

fn health_http_client() -> Result<reqwest::Client, RxLabelError> {
    static HEALTH_HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

    if let Some(client) = HEALTH_HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("rxlabel-cli/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RxLabelError::HttpClientInit)?;

    match HEALTH_HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HEALTH_HTTP_CLIENT
            .get()
            .cloned()
            .ok_or_else(|| RxLabelError::Api {
                api: "health".into(),
                message: "Health HTTP client initialization race".into(),
            }),
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

async fn check_openfda(client: &reqwest::Client) -> HealthRow {
    let base = env_base(OPENFDA_BASE, OPENFDA_BASE_ENV);
    let request = client.get(join_url(&base, "drug/label.json?limit=1"));
    check_one(request, "OpenFDA drug labels").await
}

async fn check_llm(client: &reqwest::Client) -> HealthRow {
    let Some(key) = env_secret(LLM_API_KEY_ENV) else {
        return HealthRow {
            api: "LLM completions".into(),
            status: STATUS_SKIPPED.into(),
            latency: format!("{LLM_API_KEY_ENV} not set"),
        };
    };
    let base = env_base(LLM_BASE, LLM_BASE_ENV);
    let request = client.get(join_url(&base, "models")).bearer_auth(key);
    check_one(request, "LLM completions").await
}

fn check_catalog(path: Option<&Path>) -> HealthRow {
    let start = Instant::now();
    match Catalog::load(path) {
        Ok(catalog) => HealthRow {
            api: "Field catalog".into(),
            status: STATUS_OK.into(),
            latency: format!(
                "{} fields ({}ms)",
                catalog.fields().len(),
                start.elapsed().as_millis()
            ),
        },
        Err(err) => HealthRow {
            api: "Field catalog".into(),
            status: STATUS_ERROR.into(),
            latency: err.to_string().replace('\n', " "),
        },
    }
}

/// Runs connectivity checks for the label registry and completion endpoint,
/// then validates the field catalog.
///
/// # Errors
///
/// Returns an error when the health HTTP client cannot be created.
pub async fn check(catalog_path: Option<&Path>) -> Result<HealthReport, RxLabelError> {
    let client = health_http_client()?;

    let (openfda, llm) = tokio::join!(check_openfda(&client), check_llm(&client));
    let rows = vec![openfda, llm, check_catalog(catalog_path)];
    Ok(HealthReport::from_rows(rows))
}
