use std::borrow::Cow;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::entities::label::LabelRecord;
use crate::entities::locate::LabelLookup;
use crate::error::RxLabelError;

pub(crate) const OPENFDA_BASE: &str = "https://api.fda.gov";
pub(crate) const OPENFDA_BASE_ENV: &str = "RXLABEL_OPENFDA_BASE";
const OPENFDA_API: &str = "openfda";
const OPENFDA_API_KEY_ENV: &str = "OPENFDA_API_KEY";
const BRAND_NAME_MAX_BYTES: usize = 256;

pub struct OpenFdaClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Option<String>,
}

impl OpenFdaClient {
    pub fn new() -> Result<Self, RxLabelError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(OPENFDA_BASE, OPENFDA_BASE_ENV),
            api_key: crate::sources::env_secret(OPENFDA_API_KEY_ENV),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(
        base: String,
        api_key: Option<String>,
    ) -> Result<Self, RxLabelError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            api_key: api_key
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn escape_query_value(value: &str) -> String {
        crate::utils::query::escape_lucene_value(value)
    }

    async fn get_json_optional<T: DeserializeOwned>(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> Result<Option<T>, RxLabelError> {
        let resp = req.send().await?;
        let status = resp.status();
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, OPENFDA_API).await?;

        // openFDA answers "no matches" with 404 + {"error": {"code": "NOT_FOUND"}}.
        if status.as_u16() == 404 {
            return Ok(None);
        }

        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(RxLabelError::Api {
                api: OPENFDA_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        crate::sources::ensure_json_content_type(OPENFDA_API, content_type.as_ref(), &bytes)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| RxLabelError::ApiJson {
                api: OPENFDA_API.to_string(),
                source,
            })
    }

    /// Fetches the top label whose `openfda.brand_name` matches `brand_name`.
    ///
    /// `Ok(None)` means the registry has no label for the name. Names longer
    /// than any brand name are answered locally with `Ok(None)`.
    pub async fn label_search(
        &self,
        brand_name: &str,
    ) -> Result<Option<LabelRecord>, RxLabelError> {
        let brand_name = brand_name.trim();
        if brand_name.is_empty() {
            return Err(RxLabelError::InvalidArgument(
                "Drug name is required. Example: rxlabel label Tylenol".into(),
            ));
        }
        if brand_name.len() > BRAND_NAME_MAX_BYTES {
            debug!(bytes = brand_name.len(), "Candidate too long for a brand name");
            return Ok(None);
        }

        let escaped = Self::escape_query_value(brand_name);
        let q = format!("openfda.brand_name:\"{escaped}\"");

        let url = self.endpoint("drug/label.json");
        let mut req = self
            .client
            .get(&url)
            .query(&[("search", q.as_str()), ("limit", "1")]);
        if let Some(key) = self.api_key.as_deref() {
            req = req.query(&[("api_key", key)]);
        }

        let Some(resp) = self
            .get_json_optional::<OpenFdaResponse<LabelRecord>>(req)
            .await?
        else {
            debug!(candidate = brand_name, "openFDA returned no label");
            return Ok(None);
        };

        debug!(
            candidate = brand_name,
            total = resp.meta.as_ref().map(|m| m.results.total),
            "openFDA label search"
        );
        Ok(resp.results.into_iter().find(|record| !record.is_empty()))
    }
}

#[async_trait]
impl LabelLookup for OpenFdaClient {
    async fn fetch(&self, candidate: &str) -> Result<Option<LabelRecord>, RxLabelError> {
        self.label_search(candidate).await
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaResponse<T> {
    #[serde(default)]
    pub meta: Option<OpenFdaMeta>,
    #[serde(default)]
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaMeta {
    pub results: OpenFdaMetaResults,
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaMetaResults {
    #[serde(default)]
    pub total: usize,
}
