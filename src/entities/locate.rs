use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::entities::label::LabelRecord;
use crate::error::RxLabelError;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches a label for a candidate brand name.
///
/// `Ok(None)` is the ordinary "no label for this name" outcome; `Err` is
/// reserved for transport and upstream failures.
#[async_trait]
pub trait LabelLookup: Send + Sync {
    async fn fetch(&self, candidate: &str) -> Result<Option<LabelRecord>, RxLabelError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LocatePolicy {
    /// Look up only the first word of the question
    #[default]
    FirstToken,
    /// Look up each word in order until one has a label
    Scan,
}

#[derive(Debug, Clone)]
pub struct LocateOptions<'a> {
    pub policy: LocatePolicy,
    /// An explicit drug name bypasses tokenization.
    pub drug: Option<&'a str>,
    pub lookup_timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum Located {
    Found {
        candidate: String,
        record: LabelRecord,
        tried: Vec<String>,
    },
    NotFound {
        tried: Vec<String>,
    },
}

/// Splits free text into lookup candidates: whitespace-delimited words with
/// surrounding punctuation removed.
pub(crate) fn candidate_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|word| !word.is_empty())
        .collect()
}

fn candidates<'a>(text: &'a str, opts: &LocateOptions<'a>) -> Result<Vec<&'a str>, RxLabelError> {
    if let Some(drug) = opts.drug {
        let drug = drug.trim();
        if drug.is_empty() {
            return Err(RxLabelError::InvalidArgument(
                "--drug must not be blank".into(),
            ));
        }
        return Ok(vec![drug]);
    }

    let tokens = candidate_tokens(text);
    Ok(match opts.policy {
        LocatePolicy::FirstToken => tokens.into_iter().take(1).collect(),
        LocatePolicy::Scan => tokens,
    })
}

/// Finds the drug a question is about.
///
/// Candidates are tried in order and the first one with a label wins, so the
/// result is always the lowest-index successful token. A timed-out lookup
/// counts as "no label" for that candidate. A failed lookup is logged and the
/// scan goes on; if nothing is found afterwards, the last failure is returned
/// instead of a plain not-found.
pub async fn locate<L>(
    lookup: &L,
    text: &str,
    opts: &LocateOptions<'_>,
) -> Result<Located, RxLabelError>
where
    L: LabelLookup + ?Sized,
{
    let mut tried: Vec<String> = Vec::new();
    let mut last_err: Option<RxLabelError> = None;

    for candidate in candidates(text, opts)? {
        tried.push(candidate.to_string());
        match tokio::time::timeout(opts.lookup_timeout, lookup.fetch(candidate)).await {
            Ok(Ok(Some(record))) => {
                debug!(candidate, attempts = tried.len(), "Located drug label");
                return Ok(Located::Found {
                    candidate: candidate.to_string(),
                    record,
                    tried,
                });
            }
            Ok(Ok(None)) => debug!(candidate, "No label for candidate"),
            Ok(Err(err)) => {
                warn!(candidate, error = %err, "Label lookup failed");
                last_err = Some(err);
            }
            Err(_) => warn!(
                candidate,
                timeout_secs = opts.lookup_timeout.as_secs_f64(),
                "Label lookup timed out"
            ),
        }
    }

    match last_err {
        Some(err) => Err(err),
        None => Ok(Located::NotFound { tried }),
    }
}
