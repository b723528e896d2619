use serde::Serialize;
use tracing::debug;

use crate::entities::answer::{AnswerComposer, PromptStyle};
use crate::entities::catalog::Catalog;
use crate::entities::label::{ExtractedInfo, LabelFields};
use crate::entities::locate::{LabelLookup, LocateOptions, LocatePolicy, Located, locate};
use crate::error::RxLabelError;
use crate::transform;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Single prompt with the whole label sent to the completion endpoint
    #[default]
    Prompt,
    /// System and user messages sent to the completion endpoint
    Chat,
    /// Print only the label fields relevant to the question, no completion
    Filter,
}

impl AnswerMode {
    /// Prompt style for modes that call a completion endpoint.
    pub fn prompt_style(self) -> Option<PromptStyle> {
        match self {
            Self::Prompt => Some(PromptStyle::Single),
            Self::Chat => Some(PromptStyle::Chat),
            Self::Filter => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsultOptions<'a> {
    pub locate: LocateOptions<'a>,
    pub mode: AnswerMode,
    /// Send only question-relevant fields to the composer when any matched.
    pub focused: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Consultation {
    Answer {
        question: String,
        drug: String,
        tried: Vec<String>,
        fields_used: Vec<String>,
        answer: String,
    },
    Fields {
        question: String,
        drug: String,
        tried: Vec<String>,
        fields: LabelFields,
    },
    NotFound {
        question: String,
        tried: Vec<String>,
    },
}

/// Answers one question against the label registry.
///
/// # Errors
///
/// Returns `InvalidArgument` for a blank question, or when a completion mode
/// is requested without a composer. Lookup and completion failures propagate.
pub async fn consult(
    question: &str,
    catalog: &Catalog,
    opts: &ConsultOptions<'_>,
    lookup: &dyn LabelLookup,
    composer: Option<&dyn AnswerComposer>,
) -> Result<Consultation, RxLabelError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(RxLabelError::InvalidArgument(
            "Question is required. Example: rxlabel ask \"Tylenol max daily dose?\"".into(),
        ));
    }

    let composer = match (opts.mode.prompt_style(), composer) {
        (Some(_), None) => {
            return Err(RxLabelError::InvalidArgument(format!(
                "Answer mode {:?} needs a completion client",
                opts.mode
            )));
        }
        (Some(_), Some(composer)) => Some(composer),
        (None, _) => None,
    };

    let (drug, record, tried) = match locate(lookup, question, &opts.locate).await? {
        Located::Found {
            candidate,
            record,
            tried,
        } => (candidate, record, tried),
        Located::NotFound { tried } => {
            return Ok(Consultation::NotFound {
                question: question.to_string(),
                tried,
            });
        }
    };

    let info: ExtractedInfo = transform::label::resolve(&record, catalog.fields());

    let Some(composer) = composer else {
        let fields = transform::relevance::filter(&info, question, catalog.keywords());
        return Ok(Consultation::Fields {
            question: question.to_string(),
            drug,
            tried,
            fields,
        });
    };

    let fields = if opts.focused {
        let filtered = transform::relevance::filter(&info, question, catalog.keywords());
        if filtered.is_empty() {
            debug!("No field matched the question, sending the full label");
            info
        } else {
            filtered
        }
    } else {
        info
    };

    let answer = composer.compose(question, &drug, &fields).await?;
    Ok(Consultation::Answer {
        question: question.to_string(),
        drug,
        tried,
        fields_used: fields.names(),
        answer,
    })
}

/// Resolves every catalog field for a named drug.
///
/// # Errors
///
/// Returns `NotFound` when the registry has no label for `name`.
pub async fn label(
    name: &str,
    catalog: &Catalog,
    lookup: &dyn LabelLookup,
) -> Result<ExtractedInfo, RxLabelError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RxLabelError::InvalidArgument(
            "Drug name is required. Example: rxlabel label Tylenol".into(),
        ));
    }

    let opts = LocateOptions {
        policy: LocatePolicy::FirstToken,
        drug: Some(name),
        lookup_timeout: crate::entities::locate::DEFAULT_LOOKUP_TIMEOUT,
    };
    match locate(lookup, name, &opts).await? {
        Located::Found { record, .. } => Ok(transform::label::resolve(&record, catalog.fields())),
        Located::NotFound { .. } => Err(RxLabelError::NotFound {
            entity: "drug label".into(),
            id: name.to_string(),
            suggestion: "openFDA matches brand names exactly. Try the name printed on the package, e.g. rxlabel label Tylenol".into(),
        }),
    }
}
