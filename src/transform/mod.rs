//! Transform adapters from upstream label documents into question-facing field sets.

pub(crate) mod label;
pub(crate) mod relevance;
