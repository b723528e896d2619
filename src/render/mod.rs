//! Output rendering: markdown views, JSON, and completion prompts.

pub(crate) mod json;
pub(crate) mod markdown;
pub(crate) mod prompt;
