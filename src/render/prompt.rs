use minijinja::context;

use crate::entities::label::LabelFields;
use crate::error::RxLabelError;
use crate::render::markdown::{env, field_rows};

/// Per-field byte budget inside a prompt; label sections can run to tens of KB.
pub(crate) const PROMPT_FIELD_MAX_BYTES: usize = 4000;

/// Single-message prompt carrying the instructions, question, and field data.
pub(crate) fn single_prompt(
    question: &str,
    drug: &str,
    fields: &LabelFields,
) -> Result<String, RxLabelError> {
    let tmpl = env()?.get_template("prompt.j2")?;
    Ok(tmpl.render(context! {
        question => question,
        drug => drug,
        rows => field_rows(fields),
        max_field_bytes => PROMPT_FIELD_MAX_BYTES,
    })?)
}

pub(crate) fn chat_system_prompt() -> Result<String, RxLabelError> {
    let tmpl = env()?.get_template("chat_system.j2")?;
    Ok(tmpl.render(context! {})?.trim().to_string())
}

pub(crate) fn chat_user_prompt(
    question: &str,
    drug: &str,
    fields: &LabelFields,
) -> Result<String, RxLabelError> {
    let tmpl = env()?.get_template("chat_user.j2")?;
    Ok(tmpl.render(context! {
        question => question,
        drug => drug,
        rows => field_rows(fields),
        max_field_bytes => PROMPT_FIELD_MAX_BYTES,
    })?)
}
