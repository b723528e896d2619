use std::sync::OnceLock;

use minijinja::{Environment, context};

use crate::entities::catalog::Catalog;
use crate::entities::consult::Consultation;
use crate::entities::label::LabelFields;
use crate::error::RxLabelError;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(Debug, serde::Serialize)]
pub(crate) struct FieldRow {
    pub name: String,
    pub value: String,
    pub available: bool,
}

#[derive(serde::Serialize)]
struct CatalogRow {
    name: String,
    path: String,
    keywords: Vec<String>,
}

pub(crate) fn field_rows(fields: &LabelFields) -> Vec<FieldRow> {
    fields
        .iter()
        .map(|(name, value)| FieldRow {
            name: name.to_string(),
            value: value.to_string(),
            available: value.is_available(),
        })
        .collect()
}

pub(crate) fn env() -> Result<&'static Environment<'static>, RxLabelError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_filter("truncate", |s: String, max_bytes: usize| -> String {
        if s.len() <= max_bytes {
            return s;
        }
        if max_bytes == 0 {
            return "…".to_string();
        }
        let mut boundary = max_bytes;
        while boundary > 0 && !s.is_char_boundary(boundary) {
            boundary -= 1;
        }
        let mut out = s[..boundary].trim_end().to_string();
        out.push('…');
        out
    });
    env.add_template("answer.md.j2", include_str!("../../templates/answer.md.j2"))?;
    env.add_template("fields.md.j2", include_str!("../../templates/fields.md.j2"))?;
    env.add_template(
        "not_found.md.j2",
        include_str!("../../templates/not_found.md.j2"),
    )?;
    env.add_template(
        "catalog.md.j2",
        include_str!("../../templates/catalog.md.j2"),
    )?;
    env.add_template("prompt.j2", include_str!("../../templates/prompt.j2"))?;
    env.add_template(
        "chat_system.j2",
        include_str!("../../templates/chat_system.j2"),
    )?;
    env.add_template("chat_user.j2", include_str!("../../templates/chat_user.j2"))?;

    Ok(ENV.get_or_init(|| env))
}

pub fn consultation_markdown(consultation: &Consultation) -> Result<String, RxLabelError> {
    let env = env()?;
    let out = match consultation {
        Consultation::Answer {
            drug,
            tried,
            answer,
            ..
        } => env.get_template("answer.md.j2")?.render(context! {
            drug => drug,
            tried => tried,
            answer => answer,
        })?,
        Consultation::Fields { drug, fields, .. } => {
            env.get_template("fields.md.j2")?.render(context! {
                drug => drug,
                rows => field_rows(fields),
            })?
        }
        Consultation::NotFound { tried, .. } => {
            env.get_template("not_found.md.j2")?.render(context! {
                tried => tried,
            })?
        }
    };
    Ok(out)
}

/// Full field listing for one drug, one `name: value` line per catalog field.
pub fn label_markdown(drug: &str, fields: &LabelFields) -> Result<String, RxLabelError> {
    let tmpl = env()?.get_template("fields.md.j2")?;
    Ok(tmpl.render(context! {
        drug => drug,
        rows => field_rows(fields),
    })?)
}

pub fn catalog_markdown(catalog: &Catalog) -> Result<String, RxLabelError> {
    let rows: Vec<CatalogRow> = catalog
        .fields()
        .iter()
        .map(|field| CatalogRow {
            name: field.name.clone(),
            path: field.dotted_path(),
            keywords: catalog
                .keywords_for(&field.name)
                .map(|k| k.keywords.iter().cloned().collect())
                .unwrap_or_default(),
        })
        .collect();

    let tmpl = env()?.get_template("catalog.md.j2")?;
    Ok(tmpl.render(context! { rows => rows })?)
}
