use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RxLabelError;
use crate::utils::serde::StringOrVec;

/// Display name, dotted label path, question keywords.
const BUILTIN_FIELDS: &[(&str, &str, &[&str])] = &[
    ("Brand Name", "openfda.brand_name", &["brand", "trade name"]),
    (
        "Generic Name",
        "openfda.generic_name",
        &["generic", "active ingredient"],
    ),
    (
        "Indications",
        "indications_and_usage",
        &["indication", "indicated", "used for", "treat"],
    ),
    ("Warnings", "warnings", &["warning", "caution", "boxed"]),
    (
        "Dosage",
        "dosage_and_administration",
        &["dose", "dosage", "dosing", "administ"],
    ),
    (
        "Forms and strength",
        "dosage_forms_and_strengths",
        &["strength", "tablet", "capsule", "formulation"],
    ),
    (
        "Contraindications",
        "contraindications",
        &["contraindicat", "should not take"],
    ),
    (
        "Precautions",
        "warnings_and_cautions",
        &["precaution", "caution"],
    ),
    (
        "Adverse Reactions",
        "adverse_reactions",
        &["side effect", "adverse", "reaction"],
    ),
    (
        "Drug Interactions",
        "drug_interactions",
        &["interact", "combine", "together with"],
    ),
    (
        "Pregnancy",
        "pregnancy",
        &["pregnan", "lactat", "breastfeed"],
    ),
    (
        "Pediatric use",
        "pediatric_use",
        &["pediatric", "child", "infant"],
    ),
    (
        "Geriatric use",
        "geriatric_use",
        &["geriatric", "elderly", "older adult"],
    ),
    ("Overdose", "overdosage", &["overdos", "toxicity"]),
    (
        "Mechanism of action",
        "mechanism_of_action",
        &["mechanism", "how does it work"],
    ),
    ("Pharmacodynamics", "pharmacodynamics", &["pharmacodynamic"]),
    (
        "Pharmacokinetics",
        "pharmacokinetics",
        &["pharmacokinetic", "half-life", "half life", "metabolism"],
    ),
    (
        "Clinical Studies",
        "clinical_studies",
        &["clinical stud", "trial", "efficacy"],
    ),
    (
        "How supplied",
        "how_supplied",
        &["supplied", "storage", "store"],
    ),
    (
        "Instructions for use",
        "instructions_for_use",
        &["instruction", "how to use"],
    ),
    ("NDC", "package_ndc", &["ndc", "national drug code"]),
];

const CATALOG_FILE_NAME: &str = "catalog.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub path: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordSpec {
    pub name: String,
    pub keywords: BTreeSet<String>,
}

impl KeywordSpec {
    /// Keywords are trimmed and lowercased; blank entries are dropped.
    pub fn new(
        name: impl Into<String>,
        keywords: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            name: name.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// `question` must already be lowercased.
    pub fn matches(&self, question: &str) -> bool {
        self.keywords.iter().any(|k| question.contains(k.as_str()))
    }
}

/// Field paths and keyword sets, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    fields: Vec<FieldSpec>,
    keywords: Vec<KeywordSpec>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    fields: Vec<CatalogFileEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogFileEntry {
    name: String,
    #[serde(default)]
    path: StringOrVec,
    #[serde(default)]
    keywords: Vec<String>,
}

impl Catalog {
    /// # Errors
    ///
    /// Returns `InvalidArgument` for duplicate or blank field names, empty
    /// paths, or keyword sets that name an unknown field.
    pub fn new(fields: Vec<FieldSpec>, keywords: Vec<KeywordSpec>) -> Result<Self, RxLabelError> {
        let mut names: HashSet<&str> = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(RxLabelError::InvalidArgument(
                    "Catalog field names must not be blank".into(),
                ));
            }
            if !names.insert(field.name.as_str()) {
                return Err(RxLabelError::InvalidArgument(format!(
                    "Duplicate catalog field \"{}\"",
                    field.name
                )));
            }
            if field.path.is_empty() || field.path.iter().any(|s| s.trim().is_empty()) {
                return Err(RxLabelError::InvalidArgument(format!(
                    "Catalog field \"{}\" has an empty path segment",
                    field.name
                )));
            }
        }

        let mut keyword_names: HashSet<&str> = HashSet::new();
        for spec in &keywords {
            if !names.contains(spec.name.as_str()) {
                return Err(RxLabelError::InvalidArgument(format!(
                    "Keywords given for unknown catalog field \"{}\"",
                    spec.name
                )));
            }
            if !keyword_names.insert(spec.name.as_str()) {
                return Err(RxLabelError::InvalidArgument(format!(
                    "Duplicate keyword set for \"{}\"",
                    spec.name
                )));
            }
        }

        Ok(Self { fields, keywords })
    }

    pub fn builtin() -> Self {
        let fields = BUILTIN_FIELDS
            .iter()
            .map(|(name, path, _)| FieldSpec::new(*name, path.split('.')))
            .collect();
        let keywords = BUILTIN_FIELDS
            .iter()
            .map(|(name, _, keywords)| KeywordSpec::new(*name, keywords.iter()))
            .collect();
        Self { fields, keywords }
    }

    /// Parses the JSON catalog format:
    /// `{"fields": [{"name": "...", "path": "a.b" | ["a", "b"], "keywords": [...]}]}`.
    pub fn from_json_str(raw: &str) -> Result<Self, RxLabelError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let mut fields = Vec::with_capacity(file.fields.len());
        let mut keywords = Vec::new();
        for entry in file.fields {
            fields.push(FieldSpec::new(
                entry.name.trim(),
                entry.path.into_segments('.'),
            ));
            if !entry.keywords.is_empty() {
                keywords.push(KeywordSpec::new(entry.name.trim(), entry.keywords));
            }
        }
        Self::new(fields, keywords)
    }

    /// Loads the catalog from `path`, else from the user config directory when
    /// a catalog file exists there, else the built-in catalog.
    pub fn load(path: Option<&Path>) -> Result<Self, RxLabelError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_catalog_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => return Ok(Self::builtin()),
            },
        };

        let raw = std::fs::read_to_string(&path).map_err(|err| {
            RxLabelError::InvalidArgument(format!(
                "Unable to read catalog file {}: {err}",
                path.display()
            ))
        })?;
        let catalog = Self::from_json_str(&raw)?;
        debug!(
            path = %path.display(),
            fields = catalog.fields.len(),
            "Loaded catalog file"
        );
        Ok(catalog)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn keywords(&self) -> &[KeywordSpec] {
        &self.keywords
    }

    pub fn keywords_for(&self, name: &str) -> Option<&KeywordSpec> {
        self.keywords.iter().find(|k| k.name == name)
    }
}

pub fn default_catalog_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rxlabel").join(CATALOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_passes_validation() {
        let builtin = Catalog::builtin();
        assert_eq!(builtin.fields().len(), 21);
        assert_eq!(builtin.keywords().len(), 21);
        let validated = Catalog::new(builtin.fields.clone(), builtin.keywords.clone())
            .expect("builtin catalog is valid");
        assert_eq!(validated, builtin);
    }

    #[test]
    fn builtin_catalog_uses_nested_openfda_paths() {
        let builtin = Catalog::builtin();
        let brand = &builtin.fields()[0];
        assert_eq!(brand.name, "Brand Name");
        assert_eq!(brand.path, vec!["openfda", "brand_name"]);
        assert_eq!(brand.dotted_path(), "openfda.brand_name");
    }

    #[test]
    fn keyword_spec_normalizes_and_matches_substrings() {
        let spec = KeywordSpec::new("Dosage", [" Dose ", "", "DOSING"]);
        assert_eq!(spec.keywords.len(), 2);
        assert!(spec.matches("what is the usual dose?"));
        assert!(spec.matches("overdose risk"));
        assert!(!spec.matches("any warnings"));
    }

    #[test]
    fn catalog_rejects_duplicate_names() {
        let err = Catalog::new(
            vec![
                FieldSpec::new("Dosage", ["a"]),
                FieldSpec::new("Dosage", ["b"]),
            ],
            Vec::new(),
        )
        .expect_err("duplicate should fail");
        assert!(err.to_string().contains("Duplicate catalog field"));
    }

    #[test]
    fn catalog_rejects_empty_paths_and_unknown_keyword_fields() {
        let err = Catalog::new(
            vec![FieldSpec::new("Dosage", Vec::<String>::new())],
            Vec::new(),
        )
        .expect_err("empty path should fail");
        assert!(matches!(err, RxLabelError::InvalidArgument(_)));

        let err = Catalog::new(
            vec![FieldSpec::new("Dosage", ["dosage_and_administration"])],
            vec![KeywordSpec::new("Warnings", ["warning"])],
        )
        .expect_err("unknown keyword field should fail");
        assert!(err.to_string().contains("unknown catalog field"));
    }

    #[test]
    fn catalog_file_accepts_dotted_and_list_paths() {
        let catalog = Catalog::from_json_str(
            r#"{"fields": [
                {"name": "Brand Name", "path": "openfda.brand_name", "keywords": ["Brand"]},
                {"name": "Boxed", "path": ["boxed_warning"]}
            ]}"#,
        )
        .expect("valid catalog");

        assert_eq!(catalog.fields()[0].path, vec!["openfda", "brand_name"]);
        assert_eq!(catalog.fields()[1].path, vec!["boxed_warning"]);
        assert_eq!(catalog.keywords().len(), 1);
        assert!(
            catalog
                .keywords_for("Brand Name")
                .is_some_and(|k| k.keywords.contains("brand"))
        );
        assert!(catalog.keywords_for("Boxed").is_none());
    }

    #[test]
    fn catalog_file_without_path_is_rejected() {
        let err = Catalog::from_json_str(r#"{"fields": [{"name": "Dosage"}]}"#)
            .expect_err("missing path should fail");
        assert!(matches!(err, RxLabelError::InvalidArgument(_)));
    }

    #[test]
    fn load_reports_missing_catalog_file() {
        let missing = std::env::temp_dir().join("rxlabel-missing-catalog-test.json");
        let err = Catalog::load(Some(&missing)).expect_err("missing file should fail");
        assert!(err.to_string().contains("Unable to read catalog file"));
    }
}
