use tracing::debug;

use crate::entities::catalog::KeywordSpec;
use crate::entities::label::{ExtractedInfo, FilteredInfo};

/// Keeps the fields whose keywords occur in the question.
///
/// Matching is case-insensitive substring containment, OR-ed over a field's
/// keywords. Fields without a keyword set never match. An empty result means
/// the question did not ask about any specific part of the label.
pub(crate) fn filter(
    info: &ExtractedInfo,
    question: &str,
    keywords: &[KeywordSpec],
) -> FilteredInfo {
    let question = question.to_lowercase();
    let filtered: FilteredInfo = info
        .iter()
        .filter(|(name, _)| {
            keywords
                .iter()
                .filter(|spec| spec.name == *name)
                .any(|spec| spec.matches(&question))
        })
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();

    debug!(
        matched = ?filtered.names(),
        "Filtered label fields by question keywords"
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::catalog::Catalog;
    use crate::entities::label::{FieldValue, LabelFields, LabelRecord};
    use crate::transform::label::resolve;

    fn full_info() -> LabelFields {
        let catalog = Catalog::builtin();
        let record = LabelRecord::from_json(serde_json::json!({
            "dosage_and_administration": ["500mg"],
            "warnings": ["liver damage"],
            "warnings_and_cautions": ["use caution in hepatic impairment"]
        }))
        .expect("object record");
        resolve(&record, catalog.fields())
    }

    #[test]
    fn dose_and_warning_question_selects_exactly_those_fields() {
        let catalog = Catalog::builtin();
        let filtered = filter(
            &full_info(),
            "What is the correct dose and are there any warnings?",
            catalog.keywords(),
        );

        assert_eq!(filtered.names(), vec!["Warnings", "Dosage"]);
        assert_eq!(
            filtered.get("Dosage").and_then(FieldValue::as_str),
            Some("500mg")
        );
        assert_eq!(
            filtered.get("Warnings").and_then(FieldValue::as_str),
            Some("liver damage")
        );
    }

    #[test]
    fn question_without_keywords_yields_empty_result() {
        let catalog = Catalog::builtin();
        let filtered = filter(&full_info(), "Tell me about Tylenol", catalog.keywords());
        assert!(filtered.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let catalog = Catalog::builtin();
        let filtered = filter(&full_info(), "DOSAGE FOR ADULTS", catalog.keywords());
        assert_eq!(filtered.names(), vec!["Dosage"]);
    }

    #[test]
    fn overlapping_keywords_match_several_fields() {
        let catalog = Catalog::builtin();
        let filtered = filter(
            &full_info(),
            "Should I use caution with this?",
            catalog.keywords(),
        );
        assert_eq!(filtered.names(), vec!["Warnings", "Precautions"]);
    }

    #[test]
    fn unavailable_fields_are_kept_when_asked_about() {
        let catalog = Catalog::builtin();
        let filtered = filter(&full_info(), "Is it safe in pregnancy?", catalog.keywords());
        assert_eq!(filtered.get("Pregnancy"), Some(&FieldValue::Unavailable));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn fields_without_keyword_sets_never_match() {
        let filtered = filter(&full_info(), "dose", &[]);
        assert!(filtered.is_empty());
    }
}
