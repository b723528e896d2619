use crate::entities::catalog::FieldSpec;
use crate::entities::label::{ExtractedInfo, FieldValue, LabelRecord, LabelValue};

/// Resolves every catalog field against one label record.
///
/// Each field is independent: a path that cannot be walked yields
/// `FieldValue::Unavailable` for that field only. A list at the end of a path
/// contributes its first element.
pub(crate) fn resolve(record: &LabelRecord, specs: &[FieldSpec]) -> ExtractedInfo {
    specs
        .iter()
        .map(|spec| (spec.name.clone(), resolve_field(record, &spec.path)))
        .collect()
}

fn resolve_field(record: &LabelRecord, path: &[String]) -> FieldValue {
    let Some(value) = record.lookup(path) else {
        return FieldValue::Unavailable;
    };
    let value = match value {
        LabelValue::List(items) => match items.first() {
            Some(first) => first,
            None => return FieldValue::Unavailable,
        },
        other => other,
    };
    FieldValue::Available(value.to_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::catalog::Catalog;

    fn tylenol_label() -> LabelRecord {
        LabelRecord::from_json(serde_json::json!({
            "openfda": {
                "brand_name": ["Tylenol", "Tylenol Extra Strength"],
                "generic_name": ["ACETAMINOPHEN"]
            },
            "warnings": ["Liver warning: severe liver damage may occur."],
            "dosage_and_administration": "Take 2 caplets every 6 hours.",
            "package_ndc": [],
            "how_supplied": [{"package": "100 caplets"}]
        }))
        .expect("object record")
    }

    #[test]
    fn scalar_values_resolve_verbatim() {
        let info = resolve(&tylenol_label(), Catalog::builtin().fields());
        assert_eq!(
            info.get("Dosage").and_then(FieldValue::as_str),
            Some("Take 2 caplets every 6 hours.")
        );
    }

    #[test]
    fn list_values_resolve_to_first_element() {
        let info = resolve(&tylenol_label(), Catalog::builtin().fields());
        assert_eq!(
            info.get("Brand Name").and_then(FieldValue::as_str),
            Some("Tylenol")
        );
        assert_eq!(
            info.get("Generic Name").and_then(FieldValue::as_str),
            Some("ACETAMINOPHEN")
        );
        assert_eq!(
            info.get("Warnings").and_then(FieldValue::as_str),
            Some("Liver warning: severe liver damage may occur.")
        );
    }

    #[test]
    fn nested_first_element_is_rendered_as_json_text() {
        let info = resolve(&tylenol_label(), Catalog::builtin().fields());
        assert_eq!(
            info.get("How supplied").and_then(FieldValue::as_str),
            Some(r#"{"package":"100 caplets"}"#)
        );
    }

    #[test]
    fn missing_paths_and_empty_lists_are_unavailable() {
        let info = resolve(&tylenol_label(), Catalog::builtin().fields());
        assert_eq!(info.get("Pregnancy"), Some(&FieldValue::Unavailable));
        assert_eq!(info.get("NDC"), Some(&FieldValue::Unavailable));
    }

    #[test]
    fn partial_paths_through_non_objects_are_unavailable() {
        let specs = vec![
            FieldSpec::new("Through text", ["dosage_and_administration", "text"]),
            FieldSpec::new("Through list", ["warnings", "first"]),
            FieldSpec::new("Missing parent", ["spl_unclassified", "x"]),
            FieldSpec::new("Route", ["openfda", "route"]),
        ];
        let info = resolve(&tylenol_label(), &specs);
        assert_eq!(info.len(), 4);
        assert!(info.iter().all(|(_, v)| *v == FieldValue::Unavailable));
    }

    #[test]
    fn every_catalog_field_gets_an_entry_in_order() {
        let catalog = Catalog::builtin();
        let info = resolve(&LabelRecord::default(), catalog.fields());
        let expected: Vec<String> = catalog.fields().iter().map(|f| f.name.clone()).collect();
        assert_eq!(info.names(), expected);
        assert_eq!(info.available_count(), 0);
    }

    #[test]
    fn resolve_is_idempotent() {
        let record = tylenol_label();
        let catalog = Catalog::builtin();
        assert_eq!(
            resolve(&record, catalog.fields()),
            resolve(&record, catalog.fields())
        );
    }
}
