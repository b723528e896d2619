use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StringOrVec {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrVec {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Single(value) => vec![value],
            Self::Multiple(values) => values,
        }
    }

    /// Like `into_vec`, but a single string is split on `sep` (dotted paths).
    pub fn into_segments(self, sep: char) -> Vec<String> {
        match self {
            Self::Single(value) => value.split(sep).map(str::to_string).collect(),
            other => other.into_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StringOrVec;

    #[test]
    fn string_or_vec_helpers_cover_all_shapes() {
        assert_eq!(StringOrVec::None.into_vec(), Vec::<String>::new());
        assert_eq!(StringOrVec::Single("X".into()).into_vec(), vec!["X"]);
        assert_eq!(
            StringOrVec::Multiple(vec!["A".into(), "B".into()]).into_vec(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn into_segments_splits_only_single_strings() {
        assert_eq!(
            StringOrVec::Single("openfda.brand_name".into()).into_segments('.'),
            vec!["openfda", "brand_name"]
        );
        assert_eq!(
            StringOrVec::Multiple(vec!["a.b".into()]).into_segments('.'),
            vec!["a.b"]
        );
        assert!(StringOrVec::None.into_segments('.').is_empty());
    }
}
