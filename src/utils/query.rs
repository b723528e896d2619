/// Escapes a user-provided value for the openFDA (Lucene-like) `search` syntax.
///
/// Every Lucene special character is escaped, so a candidate taken from free
/// text (`Advil?`, `Tylenol:PM`) is always searched as a literal phrase.
pub(crate) fn escape_lucene_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | '+' | '-' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~' | '*'
            | '?' | ':' | '/' | '&' | '|' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_lucene_value;

    #[test]
    fn escapes_lucene_special_characters() {
        let escaped = escape_lucene_value(r#"Tylenol:PM (extra-strength) "caplet"\x"#);
        assert_eq!(escaped, r#"Tylenol\:PM \(extra\-strength\) \"caplet\"\\x"#);
    }

    #[test]
    fn leaves_plain_names_untouched() {
        assert_eq!(escape_lucene_value("Advil Liqui Gels"), "Advil Liqui Gels");
    }
}
