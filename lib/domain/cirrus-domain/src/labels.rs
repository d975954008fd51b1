/// Normalizes a label value. Blank values yield `None` and must not be stored.
pub fn clean_label_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::clean_label_value;

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(clean_label_value("  my-label \n"), Some("my-label".into()));
    }

    #[test]
    fn rejects_blank_values() {
        assert_eq!(clean_label_value(""), None);
        assert_eq!(clean_label_value("   "), None);
    }
}
