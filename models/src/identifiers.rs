// models/src/identifiers.rs

use uuid::Uuid;

/// Generates a fresh primary key. Every entity except `Patient` (keyed by
/// phone number) is identified by one of these.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalizes an optional client-supplied string: surrounding whitespace is
/// removed and a blank value counts as absent.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{new_id, non_blank};

    #[test]
    fn should_generate_distinct_ids() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn should_treat_blank_as_absent() {
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("  d1 ")), Some("d1".to_string()));
    }
}
