//! Tag normalisation
//!
//! Tags are matched case-insensitively, so every tag name is stored in
//! lower case. Normalisation trims whitespace, drops empty names and removes
//! duplicates while keeping the order in which tags were first given.

/// Normalise a single tag name, returning `None` for empty names
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_lowercase())
    }
}

/// Normalise a list of tag names
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        if let Some(tag) = normalize_tag(tag.as_ref()) {
            if !normalized.contains(&tag) {
                normalized.push(tag);
            }
        }
    }
    normalized
}

/// Split a comma-separated tag field into normalised tags
pub fn parse_tag_list(field: &str) -> Vec<String> {
    normalize_tags(field.split(','))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_dedupes() {
        let tags = normalize_tags(["Random", "ER", "random", " er "]);
        assert_eq!(tags, vec!["random", "er"]);
    }

    #[test]
    fn test_drops_empty_tags() {
        assert_eq!(parse_tag_list("a,, ,B"), vec!["a", "b"]);
        assert!(parse_tag_list("").is_empty());
    }

    #[test]
    fn test_preserves_first_occurrence_order() {
        assert_eq!(parse_tag_list("test, bonus, TEST"), vec!["test", "bonus"]);
    }
}
