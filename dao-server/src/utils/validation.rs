//! Domain validation helpers

use super::{AppError, AppResult};

/// Wallet addresses compare case-insensitively; the canonical form is
/// lowercase everywhere (storage, cache keys, session values).
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Validate that a link-type content part carries an http(s) URL
pub fn validate_link(url: &str) -> AppResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(AppError::invalid(format!(
            "link content must start with http:// or https://: {}",
            url
        )))
    }
}

/// Trim, drop empties and de-duplicate a tag list, preserving order
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Tags persist on the post as one comma-joined string
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

/// Inverse of [`join_tags`]
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_deduped() {
        let raw = vec![
            " rust ".to_string(),
            "rust".to_string(),
            "".to_string(),
            "dao".to_string(),
        ];
        assert_eq!(normalize_tags(&raw), vec!["rust", "dao"]);
    }

    #[test]
    fn tag_join_roundtrip() {
        let tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(split_tags(&join_tags(&tags)), tags);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn link_prefix_enforced() {
        assert!(validate_link("https://example.com").is_ok());
        assert!(validate_link("http://example.com").is_ok());
        assert!(validate_link("ftp://example.com").is_err());
        assert!(validate_link("example.com").is_err());
    }

    #[test]
    fn addresses_compare_case_insensitively() {
        assert_eq!(normalize_address(" 0xAbCd "), "0xabcd");
    }
}
