//! Scalar checks shared by the handler validators

use crate::domain::{AttributePath, Problem};
use url::Url;

/// Whether `value` is a usable issuer/JWKS URL (http, https or file scheme)
pub fn is_valid_url(value: &str) -> bool {
    if value.trim().is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }

    match Url::parse(value) {
        Ok(url) => match url.scheme() {
            "http" | "https" => url.host_str().is_some_and(|h| !h.is_empty()),
            "file" => url.host_str().is_some_and(|h| !h.is_empty()) || url.path().len() > 1,
            _ => false,
        },
        Err(_) => value.strip_prefix("file://").is_some_and(|rest| !rest.is_empty()),
    }
}

pub fn has_blank(values: &[String]) -> bool {
    values.iter().any(|v| v.trim().is_empty())
}

/// A present string list must be non-empty and hold no blank members.
///
/// `blank_message` names the member kind, e.g. "scope value is empty".
pub fn check_string_list(
    path: &AttributePath,
    values: &[String],
    blank_message: &str,
) -> Option<Problem> {
    if values.is_empty() {
        Some(path.problem("value is empty"))
    } else if has_blank(values) {
        Some(path.problem(blank_message))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_https_and_file_urls() {
        assert!(is_valid_url("https://issuer.example.com"));
        assert!(is_valid_url("http://localhost:8080/.well-known/jwks.json"));
        assert!(is_valid_url("file://path/to/jwks.json"));
        assert!(is_valid_url("file:///etc/jwks.json"));
    }

    #[test]
    fn rejects_invalid_urls() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("   "));
        assert!(!is_valid_url("a t g o"));
        assert!(!is_valid_url("issuer.example.com"));
        assert!(!is_valid_url("ftp://issuer.example.com"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("file://"));
    }

    #[test]
    fn string_list_checks() {
        let path = AttributePath::new(".config.authorizations[0].requiredScopes");
        assert_eq!(
            check_string_list(&path, &[], "scope value is empty").map(|p| p.message),
            Some("value is empty".to_string())
        );
        assert_eq!(
            check_string_list(&path, &["a".into(), "".into()], "scope value is empty")
                .map(|p| p.message),
            Some("scope value is empty".to_string())
        );
        assert!(check_string_list(&path, &["a".into()], "scope value is empty").is_none());
    }
}
