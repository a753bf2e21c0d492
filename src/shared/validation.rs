use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for app label, model name and field name path components.
    /// Must be a lowercase identifier, optionally with underscores.
    /// - Valid: "documents", "report_v2", "pdf"
    /// - Invalid: "Documents", "re-port", "", "a/b"
    pub static ref COMPONENT_REGEX: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();

    /// Regex for single-use access keys: exactly 32 lowercase hex characters.
    pub static ref ACCESS_KEY_REGEX: Regex = Regex::new(r"^[0-9a-f]{32}$").unwrap();
}

/// Check that a filename is a plain basename: non-empty, no separators,
/// no parent-directory references.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_regex_valid() {
        assert!(COMPONENT_REGEX.is_match("documents"));
        assert!(COMPONENT_REGEX.is_match("report_v2"));
        assert!(COMPONENT_REGEX.is_match("a"));
        assert!(COMPONENT_REGEX.is_match("invoice_pdf"));
    }

    #[test]
    fn test_component_regex_invalid() {
        assert!(!COMPONENT_REGEX.is_match("Documents")); // uppercase
        assert!(!COMPONENT_REGEX.is_match("re-port")); // hyphen
        assert!(!COMPONENT_REGEX.is_match("_report")); // leading underscore
        assert!(!COMPONENT_REGEX.is_match("2report")); // leading digit
        assert!(!COMPONENT_REGEX.is_match("")); // empty
        assert!(!COMPONENT_REGEX.is_match("a/b")); // separator
    }

    #[test]
    fn test_access_key_regex() {
        assert!(ACCESS_KEY_REGEX.is_match("0123456789abcdef0123456789abcdef"));
        assert!(!ACCESS_KEY_REGEX.is_match("0123456789ABCDEF0123456789ABCDEF")); // uppercase
        assert!(!ACCESS_KEY_REGEX.is_match("0123456789abcdef")); // too short
        assert!(!ACCESS_KEY_REGEX.is_match("0123456789abcdef0123456789abcdef00")); // too long
        assert!(!ACCESS_KEY_REGEX.is_match("g123456789abcdef0123456789abcdef")); // non-hex
    }

    #[test]
    fn test_is_safe_filename() {
        assert!(is_safe_filename("report.pdf"));
        assert!(is_safe_filename("scan (1).png"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("."));
        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename("a/b.pdf"));
        assert!(!is_safe_filename("..\\b.pdf"));
    }
}
