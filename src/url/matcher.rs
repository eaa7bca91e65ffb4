/// Checks if a candidate host belongs to the site rooted at `base`
///
/// Two policies are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Subdomain-inclusive: "example.com" also matches
///    - "docs.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// Suffix matching is label-aware, so "badexample.com" never matches
/// "example.com".
///
/// # Examples
///
/// ```
/// use docs_to_markdown::url::host_matches;
///
/// assert!(host_matches("example.com", "example.com", false));
/// assert!(!host_matches("example.com", "docs.example.com", false));
///
/// assert!(host_matches("example.com", "docs.example.com", true));
/// assert!(!host_matches("example.com", "badexample.com", true));
/// ```
pub fn host_matches(base: &str, candidate: &str, include_subdomains: bool) -> bool {
    if candidate.eq_ignore_ascii_case(base) {
        return true;
    }

    if !include_subdomains || candidate.len() <= base.len() {
        return false;
    }

    let candidate = candidate.to_ascii_lowercase();
    let base = base.to_ascii_lowercase();
    candidate.ends_with(&base) && candidate[..candidate.len() - base.len()].ends_with('.')
}
