/// Extracts the host component of an absolute URL exactly as written
///
/// The result is the authority without userinfo: host plus any port, with
/// the original letter case. It is compared byte-for-byte when deciding
/// whether a link is internal. URLs without an authority (`mailto:`, `data:`)
/// and relative references yield an empty string.
///
/// # Examples
///
/// ```
/// use sitelens::url::raw_host;
///
/// assert_eq!(raw_host("https://example.com/path"), "example.com");
/// assert_eq!(raw_host("http://127.0.0.1:8080/"), "127.0.0.1:8080");
/// assert_eq!(raw_host("https://Example.COM"), "Example.COM");
/// assert_eq!(raw_host("mailto:someone@example.com"), "");
/// ```
pub fn raw_host(input: &str) -> &str {
    let input = input.trim();

    let Some(colon) = input.find(':') else {
        return "";
    };
    let scheme = &input[..colon];
    let valid_scheme = scheme
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return "";
    }

    let Some(rest) = input[colon + 1..].strip_prefix("//") else {
        return "";
    };

    let authority = match rest.find(['/', '?', '#']) {
        Some(end) => &rest[..end],
        None => rest,
    };

    match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    }
}
