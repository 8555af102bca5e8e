use url::Url;

/// Path extensions that never lead to a document page
const NON_DOCUMENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".tar", ".gz", ".exe", ".msi", ".dmg", ".jpg", ".jpeg", ".png", ".gif",
    ".webp", ".svg", ".ico", ".mp4", ".webm", ".mp3", ".wav", ".flac", ".json", ".xml", ".csv",
    ".css", ".js", ".woff", ".woff2",
];

/// Path segments that mark session or commerce pages rather than documentation
const NON_DOCUMENT_SEGMENTS: &[&str] = &[
    "logout", "login", "signin", "register", "signup", "cart", "checkout", "download",
];

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use module_scout::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when both URLs address exactly the same host and port
///
/// Subdomains are different hosts: `docs.example.com` does not match
/// `example.com`.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(ha), Some(hb)) => ha == hb && a.port_or_known_default() == b.port_or_known_default(),
        _ => false,
    }
}

/// Sniffs whether a URL is likely to serve an HTML document
///
/// Judged from the path alone, before any request is made, so that images,
/// scripts, archives and account pages never consume a page-budget slot.
pub fn is_document_url(url: &Url) -> bool {
    let path = url.path().to_lowercase();

    if NON_DOCUMENT_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext))
    {
        return false;
    }

    !path
        .split('/')
        .any(|segment| NON_DOCUMENT_SEGMENTS.contains(&segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_extract_simple_domain() {
        assert_eq!(
            extract_domain(&url("https://example.com/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_with_port() {
        assert_eq!(
            extract_domain(&url("https://example.com:8080/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_mixed_case() {
        assert_eq!(
            extract_domain(&url("https://Example.COM/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_same_host_exact_only() {
        let seed = url("https://example.com/docs");
        assert!(same_host(&seed, &url("https://example.com/other")));
        assert!(same_host(&seed, &url("https://EXAMPLE.com:443/x")));
        assert!(!same_host(&seed, &url("https://docs.example.com/")));
        assert!(!same_host(&seed, &url("https://example.org/")));
        assert!(!same_host(&seed, &url("https://example.com:8443/")));
    }

    #[test]
    fn test_document_urls() {
        assert!(is_document_url(&url("https://example.com/docs/intro")));
        assert!(is_document_url(&url("https://example.com/guide.html")));
        assert!(is_document_url(&url("https://example.com/")));
    }

    #[test]
    fn test_non_document_extensions() {
        assert!(!is_document_url(&url("https://example.com/logo.PNG")));
        assert!(!is_document_url(&url("https://example.com/manual.pdf")));
        assert!(!is_document_url(&url("https://example.com/app.js")));
        assert!(!is_document_url(&url("https://example.com/styles/site.css")));
    }

    #[test]
    fn test_non_document_segments() {
        assert!(!is_document_url(&url("https://example.com/account/login")));
        assert!(!is_document_url(&url("https://example.com/cart")));
        // Only whole segments count
        assert!(is_document_url(&url("https://example.com/docs/login-flow")));
    }
}
