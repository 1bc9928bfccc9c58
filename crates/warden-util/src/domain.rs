//! Hostname normalization and matching
//!
//! Every domain that enters the system (session domains, pick-list entries,
//! rule predicates, view URLs) is normalized the same way: lowercase the host
//! and strip a single leading `www.` prefix. Matching treats a rule for
//! `example.com` as covering `example.com` itself and any subdomain of it.

use url::Url;

/// Normalize a user-supplied domain to a bare hostname.
///
/// Accepts either a bare hostname (`WWW.Example.com`) or a full URL
/// (`https://www.example.com/path`); both normalize to `example.com`.
/// Inputs with no recognizable host are lowercased and trimmed as-is, so a
/// later exact-match simply never fires rather than erroring.
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();

    let host = Url::parse(trimmed)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .or_else(|| {
            // Bare hostnames are not absolute URLs; retry with a scheme.
            Url::parse(&format!("http://{trimmed}"))
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| trimmed.to_string());

    normalize_host(&host)
}

/// Normalize an already-extracted hostname.
pub fn normalize_host(host: &str) -> String {
    let lower = host.trim().trim_end_matches('.').to_ascii_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

/// Whether `host` falls under `domain`: exact match, or a subdomain of it.
///
/// `host` may be raw (it is normalized here); `domain` is expected to already
/// be normalized.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = normalize_host(host);
    host == domain || host.ends_with(&format!(".{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_full_url() {
        assert_eq!(normalize_domain("https://www.Example.com/"), "example.com");
        assert_eq!(
            normalize_domain("https://news.ycombinator.com/item?id=1"),
            "news.ycombinator.com"
        );
    }

    #[test]
    fn normalizes_bare_hostname() {
        assert_eq!(normalize_domain("WWW.Example.com"), "example.com");
        assert_eq!(normalize_domain("  youtube.com  "), "youtube.com");
    }

    #[test]
    fn strips_only_leading_www() {
        assert_eq!(normalize_domain("www.www.example.com"), "www.example.com");
        assert_eq!(normalize_host("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn match_covers_exact_and_subdomain() {
        assert!(host_matches("example.com", "example.com"));
        assert!(host_matches("www.example.com", "example.com"));
        assert!(host_matches("mail.example.com", "example.com"));
        assert!(host_matches("a.b.example.com", "example.com"));
    }

    #[test]
    fn match_rejects_lookalike_hosts() {
        assert!(!host_matches("notexample.com", "example.com"));
        assert!(!host_matches("example.com.evil.net", "example.com"));
        assert!(!host_matches("example.org", "example.com"));
    }
}
