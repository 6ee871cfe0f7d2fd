/// Column name suffixes for the three public-suffix components.
pub const PSL_COLUMNS: [&str; 3] = ["_pslpfx", "_psldom", "_pslpub"];

/// Split a host name into (prefix, registrable domain, public suffix) using
/// the bundled public suffix list. Returns `None` when the name has no known
/// suffix, which callers render as empty cells.
pub fn split_domain(name: &str) -> Option<(String, String, String)> {
    let trimmed = name.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    let parsed = psl::domain(trimmed.as_bytes())?;
    // The PSL wildcard rule makes any unknown trailing label a suffix, which
    // would happily "split" bare IP addresses; only listed suffixes count.
    if !parsed.suffix().is_known() {
        return None;
    }

    let domain = std::str::from_utf8(parsed.as_bytes()).ok()?;
    let suffix = std::str::from_utf8(parsed.suffix().as_bytes()).ok()?;

    let prefix = trimmed
        .strip_suffix(domain)
        .map(|p| p.trim_end_matches('.'))
        .unwrap_or("");

    Some((prefix.to_string(), domain.to_string(), suffix.to_string()))
}

#[cfg(test)]
mod tests {
    use super::split_domain;

    #[test]
    fn splits_host_with_prefix() {
        let got = split_domain("mail.example.co.uk").expect("split");
        assert_eq!(got.0, "mail");
        assert_eq!(got.1, "example.co.uk");
        assert_eq!(got.2, "co.uk");
    }

    #[test]
    fn bare_registrable_domain_has_empty_prefix() {
        let got = split_domain("example.com").expect("split");
        assert_eq!(got.0, "");
        assert_eq!(got.1, "example.com");
        assert_eq!(got.2, "com");
    }

    #[test]
    fn empty_or_unsplittable_names_yield_none() {
        assert!(split_domain("").is_none());
        assert!(split_domain(".").is_none());
    }
}
