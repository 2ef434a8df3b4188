//! Stratum relay URL parsing

use url::{Host, Url};

use crate::constants::{STRATUM_PREFIX, STRATUM_SCHEME};
use crate::models::{Category, Endpoint};

/// Whether the input carries the `stratum+tcp://` prefix the registry requires
pub fn has_stratum_scheme(raw: &str) -> bool {
    raw.trim().starts_with(STRATUM_PREFIX)
}

/// Parse a `stratum+tcp://host:port` URL.
///
/// Anything that does not yield a scheme match, a host and a non-zero port
/// becomes an invalid endpoint keyed by the raw input.
pub fn parse_stratum(raw: &str) -> Endpoint {
    let raw = raw.trim();

    match extract_authority(raw) {
        Some((host, port)) => Endpoint::stratum(raw, host, port),
        None => Endpoint::invalid(raw, Category::Stratum),
    }
}

fn extract_authority(raw: &str) -> Option<(String, u16)> {
    if !raw.starts_with(STRATUM_PREFIX) {
        return None;
    }

    let url = Url::parse(raw).ok()?;
    if url.scheme() != STRATUM_SCHEME {
        return None;
    }

    let host = match url.host()? {
        Host::Domain(name) => name.to_string(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    };
    if host.is_empty() {
        return None;
    }

    // Non-special schemes have no default port, so a missing port stays None
    match url.port()? {
        0 => None,
        port => Some((host, port)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_stratum_urls() {
        let cases = [
            ("stratum+tcp://10.0.0.211:5051", "10.0.0.211", 5051),
            ("stratum+tcp://ss.id.antpool.com:3333", "ss.id.antpool.com", 3333),
            ("stratum+tcp://pool.example.org:443/", "pool.example.org", 443),
            ("stratum+tcp://[::1]:3333", "::1", 3333),
        ];

        for (raw, host, port) in cases {
            let endpoint = parse_stratum(raw);
            assert!(endpoint.is_valid(), "{raw} should be valid");
            assert_eq!(endpoint.host, host);
            assert_eq!(endpoint.port, Some(port));
            assert_eq!(endpoint.key, raw);
        }
    }

    #[test]
    fn test_input_is_trimmed_before_keying() {
        let endpoint = parse_stratum("  stratum+tcp://pool:3333  ");
        assert_eq!(endpoint.key, "stratum+tcp://pool:3333");
        assert_eq!(endpoint.raw_input, "stratum+tcp://pool:3333");
    }

    #[test]
    fn test_wrong_scheme_is_invalid() {
        for raw in ["tcp://pool:3333", "stratum+ssl://pool:3333", "http://pool:3333", "pool:3333", "not-a-url"] {
            assert!(!parse_stratum(raw).is_valid(), "{raw} should be invalid");
        }
    }

    #[test]
    fn test_missing_or_bad_port_is_invalid() {
        assert!(!parse_stratum("stratum+tcp://pool").is_valid());
        assert!(!parse_stratum("stratum+tcp://pool:").is_valid());
        assert!(!parse_stratum("stratum+tcp://pool:0").is_valid());
        assert!(!parse_stratum("stratum+tcp://pool:70000").is_valid());
        assert!(!parse_stratum("stratum+tcp://pool:abc").is_valid());
    }

    #[test]
    fn test_missing_host_is_invalid() {
        assert!(!parse_stratum("stratum+tcp://").is_valid());
        assert!(!parse_stratum("stratum+tcp://:3333").is_valid());
    }

    #[test]
    fn test_scheme_check() {
        assert!(has_stratum_scheme("stratum+tcp://pool:1"));
        assert!(has_stratum_scheme("  stratum+tcp://pool:1"));
        assert!(!has_stratum_scheme("not-a-url"));
        assert!(!has_stratum_scheme("STRATUM+TCP://pool:1"));
    }
}
