use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::ALLOWED_HOSTS;

static STRICT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/[A-Za-z0-9\-/]+$").expect("strict path pattern compiles"));

/// Allow-list check for catalog URLs.
///
/// Only `https` URLs whose host is in the allow-list pass. In strict mode
/// the path must also be made of ASCII letters, digits, `-` and `/`.
#[derive(Debug, Clone)]
pub struct DomainValidator {
    hosts: Vec<String>,
    strict: bool,
}

impl DomainValidator {
    pub fn new<I, S>(hosts: I, strict: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
            strict,
        }
    }

    /// Validator over the built-in catalog hosts.
    pub fn catalog(strict: bool) -> Self {
        Self::new(ALLOWED_HOSTS.iter().copied(), strict)
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        match Url::parse(url.trim()) {
            Ok(parsed) => self.is_allowed_url(&parsed),
            Err(_) => false,
        }
    }

    pub fn is_allowed_url(&self, url: &Url) -> bool {
        if url.scheme() != "https" {
            return false;
        }
        if !url.username().is_empty() || url.password().is_some() || url.port().is_some() {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        if !self.hosts.iter().any(|allowed| allowed == host) {
            return false;
        }
        !self.strict || STRICT_PATH.is_match(url.path())
    }
}

impl Default for DomainValidator {
    fn default() -> Self {
        Self::catalog(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_catalog_hosts() {
        let v = DomainValidator::catalog(false);
        assert!(v.is_allowed("https://example-catalog.tld/android/whatsapp"));
        assert!(v.is_allowed("https://www.example-catalog.tld/"));
        assert!(v.is_allowed("https://WWW.Example-Catalog.tld/android"));
    }

    #[test]
    fn test_rejects_foreign_hosts_and_schemes() {
        let v = DomainValidator::catalog(false);
        assert!(!v.is_allowed("https://evil.tld/android/whatsapp"));
        assert!(!v.is_allowed("https://example-catalog.tld.evil.tld/android"));
        assert!(!v.is_allowed("https://cdn.example-catalog.tld/file.apk"));
        assert!(!v.is_allowed("http://www.example-catalog.tld/android/whatsapp"));
        assert!(!v.is_allowed("ftp://www.example-catalog.tld/android/whatsapp"));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let v = DomainValidator::default();
        for input in ["", "not a url", "https://", "://www.example-catalog.tld", "www.example-catalog.tld/android"] {
            assert!(!v.is_allowed(input), "accepted {input:?}");
        }
    }

    #[test]
    fn test_strict_mode_checks_path_shape() {
        let v = DomainValidator::catalog(true);
        assert!(v.is_allowed("https://www.example-catalog.tld/android/sample-app"));
        assert!(v.is_allowed("https://www.example-catalog.tld/android/sample-app/download"));
        assert!(!v.is_allowed("https://www.example-catalog.tld/"));
        assert!(!v.is_allowed("https://www.example-catalog.tld/android/sample_app"));
        assert!(!v.is_allowed("https://www.example-catalog.tld/android/%3Cscript%3E"));
        // Query strings are not part of the path.
        assert!(v.is_allowed("https://www.example-catalog.tld/dwn/abc-123?token=x_y"));
    }

    #[test]
    fn test_rejects_userinfo_and_ports() {
        let v = DomainValidator::default();
        for input in [
            "https://user@www.example-catalog.tld/android/sample-app",
            "https://user:pw@www.example-catalog.tld/android/sample-app",
            "https://:pw@www.example-catalog.tld/android/sample-app",
            "https://www.example-catalog.tld:8443/android/sample-app",
        ] {
            assert!(!v.is_allowed(input), "accepted {input:?}");
        }
        // The default https port is normalized away by the parser.
        assert!(v.is_allowed("https://www.example-catalog.tld:443/android/sample-app"));
    }

    #[test]
    fn test_custom_host_list() {
        let v = DomainValidator::new(["mirror.tld"], false);
        assert!(v.is_allowed("https://mirror.tld/app"));
        assert!(!v.is_allowed("https://www.example-catalog.tld/app"));
    }
}
