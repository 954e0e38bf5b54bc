//! URL syntax and host-policy checks for submitted links.

use std::borrow::Cow;
use url::{Host, Url};

/// Schemes a submitted URL may use.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// Options for [`is_valid_url`].
#[derive(Debug, Clone, Default)]
pub struct UrlConstraints {
    /// Reject candidates without an explicit `scheme://` prefix. When unset,
    /// a bare candidate is checked as if it started with `http://`.
    pub require_scheme: bool,

    /// Hosts that may not be linked to. Entries are compared
    /// case-insensitively and any `:port` suffix on an entry is ignored, so a
    /// raw `Host` header can be passed straight through.
    pub host_blacklist: Vec<String>,
}

/// Return `true` if `candidate` is an absolute http/https/ftp URL with a
/// fully-qualified domain (or IP literal) host that is not blacklisted.
pub fn is_valid_url(candidate: &str, constraints: &UrlConstraints) -> bool {
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return false;
    }

    let qualified: Cow<'_, str> = if candidate.contains("://") {
        Cow::Borrowed(candidate)
    } else if constraints.require_scheme {
        return false;
    } else {
        Cow::Owned(format!("http://{candidate}"))
    };

    let parsed = match Url::parse(&qualified) {
        Ok(url) => url,
        Err(_) => return false,
    };

    // The "://" we saw must be the one terminating the scheme, not one buried
    // in a path or query.
    let scheme = parsed.scheme();
    match qualified.get(..scheme.len() + 3) {
        Some(prefix) if prefix.eq_ignore_ascii_case(&format!("{scheme}://")) => {}
        _ => return false,
    }

    if !ALLOWED_SCHEMES.contains(&scheme) {
        return false;
    }

    let host_ok = match parsed.host() {
        Some(Host::Domain(domain)) => is_fqdn(domain),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        None => false,
    };
    if !host_ok {
        return false;
    }

    match parsed.host_str() {
        Some(host) => !is_blacklisted(host, &constraints.host_blacklist),
        None => false,
    }
}

fn is_fqdn(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    });
    if !labels_ok {
        return false;
    }

    let tld = labels[labels.len() - 1];
    tld.starts_with("xn--") || (tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic()))
}

fn is_blacklisted(host: &str, blacklist: &[String]) -> bool {
    blacklist
        .iter()
        .map(|entry| strip_port(entry.trim()))
        .filter(|entry| !entry.is_empty())
        .any(|entry| entry.eq_ignore_ascii_case(host))
}

/// `example.com:3000` -> `example.com`, `[::1]:80` -> `[::1]`.
fn strip_port(entry: &str) -> &str {
    if entry.starts_with('[') {
        return match entry.find(']') {
            Some(end) => &entry[..=end],
            None => entry,
        };
    }

    match entry.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            host
        }
        _ => entry,
    }
}
