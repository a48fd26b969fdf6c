//! Syntactic checks for domains and upstream addresses.
//!
//! Pure functions: they never fail, they just say no.

use url::Host;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;
const WILDCARD_PREFIX: &str = "*.";

/// Returns `true` for `*.<suffix>` domains.
pub fn is_wildcard(domain: &str) -> bool {
    domain.starts_with(WILDCARD_PREFIX)
}

/// Validate a plain or leading-wildcard domain name.
///
/// Wildcards have their `*.` stripped and the suffix checked like any other
/// name, so `*.example.com` is valid but `*.com` and `a.*.example.com` are not.
pub fn is_valid_domain(domain: &str) -> bool {
    normalize_domain(domain).is_some()
}

/// Canonical form of a valid domain: lowercase ASCII, with internationalized
/// labels in punycode. `None` when the domain is not valid.
///
/// Two domains naming the same host normalize to the same string, so this is
/// the form route keys are stored under.
pub fn normalize_domain(domain: &str) -> Option<String> {
    match domain.strip_prefix(WILDCARD_PREFIX) {
        Some(suffix) => to_ascii_hostname(suffix).map(|s| format!("{WILDCARD_PREFIX}{s}")),
        None => to_ascii_hostname(domain),
    }
}

/// Validate a `host:port` upstream dial address. IPv6 hosts must be bracketed.
pub fn is_valid_upstream(upstream: &str) -> bool {
    let Some((host, port)) = upstream.rsplit_once(':') else {
        return false;
    };
    let port_ok = port.parse::<u16>().is_ok_and(|p| p != 0);
    let host_ok = if let Some(inner) = host.strip_prefix('[') {
        inner.strip_suffix(']').is_some_and(|ip| ip.parse::<std::net::Ipv6Addr>().is_ok())
    } else {
        !host.is_empty() && !host.contains(':') && !host.chars().any(char::is_whitespace)
    };
    host_ok && port_ok
}

fn to_ascii_hostname(name: &str) -> Option<String> {
    // The URL host parser percent-decodes, which would let an encoded dot through.
    if name.contains('%') {
        return None;
    }
    let Ok(Host::Domain(ascii)) = Host::parse(name) else {
        return None;
    };
    if ascii.len() > MAX_DOMAIN_LEN {
        return None;
    }

    let labels: Vec<&str> = ascii.split('.').collect();
    let valid = labels.len() >= 2
        && labels.iter().all(|l| is_valid_label(l))
        && labels.last().is_some_and(|tld| is_valid_tld(tld));
    valid.then_some(ascii)
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Alphabetic top-level labels of two or more characters, or punycode ones.
fn is_valid_tld(tld: &str) -> bool {
    if tld.starts_with("xn--") {
        return true;
    }
    tld.len() >= 2
        && tld.starts_with(|c: char| c.is_ascii_alphabetic())
        && tld.ends_with(|c: char| c.is_ascii_alphabetic())
}
