//! Name derivation helpers
//!
//! Kubernetes object and volume names must be DNS labels:
//! `[a-z0-9]([-a-z0-9]*[a-z0-9])?`, max 63 chars.

use aws_lc_rs::digest::{digest, SHA256};

/// Maximum length of a DNS label
pub const MAX_DNS_LABEL_LEN: usize = 63;

/// Number of hex characters appended by [`unique_name`]
const HASH_SUFFIX_LEN: usize = 8;

/// Sanitize a string into a valid DNS label.
///
/// Non-alphanumeric characters become `-`, leading/trailing dashes are trimmed
/// and the result is truncated to 63 chars.
pub fn sanitize_dns_label(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = sanitized.trim_matches('-');
    truncate_label(trimmed)
}

/// Short SHA-256 hex digest of `input`.
pub fn short_hash(input: &str) -> String {
    let hash = digest(&SHA256, input.as_bytes());
    hash.as_ref()
        .iter()
        .take(HASH_SUFFIX_LEN / 2)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Derive a stable, unique object name from a path of components.
///
/// The readable part is the sanitized components joined with `-`; the suffix
/// is a hash of the full path so two paths that sanitize identically still get
/// different names. E.g. `["shop", "web"]` → `shop-web-<8 hex>`.
pub fn unique_name(components: &[&str]) -> String {
    let suffix = short_hash(&components.join("/"));
    let readable: Vec<String> = components
        .iter()
        .map(|c| sanitize_dns_label(c))
        .filter(|c| !c.is_empty())
        .collect();
    let readable = readable.join("-");

    let budget = MAX_DNS_LABEL_LEN - HASH_SUFFIX_LEN - 1;
    let readable = if readable.len() > budget {
        readable[..budget].trim_end_matches('-').to_string()
    } else {
        readable
    };

    if readable.is_empty() {
        suffix
    } else {
        format!("{}-{}", readable, suffix)
    }
}

fn truncate_label(s: &str) -> String {
    if s.len() > MAX_DNS_LABEL_LEN {
        s[..MAX_DNS_LABEL_LEN].trim_end_matches('-').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_dns_label("My_App.Config"), "my-app-config");
        assert_eq!(sanitize_dns_label("/var/cache/nginx"), "var-cache-nginx");
    }

    #[test]
    fn sanitize_truncates_to_63_chars() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_dns_label(&long).len(), MAX_DNS_LABEL_LEN);
    }

    #[test]
    fn unique_name_is_stable_and_hash_suffixed() {
        let a = unique_name(&["shop", "web"]);
        let b = unique_name(&["shop", "web"]);
        assert_eq!(a, b);
        assert!(a.starts_with("shop-web-"));
        assert_eq!(a.len(), "shop-web-".len() + HASH_SUFFIX_LEN);
    }

    #[test]
    fn unique_name_distinguishes_paths_that_sanitize_alike() {
        assert_ne!(unique_name(&["shop", "Web"]), unique_name(&["shop", "web"]));
    }

    #[test]
    fn unique_name_fits_in_a_dns_label() {
        let long = "x".repeat(80);
        let name = unique_name(&["chart", &long]);
        assert!(name.len() <= MAX_DNS_LABEL_LEN);
    }
}
