// ── Name and slug derivation ──
//
// Pure helpers shared by the tag resolver and the device reconciler.

use tracing::{debug, warn};

/// NetBox caps slugs at 100 characters.
const MAX_SLUG_LEN: usize = 100;

/// Derive a URL-safe slug from a human name: lowercase, anything outside
/// `[a-z0-9_-]` becomes `-`, runs of `-` collapse, ends are trimmed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    let slug = slug.trim_matches('-');
    slug.chars().take(MAX_SLUG_LEN).collect()
}

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `azure_subscription_url` -> `Azure Subscription Url`.
pub fn label_from_key(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compute a device display name: drop everything from the first `.`
/// (FQDN-style names), then hard-truncate to `max_len` characters.
pub fn truncate_name(name: &str, max_len: usize) -> String {
    let short = match name.split_once('.') {
        Some((head, _)) => {
            debug!(name, truncated = head, "dropped domain suffix from device name");
            head
        }
        None => name,
    };

    if short.chars().count() > max_len {
        let truncated: String = short.chars().take(max_len).collect();
        warn!(
            name,
            truncated = %truncated,
            max_len,
            "device name exceeds maximum length, truncating"
        );
        truncated
    } else {
        short.to_owned()
    }
}

/// `{base}-{n}`, with `base` shortened so the whole stays within
/// `max_len` characters. `None` when the suffix leaves no room for at
/// least one character of `base`.
pub fn suffixed_name(base: &str, n: u32, max_len: usize) -> Option<String> {
    let suffix = format!("-{n}");
    let budget = max_len.checked_sub(suffix.chars().count()).filter(|b| *b > 0)?;
    let head: String = base.chars().take(budget).collect();
    Some(format!("{head}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slugify_normalizes() {
        assert_eq!(slugify("Azure Vm"), "azure-vm");
        assert_eq!(slugify("Azure Network_Interface"), "azure-network_interface");
        assert_eq!(slugify("Azure-westeurope"), "azure-westeurope");
        assert_eq!(slugify("  Microsoft   Azure  "), "microsoft-azure");
        assert_eq!(slugify("a/b.c"), "a-b-c");
    }

    #[test]
    fn capitalize_and_labels() {
        assert_eq!(capitalize("westeurope"), "Westeurope");
        assert_eq!(capitalize("CORE"), "Core");
        assert_eq!(label_from_key("azure_subscription"), "Azure Subscription");
    }

    #[test]
    fn decimal_point_rule_applies_before_length() {
        assert_eq!(truncate_name("server01.internal.example", 10), "server01");
    }

    #[test]
    fn long_names_are_cut_to_max() {
        assert_eq!(truncate_name("a-very-long-virtual-machine", 6), "a-very");
        assert_eq!(truncate_name("short", 64), "short");
    }

    #[test]
    fn suffix_respects_length_budget() {
        assert_eq!(suffixed_name("web01", 1, 64).as_deref(), Some("web01-1"));
        assert_eq!(suffixed_name("abcdefghij", 2, 10).as_deref(), Some("abcdefgh-2"));
        assert_eq!(suffixed_name("abcdefghij", 12, 10).as_deref(), Some("abcdefg-12"));
    }

    #[test]
    fn suffix_that_does_not_fit_yields_nothing() {
        assert_eq!(suffixed_name("ab", 1, 3).as_deref(), Some("a-1"));
        assert_eq!(suffixed_name("ab", 10, 3), None);
        assert_eq!(suffixed_name("ab", 1, 2), None);
        // Longest suffix still leaves one character at the minimum length.
        assert_eq!(
            suffixed_name("web01", crate::device::MAX_NAME_SUFFIX, crate::device::MIN_NAME_LENGTH)
                .as_deref(),
            Some("w-100")
        );
    }
}
