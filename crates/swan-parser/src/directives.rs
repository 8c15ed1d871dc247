//! Directive-key grammar (spec §6): `^(s-|bind:?|catch:?|capture-bind:|capture-catch:)(\w[\w-.]+)$`.
//!
//! Grounded on `attributes.rs`'s `qualified_attribute_name` — a `match`
//! over string prefixes rather than a regex dependency — combined with
//! `svelte-parser`'s `attribute.rs` dispatch-on-leading-token idiom from
//! `other_examples` (there it branches on `{`/`...`/`@`; here it branches
//! on the longest matching directive prefix).

/// A successfully recognized directive prefix, with both the canonical
/// and as-written (`raw`) spelling — `bindtap` and `bind:tap` both yield
/// `prefix == "bind"`, but `rawPrefix` differs (spec §3: `XDirectiveKey`
/// carries both).
pub struct DirectiveKeyParts<'a> {
    pub prefix: &'a str,
    pub raw_prefix: &'a str,
    pub name: &'a str,
}

/// Ordered longest-prefix-first so `capture-bind:`/`capture-catch:` are
/// tried before the shorter `bind`/`catch` forms they would otherwise be
/// mistaken for a substring of (not actually ambiguous today since every
/// prefix anchors at the attribute name's start, but keeping the longest
/// forms first documents the intent and protects future additions).
const PREFIXES: &[(&str, &str)] = &[
    ("capture-bind:", "capture-bind"),
    ("capture-catch:", "capture-catch"),
    ("bind:", "bind"),
    ("catch:", "catch"),
    ("bind", "bind"),
    ("catch", "catch"),
    ("s-", "s-"),
];

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// `\w[\w-.]+` — at least two characters, the first a word character.
fn is_valid_rest(rest: &str) -> bool {
    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphanumeric() || first == '_') {
        return false;
    }
    let tail: Vec<char> = chars.collect();
    !tail.is_empty() && tail.iter().all(|&c| is_name_char(c))
}

pub fn parse_directive_key(raw_name: &str) -> Option<DirectiveKeyParts<'_>> {
    for (raw_prefix, prefix) in PREFIXES {
        if let Some(rest) = raw_name.strip_prefix(raw_prefix) {
            if is_valid_rest(rest) {
                return Some(DirectiveKeyParts {
                    prefix,
                    raw_prefix,
                    name: rest,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s_if_is_recognized() {
        let parts = parse_directive_key("s-if").unwrap();
        assert_eq!(parts.prefix, "s-");
        assert_eq!(parts.name, "if");
    }

    #[test]
    fn bindtap_without_colon() {
        let parts = parse_directive_key("bindtap").unwrap();
        assert_eq!(parts.prefix, "bind");
        assert_eq!(parts.name, "tap");
    }

    #[test]
    fn bind_colon_tap() {
        let parts = parse_directive_key("bind:tap").unwrap();
        assert_eq!(parts.prefix, "bind");
        assert_eq!(parts.name, "tap");
    }

    #[test]
    fn capture_bind_requires_colon() {
        assert!(parse_directive_key("capture-bindtap").is_none());
        assert!(parse_directive_key("capture-bind:tap").is_some());
    }

    #[test]
    fn plain_class_attribute_is_not_a_directive() {
        assert!(parse_directive_key("class").is_none());
    }
}
