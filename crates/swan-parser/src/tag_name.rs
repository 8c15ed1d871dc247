//! Tag name classification (spec §4.2's content-model sets).
//!
//! The teacher's `TagName` (`tag_processor.rs`) is a giant enum covering
//! every element HTML5 defines, because the teacher's whole job is to be a
//! conformant HTML processor. SWAN templates only ever name a handful of
//! built-in components plus whatever custom component tags userland
//! registers, so a closed enum would be the wrong shape here — this keeps
//! the teacher's match-based, no-regex style (see also `attributes.rs`'s
//! `qualified_attribute_name`) but applies it to membership tests over a
//! small fixed set rather than to renaming.

/// How the tokenizer should read a given element's content once it has
/// seen the start tag (spec §4.2, "content model").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModel {
    /// Ordinary tag soup: `<`, mustaches, and nested elements are all
    /// recognized.
    Data,
    /// Mustaches are recognized but nested tags are not (e.g. `<text>`).
    RcData,
    /// Neither mustaches nor nested tags are recognized; only the matching
    /// end tag closes the element (e.g. `<import-sjs>`, `<filter>`).
    RawText,
}

/// `SWAN_RCDATA_TAGS` (spec §6).
const RCDATA_TAGS: &[&str] = &["textarea"];
/// `SWAN_RAWTEXT_TAGS` (spec §6).
const RAWTEXT_TAGS: &[&str] = &["filter", "import-sjs"];
/// `SWAN_VOID_ELEMENT_TAGS` (spec §6). Spec's design notes permit widening
/// this to the host mini-program platform's real void set, but any
/// addition must be documented — none are added here.
const VOID_TAGS: &[&str] = &["include"];
/// `SWAN_CAN_BE_LEFT_OPEN_TAGS` (spec §6) — a reserved escape hatch with no
/// current member; kept as a named, empty table rather than special-cased
/// away so a future tag can be added without touching the tree builder.
pub const CAN_BE_LEFT_OPEN_TAGS: &[&str] = &[];

pub fn content_model_for(tag_name: &str) -> ContentModel {
    let lower = tag_name;
    if RAWTEXT_TAGS.contains(&lower) {
        ContentModel::RawText
    } else if RCDATA_TAGS.contains(&lower) {
        ContentModel::RcData
    } else {
        ContentModel::Data
    }
}

pub fn is_void(tag_name: &str) -> bool {
    VOID_TAGS.contains(&tag_name)
}

/// Lowercases a tag name per spec's ASCII-case-insensitive tag matching,
/// without touching characters outside the ASCII range (custom component
/// names can legally contain non-ASCII in SWAN, unlike HTML5 element
/// names).
pub fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rawtext_tags_are_classified() {
        assert_eq!(content_model_for("import-sjs"), ContentModel::RawText);
        assert_eq!(content_model_for("filter"), ContentModel::RawText);
    }

    #[test]
    fn textarea_is_rcdata() {
        assert_eq!(content_model_for("textarea"), ContentModel::RcData);
    }

    #[test]
    fn unknown_tag_is_data() {
        assert_eq!(content_model_for("view"), ContentModel::Data);
    }

    #[test]
    fn normalize_is_ascii_only() {
        assert_eq!(normalize("View"), "view");
    }
}
