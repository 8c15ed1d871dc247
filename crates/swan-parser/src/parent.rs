//! Parent back-references (spec §3: "every node knows its parent").
//!
//! The tree itself is an owned, `Vec`-of-children structure (no `Rc`/
//! `RefCell`) so walking down never needs a parent pointer; this module
//! builds the reverse map once, after the fact, for the consumers spec §6
//! lists that walk *up* from a node (`getParent`, the ESLint-style
//! visitor keys). Keyed by [`Range`] rather than by a node index or
//! pointer because every node's range is already unique and stable
//! (spec invariant 1: ranges never overlap), so it doubles as an
//! identity without adding an id field to every AST struct — the same
//! "position is identity" idiom the teacher's bookmark-based
//! `tag_processor.rs` leans on, adapted from byte offsets to ranges.
//!
//! `rustc_hash::FxHashMap` stands in for `std::collections::HashMap` here
//! the way `other_examples`' `oxc_parse.rs`-adjacent tooling uses it for
//! its own span-keyed tables: `Range` is a plain pair of `usize`s with no
//! attacker-controlled input shaping its distribution, so the
//! DoS-resistant guarantees of `SipHash` buy nothing and `FxHashMap`'s
//! cheaper multiply-xor hash is a straightforward win.

use rustc_hash::FxHashMap;

use crate::ast::{XAttributeOrDirective, XAttributeValuePiece, XDocument, XNode};
use crate::location::Range;

/// Maps every node's range to its parent's range. The document itself has
/// no entry (it has no parent).
pub fn build_parent_map(doc: &XDocument) -> FxHashMap<Range, Range> {
    let mut map = FxHashMap::default();
    for child in &doc.children {
        walk_node(child, doc.range, &mut map);
    }
    map
}

fn walk_node(node: &XNode, parent: Range, map: &mut FxHashMap<Range, Range>) {
    map.insert(node.range(), parent);
    match node {
        XNode::Element(el) => {
            for attr in &el.start_tag.attributes {
                walk_attribute(attr, el.range, map);
            }
            for child in &el.children {
                walk_node(child, el.range, map);
            }
        }
        XNode::Mustache(m) => {
            map.insert(m.value.range, m.range);
        }
        XNode::Text(_) | XNode::Module(_) => {}
    }
}

fn walk_attribute(attr: &XAttributeOrDirective, parent: Range, map: &mut FxHashMap<Range, Range>) {
    let (range, pieces) = match attr {
        XAttributeOrDirective::Attribute(a) => (a.range, &a.value.pieces),
        XAttributeOrDirective::Directive(d) => (d.range, &d.value.pieces),
    };
    map.insert(range, parent);
    for piece in pieces {
        match piece {
            XAttributeValuePiece::Literal(l) => {
                map.insert(l.range, range);
            }
            XAttributeValuePiece::Mustache(m) => {
                map.insert(m.range, range);
                map.insert(m.value.range, m.range);
            }
            XAttributeValuePiece::Expression(e) => {
                map.insert(e.range, range);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tree_builder::build;

    #[test]
    fn mustache_child_points_back_to_element() {
        let doc = build("<view>{{x}}</view>", &ParseOptions::default());
        let map = build_parent_map(&doc);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        let XNode::Mustache(m) = &el.children[0] else {
            panic!("expected mustache");
        };
        assert_eq!(map.get(&m.range), Some(&el.range));
        assert_eq!(map.get(&el.range), Some(&doc.range));
    }
}
