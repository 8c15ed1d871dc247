//! Universal-property tests (spec §8's six properties), driven by
//! `quickcheck` the way the teacher's dev-dependencies already anticipate
//! (`quickcheck`/`quickcheck_macros` sit in
//! `wp-html-api`'s `Cargo.toml` unused by its own test suite; this crate
//! is the first to put them to work). Fragments are generated from a
//! small, bounded SWAN-flavored grammar rather than arbitrary byte soup:
//! the pipeline's own recover-and-continue policy (spec §7) means it
//! never panics on malformed input, so an unconstrained `String` would
//! mostly just exercise error recovery paths already covered by
//! `src/tree_builder.rs`'s unit tests. Biasing the generator toward
//! well-formed-ish markup instead targets the properties that actually
//! depend on successful structure: nesting, range containment, and
//! reference resolution.

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

use swan_parser::ast::{XDocument, XNode};
use swan_parser::options::ParseOptions;
use swan_parser::parse;

const TAGS: &[&str] = &["view", "text", "block"];
const IDENTS: &[&str] = &["a", "b", "foo", "bar", "cond"];

#[derive(Debug, Clone)]
struct Fragment(String);

impl Arbitrary for Fragment {
    fn arbitrary(g: &mut Gen) -> Self {
        Fragment(build_nodes(g, 3))
    }
}

fn build_nodes(g: &mut Gen, depth: u32) -> String {
    let count = (u8::arbitrary(g) % 4) as usize;
    let mut out = String::new();
    for _ in 0..count {
        out.push_str(&build_node(g, depth));
    }
    out
}

fn build_node(g: &mut Gen, depth: u32) -> String {
    match u8::arbitrary(g) % 3 {
        0 => {
            let word = *g.choose(IDENTS).unwrap();
            // Sometimes include an embedded line terminator so
            // `crlf_round_trip_preserves_shape` has something to collapse.
            if bool::arbitrary(g) {
                format!("hello {word}\nworld ")
            } else {
                format!("hello {word} ")
            }
        }
        1 => {
            let ident = *g.choose(IDENTS).unwrap();
            format!("{{{{ {ident} }}}}")
        }
        _ => {
            if depth == 0 {
                "leaf ".to_string()
            } else {
                let tag = *g.choose(TAGS).unwrap();
                let inner = build_nodes(g, depth - 1);
                format!("<{tag}>{inner}</{tag}>")
            }
        }
    }
}

/// A structural descriptor that ignores every offset/position field —
/// used to compare two parses of "the same" document modulo line-ending
/// representation.
fn shape(nodes: &[XNode]) -> Vec<String> {
    nodes
        .iter()
        .map(|n| match n {
            XNode::Element(el) => format!("el:{}[{}]", el.name, shape(&el.children).join(",")),
            XNode::Text(t) => format!("text:{}", t.value.replace("\r\n", "\n")),
            XNode::Mustache(_) => "mustache".to_string(),
            XNode::Module(_) => "module".to_string(),
        })
        .collect()
}

/// Every node's range is a valid, non-empty-or-zero-width-as-appropriate
/// sub-range of the document text, and every child's range is contained
/// within its parent's (spec invariant 1: ranges never overlap and nest
/// correctly).
fn check_nesting(nodes: &[XNode], bound: swan_parser::location::Range, text_len: usize) {
    for node in nodes {
        let range = node.range();
        assert!(range.start <= range.end);
        assert!(range.end <= text_len);
        assert!(range.start >= bound.start && range.end <= bound.end);
        if let XNode::Element(el) = node {
            check_nesting(&el.children, range, text_len);
        }
    }
}

#[quickcheck]
fn structural_integrity_holds(fragment: Fragment) -> bool {
    let doc = parse(&fragment.0, ParseOptions::default());
    check_nesting(&doc.children, doc.range, fragment.0.len());
    true
}

/// Tokens are emitted in non-decreasing document order (spec §8 property:
/// "tokens are sorted and non-overlapping").
#[quickcheck]
fn tokens_are_sorted(fragment: Fragment) -> bool {
    let doc = parse(&fragment.0, ParseOptions::default());
    doc.tokens
        .windows(2)
        .all(|w| w[0].range.start <= w[1].range.start)
}

/// Comments are emitted in non-decreasing document order.
#[quickcheck]
fn comments_are_sorted(fragment: Fragment) -> bool {
    let doc = parse(&fragment.0, ParseOptions::default());
    doc.comments
        .windows(2)
        .all(|w| w[0].range.start <= w[1].range.start)
}

/// `XDocument::errors` is already sorted by offset on return — spec §8
/// property 6 — independent of `sort_errors` being called again.
#[quickcheck]
fn errors_are_already_sorted(fragment: Fragment) -> bool {
    let doc = parse(&fragment.0, ParseOptions::default());
    let mut resorted = doc.errors.clone();
    swan_parser::errors::sort_errors(&mut resorted);
    resorted.iter().map(|e| e.index).collect::<Vec<_>>()
        == doc.errors.iter().map(|e| e.index).collect::<Vec<_>>()
}

/// Parsing is a pure function of its input: the same text parses to an
/// identical `XDocument` every time (spec §8 property: idempotence of
/// reparse).
#[quickcheck]
fn reparse_is_idempotent(fragment: Fragment) -> bool {
    let a = parse(&fragment.0, ParseOptions::default());
    let b = parse(&fragment.0, ParseOptions::default());
    a == b
}

/// Collapsing every embedded `\n` to `\r\n` must not change the parsed
/// tree's shape — only the absolute offsets the gap table then rebases
/// (spec §4.1/§4.4, testable as CRLF invariance).
#[quickcheck]
fn crlf_round_trip_preserves_shape(fragment: Fragment) -> bool {
    let lf = fragment.0;
    let crlf = lf.replace('\n', "\r\n");
    let doc_lf = parse(&lf, ParseOptions::default());
    let doc_crlf = parse(&crlf, ParseOptions::default());
    shape(&doc_lf.children) == shape(&doc_crlf.children)
}

/// Every reference inside an `s-for` scope's descendant mustaches resolves
/// to that scope's variable, and nothing outside the scope does (spec
/// invariant 6 / testable property 5), checked directly against a fixed
/// document rather than the generator above.
#[test]
fn for_scope_reference_resolution_is_precise() {
    let doc: XDocument = parse(
        r#"<view s-for="item in list">{{item}}{{other}}</view>"#,
        ParseOptions::default(),
    );
    let XNode::Element(el) = &doc.children[0] else {
        panic!("expected element");
    };
    let XNode::Mustache(in_scope) = &el.children[0] else {
        panic!("expected mustache");
    };
    let XNode::Mustache(out_of_scope) = &el.children[1] else {
        panic!("expected mustache");
    };
    assert!(in_scope.value.references[0].resolved);
    assert!(!out_of_scope.value.references[0].resolved);
}
