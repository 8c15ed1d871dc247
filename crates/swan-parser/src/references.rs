//! Reference resolution (spec invariant 6, SPEC_FULL.md §5.7).
//!
//! Deliberately **not** full scope analysis — spec §1 places that out of
//! scope too ("assumed available as a function on a script AST"). This is
//! a minimal, explicitly partial free-identifier walk over the opaque
//! `serde_json::Value` script AST, sufficient to satisfy testable property
//! 5: every reference resolves to a variable if and only if an enclosing
//! `XElement` introduces it via `s-for`. A real embedder is expected to
//! substitute a proper scope analyzer behind the same `ScriptParser` seam;
//! see DESIGN.md.

use crate::ast::{Reference, ScriptNode};
use crate::location::{Loc, Position, Range};
use serde_json::Value;

/// Declarative-position keys that introduce a binding rather than a
/// reference (so `{a: 1}`'s `a` key, or a `MemberExpression`'s
/// non-computed `property`, is never treated as a free identifier).
const NON_REFERENCE_POSITIONS: &[(&str, &str)] = &[
    ("Property", "key"),
    ("MemberExpression", "property"),
    ("ObjectExpression", "key"),
];

/// Walks `node` collecting every `Identifier` that is used as a value
/// (not a declarative key, and not itself the `id` of a binding pattern),
/// then marks each one resolved if its name is in `scope_names`.
pub fn collect_references(node: &ScriptNode, scope_names: &[String]) -> Vec<Reference> {
    let mut out = Vec::new();
    walk(&node.0, None, &mut out);
    for reference in &mut out {
        reference.resolved = scope_names.iter().any(|n| n == &reference.name);
    }
    out
}

fn walk(value: &Value, parent_key: Option<(&str, &str)>, out: &mut Vec<Reference>) {
    let Value::Object(map) = value else {
        if let Value::Array(items) = value {
            for item in items {
                walk(item, parent_key, out);
            }
        }
        return;
    };

    let node_type = map.get("type").and_then(|t| t.as_str());
    if node_type == Some("Identifier") {
        let is_computed_property_key = parent_key
            .map(|(ty, key)| NON_REFERENCE_POSITIONS.contains(&(ty, key)))
            .unwrap_or(false)
            && !map
                .get("computed")
                .and_then(|c| c.as_bool())
                .unwrap_or(false);
        if !is_computed_property_key {
            if let Some(name) = map.get("name").and_then(|n| n.as_str()) {
                let (start, end) = extract_range(map);
                out.push(Reference {
                    name: name.to_string(),
                    range: Range::new(start, end),
                    // Line/column are left at the sentinel; the caller
                    // rewrites them via `LocationCalculator` once the
                    // enclosing expression's absolute offset is known,
                    // the same "fix location after the fact" step spec
                    // §4.6 applies to every script-parser result.
                    loc: Loc {
                        start: Position::new(1, 0),
                        end: Position::new(1, 0),
                    },
                    resolved: false,
                });
            }
        }
        return;
    }

    for (key, v) in map {
        if key == "type" || key == "start" || key == "end" || key == "range" || key == "loc" {
            continue;
        }
        let ty = node_type.unwrap_or("");
        walk(v, Some((ty, key.as_str())), out);
    }
}

fn extract_range(map: &serde_json::Map<String, Value>) -> (usize, usize) {
    let start = map.get("start").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    let end = map.get("end").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_identifier_is_a_reference() {
        let node = ScriptNode(json!({"type": "Identifier", "name": "cond", "start": 0, "end": 4}));
        let refs = collect_references(&node, &["cond".to_string()]);
        assert_eq!(refs.len(), 1);
        assert!(refs[0].resolved);
    }

    #[test]
    fn object_key_is_not_a_reference() {
        let node = json!({
            "type": "ObjectExpression",
            "properties": [{
                "type": "Property",
                "key": {"type": "Identifier", "name": "a", "start": 1, "end": 2},
                "value": {"type": "Literal", "value": 1, "start": 4, "end": 5},
                "computed": false,
            }]
        });
        let refs = collect_references(&ScriptNode(node), &[]);
        assert!(refs.is_empty());
    }

    #[test]
    fn unresolved_reference_is_reported_unresolved() {
        let node = ScriptNode(json!({"type": "Identifier", "name": "item", "start": 0, "end": 4}));
        let refs = collect_references(&node, &["other".to_string()]);
        assert!(!refs[0].resolved);
    }
}
