//! Expression / for / script-module post-processors (spec §4.6).
//!
//! All three share the same shape: obtain a sub-calculator at the
//! fragment's absolute start, invoke the external `ScriptParser`, rebase
//! whatever it returns into document coordinates, and collect references.
//! Grounded on `svelte-parser`'s `oxc_parse.rs` wrap-reparse-adjust idiom
//! (`other_examples`), generalized here so the final rebase step goes
//! through `LocationCalculator` (gap-aware) rather than a flat integer
//! shift, since a fragment lifted out of the document can itself span a
//! CRLF gap.

use serde_json::Value;

use crate::ast::{Reference, ScriptNode, SwanForExpression, XExpressionBody};
use crate::errors::{ErrorCode, ParseError};
use crate::location::LocationCalculator;
use crate::references::collect_references;
use crate::script_parser::{ScriptParseError, ScriptParser};

/// Result of running one of the three processors: the parsed body, every
/// reference discovered inside it (not yet resolved against a particular
/// element's `variables` — the tree builder does that once it knows the
/// enclosing scope chain), and any errors to append to the document.
pub struct ProcessedExpression {
    pub body: XExpressionBody,
    pub references: Vec<Reference>,
    pub errors: Vec<ParseError>,
}

/// Walks an ESTree JSON value, replacing every local `start`/`end` byte
/// offset with its document-absolute counterpart (spec §4.4's
/// `fixLocation`, generalized from acting on one AST type to acting on
/// the opaque JSON the script parser returns).
fn rebase(value: &mut Value, calc: &LocationCalculator) {
    match value {
        Value::Object(map) => {
            if let Some(start) = map.get("start").and_then(|v| v.as_u64()) {
                map.insert(
                    "start".to_string(),
                    Value::from(calc.get_offset_with_gap(start as usize)),
                );
            }
            if let Some(end) = map.get("end").and_then(|v| v.as_u64()) {
                map.insert(
                    "end".to_string(),
                    Value::from(calc.get_offset_with_gap(end as usize)),
                );
            }
            for (key, v) in map.iter_mut() {
                if key == "start" || key == "end" {
                    continue;
                }
                rebase(v, calc);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                rebase(v, calc);
            }
        }
        _ => {}
    }
}

fn rebase_node(node: &mut ScriptNode, calc: &LocationCalculator) {
    rebase(&mut node.0, calc);
}

/// `collect_references` leaves every `Reference::loc` at a sentinel since
/// it runs on a script AST whose `range` may not be absolute yet; by the
/// time a reference reaches here it has already been rebased, so `range`
/// is a real document offset and `loc` can be filled in for real.
fn fix_reference_locs(references: &mut [Reference], calc: &LocationCalculator) {
    for reference in references {
        reference.loc.start = calc.get_location_at_absolute(reference.range.start);
        reference.loc.end = calc.get_location_at_absolute(reference.range.end);
    }
}

/// Promotes a script-parser error into a document `ParseError`, relocated
/// into the template's coordinate system. Spec §7: "An 'end of expression'
/// heuristic promotes any script error whose offset ≥ fragment length to
/// the message 'Unexpected end of expression.'".
fn relocate_script_error(
    err: ScriptParseError,
    fragment_len: usize,
    calc: &LocationCalculator,
) -> ParseError {
    let message = if err.offset >= fragment_len {
        "Unexpected end of expression.".to_string()
    } else {
        err.message
    };
    let abs_offset = calc.get_offset_with_gap(err.offset.min(fragment_len));
    ParseError::from_script_parser(message, abs_offset, calc.position_at(err.offset.min(fragment_len)))
}

/// `^\s*(\w+)\s*$` — a mustache payload that is nothing but a bare
/// identifier, lifted directly without invoking the script parser (spec
/// §4.6 "Fast path").
pub fn identifier_fast_path(payload: &str) -> Option<&str> {
    let trimmed = payload.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(trimmed)
    } else {
        None
    }
}

/// `^\s*(?:\w+\s*:|(["'])[\w.-]+\1\s*:)` — payload looks like the start of
/// an object literal's first key (spec §4.6 "Inline-object path").
pub fn looks_like_inline_object(payload: &str) -> bool {
    let trimmed = payload.trim_start();
    let bytes = trimmed.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    let quote = bytes[0];
    if quote == b'"' || quote == b'\'' {
        if let Some(close) = trimmed[1..].find(quote as char) {
            let after = trimmed[1 + close + 1..].trim_start();
            return after.starts_with(':');
        }
        return false;
    }
    let ident_end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    if ident_end == 0 {
        return false;
    }
    trimmed[ident_end..].trim_start().starts_with(':')
}

/// `processMustache` (spec §4.6).
///
/// `is_double` names the opener actually seen (`{{` vs `{=`): the
/// inline-object shortcut only applies "if ... the opener is `{{`" — a
/// two-way-binding `{= a:1 =}` payload that merely looks object-shaped
/// must still go through the general expression path, not be wrapped as
/// an object literal.
pub fn process_mustache(
    payload: &str,
    calc: &LocationCalculator,
    parser: &dyn ScriptParser,
    parse_expression: bool,
    is_double: bool,
) -> ProcessedExpression {
    if !parse_expression {
        return ProcessedExpression {
            body: XExpressionBody::None,
            references: Vec::new(),
            errors: Vec::new(),
        };
    }

    if let Some(name) = identifier_fast_path(payload) {
        let node = ScriptNode(serde_json::json!({
            "type": "Identifier",
            "name": name,
            "start": 0,
            "end": payload.len(),
        }));
        let mut node = node;
        rebase_node(&mut node, calc);
        let mut references = collect_references(&node, &[]);
        fix_reference_locs(&mut references, calc);
        return ProcessedExpression {
            body: XExpressionBody::Script(node),
            references,
            errors: Vec::new(),
        };
    }

    if is_double && looks_like_inline_object(payload) {
        let wrapped = format!("{{{payload}}}");
        // The wrapped string's own `{`/`}` reuse one physical brace
        // character from each mustache delimiter rather than adding new
        // ones, so an offset the parser reports against `wrapped` is one
        // byte ahead of the same position in `payload`; shift back before
        // rebasing into document coordinates.
        let rebase_calc = calc.sub_calculator_shift(-1);
        return match parser.parse_expression(&wrapped) {
            Ok(mut node) => {
                rebase_node(&mut node, &rebase_calc);
                let mut references = collect_references(&node, &[]);
                fix_reference_locs(&mut references, calc);
                ProcessedExpression {
                    body: XExpressionBody::Script(node),
                    references,
                    errors: Vec::new(),
                }
            }
            Err(err) => ProcessedExpression {
                body: XExpressionBody::None,
                references: Vec::new(),
                errors: vec![relocate_script_error(err, payload.len(), calc)],
            },
        };
    }

    // Otherwise: wrap as `0(<payload>)` and extract the sole call
    // argument. A bare `(<payload>)` wrap would let a top-level comma
    // silently parse as a `SequenceExpression`; wrapping as a call
    // instead turns it into a second `arguments` entry, which is rejected
    // below, and lets a genuine `...spread` show up as a `SpreadElement`
    // argument (spread is not valid syntax inside bare parens at all) so
    // it too can be rejected explicitly rather than relying on a parse
    // error. `0(` is two bytes, hence `sub_calculator_shift(-2)`.
    let wrapped = format!("0({payload})");
    let rebase_calc = calc.sub_calculator_shift(-2);
    match parser.parse_expression(&wrapped) {
        Ok(call) => {
            let Some(arguments) = call.get("arguments").and_then(|v| v.as_array()) else {
                return ProcessedExpression {
                    body: XExpressionBody::None,
                    references: Vec::new(),
                    errors: vec![ParseError::new(
                        ErrorCode::Unreachable,
                        "expected a call expression wrapper",
                        0,
                        calc.position_at(0),
                    )],
                };
            };
            if arguments.len() > 1 {
                let second_start = arguments[1]
                    .get("start")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as usize;
                let abs = rebase_calc.get_offset_with_gap(second_start);
                return ProcessedExpression {
                    body: XExpressionBody::None,
                    references: Vec::new(),
                    errors: vec![ParseError::new(
                        ErrorCode::XExpressionError,
                        "unexpected `,`: a mustache may hold only one expression",
                        abs,
                        rebase_calc.position_at(second_start),
                    )],
                };
            }
            let Some(first) = arguments.first() else {
                return ProcessedExpression {
                    body: XExpressionBody::None,
                    references: Vec::new(),
                    errors: vec![ParseError::new(
                        ErrorCode::XExpressionError,
                        "Unexpected end of expression.",
                        payload.len(),
                        calc.position_at(payload.len()),
                    )],
                };
            };
            if first.get("type").and_then(|v| v.as_str()) == Some("SpreadElement") {
                return ProcessedExpression {
                    body: XExpressionBody::None,
                    references: Vec::new(),
                    errors: vec![ParseError::new(
                        ErrorCode::XExpressionError,
                        "spread elements are not valid mustache expressions",
                        0,
                        calc.position_at(0),
                    )],
                };
            }
            let mut node = ScriptNode(first.clone());
            rebase_node(&mut node, &rebase_calc);
            let mut references = collect_references(&node, &[]);
            fix_reference_locs(&mut references, calc);
            ProcessedExpression {
                body: XExpressionBody::Script(node),
                references,
                errors: Vec::new(),
            }
        }
        Err(err) => ProcessedExpression {
            body: XExpressionBody::None,
            references: Vec::new(),
            errors: vec![relocate_script_error(err, payload.len(), calc)],
        },
    }
}

/// Parses a directive's literal attribute value as a plain expression
/// (spec §4.5 `processAttribute`: "parse it as an expression" — unlike
/// `processMustache`'s payload, a directive literal gets neither the
/// bare-identifier fast path nor the inline-object heuristic; both of
/// those are specific to the `{{ }}` mustache syntax).
pub fn process_plain_expression(
    payload: &str,
    calc: &LocationCalculator,
    parser: &dyn ScriptParser,
) -> ProcessedExpression {
    match parser.parse_expression(payload) {
        Ok(mut node) => {
            rebase_node(&mut node, calc);
            let mut references = collect_references(&node, &[]);
            fix_reference_locs(&mut references, calc);
            ProcessedExpression {
                body: XExpressionBody::Script(node),
                references,
                errors: Vec::new(),
            }
        }
        Err(err) => ProcessedExpression {
            body: XExpressionBody::None,
            references: Vec::new(),
            errors: vec![relocate_script_error(err, payload.len(), calc)],
        },
    }
}

/// Byte spans (local to the `s-for` payload) of each sub-expression and
/// the synthetic `in`/`trackBy` keyword runs between them. Reused both to
/// slice the sub-strings handed to the script parser and, in
/// `tree_builder.rs`, to build the synthetic `Keyword` tokens spec §4.6
/// calls for ("Emit synthetic Keyword tokens for in and trackBy that sit
/// between the parsed token runs").
pub struct ForHeaderSpans {
    pub left: (usize, usize),
    pub in_keyword: (usize, usize),
    pub right: (usize, usize),
    pub track_by_keyword: Option<(usize, usize)>,
    pub track_by: Option<(usize, usize)>,
}

/// Splits `code` on the `in`/`trackBy` keyword boundaries per spec §4.6
/// ("the more featureful variant ... supports `in` followed by
/// `trackBy`" — §9's Design Notes resolve the two competing
/// implementations the original carried in favor of this one).
pub fn split_for_header_spans(code: &str) -> ForHeaderSpans {
    let bytes = code.as_bytes();
    let mut in_idx = None;
    let mut track_by_idx = None;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            let rest = &code[i + 1..];
            if rest.starts_with("in ") || rest.starts_with("in\t") {
                if in_idx.is_none() {
                    in_idx = Some((i + 1, i + 1 + 2));
                }
            } else if rest.starts_with("trackBy ") || rest.starts_with("trackBy\t") {
                track_by_idx = Some((i + 1, i + 1 + 7));
            }
        }
        i += 1;
    }

    let (in_start, in_end) = in_idx.unwrap_or((code.len(), code.len()));
    let left = (0, in_start);

    match track_by_idx {
        Some((tb_start, tb_end)) => ForHeaderSpans {
            left,
            in_keyword: (in_start, in_end),
            right: (in_end, tb_start),
            track_by_keyword: Some((tb_start, tb_end)),
            track_by: Some((tb_end, code.len())),
        },
        None => ForHeaderSpans {
            left,
            in_keyword: (in_start, in_end),
            right: (in_end, code.len()),
            track_by_keyword: None,
            track_by: None,
        },
    }
}

/// Slices the sub-strings `process_for_expression` hands to the script
/// parser out of `split_for_header_spans`' byte spans.
fn split_for_header(code: &str) -> (String, String, Option<String>) {
    let spans = split_for_header_spans(code);
    let left = code[spans.left.0..spans.left.1].to_string();
    let right = code[spans.right.0..spans.right.1].to_string();
    let track_by = spans.track_by.map(|(s, e)| code[s..e].to_string());
    (left, right, track_by)
}

/// `processForExpression` (spec §4.6).
pub fn process_for_expression(
    payload: &str,
    calc: &LocationCalculator,
    parser: &dyn ScriptParser,
) -> ProcessedExpression {
    let (left, right, track_by) = split_for_header(payload);
    if right.trim().is_empty() {
        return ProcessedExpression {
            body: XExpressionBody::None,
            references: Vec::new(),
            errors: vec![ParseError::new(
                ErrorCode::XExpressionError,
                "s-for requires an `in` clause",
                0,
                calc.position_at(0),
            )],
        };
    }

    match parser.parse_for_header(&left, &right, track_by.as_deref()) {
        Ok(mut nodes) => {
            rebase_node(&mut nodes.left, calc);
            if let Some(index) = &mut nodes.index {
                rebase_node(index, calc);
            }
            rebase_node(&mut nodes.right, calc);
            if let Some(track_by) = &mut nodes.track_by {
                rebase_node(track_by, calc);
            }

            let mut references = collect_references(&nodes.right, &[]);
            if let Some(track_by) = &nodes.track_by {
                references.extend(collect_references(track_by, &[]));
            }
            fix_reference_locs(&mut references, calc);

            let for_expr = SwanForExpression {
                left: nodes.left,
                index: nodes.index,
                right: nodes.right,
                track_by: nodes.track_by,
                range: calc.range_and_loc(0, payload.len()).0,
                loc: calc.range_and_loc(0, payload.len()).1,
            };
            ProcessedExpression {
                body: XExpressionBody::For(for_expr),
                references,
                errors: Vec::new(),
            }
        }
        Err(err) => ProcessedExpression {
            body: XExpressionBody::None,
            references: Vec::new(),
            errors: vec![relocate_script_error(err, payload.len(), calc)],
        },
    }
}

/// `processScriptModule` (spec §4.6): parses the sole `XText` child of an
/// `<import-sjs>`/`<filter>` element as a full script program.
pub fn process_script_module(
    source: &str,
    calc: &LocationCalculator,
    parser: &dyn ScriptParser,
) -> Result<(Vec<ScriptNode>, Vec<crate::ast::Comment>, Vec<Reference>), ParseError> {
    match parser.parse_program(source) {
        Ok((mut body, mut comments)) => {
            for node in &mut body {
                rebase_node(node, calc);
            }
            for comment in &mut comments {
                let (range, loc) = calc.range_and_loc(comment.range.start, comment.range.end);
                comment.range = range;
                comment.loc = loc;
            }
            let mut references: Vec<Reference> = body
                .iter()
                .flat_map(|n| collect_references(n, &[]))
                .collect();
            fix_reference_locs(&mut references, calc);
            Ok((body, comments, references))
        }
        Err(err) => Err(relocate_script_error(err, source.len(), calc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_recognizes_bare_identifier() {
        assert_eq!(identifier_fast_path("  cond  "), Some("cond"));
        assert_eq!(identifier_fast_path("a.b"), None);
    }

    #[test]
    fn inline_object_detection() {
        assert!(looks_like_inline_object("a:1,b:2"));
        assert!(looks_like_inline_object(" 'a-b':1 "));
        assert!(!looks_like_inline_object("a + b"));
    }

    #[test]
    fn splits_for_header_with_trackby() {
        let (left, right, track_by) = split_for_header("item, idx in list trackBy item.id");
        assert_eq!(left.trim(), "item, idx");
        assert_eq!(right.trim(), "list");
        assert_eq!(track_by.unwrap().trim(), "item.id");
    }

    #[test]
    fn splits_for_header_without_trackby() {
        let (left, right, track_by) = split_for_header("item in list");
        assert_eq!(left.trim(), "item");
        assert_eq!(right.trim(), "list");
        assert!(track_by.is_none());
    }
}
