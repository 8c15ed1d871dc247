//! The opaque script-parser boundary (SPEC_FULL.md §5.7).
//!
//! Spec §1 places the expression/script parser itself out of scope ("an
//! external collaborator"); `ScriptParser` is the seam the tree builder
//! calls through. [`OxcScriptParser`] is a real, working default rather
//! than a stub, built the same way `svelte-parser`'s `oxc_parse.rs` (in
//! the retrieval pack's `other_examples`) builds its own JS/TS adapter:
//! wrap the fragment so the grammar is unambiguous, parse it as a full
//! program with `oxc_parser`, serialize the relevant sub-node to
//! `serde_json::Value` via `oxc_estree`, then shift every offset in that
//! JSON back into the caller's coordinate system.

use oxc_allocator::Allocator;
use oxc_estree::{CompactJSSerializer, ESTree};
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde_json::Value;

use crate::ast::{Comment, ScriptNode};

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptParseError {
    pub message: String,
    /// Byte offset within the fragment that was handed to the parser (not
    /// yet relocated into the document's coordinate system — the caller
    /// does that via `LocationCalculator::fixErrorLocation`).
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForHeaderNodes {
    pub left: ScriptNode,
    pub index: Option<ScriptNode>,
    pub right: ScriptNode,
    pub track_by: Option<ScriptNode>,
}

/// The external collaborator boundary (spec §1: "treat the script parser
/// as an opaque callable").
pub trait ScriptParser {
    fn parse_expression(&self, source: &str) -> Result<ScriptNode, ScriptParseError>;

    /// Parses `left in right (trackBy track_by)?`-shaped for-headers. The
    /// caller (`expression.rs::process_for_expression`) has already split
    /// `source` into its three sub-strings; this just turns `left` and
    /// `right`/`track_by` into script nodes using the same wrap-and-parse
    /// trick as `parse_expression`.
    fn parse_for_header(
        &self,
        left: &str,
        right: &str,
        track_by: Option<&str>,
    ) -> Result<ForHeaderNodes, ScriptParseError>;

    fn parse_program(&self, source: &str) -> Result<(Vec<ScriptNode>, Vec<Comment>), ScriptParseError>;
}

/// Recursively shifts every `"start"`/`"end"`/`"range"` field of an ESTree
/// JSON value by `delta`, mirroring `oxc_parse.rs`'s `adjust_offsets`.
fn adjust_offsets(value: &mut Value, delta: i64) {
    match value {
        Value::Object(map) => {
            for key in ["start", "end"] {
                if let Some(n) = map.get_mut(key).and_then(|v| v.as_i64()) {
                    map.insert(key.to_string(), Value::from((n + delta).max(0)));
                }
            }
            if let Some(Value::Array(range)) = map.get_mut("range") {
                for entry in range.iter_mut() {
                    if let Some(n) = entry.as_i64() {
                        *entry = Value::from((n + delta).max(0));
                    }
                }
            }
            for (key, v) in map.iter_mut() {
                if key == "start" || key == "end" || key == "range" {
                    continue;
                }
                adjust_offsets(v, delta);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                adjust_offsets(v, delta);
            }
        }
        _ => {}
    }
}

fn estree_to_value<T: ESTree>(node: &T) -> Result<Value, ScriptParseError> {
    let mut serializer = CompactJSSerializer::new(false);
    node.serialize(&mut serializer);
    let json_str = serializer.into_string();
    serde_json::from_str(&json_str).map_err(|e| ScriptParseError {
        message: format!("failed to deserialize script AST: {e}"),
        offset: 0,
    })
}

/// The default `ScriptParser`, backed by `oxc_parser`. Each call allocates
/// its own arena (spec §5: "no shared mutable state across parses") and
/// drops it at the end of the call.
///
/// Carries the two fields of `options::ScriptOptions` (spec §6) that have a
/// direct `oxc_parser` equivalent: `source_type` (`script`/`module`/
/// `commonjs`) picks the base grammar, and `allow_reserved` (when set)
/// skips straight to the permissive, non-strict grammar instead of trying
/// strict-module first and retrying on rejection. `ecma_version` has no
/// `oxc_parser` counterpart (it always parses the latest grammar) and
/// `range`/`loc`/`tokens`/`comments` are no-ops here — unlike espree, where
/// they're opt-in output toggles, this crate's `ScriptNode`/`Comment`
/// types always carry range and location.
#[derive(Debug, Clone, Copy)]
pub struct OxcScriptParser {
    base_source_type: SourceType,
    allow_reserved: bool,
}

impl Default for OxcScriptParser {
    fn default() -> Self {
        Self {
            base_source_type: SourceType::mjs(),
            allow_reserved: false,
        }
    }
}

impl OxcScriptParser {
    /// Builds a parser honoring `options::ScriptOptions::source_type` and
    /// `allow_reserved`.
    pub fn with_options(options: &crate::options::ScriptOptions) -> Self {
        let base_source_type = match options.source_type {
            crate::options::SourceType::Script => SourceType::default(),
            crate::options::SourceType::Module => SourceType::mjs(),
            crate::options::SourceType::CommonJs => SourceType::cjs(),
        };
        Self {
            base_source_type,
            allow_reserved: options.allow_reserved,
        }
    }
}

/// `The keyword '<x>' is reserved` (spec §4.6 "Retry on reserved keyword").
/// `oxc_parser` phrases the same rejection as "... is a reserved word" when
/// a future-reserved word (`yield`, `let`, `static`, …) shows up as an
/// identifier under the strict-module grammar `mjs()` forces; matched
/// loosely since the exact wording isn't part of any stable contract.
fn is_reserved_keyword_error(message: &str) -> bool {
    message.contains("reserved word") || message.contains("is reserved")
}

impl OxcScriptParser {
    fn parse_wrapped_as(&self, wrapper: &str, source_type: SourceType) -> Result<Value, ScriptParseError> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, wrapper, source_type).parse();
        if ret.panicked {
            return Err(ScriptParseError {
                message: "script parser panicked".to_string(),
                offset: 0,
            });
        }
        if let Some(first) = ret.errors.first() {
            return Err(ScriptParseError {
                message: first.to_string(),
                offset: 0,
            });
        }
        estree_to_value(&ret.program)
    }

    /// Parses under `base_source_type`; on a reserved-keyword rejection
    /// (unless `allow_reserved` already requested the permissive grammar
    /// up front), retries once under a sloppy, non-module grammar (the
    /// closest `oxc_parser` equivalent of "`ecmaVersion: 3, allowReserved:
    /// true, sourceType: 'script'`" — `SourceType`'s default `Script`/
    /// non-strict variant does not reserve the future-reserved words ES
    /// modules do). If the retry also fails, the original error is what
    /// gets reported.
    fn parse_wrapped(&self, wrapper: &str) -> Result<Value, ScriptParseError> {
        if self.allow_reserved {
            return self.parse_wrapped_as(wrapper, SourceType::default());
        }
        match self.parse_wrapped_as(wrapper, self.base_source_type) {
            Err(err) if is_reserved_keyword_error(&err.message) => {
                self.parse_wrapped_as(wrapper, SourceType::default()).or(Err(err))
            }
            result => result,
        }
    }

    fn parse_program_as(
        &self,
        source: &str,
        source_type: SourceType,
    ) -> Result<(Vec<ScriptNode>, Vec<Comment>), ScriptParseError> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type).parse();
        if ret.panicked {
            return Err(ScriptParseError {
                message: "script parser panicked".to_string(),
                offset: 0,
            });
        }
        if let Some(first) = ret.errors.first() {
            return Err(ScriptParseError {
                message: first.to_string(),
                offset: 0,
            });
        }
        let comments = ret
            .program
            .comments
            .iter()
            .map(|c| {
                let start = c.span.start as usize;
                let end = c.span.end as usize;
                let text = source.get(start..end).unwrap_or("").to_string();
                Comment {
                    value: text,
                    range: crate::location::Range::new(start, end),
                    loc: crate::location::Loc {
                        start: crate::location::Position::new(1, 0),
                        end: crate::location::Position::new(1, 0),
                    },
                    block: c.kind != oxc_ast::ast::CommentKind::Line,
                }
            })
            .collect();
        let program_value = estree_to_value(&ret.program)?;
        let body = program_value
            .get("body")
            .and_then(|b| b.as_array())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(ScriptNode)
            .collect();
        Ok((body, comments))
    }
}

impl ScriptParser for OxcScriptParser {
    fn parse_expression(&self, source: &str) -> Result<ScriptNode, ScriptParseError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(ScriptParseError {
                message: "Unexpected end of expression.".to_string(),
                offset: source.len(),
            });
        }
        // Wrapping as `(<expr>)` (spec's `0(<expr>)` trick uses a numeral
        // prefix to additionally disambiguate from a block statement when
        // the callsite doesn't want an enclosing CallExpression; the plain
        // paren form suffices for a bare expression fragment).
        let wrapper = format!("({trimmed})");
        let program = self.parse_wrapped(&wrapper)?;
        let mut expr = program
            .get("body")
            .and_then(|b| b.as_array())
            .and_then(|arr| arr.first())
            .and_then(|stmt| stmt.get("expression"))
            .cloned()
            .ok_or_else(|| ScriptParseError {
                message: "Unexpected end of expression.".to_string(),
                offset: source.len(),
            })?;
        // Offset 1 inside the wrapper (just past the opening paren) is
        // offset 0 of `trimmed` in the caller's fragment; the caller is
        // responsible for adding back the fragment's own start offset
        // (done via `LocationCalculator::sub_calculator_shift(-2)` for the
        // `0(...)` callers, or `-1` here).
        adjust_offsets(&mut expr, -1);
        Ok(ScriptNode(expr))
    }

    fn parse_for_header(
        &self,
        left: &str,
        right: &str,
        track_by: Option<&str>,
    ) -> Result<ForHeaderNodes, ScriptParseError> {
        // `left` may be `item` or `item, index`; wrapping as an array
        // literal lets a single parse handle both shapes (mirrors
        // `parse_pattern`'s destructuring-via-wrapper trick in
        // `oxc_parse.rs`, generalized from params to array elements).
        let left_wrapper = format!("[{}]", left.trim());
        let left_program = self.parse_wrapped(&left_wrapper)?;
        let mut elements = left_program
            .get("body")
            .and_then(|b| b.as_array())
            .and_then(|arr| arr.first())
            .and_then(|stmt| stmt.get("expression"))
            .and_then(|expr| expr.get("elements"))
            .cloned()
            .ok_or_else(|| ScriptParseError {
                message: "invalid s-for left-hand side".to_string(),
                offset: 0,
            })?;
        adjust_offsets(&mut elements, -1);
        let elements = elements.as_array().cloned().unwrap_or_default();
        let mut iter = elements.into_iter();
        let left_node = iter.next().ok_or_else(|| ScriptParseError {
            message: "s-for requires at least one bound identifier".to_string(),
            offset: 0,
        })?;
        let index_node = iter.next();

        let right_node = self.parse_expression(right)?;
        let track_by_node = track_by.map(|t| self.parse_expression(t)).transpose()?;

        Ok(ForHeaderNodes {
            left: ScriptNode(left_node),
            index: index_node.map(ScriptNode),
            right: right_node,
            track_by: track_by_node,
        })
    }

    fn parse_program(&self, source: &str) -> Result<(Vec<ScriptNode>, Vec<Comment>), ScriptParseError> {
        if self.allow_reserved {
            return self.parse_program_as(source, SourceType::default());
        }
        self.parse_program_as(source, self.base_source_type)
            .or_else(|err| {
                if is_reserved_keyword_error(&err.message) {
                    self.parse_program_as(source, SourceType::default())
                } else {
                    Err(err)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identifier_expression() {
        let parser = OxcScriptParser::default();
        let node = parser.parse_expression("cond").unwrap();
        assert_eq!(node.type_name(), Some("Identifier"));
    }

    #[test]
    fn parses_object_expression() {
        let parser = OxcScriptParser::default();
        let node = parser.parse_expression("{a:1,b:2}").unwrap();
        assert_eq!(node.type_name(), Some("ObjectExpression"));
    }

    #[test]
    fn empty_expression_is_an_error() {
        let parser = OxcScriptParser::default();
        assert!(parser.parse_expression("   ").is_err());
    }

    #[test]
    fn retries_future_reserved_word_used_as_identifier() {
        // `yield` is only a keyword inside generator bodies; as a bare
        // mustache expression it's just an identifier a mini-program
        // author might reasonably name a data field. The strict-module
        // grammar rejects it; the sloppy-script retry accepts it.
        let parser = OxcScriptParser::default();
        let node = parser.parse_expression("yield").unwrap();
        assert_eq!(node.type_name(), Some("Identifier"));
    }
}
