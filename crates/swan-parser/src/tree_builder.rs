//! The tree builder (spec §4.5).
//!
//! Grounded on the teacher's element-stack idiom (`StackOfOpenElements` in
//! `html_processor.rs`) but deliberately **not** on its full HTML5
//! insertion-mode machinery (23 `InsertionMode` variants, active formatting
//! elements, the adoption agency algorithm) — spec §1's Non-goals exclude
//! "Strict HTML 5 conformance", and spec §4.5 itself describes a single
//! flat element stack with case-insensitive end-tag matching, nothing more
//! elaborate. See DESIGN.md for this simplification.
//!
//! An `XElement` only becomes a finished, owned node once its matching end
//! tag (real or fabricated at EOF) is seen — up to that point it lives as
//! an [`OpenElement`] on `stack`, which is where `s-for` scope variables
//! accumulate so a still-open ancestor's `variables` are visible to a
//! child being built right now (spec invariant 5/6).

use std::sync::Arc;

use crate::ast::{
    self, Comment, Reference, ScriptNode, SwanForExpression, Token, TokenType, XAttribute,
    XAttributeOrDirective, XAttributeValue, XAttributeValuePiece, XDirective, XDirectiveKey,
    XDocument, XElement, XEndTag, XExpression, XExpressionBody, XIdentifier, XLiteral, XModule,
    XMustache, XNode, XStartTag, XText, XVariable, XmlType,
};
use crate::directives;
use crate::errors::{sort_errors, ErrorCode, ParseError};
use crate::expression::{self, ProcessedExpression};
use crate::intermediate_tokenizer::{
    AttrPiece, AttributeRecord, EndTagRecord, IntermediateToken, IntermediateTokenizer,
    MustacheRecord, StartTagRecord, TextRecord,
};
use crate::location::{Loc, LocationCalculator, Position, Range};
use crate::options::ParseOptions;
use crate::script_parser::ScriptParser;
use crate::tag_name;
use crate::tokenizer;

/// An `XElement` still under construction: pushed when its start tag is
/// seen, popped (and turned into a real, owned [`XElement`]) when its end
/// tag is seen, an ancestor's end tag forces it closed, or the document
/// ends.
struct OpenElement {
    name: String,
    raw_name: String,
    start_tag: XStartTag,
    children: Vec<XNode>,
    variables: Vec<XVariable>,
}

impl OpenElement {
    fn has_src_attribute(&self) -> bool {
        self.start_tag.attributes.iter().any(|a| match a {
            XAttributeOrDirective::Attribute(attr) => attr.key.name == "src",
            XAttributeOrDirective::Directive(_) => false,
        })
    }
}

/// A pending range→tokens replacement (spec §4.6 step d: "rewrite the
/// tokens in `document.tokens` within the expression's range by splicing
/// in the returned script tokens"). Collected while walking the document
/// and applied once, in range order, at the very end.
struct Splice {
    target: Range,
    replacement: Vec<Token>,
}

pub struct TreeBuilder<'a> {
    source: &'a str,
    options: &'a ParseOptions,
    stack: Vec<OpenElement>,
    document_children: Vec<XNode>,
    errors: Vec<ParseError>,
    extra_comments: Vec<Comment>,
    splices: Vec<Splice>,
}

/// `parse`'s HTML/template entry point (spec §4.5 top-level driver).
pub fn build(source: &str, options: &ParseOptions) -> XDocument {
    let mut it = IntermediateTokenizer::new(source);
    let mut intermediate_errors: Vec<ParseError> = Vec::new();
    let mut builder = TreeBuilder {
        source,
        options,
        stack: Vec::new(),
        document_children: Vec::new(),
        errors: Vec::new(),
        extra_comments: Vec::new(),
        splices: Vec::new(),
    };

    while let Some(record) = it.next(&mut intermediate_errors) {
        match record {
            IntermediateToken::StartTag(st) => builder.handle_start_tag(st, &it),
            IntermediateToken::EndTag(et) => builder.handle_end_tag(et, &it),
            IntermediateToken::Text(t) => builder.handle_text(t, &it),
            IntermediateToken::Mustache(m) => builder.handle_top_level_mustache(m, &it),
        }
    }

    builder.close_all_at_eof(&it);

    let mut errors = intermediate_errors;
    errors.append(&mut builder.errors);
    sort_errors(&mut errors);

    let calc = it.calculator();
    let mut tokens = convert_tokens(it.raw_tokens(), &calc);
    apply_splices(&mut tokens, builder.splices);

    let mut comments = it.comments().to_vec();
    comments.extend(builder.extra_comments);
    comments.sort_by_key(|c| c.range.start);

    let end = source.len();
    let loc = Loc {
        start: Position::new(1, 0),
        end: calc.get_location_at_absolute(end),
    };

    XDocument {
        xml_type: if options.is_swan_template() {
            XmlType::Swan
        } else {
            XmlType::Unknown
        },
        children: builder.document_children,
        tokens,
        comments,
        errors,
        range: Range::new(0, end),
        loc,
    }
}

fn tokenizer_type_to_ast(ty: tokenizer::TokenType) -> TokenType {
    match ty {
        tokenizer::TokenType::HtmlTagOpen => TokenType::HtmlTagOpen,
        tokenizer::TokenType::HtmlEndTagOpen => TokenType::HtmlEndTagOpen,
        tokenizer::TokenType::HtmlTagClose => TokenType::HtmlTagClose,
        tokenizer::TokenType::HtmlSelfClosingTagClose => TokenType::HtmlSelfClosingTagClose,
        tokenizer::TokenType::HtmlIdentifier => TokenType::HtmlIdentifier,
        tokenizer::TokenType::HtmlAssociation => TokenType::HtmlAssociation,
        tokenizer::TokenType::HtmlQuote => TokenType::HtmlQuote,
        tokenizer::TokenType::HtmlLiteral => TokenType::HtmlLiteral,
        tokenizer::TokenType::HtmlAttrLiteral => TokenType::HtmlAttrLiteral,
        tokenizer::TokenType::HtmlComment => TokenType::HtmlComment,
        tokenizer::TokenType::HtmlText => TokenType::HtmlText,
        tokenizer::TokenType::HtmlWhitespace => TokenType::HtmlWhitespace,
        tokenizer::TokenType::HtmlRcDataText => TokenType::HtmlRcDataText,
        tokenizer::TokenType::HtmlRawText => TokenType::HtmlRawText,
        tokenizer::TokenType::XMustacheStart => TokenType::XMustacheStart,
        tokenizer::TokenType::XMustacheEnd => TokenType::XMustacheEnd,
    }
}

fn convert_tokens(raw: &[tokenizer::Token], calc: &LocationCalculator) -> Vec<Token> {
    raw.iter()
        .map(|t| {
            let (range, loc) = calc.range_and_loc_absolute(t.start, t.end);
            Token {
                token_type: tokenizer_type_to_ast(t.token_type),
                value: t.value.clone(),
                range,
                loc,
            }
        })
        .collect()
}

/// Range-keyed replace (spec §4.6 step d), applied once per collected
/// [`Splice`] in ascending `target.start` order so each splice's
/// `partition_point` search sees a vector whose untouched suffix still
/// carries the original token ranges.
fn apply_splices(tokens: &mut Vec<Token>, mut splices: Vec<Splice>) {
    splices.sort_by_key(|s| s.target.start);
    for splice in splices {
        let start_idx = tokens.partition_point(|t| t.range.start < splice.target.start);
        let mut end_idx = start_idx;
        while end_idx < tokens.len() && tokens[end_idx].range.end <= splice.target.end {
            end_idx += 1;
        }
        tokens.splice(start_idx..end_idx, splice.replacement);
    }
}

impl<'a> TreeBuilder<'a> {
    fn parser(&self) -> &dyn ScriptParser {
        let arc: &Arc<dyn ScriptParser> = &self.options.parser;
        arc.as_ref()
    }

    fn current_children_mut(&mut self) -> &mut Vec<XNode> {
        match self.stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.document_children,
        }
    }

    /// Resolves every unresolved reference against the live scope chain
    /// (spec invariant 6): nearest enclosing still-open element whose
    /// `variables` contains a matching name. Each resolved reference is
    /// also recorded once on that variable's own `references` list.
    fn resolve_references(&mut self, references: &mut [Reference]) {
        for reference in references.iter_mut() {
            for open in self.stack.iter_mut().rev() {
                if let Some(var) = open.variables.iter_mut().find(|v| v.name == reference.name) {
                    reference.resolved = true;
                    var.references.push(reference.clone());
                    break;
                }
            }
        }
    }

    fn handle_start_tag(&mut self, st: StartTagRecord, it: &IntermediateTokenizer) {
        let calc = it.calculator();
        let raw_name = st.name.clone();
        let name = tag_name::normalize(&st.name);

        if let Some(top) = self.stack.last() {
            if tag_name::CAN_BE_LEFT_OPEN_TAGS.contains(&top.name.as_str()) && top.name == name {
                self.pop_top(None, &calc);
            }
        }

        let mut variables = Vec::new();
        let mut attributes = Vec::with_capacity(st.attributes.len());
        for attr in st.attributes {
            attributes.push(self.process_attribute(attr, &calc, &mut variables));
        }

        let (tag_range, tag_loc) = calc.range_and_loc_absolute(st.range.start, st.range.end);
        let start_tag = XStartTag {
            self_closing: st.self_closing,
            attributes,
            range: tag_range,
            loc: tag_loc,
        };

        let is_void = tag_name::is_void(&name);
        if st.self_closing || is_void {
            let element = XElement {
                name,
                raw_name,
                start_tag,
                children: Vec::new(),
                end_tag: None,
                variables,
                range: tag_range,
                loc: tag_loc,
            };
            self.current_children_mut().push(XNode::Element(element));
        } else {
            self.stack.push(OpenElement {
                name,
                raw_name,
                start_tag,
                children: Vec::new(),
                variables,
            });
        }
    }

    fn handle_end_tag(&mut self, et: EndTagRecord, it: &IntermediateTokenizer) {
        let calc = it.calculator();
        let end_name = tag_name::normalize(&et.name);
        match self.stack.iter().rposition(|open| open.name == end_name) {
            Some(idx) => {
                while self.stack.len() - 1 > idx {
                    self.pop_top(None, &calc);
                }
                let (range, loc) = calc.range_and_loc_absolute(et.range.start, et.range.end);
                self.pop_top(Some(XEndTag { range, loc }), &calc);
            }
            None => {
                let pos = calc.get_location_at_absolute(et.range.start);
                self.errors.push(ParseError::new(
                    ErrorCode::XInvalidEndTag,
                    "x-invalid-end-tag",
                    et.range.start,
                    pos,
                ));
            }
        }
    }

    /// Pops `stack`'s top element, attaching `end_tag` if a real one was
    /// found. When `end_tag` is `None` the element is being force-closed
    /// (an ancestor's end tag, or EOF); `no_open_tag` then governs whether
    /// that's reported as `missing-end-tag`.
    fn pop_top(&mut self, end_tag: Option<XEndTag>, calc: &LocationCalculator) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        let start = open.start_tag.range.start;
        let children_end = open
            .children
            .last()
            .map(|c| c.range().end)
            .unwrap_or(open.start_tag.range.end);
        let end = end_tag
            .as_ref()
            .map(|e| e.range.end)
            .unwrap_or_else(|| children_end.max(open.start_tag.range.end));

        if end_tag.is_none() && self.options.no_open_tag {
            let pos = calc.get_location_at_absolute(end);
            self.errors.push(ParseError::new(
                ErrorCode::MissingEndTag,
                "missing-end-tag",
                end,
                pos,
            ));
        }

        let loc = Loc {
            start: calc.get_location_at_absolute(start),
            end: calc.get_location_at_absolute(end),
        };
        let element = XElement {
            name: open.name,
            raw_name: open.raw_name,
            start_tag: open.start_tag,
            children: open.children,
            end_tag,
            variables: open.variables,
            range: Range::new(start, end),
            loc,
        };
        self.current_children_mut().push(XNode::Element(element));
    }

    fn close_all_at_eof(&mut self, it: &IntermediateTokenizer) {
        let calc = it.calculator();
        while !self.stack.is_empty() {
            self.pop_top(None, &calc);
        }
    }

    fn handle_text(&mut self, t: TextRecord, it: &IntermediateTokenizer) {
        let calc = it.calculator();
        let (range, loc) = calc.range_and_loc_absolute(t.range.start, t.range.end);

        let is_script_module_body = self
            .stack
            .last()
            .map(|top| {
                matches!(top.name.as_str(), "import-sjs" | "filter")
                    && top.children.is_empty()
                    && !top.has_src_attribute()
            })
            .unwrap_or(false);

        if is_script_module_body {
            let payload_calc = calc.sub_calculator_after_absolute(t.range.start);
            match expression::process_script_module(&t.value, &payload_calc, self.parser()) {
                Ok((body, comments, mut references)) => {
                    self.extra_comments.extend(comments);
                    self.resolve_references(&mut references);
                    let module = XModule {
                        body,
                        references,
                        range,
                        loc,
                    };
                    self.splices.push(Splice {
                        target: range,
                        replacement: vec![Token {
                            token_type: TokenType::ScriptToken,
                            value: t.value.clone(),
                            range,
                            loc,
                        }],
                    });
                    if let Some(top) = self.stack.last_mut() {
                        top.children.push(XNode::Module(module));
                        return;
                    }
                }
                Err(err) => self.errors.push(err),
            }
        }

        self.current_children_mut()
            .push(XNode::Text(XText { value: t.value, range, loc }));
    }

    fn handle_top_level_mustache(&mut self, m: MustacheRecord, it: &IntermediateTokenizer) {
        let calc = it.calculator();
        let mustache = self.build_mustache(&m, &calc);
        self.current_children_mut().push(XNode::Mustache(mustache));
    }

    /// `processMustache` (spec §4.6), shared by top-level mustaches and
    /// mustaches interleaved inside a quoted attribute value.
    fn build_mustache(&mut self, m: &MustacheRecord, calc: &LocationCalculator) -> XMustache {
        let payload = &m.value;
        let is_double = m.start_token.value == "{{";
        let inline_object = is_double && expression::looks_like_inline_object(payload);

        let payload_calc = calc.sub_calculator_after_absolute(m.start_token.end);
        let (payload_range, payload_loc) = payload_calc.range_and_loc(0, payload.len());

        let ProcessedExpression {
            body,
            mut references,
            errors,
        } = expression::process_mustache(
            payload,
            &payload_calc,
            self.parser(),
            self.options.parse_expression,
            is_double,
        );
        self.errors.extend(errors);
        self.resolve_references(&mut references);

        let (start_range, start_loc, end_range, end_loc) = if inline_object {
            let (sr, sl) = calc.range_and_loc_absolute(m.start_token.start, m.start_token.end - 1);
            let (er, el) = calc.range_and_loc_absolute(m.end_token.start + 1, m.end_token.end);
            (sr, sl, er, el)
        } else {
            let (sr, sl) = calc.range_and_loc_absolute(m.start_token.start, m.start_token.end);
            let (er, el) = calc.range_and_loc_absolute(m.end_token.start, m.end_token.end);
            (sr, sl, er, el)
        };
        let start_value = self
            .source
            .get(start_range.start..start_range.end)
            .unwrap_or(&m.start_token.value)
            .to_string();
        let end_value = self
            .source
            .get(end_range.start..end_range.end)
            .unwrap_or(&m.end_token.value)
            .to_string();

        let start_token = Token {
            token_type: TokenType::XMustacheStart,
            value: start_value,
            range: start_range,
            loc: start_loc,
        };
        let end_token = Token {
            token_type: TokenType::XMustacheEnd,
            value: end_value,
            range: end_range,
            loc: end_loc,
        };

        let (range, loc) = calc.range_and_loc_absolute(m.range.start, m.range.end);

        if !matches!(body, XExpressionBody::None) {
            let replacement_type = if matches!(body, XExpressionBody::Script(ref node) if node.type_name() == Some("Identifier") && expression::identifier_fast_path(payload).is_some())
            {
                TokenType::Identifier
            } else {
                TokenType::ScriptToken
            };
            self.splices.push(Splice {
                target: payload_range,
                replacement: vec![Token {
                    token_type: replacement_type,
                    value: payload.clone(),
                    range: payload_range,
                    loc: payload_loc,
                }],
            });
        }

        let expr = XExpression {
            expression: body,
            references,
            range: payload_range,
            loc: payload_loc,
        };

        XMustache {
            start_token,
            end_token,
            value: expr,
            range,
            loc,
        }
    }

    /// `processAttribute` (spec §4.5): classifies the attribute key,
    /// converts literal directive values into expressions/for-headers, and
    /// promotes interleaved mustaches in place. Returns the built
    /// attribute/directive node; any `s-for` scope variables it introduces
    /// are appended to `variables` (the enclosing element's, accumulating
    /// across the start tag's attributes).
    fn process_attribute(
        &mut self,
        attr: AttributeRecord,
        calc: &LocationCalculator,
        variables: &mut Vec<XVariable>,
    ) -> XAttributeOrDirective {
        let key_text = self
            .source
            .get(attr.key.start..attr.key.end)
            .unwrap_or(&attr.key.value)
            .to_string();
        let directive_parts = directives::parse_directive_key(&key_text).map(|p| {
            (
                p.prefix.to_string(),
                p.raw_prefix.to_string(),
                p.name.to_string(),
            )
        });

        let mut pieces = Vec::with_capacity(attr.pieces.len());
        for piece in &attr.pieces {
            match piece {
                AttrPiece::Literal(tok) => {
                    let (range, loc) = calc.range_and_loc_absolute(tok.start, tok.end);
                    pieces.push(XAttributeValuePiece::Literal(XLiteral {
                        value: tok.value.clone(),
                        range,
                        loc,
                    }));
                }
                AttrPiece::Mustache(m) => {
                    let mustache = self.build_mustache(m, calc);
                    pieces.push(XAttributeValuePiece::Mustache(mustache));
                }
            }
        }

        let value_start = attr.key.end;
        let value_end = pieces
            .last()
            .map(|p| match p {
                XAttributeValuePiece::Literal(l) => l.range.end,
                XAttributeValuePiece::Mustache(m) => m.range.end,
                XAttributeValuePiece::Expression(e) => e.range.end,
            })
            .unwrap_or(value_start);
        let (value_start_abs, _) = calc.range_and_loc_absolute(value_start, value_start);
        let (value_end_abs, _) = calc.range_and_loc_absolute(value_end, value_end);
        let value_range = Range::new(value_start_abs.start, value_end_abs.start);
        let value_loc = Loc {
            start: calc.get_location_at_absolute(value_range.start),
            end: calc.get_location_at_absolute(value_range.end),
        };

        let (key_range, key_loc) = calc.range_and_loc_absolute(attr.key.start, attr.key.end);
        let (attr_range, attr_loc) = calc.range_and_loc_absolute(attr.range.start, attr.range.end);

        if let Some((prefix, raw_prefix, name)) = directive_parts {
            // A single bare literal (no mustache) gets parsed directly as
            // an expression or `for`-header (spec §4.5): "If the attribute
            // has a single XLiteral value and a non-blank trimmed string,
            // parse it as an expression".
            if let [XAttributeValuePiece::Literal(lit)] = pieces.as_slice() {
                let trimmed = lit.value.trim();
                if !trimmed.is_empty() && self.options.parse_expression {
                    let lit_range = lit.range;
                    let lit_value = lit.value.clone();
                    let payload_calc = calc.sub_calculator_after_absolute(lit_range.start);
                    let processed = if name == "for" {
                        expression::process_for_expression(&lit_value, &payload_calc, self.parser())
                    } else {
                        expression::process_plain_expression(&lit_value, &payload_calc, self.parser())
                    };
                    let ProcessedExpression {
                        body,
                        mut references,
                        errors,
                    } = processed;
                    self.errors.extend(errors);

                    if let XExpressionBody::For(ref for_expr) = body {
                        self.push_for_spans(&lit_value, lit_range, calc);
                        if let Some(name) = identifier_name(&for_expr.left) {
                            variables.push(XVariable {
                                name,
                                references: Vec::new(),
                            });
                        }
                        if let Some(index) = &for_expr.index {
                            if let Some(name) = identifier_name(index) {
                                variables.push(XVariable {
                                    name,
                                    references: Vec::new(),
                                });
                            }
                        }
                    } else if !matches!(body, XExpressionBody::None) {
                        self.splices.push(Splice {
                            target: lit_range,
                            replacement: vec![Token {
                                token_type: TokenType::ScriptToken,
                                value: lit_value,
                                range: lit_range,
                                loc: lit.loc,
                            }],
                        });
                    }

                    self.resolve_references(&mut references);
                    if !matches!(body, XExpressionBody::None) {
                        let expr = XExpression {
                            expression: body,
                            references,
                            range: lit_range,
                            loc: lit.loc,
                        };
                        pieces = vec![XAttributeValuePiece::Expression(expr)];
                    }
                }
            }

            let value = XAttributeValue {
                pieces,
                range: value_range,
                loc: value_loc,
            };
            let key = XDirectiveKey {
                prefix,
                raw_prefix,
                name: name.clone(),
                raw_name: name,
                range: key_range,
                loc: key_loc,
            };
            XAttributeOrDirective::Directive(XDirective {
                key,
                value,
                range: attr_range,
                loc: attr_loc,
            })
        } else {
            let value = XAttributeValue {
                pieces,
                range: value_range,
                loc: value_loc,
            };
            let key = XIdentifier {
                name: key_text,
                range: key_range,
                loc: key_loc,
            };
            XAttributeOrDirective::Attribute(XAttribute {
                key,
                value,
                range: attr_range,
                loc: attr_loc,
            })
        }
    }

    /// Splices the `left`/`in`/`right`/`trackBy`/`trackBy`-expr runs of an
    /// `s-for` header into the document token stream, with synthetic
    /// `Keyword` tokens standing in for `in`/`trackBy` between them (spec
    /// §4.6's "Emit synthetic Keyword tokens ... so the final token stream
    /// reads like a coherent sentence").
    fn push_for_spans(&mut self, payload: &str, payload_range: Range, calc: &LocationCalculator) {
        let spans = expression::split_for_header_spans(payload);
        let payload_calc = calc.sub_calculator_after_absolute(payload_range.start);
        let mut replacement = Vec::new();

        let mut push_script = |builder: &mut Vec<Token>, span: (usize, usize)| {
            if span.1 <= span.0 {
                return;
            }
            let (range, loc) = payload_calc.range_and_loc(span.0, span.1);
            builder.push(Token {
                token_type: TokenType::ScriptToken,
                value: payload[span.0..span.1].to_string(),
                range,
                loc,
            });
        };
        let mut push_keyword = |builder: &mut Vec<Token>, span: (usize, usize)| {
            let (range, loc) = payload_calc.range_and_loc(span.0, span.1);
            builder.push(Token {
                token_type: TokenType::Keyword,
                value: payload[span.0..span.1].to_string(),
                range,
                loc,
            });
        };

        push_script(&mut replacement, spans.left);
        push_keyword(&mut replacement, spans.in_keyword);
        push_script(&mut replacement, spans.right);
        if let Some(kw) = spans.track_by_keyword {
            push_keyword(&mut replacement, kw);
        }
        if let Some(tb) = spans.track_by {
            push_script(&mut replacement, tb);
        }

        self.splices.push(Splice {
            target: payload_range,
            replacement,
        });
    }
}

fn identifier_name(node: &ScriptNode) -> Option<String> {
    if node.type_name() == Some("Identifier") {
        node.get("name").and_then(|v| v.as_str()).map(String::from)
    } else {
        None
    }
}

#[allow(dead_code)]
fn unused_for_exhaustiveness_check(_: &SwanForExpression) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;

    fn parse(source: &str) -> XDocument {
        build(source, &ParseOptions::default())
    }

    #[test]
    fn simple_element_round_trips_range() {
        let doc = parse("<view></view>");
        assert_eq!(doc.children.len(), 1);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(el.name, "view");
        assert_eq!(el.range, Range::new(0, 13));
        assert!(el.end_tag.is_some());
    }

    #[test]
    fn mustache_directive_scenario_1() {
        let doc = parse(r#"<view s-if="{{cond}}"></view>"#);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(el.start_tag.attributes.len(), 1);
        let XAttributeOrDirective::Directive(dir) = &el.start_tag.attributes[0] else {
            panic!("expected directive");
        };
        assert_eq!(dir.key.prefix, "s-");
        assert_eq!(dir.key.name, "if");
        assert_eq!(dir.value.pieces.len(), 1);
        let XAttributeValuePiece::Mustache(m) = &dir.value.pieces[0] else {
            panic!("expected mustache piece");
        };
        match &m.value.expression {
            XExpressionBody::Script(node) => {
                assert_eq!(node.type_name(), Some("Identifier"));
                assert_eq!(node.get("name").and_then(|v| v.as_str()), Some("cond"));
            }
            _ => panic!("expected script expression"),
        }
    }

    #[test]
    fn plain_literal_directive_scenario_2() {
        let doc = parse(r#"<view s-if="cond"></view>"#);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        let XAttributeOrDirective::Directive(dir) = &el.start_tag.attributes[0] else {
            panic!("expected directive");
        };
        assert_eq!(dir.value.pieces.len(), 1);
        assert!(matches!(
            dir.value.pieces[0],
            XAttributeValuePiece::Expression(_)
        ));
    }

    #[test]
    fn parse_expression_false_keeps_literal() {
        let mut options = ParseOptions::default();
        options.parse_expression = false;
        let doc = build(r#"<view s-if="cond"></view>"#, &options);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        let XAttributeOrDirective::Directive(dir) = &el.start_tag.attributes[0] else {
            panic!("expected directive");
        };
        let XAttributeValuePiece::Literal(lit) = &dir.value.pieces[0] else {
            panic!("expected literal");
        };
        assert_eq!(lit.value, "cond");
    }

    #[test]
    fn import_sjs_body_becomes_module() {
        let doc = parse("<import-sjs module=\"module\">exports.a = 1;</import-sjs>");
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(el.children.len(), 1);
        assert!(matches!(el.children[0], XNode::Module(_)));
    }

    #[test]
    fn duplicate_attribute_reports_error() {
        let doc = parse(r#"<view class="a" class="b">Hello</view>"#);
        assert!(doc
            .errors
            .iter()
            .any(|e| e.code == Some(ErrorCode::DuplicateAttribute)));
    }

    #[test]
    fn for_directive_introduces_variables() {
        let doc = parse(r#"<view s-for="item, idx in list trackBy item.id"></view>"#);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(el.variables.len(), 2);
        assert_eq!(el.variables[0].name, "item");
        assert_eq!(el.variables[1].name, "idx");
        let XAttributeOrDirective::Directive(dir) = &el.start_tag.attributes[0] else {
            panic!("expected directive");
        };
        let XAttributeValuePiece::Expression(expr) = &dir.value.pieces[0] else {
            panic!("expected expression");
        };
        assert!(matches!(expr.expression, XExpressionBody::For(_)));
    }

    #[test]
    fn for_loop_variable_reference_resolves() {
        let doc = parse(r#"<view s-for="item in list">{{item}}</view>"#);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(el.children.len(), 1);
        let XNode::Mustache(m) = &el.children[0] else {
            panic!("expected mustache child");
        };
        assert_eq!(m.value.references.len(), 1);
        assert!(m.value.references[0].resolved);
        assert_eq!(el.variables[0].references.len(), 1);
    }

    #[test]
    fn inline_object_mustache_scenario_6() {
        let doc = parse(r#"<view style="{{a:1,b:2}}"/>"#);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        let XAttributeOrDirective::Attribute(attr) = &el.start_tag.attributes[0] else {
            panic!("expected plain attribute");
        };
        let XAttributeValuePiece::Mustache(m) = &attr.value.pieces[0] else {
            panic!("expected mustache piece");
        };
        match &m.value.expression {
            XExpressionBody::Script(node) => {
                assert_eq!(node.type_name(), Some("ObjectExpression"));
            }
            _ => panic!("expected object expression"),
        }
    }

    #[test]
    fn missing_expression_end_tag_still_returns_tree() {
        let doc = parse(r#"<view s-if="{{cond""#);
        assert!(doc
            .errors
            .iter()
            .any(|e| e.code == Some(ErrorCode::MissingExpressionEndTag)));
    }

    #[test]
    fn self_closing_void_include_has_no_end_tag() {
        let doc = parse(r#"<include src="a.swan"/>"#);
        let XNode::Element(el) = &doc.children[0] else {
            panic!("expected element");
        };
        assert!(el.end_tag.is_none());
        assert!(el.start_tag.self_closing);
    }

    #[test]
    fn unmatched_end_tag_is_reported_and_discarded() {
        let doc = parse("<view></span></view>");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.code == Some(ErrorCode::XInvalidEndTag)));
    }

    #[test]
    fn tokens_are_sorted_and_non_overlapping() {
        let doc = parse(r#"<view s-if="{{cond}}">hi {{x}}</view>"#);
        for pair in doc.tokens.windows(2) {
            assert!(pair[0].range.start <= pair[1].range.start);
            assert!(pair[0].range.end <= pair[1].range.start || pair[0].range == pair[1].range);
        }
    }
}
