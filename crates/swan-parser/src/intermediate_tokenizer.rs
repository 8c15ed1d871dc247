//! The intermediate tokenizer (spec §4.3).
//!
//! New relative to the teacher — `wp-html-api` has no merging layer; PHP
//! consumers re-derive start/end/text grouping from bookmarks on demand
//! (`tag_processor.rs`'s `get_attribute_names_with_prefix` and friends).
//! This crate needs a retained, coarser record stream because the tree
//! builder (§4.5) and the directive/expression post-processors (§4.6)
//! operate on whole attributes and whole mustaches, not individual
//! low-level tokens. Shaped on the teacher's element-stack /
//! `HTMLToken`-accumulation idiom for the outer driving loop, and on
//! `svelte-parser`'s `AttributeSequenceValue` idea (an attribute value as
//! an interleaved sequence of literal and expression pieces) for
//! `AttributeRecord::pieces`.
//!
//! Tokens from `tokenizer.rs` carry only raw `start`/`end` byte offsets
//! (no line/column): the tokenizer runs before the document's full
//! `gaps`/`line_terminators` tables exist, so it can't resolve positions
//! itself. Positions are resolved here (and in `tree_builder.rs`) via
//! `LocationCalculator::get_location_at_absolute`, which only needs the
//! tables to be complete up to the offset being queried — always true for
//! an offset the tokenizer itself just produced.

use crate::ast::Comment;
use crate::errors::{ErrorCode, ParseError};
use crate::location::{LocationCalculator, Range};
use crate::tokenizer::{Token, TokenType, Tokenizer};

#[derive(Debug, Clone, PartialEq)]
pub enum AttrPiece {
    Literal(Token),
    Mustache(MustacheRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    pub key: Token,
    pub pieces: Vec<AttrPiece>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartTagRecord {
    pub name: String,
    pub name_range: Range,
    pub self_closing: bool,
    pub attributes: Vec<AttributeRecord>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndTagRecord {
    pub name: String,
    pub name_range: Range,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRecord {
    pub value: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MustacheRecord {
    pub start_token: Token,
    pub end_token: Token,
    pub value: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntermediateToken {
    StartTag(StartTagRecord),
    EndTag(EndTagRecord),
    Text(TextRecord),
    Mustache(MustacheRecord),
}

enum PendingTag {
    Start {
        name: String,
        name_range: Range,
        start: usize,
        attributes: Vec<AttributeRecord>,
    },
    End {
        name: String,
        name_range: Range,
        start: usize,
    },
}

enum AttrValueState {
    None,
    WaitingForValue,
    Quoted(char),
    Unquoted,
}

pub struct IntermediateTokenizer<'a> {
    tokenizer: Tokenizer<'a>,
    pending_tag: Option<PendingTag>,
    current_attr_key: Option<Token>,
    attr_value_state: AttrValueState,
    current_attr_pieces: Vec<AttrPiece>,
    attr_names_seen: Vec<String>,
    mustache_start: Option<Token>,
    mustache_buffer: String,
    mustache_buffer_range: Option<Range>,
    text_buffer: String,
    text_buffer_range: Option<Range>,
    /// A token already pulled from the tokenizer that needs to be
    /// re-matched on the next call to [`next`](Self::next) — used when a
    /// buffered text/mustache run must be flushed before this token can be
    /// handled, so the token itself must not be dropped.
    reprocess: Option<Token>,
    pub comments: Vec<Comment>,
    /// Every low-level token seen so far, in order — kept alongside the
    /// merged records above so `tree_builder.rs` can assemble
    /// `XDocument::tokens` (spec §3) without the tokenizer itself having to
    /// know about that coarser shape.
    pub raw_tokens: Vec<Token>,
}

impl<'a> IntermediateTokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            pending_tag: None,
            current_attr_key: None,
            attr_value_state: AttrValueState::None,
            current_attr_pieces: Vec::new(),
            attr_names_seen: Vec::new(),
            mustache_start: None,
            mustache_buffer: String::new(),
            mustache_buffer_range: None,
            text_buffer: String::new(),
            text_buffer_range: None,
            reprocess: None,
            comments: Vec::new(),
            raw_tokens: Vec::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.tokenizer.source()
    }

    pub fn gaps(&self) -> &[usize] {
        self.tokenizer.gaps()
    }

    pub fn line_terminators(&self) -> &[usize] {
        self.tokenizer.line_terminators()
    }

    /// A [`LocationCalculator`] over everything the reader has recorded so
    /// far. Safe to build at any point: every offset this crate ever feeds
    /// it (a just-emitted token's own range, or a fragment already fully
    /// consumed by the tokenizer) is `<=` the current reader position, and
    /// `gaps`/`line_terminators` only need to be complete up to the offset
    /// being queried, not up to the end of the document.
    pub fn calculator(&self) -> LocationCalculator<'_> {
        LocationCalculator::new(self.gaps(), self.line_terminators())
    }

    /// Every low-level token emitted so far, in order — used by
    /// `tree_builder.rs` to assemble `XDocument::tokens`.
    pub fn raw_tokens(&self) -> &[Token] {
        &self.raw_tokens
    }

    /// Every comment token collected so far.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    fn flush_text(&mut self) -> Option<IntermediateToken> {
        if self.text_buffer.is_empty() {
            return None;
        }
        let range = self.text_buffer_range.take().unwrap();
        let value = std::mem::take(&mut self.text_buffer);
        Some(IntermediateToken::Text(TextRecord { value, range }))
    }

    fn append_text(&mut self, token: &Token) {
        self.text_buffer.push_str(&token.value);
        self.text_buffer_range = Some(match self.text_buffer_range {
            Some(r) => Range::new(r.start, token.end),
            None => Range::new(token.start, token.end),
        });
    }

    fn finish_attribute(&mut self) {
        if let Some(key) = self.current_attr_key.take() {
            let pieces = std::mem::take(&mut self.current_attr_pieces);
            let end = pieces
                .last()
                .map(|p| match p {
                    AttrPiece::Literal(t) => t.end,
                    AttrPiece::Mustache(m) => m.range.end,
                })
                .unwrap_or(key.end);
            let record = AttributeRecord {
                range: Range::new(key.start, end),
                key,
                pieces,
            };
            if let Some(PendingTag::Start { attributes, .. }) = &mut self.pending_tag {
                attributes.push(record);
            }
        }
        self.attr_value_state = AttrValueState::None;
    }

    /// Drives the underlying tokenizer until a coarser record is ready,
    /// reporting tokenizer-level errors (duplicate attributes,
    /// unterminated mustaches) into `errors` as it goes.
    pub fn next(&mut self, errors: &mut Vec<ParseError>) -> Option<IntermediateToken> {
        loop {
            let token = if let Some(t) = self.reprocess.take() {
                t
            } else {
                let Some(t) = self.tokenizer.next_token(errors) else {
                    if let Some(flushed) = self.flush_text() {
                        return Some(flushed);
                    }
                    if let Some(start) = self.mustache_start.take() {
                        let calc = self.calculator();
                        let pos = calc.get_location_at_absolute(start.start);
                        errors.push(ParseError::new(
                            ErrorCode::MissingExpressionEndTag,
                            "missing-expression-end-tag",
                            start.start,
                            pos,
                        ));
                        let range = self
                            .mustache_buffer_range
                            .unwrap_or(Range::new(start.start, start.end));
                        let value = std::mem::take(&mut self.mustache_buffer);
                        return Some(IntermediateToken::Text(TextRecord { value, range }));
                    }
                    return None;
                };
                self.raw_tokens.push(t.clone());
                t
            };

            match token.token_type {
                TokenType::HtmlComment => {
                    let calc = self.calculator();
                    let (range, loc) = calc.range_and_loc_absolute(token.start, token.end);
                    self.comments.push(Comment {
                        value: token.value.clone(),
                        range,
                        loc,
                        block: true,
                    });
                    continue;
                }

                TokenType::HtmlTagOpen => {
                    if let Some(flushed) = self.flush_text() {
                        self.reprocess = Some(token);
                        return Some(flushed);
                    }
                    self.pending_tag = Some(PendingTag::Start {
                        name: String::new(),
                        name_range: Range::new(token.start, token.start),
                        start: token.start,
                        attributes: Vec::new(),
                    });
                    self.attr_names_seen.clear();
                    continue;
                }

                TokenType::HtmlEndTagOpen => {
                    if let Some(flushed) = self.flush_text() {
                        self.reprocess = Some(token);
                        return Some(flushed);
                    }
                    let inline_name = token.value.strip_prefix('/').unwrap_or("");
                    self.pending_tag = Some(PendingTag::End {
                        name: inline_name.to_string(),
                        name_range: Range::new(token.start, token.start),
                        start: token.start,
                    });
                    continue;
                }

                TokenType::HtmlIdentifier => {
                    match &mut self.pending_tag {
                        Some(PendingTag::Start { name, name_range, .. }) if name.is_empty() => {
                            *name = token.value.clone();
                            *name_range = Range::new(token.start, token.end);
                        }
                        Some(PendingTag::End { name, name_range, .. }) if name.is_empty() => {
                            *name = token.value.clone();
                            *name_range = Range::new(token.start, token.end);
                        }
                        Some(PendingTag::Start { .. }) => {
                            self.finish_attribute();
                            if self.attr_names_seen.contains(&token.value) {
                                let calc = self.calculator();
                                let pos = calc.get_location_at_absolute(token.start);
                                errors.push(ParseError::new(
                                    ErrorCode::DuplicateAttribute,
                                    "duplicate-attribute",
                                    token.start,
                                    pos,
                                ));
                            } else {
                                self.attr_names_seen.push(token.value.clone());
                            }
                            self.current_attr_key = Some(token);
                            self.attr_value_state = AttrValueState::None;
                        }
                        _ => {}
                    }
                    continue;
                }

                TokenType::HtmlAssociation => {
                    self.attr_value_state = AttrValueState::WaitingForValue;
                    continue;
                }

                TokenType::HtmlQuote => {
                    let quote = token.value.chars().next().unwrap_or('"');
                    match self.attr_value_state {
                        AttrValueState::WaitingForValue => {
                            self.attr_value_state = AttrValueState::Quoted(quote);
                        }
                        AttrValueState::Quoted(open) if open == quote => {
                            self.finish_attribute();
                        }
                        _ => {}
                    }
                    continue;
                }

                TokenType::HtmlAttrLiteral => {
                    if matches!(self.attr_value_state, AttrValueState::WaitingForValue) {
                        self.attr_value_state = AttrValueState::Unquoted;
                    }
                    self.current_attr_pieces.push(AttrPiece::Literal(token));
                    continue;
                }

                TokenType::HtmlSelfClosingTagClose | TokenType::HtmlTagClose => {
                    self.finish_attribute();
                    let self_closing = token.token_type == TokenType::HtmlSelfClosingTagClose;
                    match self.pending_tag.take() {
                        Some(PendingTag::Start {
                            name,
                            name_range,
                            start,
                            attributes,
                        }) => {
                            return Some(IntermediateToken::StartTag(StartTagRecord {
                                name,
                                name_range,
                                self_closing,
                                attributes,
                                range: Range::new(start, token.end),
                            }));
                        }
                        Some(PendingTag::End { name, name_range, start }) => {
                            return Some(IntermediateToken::EndTag(EndTagRecord {
                                name,
                                name_range,
                                range: Range::new(start, token.end),
                            }));
                        }
                        None => continue,
                    }
                }

                TokenType::XMustacheStart => {
                    if let AttrValueState::WaitingForValue = self.attr_value_state {
                        self.attr_value_state = AttrValueState::Unquoted;
                    }
                    if self.mustache_start.is_none() {
                        let flushed = if self.pending_tag.is_none() {
                            self.flush_text()
                        } else {
                            None
                        };
                        self.mustache_start = Some(token);
                        self.mustache_buffer.clear();
                        self.mustache_buffer_range = None;
                        if let Some(flushed) = flushed {
                            return Some(flushed);
                        }
                    }
                    continue;
                }

                TokenType::XMustacheEnd => {
                    let Some(start_token) = self.mustache_start.take() else {
                        continue;
                    };
                    let value = std::mem::take(&mut self.mustache_buffer);
                    let range = Range::new(start_token.start, token.end);
                    let record = MustacheRecord {
                        start_token,
                        end_token: token,
                        value,
                        range,
                    };
                    if matches!(self.attr_value_state, AttrValueState::Quoted(_)) {
                        self.current_attr_pieces.push(AttrPiece::Mustache(record));
                        continue;
                    }
                    return Some(IntermediateToken::Mustache(record));
                }

                TokenType::HtmlText
                | TokenType::HtmlWhitespace
                | TokenType::HtmlRcDataText
                | TokenType::HtmlRawText
                | TokenType::HtmlLiteral => {
                    if self.mustache_start.is_some() {
                        self.mustache_buffer.push_str(&token.value);
                        self.mustache_buffer_range = Some(match self.mustache_buffer_range {
                            Some(r) => Range::new(r.start, token.end),
                            None => Range::new(token.start, token.end),
                        });
                        continue;
                    }
                    if token.value.is_empty() {
                        continue;
                    }
                    self.append_text(&token);
                    continue;
                }
            }
        }
    }
}
