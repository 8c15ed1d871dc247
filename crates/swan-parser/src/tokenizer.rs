//! The low-level tokenizer (spec §4.2 / SPEC_FULL.md §5.2).
//!
//! A per-code-point state machine in the same spirit as the HTML5
//! tokenization algorithm the teacher's `tag_processor.rs` draws on, but
//! driven character-by-character (`consume_next`) rather than the
//! teacher's byte-scanning (`memchr`-assisted) style, because this
//! tokenizer additionally has to recognize `{{ }}` / `{= =}` mustaches
//! interleaved with ordinary markup and can't assume attribute values are
//! memchr-scannable runs — a mustache can open and close mid-value.
//!
//! States are named after their HTML5 counterparts where one exists
//! (`TagOpen`, `BeforeAttributeName`, ...) and after spec §4.2's own names
//! where the behavior is SWAN-specific (`XExpression`).

use std::collections::VecDeque;

use crate::code_point_reader::CodePointReader;
use crate::errors::{ErrorCode, ParseError};
use crate::location::Position;
use crate::tag_name::{content_model_for, is_void, normalize, ContentModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    HtmlTagOpen,
    HtmlEndTagOpen,
    HtmlTagClose,
    HtmlSelfClosingTagClose,
    HtmlIdentifier,
    HtmlAssociation,
    HtmlQuote,
    HtmlLiteral,
    HtmlAttrLiteral,
    HtmlComment,
    HtmlText,
    HtmlWhitespace,
    HtmlRcDataText,
    HtmlRawText,
    XMustacheStart,
    XMustacheEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MustacheKind {
    Double,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    TagOpen,
    EndTagOpen,
    TagName,
    RcData,
    RcDataLessThanSign,
    RcDataEndTagOpen,
    RcDataEndTagName,
    RawText,
    RawTextLessThanSign,
    RawTextEndTagOpen,
    RawTextEndTagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    BogusComment,
    MarkupDeclarationOpen,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentEndDash,
    CommentEnd,
    CommentEndBang,
    XExpression,
}

pub struct Tokenizer<'a> {
    reader: CodePointReader<'a>,
    state: State,
    /// Characters pushed back onto the stream, oldest-first. A single
    /// `Option` slot isn't enough: rolling back a failed provisional
    /// RCDATA/RAWTEXT end tag (spec §4.2/§9) replays the whole buffered
    /// `</name` run, not just its last character.
    pending: VecDeque<(char, usize, Position)>,
    current_tag_name: String,
    current_tag_is_end: bool,
    last_start_tag_name: Option<String>,
    mustache_kind: Option<MustacheKind>,
    /// The state to return to once the current mustache closes — `Data`
    /// for a top-level mustache, or the owning quoted-attribute-value
    /// state when the mustache opened mid-attribute (spec §4.2: mustaches
    /// and two-way bindings are recognized inside quoted attribute values
    /// too).
    mustache_return_state: Option<State>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            reader: CodePointReader::new(source),
            state: State::Data,
            pending: VecDeque::new(),
            current_tag_name: String::new(),
            current_tag_is_end: false,
            last_start_tag_name: None,
            mustache_kind: None,
            mustache_return_state: None,
        }
    }

    pub fn source(&self) -> &'a str {
        self.reader.source()
    }

    pub fn gaps(&self) -> &[usize] {
        &self.reader.gaps
    }

    pub fn line_terminators(&self) -> &[usize] {
        &self.reader.line_terminators
    }

    fn next_char(&mut self, errors: &mut Vec<ParseError>) -> Option<(char, usize, Position)> {
        if let Some(pending) = self.pending.pop_front() {
            return Some(pending);
        }
        let c = self
            .reader
            .consume_next(&mut |code, index, pos| errors.push(ParseError::new(code, code.as_str(), index, pos)))?;
        Some((c, self.reader.offset, self.reader.current_position()))
    }

    /// Returns `item` to the front of the stream so it (and anything
    /// pushed back before it) is read again, in order, before any new
    /// input. Callers that push back more than one character (none
    /// currently do — `run_content_end_tag`'s rollback builds its token
    /// directly instead of replaying pushed-back characters) must still
    /// push them in reverse order so the earliest-consumed character ends
    /// up frontmost.
    fn push_back(&mut self, item: (char, usize, Position)) {
        self.pending.push_front(item);
    }

    fn peek_char(&mut self, errors: &mut Vec<ParseError>) -> Option<char> {
        if let Some((c, _, _)) = self.pending.front() {
            return Some(*c);
        }
        let item = self.next_char(errors)?;
        let c = item.0;
        self.push_back(item);
        Some(c)
    }

    /// Returns the next token, or `None` at end of input. Runs the state
    /// machine until a token boundary is reached; a single call may
    /// advance through several states (e.g. `<div` spans `TagOpen` and
    /// `TagName`) but always yields exactly one [`Token`].
    pub fn next_token(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        loop {
            match self.state {
                State::Data => return self.run_data(errors),
                State::TagOpen => return self.run_tag_open(errors),
                State::EndTagOpen => return self.run_end_tag_open(errors),
                State::TagName => return self.run_tag_name(errors),
                State::RcData => return self.run_text_content(errors, ContentModel::RcData),
                State::RcDataLessThanSign => {
                    return self.run_content_less_than_sign(errors, ContentModel::RcData)
                }
                State::RcDataEndTagOpen | State::RcDataEndTagName => {
                    return self.run_content_end_tag(errors, ContentModel::RcData)
                }
                State::RawText => return self.run_text_content(errors, ContentModel::RawText),
                State::RawTextLessThanSign => {
                    return self.run_content_less_than_sign(errors, ContentModel::RawText)
                }
                State::RawTextEndTagOpen | State::RawTextEndTagName => {
                    return self.run_content_end_tag(errors, ContentModel::RawText)
                }
                State::BeforeAttributeName
                | State::AttributeName
                | State::AfterAttributeName => return self.run_attribute_name(errors),
                State::BeforeAttributeValue => return self.run_before_attribute_value(errors),
                State::AttributeValueDoubleQuoted => {
                    return self.run_attribute_value_quoted(errors, '"')
                }
                State::AttributeValueSingleQuoted => {
                    return self.run_attribute_value_quoted(errors, '\'')
                }
                State::AttributeValueUnquoted => return self.run_attribute_value_unquoted(errors),
                State::AfterAttributeValueQuoted => {
                    return self.run_after_attribute_value_quoted(errors)
                }
                State::SelfClosingStartTag => return self.run_self_closing_start_tag(errors),
                State::BogusComment => return self.run_bogus_comment(errors),
                State::MarkupDeclarationOpen => return self.run_markup_declaration_open(errors),
                State::CommentStart
                | State::CommentStartDash
                | State::Comment
                | State::CommentEndDash
                | State::CommentEnd
                | State::CommentEndBang => return self.run_comment(errors),
                State::XExpression => return self.run_x_expression(errors),
            }
        }
    }

    fn run_data(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let mut buf = String::new();
        let mut start = None;
        let mut end = 0;
        loop {
            let Some(item) = self.next_char(errors) else {
                break;
            };
            let (c, idx, _pos) = item;
            if c == '<' {
                if !buf.is_empty() {
                    self.push_back(item);
                    break;
                }
                self.state = State::TagOpen;
                let tok = Token {
                    token_type: TokenType::HtmlTagOpen,
                    value: "<".to_string(),
                    start: idx,
                    end: idx + 1,
                };
                return Some(tok);
            }
            if c == '{' {
                if let Some(kind) = self.peek_mustache_open(errors) {
                    if !buf.is_empty() {
                        self.push_back(item);
                        break;
                    }
                    return Some(self.consume_mustache_start(kind, idx, errors));
                }
            }
            if start.is_none() {
                start = Some(idx);
            }
            buf.push(c);
            end = idx + c.len_utf8();
        }
        if buf.is_empty() {
            return None;
        }
        Some(Token {
            token_type: TokenType::HtmlText,
            value: buf,
            start: start.unwrap_or(end),
            end,
        })
    }

    /// After seeing `{`, checks whether the next char completes a mustache
    /// opener (`{{` or `{=`) without permanently consuming input when it
    /// doesn't.
    fn peek_mustache_open(&mut self, errors: &mut Vec<ParseError>) -> Option<MustacheKind> {
        let next = self.peek_char(errors)?;
        match next {
            '{' => Some(MustacheKind::Double),
            '=' => Some(MustacheKind::Assign),
            _ => None,
        }
    }

    fn consume_mustache_start(
        &mut self,
        kind: MustacheKind,
        open_idx: usize,
        errors: &mut Vec<ParseError>,
    ) -> Token {
        let (_second_char, second_idx, _) = self.next_char(errors).expect("peeked char must exist");
        self.mustache_kind = Some(kind);
        self.mustache_return_state.get_or_insert(self.state);
        self.state = State::XExpression;
        Token {
            token_type: TokenType::XMustacheStart,
            value: match kind {
                MustacheKind::Double => "{{".to_string(),
                MustacheKind::Assign => "{=".to_string(),
            },
            start: open_idx,
            end: second_idx + 1,
        }
    }

    fn run_x_expression(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let kind = self.mustache_kind.unwrap_or(MustacheKind::Double);
        let mut buf = String::new();
        let mut start = None;
        let mut hit_eof = false;
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                // EOF with the mustache still open (spec §4.3: "If EOF
                // arrives with a pending start"). The document-level
                // `missing-expression-end-tag` error is reported by the
                // intermediate tokenizer, which has the location calculator
                // needed to place it correctly — reporting it again here
                // would double it. What matters at this layer is draining
                // back to a state that lets `next_token` return `None`
                // instead of re-entering `run_x_expression` forever.
                hit_eof = true;
                break;
            };
            let closes = match kind {
                MustacheKind::Double => c == '}' && self.peek_char(errors) == Some('}'),
                MustacheKind::Assign => c == '=' && self.peek_char(errors) == Some('}'),
            };
            if closes {
                if !buf.is_empty() {
                    self.push_back((c, idx, self.reader.current_position()));
                    break;
                }
                let (_second, second_idx, _) = self.next_char(errors).unwrap();
                self.mustache_kind = None;
                self.state = self.mustache_return_state.take().unwrap_or(State::Data);
                return Some(Token {
                    token_type: TokenType::XMustacheEnd,
                    value: match kind {
                        MustacheKind::Double => "}}".to_string(),
                        MustacheKind::Assign => "=}".to_string(),
                    },
                    start: idx,
                    end: second_idx + 1,
                });
            }
            if start.is_none() {
                start = Some(idx);
            }
            buf.push(c);
        }
        if hit_eof {
            // Drain out of the expression state entirely so the next
            // `next_token` call sees `State::Data` (or the owning
            // attribute-value state) and returns `None` instead of
            // looping back into an empty `run_x_expression`.
            self.mustache_kind = None;
            self.state = self.mustache_return_state.take().unwrap_or(State::Data);
        }
        if buf.is_empty() {
            return if hit_eof { None } else { self.next_token(errors) };
        }
        let end = start.unwrap() + buf.len();
        Some(Token {
            token_type: TokenType::HtmlText,
            value: buf,
            start: start.unwrap(),
            end,
        })
    }

    fn run_tag_open(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let Some((c, idx, _)) = self.next_char(errors) else {
            errors.push(ParseError::new(
                ErrorCode::EofBeforeTagName,
                "eof-before-tag-name",
                idx_or(None, 0),
                self.reader.current_position(),
            ));
            self.state = State::Data;
            return Some(Token {
                token_type: TokenType::HtmlText,
                value: "<".to_string(),
                start: idx_or(None, 0),
                end: idx_or(None, 0) + 1,
            });
        };
        if c == '/' {
            self.state = State::EndTagOpen;
            return Some(Token {
                token_type: TokenType::HtmlEndTagOpen,
                value: "</".to_string(),
                start: idx.saturating_sub(1),
                end: idx + 1,
            });
        }
        if c.is_ascii_alphabetic() {
            self.current_tag_name.clear();
            self.current_tag_name.push(c);
            self.current_tag_is_end = false;
            self.state = State::TagName;
            return self.next_token(errors);
        }
        if c == '!' {
            self.state = State::MarkupDeclarationOpen;
            return self.next_token(errors);
        }
        if c == '?' {
            errors.push(ParseError::new(
                ErrorCode::UnexpectedQuestionMarkInsteadOfTagName,
                "unexpected-question-mark-instead-of-tag-name",
                idx,
                self.reader.current_position(),
            ));
            self.push_back((c, idx, self.reader.current_position()));
            self.state = State::BogusComment;
            return self.next_token(errors);
        }
        errors.push(ParseError::new(
            ErrorCode::InvalidFirstCharacterOfTagName,
            "invalid-first-character-of-tag-name",
            idx,
            self.reader.current_position(),
        ));
        self.push_back((c, idx, self.reader.current_position()));
        self.state = State::Data;
        Some(Token {
            token_type: TokenType::HtmlText,
            value: "<".to_string(),
            start: idx.saturating_sub(1),
            end: idx,
        })
    }

    fn run_end_tag_open(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let Some((c, idx, _)) = self.next_char(errors) else {
            errors.push(ParseError::new(
                ErrorCode::EofBeforeTagName,
                "eof-before-tag-name",
                idx_or(None, 0),
                self.reader.current_position(),
            ));
            return None;
        };
        if c == '>' {
            errors.push(ParseError::new(
                ErrorCode::MissingEndTagName,
                "missing-end-tag-name",
                idx,
                self.reader.current_position(),
            ));
            self.state = State::Data;
            return self.next_token(errors);
        }
        self.current_tag_name.clear();
        self.current_tag_name.push(c);
        self.current_tag_is_end = true;
        self.state = State::TagName;
        self.next_token(errors)
    }

    fn run_tag_name(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let start = self.reader.offset;
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                errors.push(ParseError::new(
                    ErrorCode::EofInTag,
                    "eof-in-tag",
                    idx_or(None, start),
                    self.reader.current_position(),
                ));
                break;
            };
            if c.is_whitespace() {
                self.state = State::BeforeAttributeName;
                break;
            }
            if c == '/' {
                self.state = State::SelfClosingStartTag;
                break;
            }
            if c == '>' {
                self.push_back((c, idx, self.reader.current_position()));
                self.state = State::BeforeAttributeName;
                break;
            }
            self.current_tag_name.push(c);
        }
        let name = normalize(&self.current_tag_name);
        let end = self.reader.offset + 1;
        Some(Token {
            token_type: TokenType::HtmlIdentifier,
            value: name,
            start,
            end,
        })
    }

    fn run_attribute_name(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        // Skip whitespace between attributes / before `>`.
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                errors.push(ParseError::new(
                    ErrorCode::EofInTag,
                    "eof-in-tag",
                    idx_or(None, 0),
                    self.reader.current_position(),
                ));
                return None;
            };
            if c.is_whitespace() {
                continue;
            }
            if c == '>' {
                self.state = State::Data;
                return Some(self.tag_close_token(idx));
            }
            if c == '/' {
                self.state = State::SelfClosingStartTag;
                return self.next_token(errors);
            }
            if c == '=' {
                self.push_back((c, idx, self.reader.current_position()));
                self.state = State::BeforeAttributeValue;
                return self.next_token(errors);
            }
            // Start of an attribute name.
            let start = idx;
            let mut buf = String::new();
            buf.push(c);
            loop {
                let Some((c2, idx2, _)) = self.next_char(errors) else {
                    break;
                };
                if c2.is_whitespace() || c2 == '=' || c2 == '>' || c2 == '/' {
                    self.push_back((c2, idx2, self.reader.current_position()));
                    break;
                }
                buf.push(c2);
            }
            self.state = State::AfterAttributeName;
            let end = start + buf.len();
            return Some(Token {
                token_type: TokenType::HtmlIdentifier,
                value: buf,
                start,
                end,
            });
        }
    }

    fn tag_close_token(&mut self, idx: usize) -> Token {
        let name = normalize(&self.current_tag_name);
        if !self.current_tag_is_end {
            self.last_start_tag_name = Some(name.clone());
            match content_model_for(&name) {
                ContentModel::RcData if !is_void(&name) => self.state = State::RcData,
                ContentModel::RawText if !is_void(&name) => self.state = State::RawText,
                _ => self.state = State::Data,
            }
        } else {
            self.state = State::Data;
        }
        Token {
            token_type: TokenType::HtmlTagClose,
            value: ">".to_string(),
            start: idx,
            end: idx + 1,
        }
    }

    fn run_before_attribute_value(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                return None;
            };
            if c.is_whitespace() {
                continue;
            }
            if c == '=' {
                self.state = State::BeforeAttributeValue;
                return Some(Token {
                    token_type: TokenType::HtmlAssociation,
                    value: "=".to_string(),
                    start: idx,
                    end: idx + 1,
                });
            }
            if c == '"' {
                self.state = State::AttributeValueDoubleQuoted;
                return Some(Token {
                    token_type: TokenType::HtmlQuote,
                    value: "\"".to_string(),
                    start: idx,
                    end: idx + 1,
                });
            }
            if c == '\'' {
                self.state = State::AttributeValueSingleQuoted;
                return Some(Token {
                    token_type: TokenType::HtmlQuote,
                    value: "'".to_string(),
                    start: idx,
                    end: idx + 1,
                });
            }
            if c == '>' {
                errors.push(ParseError::new(
                    ErrorCode::MissingAttributeValue,
                    "missing-attribute-value",
                    idx,
                    self.reader.current_position(),
                ));
                return Some(self.tag_close_token(idx));
            }
            self.push_back((c, idx, self.reader.current_position()));
            self.state = State::AttributeValueUnquoted;
            return self.next_token(errors);
        }
    }

    fn run_attribute_value_quoted(
        &mut self,
        errors: &mut Vec<ParseError>,
        quote: char,
    ) -> Option<Token> {
        let mut buf = String::new();
        let mut start = None;
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                errors.push(ParseError::new(
                    ErrorCode::EofInTag,
                    "eof-in-tag",
                    idx_or(start, 0),
                    self.reader.current_position(),
                ));
                break;
            };
            if c == quote {
                self.push_back((c, idx, self.reader.current_position()));
                break;
            }
            if c == '{' {
                if let Some(kind) = self.peek_mustache_open(errors) {
                    if !buf.is_empty() {
                        self.push_back((c, idx, self.reader.current_position()));
                        break;
                    }
                    return Some(self.consume_mustache_start(kind, idx, errors));
                }
            }
            if start.is_none() {
                start = Some(idx);
            }
            buf.push(c);
        }
        if buf.is_empty() {
            let Some((c, idx, _)) = self.next_char(errors) else {
                self.state = State::AfterAttributeValueQuoted;
                return self.next_token(errors);
            };
            debug_assert_eq!(c, quote);
            self.state = State::AfterAttributeValueQuoted;
            return Some(Token {
                token_type: TokenType::HtmlQuote,
                value: quote.to_string(),
                start: idx,
                end: idx + 1,
            });
        }
        let end = start.unwrap() + buf.len();
        Some(Token {
            token_type: TokenType::HtmlAttrLiteral,
            value: buf,
            start: start.unwrap(),
            end,
        })
    }

    fn run_attribute_value_unquoted(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let mut buf = String::new();
        let mut start = None;
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                break;
            };
            if c.is_whitespace() {
                self.push_back((c, idx, self.reader.current_position()));
                break;
            }
            if c == '>' {
                self.push_back((c, idx, self.reader.current_position()));
                break;
            }
            if start.is_none() {
                start = Some(idx);
            }
            buf.push(c);
        }
        self.state = State::BeforeAttributeName;
        let end = start.map(|s| s + buf.len()).unwrap_or(0);
        if buf.is_empty() {
            return self.next_token(errors);
        }
        Some(Token {
            token_type: TokenType::HtmlAttrLiteral,
            value: buf,
            start: start.unwrap(),
            end,
        })
    }

    fn run_after_attribute_value_quoted(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let Some((c, idx, _)) = self.next_char(errors) else {
            return None;
        };
        if c.is_whitespace() {
            self.state = State::BeforeAttributeName;
            return self.next_token(errors);
        }
        if c == '/' {
            self.state = State::SelfClosingStartTag;
            return self.next_token(errors);
        }
        if c == '>' {
            self.state = State::Data;
            return Some(self.tag_close_token(idx));
        }
        errors.push(ParseError::new(
            ErrorCode::MissingWhitespaceBetweenAttributes,
            "missing-whitespace-between-attributes",
            idx,
            self.reader.current_position(),
        ));
        self.push_back((c, idx, self.reader.current_position()));
        self.state = State::BeforeAttributeName;
        self.next_token(errors)
    }

    fn run_self_closing_start_tag(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let Some((c, idx, _)) = self.next_char(errors) else {
            return None;
        };
        if c == '>' {
            self.state = State::Data;
            return Some(Token {
                token_type: TokenType::HtmlSelfClosingTagClose,
                value: "/>".to_string(),
                start: idx.saturating_sub(1),
                end: idx + 1,
            });
        }
        errors.push(ParseError::new(
            ErrorCode::UnexpectedSolidusInTag,
            "unexpected-solidus-in-tag",
            idx,
            self.reader.current_position(),
        ));
        self.push_back((c, idx, self.reader.current_position()));
        self.state = State::BeforeAttributeName;
        self.next_token(errors)
    }

    fn run_text_content(
        &mut self,
        errors: &mut Vec<ParseError>,
        model: ContentModel,
    ) -> Option<Token> {
        let mut buf = String::new();
        let mut start = None;
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                break;
            };
            if c == '<' {
                if let Some(next) = self.peek_char(errors) {
                    if next == '/' || next.is_ascii_alphabetic() {
                        self.push_back((c, idx, self.reader.current_position()));
                        self.state = match model {
                            ContentModel::RcData => State::RcDataLessThanSign,
                            ContentModel::RawText => State::RawTextLessThanSign,
                            ContentModel::Data => State::TagOpen,
                        };
                        break;
                    }
                }
            }
            if model == ContentModel::RcData && c == '{' {
                if let Some(kind) = self.peek_mustache_open(errors) {
                    if !buf.is_empty() {
                        self.push_back((c, idx, self.reader.current_position()));
                        break;
                    }
                    return Some(self.consume_mustache_start(kind, idx, errors));
                }
            }
            if start.is_none() {
                start = Some(idx);
            }
            buf.push(c);
        }
        if buf.is_empty() {
            return self.next_token(errors);
        }
        let end = start.unwrap() + buf.len();
        let token_type = match model {
            ContentModel::RcData => TokenType::HtmlRcDataText,
            ContentModel::RawText => TokenType::HtmlRawText,
            ContentModel::Data => TokenType::HtmlText,
        };
        Some(Token {
            token_type,
            value: buf,
            start: start.unwrap(),
            end,
        })
    }

    fn run_content_less_than_sign(
        &mut self,
        errors: &mut Vec<ParseError>,
        model: ContentModel,
    ) -> Option<Token> {
        let Some((c, idx, _)) = self.next_char(errors) else {
            return None;
        };
        debug_assert_eq!(c, '<');
        self.state = match model {
            ContentModel::RcData => State::RcDataEndTagOpen,
            ContentModel::RawText => State::RawTextEndTagOpen,
            ContentModel::Data => State::TagOpen,
        };
        Some(Token {
            token_type: TokenType::HtmlTagOpen,
            value: "<".to_string(),
            start: idx,
            end: idx + 1,
        })
    }

    /// Reads a speculative end tag inside RCDATA/RAWTEXT content. Per
    /// spec §4.2, an end tag here only "counts" if its name matches the
    /// most recent start tag name; otherwise the `</name` run is emitted
    /// back as plain text and scanning resumes in the same content model
    /// (the provisional-token-then-rollback behavior named in spec §4.2's
    /// edge cases).
    fn run_content_end_tag(
        &mut self,
        errors: &mut Vec<ParseError>,
        model: ContentModel,
    ) -> Option<Token> {
        let Some((slash, idx, _)) = self.next_char(errors) else {
            return None;
        };
        if slash != '/' {
            self.push_back((slash, idx, self.reader.current_position()));
            self.state = match model {
                ContentModel::RcData => State::RcData,
                ContentModel::RawText => State::RawText,
                ContentModel::Data => State::Data,
            };
            return Some(Token {
                token_type: TokenType::HtmlText,
                value: String::new(),
                start: idx,
                end: idx,
            });
        }
        let mut name = String::new();
        let mut consumed = vec![(slash, idx)];
        loop {
            let Some((c, cidx, _)) = self.next_char(errors) else {
                break;
            };
            if c.is_ascii_alphanumeric() || c == '-' {
                name.push(c);
                consumed.push((c, cidx));
            } else {
                self.push_back((c, cidx, self.reader.current_position()));
                break;
            }
        }
        let normalized = normalize(&name);
        let is_match = self
            .last_start_tag_name
            .as_deref()
            .map(|expected| expected == normalized)
            .unwrap_or(false);
        if is_match {
            self.current_tag_name = normalized;
            self.current_tag_is_end = true;
            self.state = State::BeforeAttributeName;
            Some(Token {
                token_type: TokenType::HtmlEndTagOpen,
                value: format!("/{name}"),
                start: idx.saturating_sub(1),
                end: consumed.last().map(|(_, i)| *i + 1).unwrap_or(idx + 1),
            })
        } else {
            // Roll back: this was not an end tag after all. Per this
            // function's own contract above, the whole speculatively
            // consumed `</name` run (not just its first character) is
            // re-emitted as one literal run in the element's content
            // model, and scanning resumes from right after it.
            let text_start = idx.saturating_sub(1);
            let end = consumed.last().map(|(_, i)| *i + 1).unwrap_or(idx + 1);
            let mut value = String::with_capacity(1 + name.len() + 1);
            value.push('<');
            value.push('/');
            value.push_str(&name);
            self.state = match model {
                ContentModel::RcData => State::RcData,
                ContentModel::RawText => State::RawText,
                ContentModel::Data => State::Data,
            };
            Some(Token {
                token_type: match model {
                    ContentModel::RcData => TokenType::HtmlRcDataText,
                    ContentModel::RawText => TokenType::HtmlRawText,
                    ContentModel::Data => TokenType::HtmlText,
                },
                value,
                start: text_start,
                end,
            })
        }
    }

    fn run_bogus_comment(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let start = self.reader.offset;
        let mut buf = String::new();
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                break;
            };
            if c == '>' {
                self.state = State::Data;
                return Some(Token {
                    token_type: TokenType::HtmlComment,
                    value: buf,
                    start,
                    end: idx + 1,
                });
            }
            buf.push(c);
        }
        self.state = State::Data;
        Some(Token {
            token_type: TokenType::HtmlComment,
            value: buf,
            start,
            end: self.reader.offset + 1,
        })
    }

    fn run_markup_declaration_open(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        // Only `<!--` (comments) is meaningful in SWAN templates; DOCTYPE
        // and CDATA sections are HTML5-only and out of scope (spec
        // Non-goal: "Strict HTML5 conformance").
        let first = self.peek_char(errors);
        if first == Some('-') {
            let (_, idx, _) = self.next_char(errors).unwrap();
            if self.peek_char(errors) == Some('-') {
                self.next_char(errors);
                self.state = State::CommentStart;
                return self.next_token(errors);
            }
            self.push_back((
                '-',
                idx,
                self.reader.current_position(),
            ));
        }
        self.state = State::BogusComment;
        self.next_token(errors)
    }

    fn run_comment(&mut self, errors: &mut Vec<ParseError>) -> Option<Token> {
        let start = self.reader.offset.saturating_sub(3);
        let mut buf = String::new();
        let mut dashes = 0u8;
        loop {
            let Some((c, idx, _)) = self.next_char(errors) else {
                errors.push(ParseError::new(
                    ErrorCode::EofInComment,
                    "eof-in-comment",
                    idx_or(None, start),
                    self.reader.current_position(),
                ));
                self.state = State::Data;
                return Some(Token {
                    token_type: TokenType::HtmlComment,
                    value: buf,
                    start,
                    end: self.reader.offset + 1,
                });
            };
            match c {
                '-' => {
                    dashes += 1;
                    if dashes >= 2 {
                        if self.peek_char(errors) == Some('>') {
                            self.next_char(errors);
                            self.state = State::Data;
                            return Some(Token {
                                token_type: TokenType::HtmlComment,
                                value: buf,
                                start,
                                end: idx + 2,
                            });
                        }
                        if dashes > 2 {
                            buf.push('-');
                        }
                    }
                }
                _ => {
                    if dashes >= 2 {
                        errors.push(ParseError::new(
                            ErrorCode::IncorrectlyClosedComment,
                            "incorrectly-closed-comment",
                            idx,
                            self.reader.current_position(),
                        ));
                        for _ in 0..dashes {
                            buf.push('-');
                        }
                    }
                    dashes = 0;
                    buf.push(c);
                }
            }
        }
    }
}

fn idx_or(start: Option<usize>, fallback: usize) -> usize {
    start.unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(source);
        let mut errors = Vec::new();
        let mut out = Vec::new();
        while let Some(tok) = tokenizer.next_token(&mut errors) {
            out.push(tok);
        }
        out
    }

    #[test]
    fn plain_text_is_one_token() {
        let tokens = collect("hello world");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::HtmlText);
        assert_eq!(tokens[0].value, "hello world");
    }

    #[test]
    fn simple_tag_tokenizes() {
        let tokens = collect("<view></view>");
        let types: Vec<_> = tokens.iter().map(|t| t.token_type).collect();
        assert!(types.contains(&TokenType::HtmlTagOpen));
        assert!(types.contains(&TokenType::HtmlEndTagOpen));
        assert!(types.contains(&TokenType::HtmlTagClose));
    }

    #[test]
    fn mustache_is_recognized() {
        let tokens = collect("{{ a + b }}");
        assert_eq!(tokens[0].token_type, TokenType::XMustacheStart);
        assert_eq!(tokens.last().unwrap().token_type, TokenType::XMustacheEnd);
    }

    #[test]
    fn two_way_binding_mustache() {
        let tokens = collect("{= value =}");
        assert_eq!(tokens[0].value, "{=");
        assert_eq!(tokens.last().unwrap().value, "=}");
    }

    /// An unterminated top-level mustache must drain to `None`, not loop
    /// forever re-entering `run_x_expression` on an empty buffer (spec
    /// §4.3's EOF recovery).
    #[test]
    fn unterminated_mustache_drains_to_none() {
        let tokens = collect("{{x");
        assert_eq!(tokens[0].token_type, TokenType::XMustacheStart);
        assert!(tokens
            .iter()
            .any(|t| t.token_type == TokenType::HtmlText && t.value == "x"));
    }

    /// Same, but with nothing at all after the opener.
    #[test]
    fn unterminated_empty_mustache_drains_to_none() {
        let tokens = collect("{{");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::XMustacheStart);
    }

    /// A speculative RCDATA end tag that doesn't match the open element's
    /// name rolls back to plain text with every character intact, not just
    /// the leading `<` (spec §4.2/§9).
    #[test]
    fn mismatched_rcdata_end_tag_preserves_all_characters() {
        let tokens = collect("<textarea></div></textarea>");
        let rolled_back = tokens
            .iter()
            .find(|t| t.token_type == TokenType::HtmlRcDataText)
            .expect("rolled-back text token");
        assert_eq!(rolled_back.value, "</div");
    }

    /// Same provisional-rollback path in a RAWTEXT (`filter`/`import-sjs`)
    /// body.
    #[test]
    fn mismatched_rawtext_end_tag_preserves_all_characters() {
        let tokens = collect("<filter></notfilter></filter>");
        let rolled_back = tokens
            .iter()
            .find(|t| t.token_type == TokenType::HtmlRawText)
            .expect("rolled-back text token");
        assert_eq!(rolled_back.value, "</notfilter");
    }
}
