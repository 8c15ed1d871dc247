//! The document-level error taxonomy.
//!
//! Mirrors the teacher's `HtmlProcessorError`/`UnsupportedException` split
//! (a closed, matchable code plus a renderable message) but accumulates
//! into a `Vec` on the document rather than aborting the parse: spec §7
//! requires "recover and continue", not "stop on first problem".

use crate::location::Position;

/// The closed set of recoverable problems the pipeline can report.
///
/// This is the HTML5 tokenization error set (the state machine in
/// `tokenizer.rs` follows the HTML5 algorithm closely enough to reuse its
/// vocabulary) plus the SWAN-specific codes spec §4.2 calls out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UnexpectedCharacter,
    UnexpectedNullCharacter,
    UnexpectedQuestionMarkInsteadOfTagName,
    MissingEndTagName,
    EofBeforeTagName,
    EofInTag,
    InvalidFirstCharacterOfTagName,
    MissingAttributeValue,
    MissingWhitespaceBetweenAttributes,
    DuplicateAttribute,
    UnexpectedSolidusInTag,
    EofInComment,
    IncorrectlyClosedComment,
    AbruptClosingOfEmptyComment,
    NestedComment,
    AbruptDoctypePublicIdentifier,
    AbruptDoctypeSystemIdentifier,
    EofInDoctype,
    MissingWhitespaceBeforeDoctypeName,
    MissingDoctypeName,
    EofInCdata,
    SurrogateInInputStream,
    NoncharacterInInputStream,
    ControlCharacterInInputStream,
    MissingExpressionEndTag,
    MissingEndTag,
    XInvalidEndTag,
    XInvalidDirective,
    XExpressionError,
    Unreachable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnexpectedCharacter => "unexpected-character",
            ErrorCode::UnexpectedNullCharacter => "unexpected-null-character",
            ErrorCode::UnexpectedQuestionMarkInsteadOfTagName => {
                "unexpected-question-mark-instead-of-tag-name"
            }
            ErrorCode::MissingEndTagName => "missing-end-tag-name",
            ErrorCode::EofBeforeTagName => "eof-before-tag-name",
            ErrorCode::EofInTag => "eof-in-tag",
            ErrorCode::InvalidFirstCharacterOfTagName => "invalid-first-character-of-tag-name",
            ErrorCode::MissingAttributeValue => "missing-attribute-value",
            ErrorCode::MissingWhitespaceBetweenAttributes => {
                "missing-whitespace-between-attributes"
            }
            ErrorCode::DuplicateAttribute => "duplicate-attribute",
            ErrorCode::UnexpectedSolidusInTag => "unexpected-solidus-in-tag",
            ErrorCode::EofInComment => "eof-in-comment",
            ErrorCode::IncorrectlyClosedComment => "incorrectly-closed-comment",
            ErrorCode::AbruptClosingOfEmptyComment => "abrupt-closing-of-empty-comment",
            ErrorCode::NestedComment => "nested-comment",
            ErrorCode::AbruptDoctypePublicIdentifier => "abrupt-doctype-public-identifier",
            ErrorCode::AbruptDoctypeSystemIdentifier => "abrupt-doctype-system-identifier",
            ErrorCode::EofInDoctype => "eof-in-doctype",
            ErrorCode::MissingWhitespaceBeforeDoctypeName => {
                "missing-whitespace-before-doctype-name"
            }
            ErrorCode::MissingDoctypeName => "missing-doctype-name",
            ErrorCode::EofInCdata => "eof-in-cdata",
            ErrorCode::SurrogateInInputStream => "surrogate-in-input-stream",
            ErrorCode::NoncharacterInInputStream => "noncharacter-in-input-stream",
            ErrorCode::ControlCharacterInInputStream => "control-character-in-input-stream",
            ErrorCode::MissingExpressionEndTag => "missing-expression-end-tag",
            ErrorCode::MissingEndTag => "missing-end-tag",
            ErrorCode::XInvalidEndTag => "x-invalid-end-tag",
            ErrorCode::XInvalidDirective => "x-invalid-directive",
            ErrorCode::XExpressionError => "x-expression-error",
            ErrorCode::Unreachable => "unreachable",
        }
    }
}

impl From<ErrorCode> for &'static str {
    fn from(code: ErrorCode) -> Self {
        code.as_str()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recovered problem, attached to a point in the original source.
///
/// Unlike a thrown exception, a `ParseError` never interrupts the pipeline;
/// it is appended to `XDocument::errors` and the caller decides what to do
/// with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub code: Option<ErrorCode>,
    pub message: String,
    pub index: usize,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>, index: usize, pos: Position) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            index,
            line: pos.line,
            column: pos.column,
        }
    }

    /// Build a `ParseError` whose code has no fixed member in `ErrorCode` —
    /// used for errors relayed verbatim from the external script parser.
    pub fn from_script_parser(message: impl Into<String>, index: usize, pos: Position) -> Self {
        Self {
            code: None,
            message: message.into(),
            index,
            line: pos.line,
            column: pos.column,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Sorts errors by source offset, stable for errors reported at the same
/// offset — satisfies testable property 6 in spec §8.
pub fn sort_errors(errors: &mut [ParseError]) {
    errors.sort_by_key(|e| e.index);
}
