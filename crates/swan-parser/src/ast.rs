//! The tree data model (spec §3).
//!
//! Node shapes follow spec §3 directly; `Range`/`Loc` come from
//! `location.rs`. Unlike the teacher's `HTMLToken`/`HtmlStackEvent` (which
//! exist only transiently while the HTML5 insertion-mode machine runs and
//! are thrown away once the document is built), these are the crate's
//! actual, retained output — closer in spirit to `svelte-parser`'s AST
//! structs in `other_examples`, which also carry a `range`/`loc` pair on
//! every node and a `serde_json::Value` for the parts produced by an
//! external script parser.

use crate::errors::ParseError;
use crate::location::{Loc, Range};
use serde_json::Value;

/// An ESTree-shaped node produced by a [`ScriptParser`](crate::script_parser::ScriptParser).
/// Kept as an opaque JSON value rather than a fixed Rust type because the
/// concrete script AST is produced by a swappable external collaborator
/// (spec §1, §4.6's "script-AST node").
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptNode(pub Value);

impl ScriptNode {
    pub fn type_name(&self) -> Option<&str> {
        self.0.get("type")?.as_str()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub value: String,
    pub range: Range,
    pub loc: Loc,
    pub block: bool,
}

/// A free-identifier reference discovered inside a script AST (spec
/// invariant 6). `name` and `range`/`loc` identify the identifier node in
/// the script AST that referred to an enclosing element's variable;
/// `resolved` names which `XElement.variables` entry it matched, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub range: Range,
    pub loc: Loc,
    pub resolved: bool,
}

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
    /// A synthetic token standing in for a run of script tokens that has
    /// been spliced in from the external parser's own token list (spec
    /// §4.6 step d).
    ScriptToken,
    /// The synthetic `in`/`trackBy` keyword tokens spec §4.6's
    /// `processForExpression` manufactures between the parsed sub-ranges.
    Keyword,
    /// The identifier fast-path token `processMustache` substitutes for a
    /// raw text token when a mustache payload is a bare identifier.
    Identifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlType {
    Swan,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XDocument {
    pub xml_type: XmlType,
    pub children: Vec<XNode>,
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub errors: Vec<ParseError>,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XElement {
    pub name: String,
    pub raw_name: String,
    pub start_tag: XStartTag,
    pub children: Vec<XNode>,
    pub end_tag: Option<XEndTag>,
    /// Scope declarations introduced by an `s-for` directive on this
    /// element (spec invariant 5): identifier name plus the span of
    /// references resolved against it.
    pub variables: Vec<XVariable>,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XVariable {
    pub name: String,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XNode {
    Element(XElement),
    Text(XText),
    Mustache(XMustache),
    Module(XModule),
}

impl XNode {
    pub fn range(&self) -> Range {
        match self {
            XNode::Element(e) => e.range,
            XNode::Text(t) => t.range,
            XNode::Mustache(m) => m.range,
            XNode::Module(m) => m.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XStartTag {
    pub self_closing: bool,
    pub attributes: Vec<XAttributeOrDirective>,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XEndTag {
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XAttributeOrDirective {
    Attribute(XAttribute),
    Directive(XDirective),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XIdentifier {
    pub name: String,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XAttribute {
    pub key: XIdentifier,
    pub value: XAttributeValue,
    pub range: Range,
    pub loc: Loc,
}

/// `prefix` is one of `s-`, `bind`, `catch`, `capture-bind`, `capture-catch`
/// per spec §6's directive grammar (the trailing `:` after `bind`/`catch`
/// is optional and not part of `prefix` itself).
#[derive(Debug, Clone, PartialEq)]
pub struct XDirectiveKey {
    pub prefix: String,
    pub raw_prefix: String,
    pub name: String,
    pub raw_name: String,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XDirective {
    pub key: XDirectiveKey,
    pub value: XAttributeValue,
    pub range: Range,
    pub loc: Loc,
}

/// An attribute's value as an ordered sequence of literal / mustache /
/// expression pieces — spec §3: "an attribute may mix literal and
/// mustache fragments".
#[derive(Debug, Clone, PartialEq)]
pub struct XAttributeValue {
    pub pieces: Vec<XAttributeValuePiece>,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XAttributeValuePiece {
    Literal(XLiteral),
    Mustache(XMustache),
    Expression(XExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XLiteral {
    pub value: String,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XMustache {
    pub start_token: Token,
    pub end_token: Token,
    pub value: XExpression,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XExpressionBody {
    Script(ScriptNode),
    For(SwanForExpression),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XExpression {
    pub expression: XExpressionBody,
    pub references: Vec<Reference>,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwanForExpression {
    pub left: ScriptNode,
    pub index: Option<ScriptNode>,
    pub right: ScriptNode,
    pub track_by: Option<ScriptNode>,
    pub range: Range,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XText {
    pub value: String,
    pub range: Range,
    pub loc: Loc,
}

/// Script body embedded in `<import-sjs>`/`<filter>` (spec §3, §4.5's
/// "Text" rule, §4.6's `processScriptModule`).
#[derive(Debug, Clone, PartialEq)]
pub struct XModule {
    pub body: Vec<ScriptNode>,
    pub references: Vec<Reference>,
    pub range: Range,
    pub loc: Loc,
}
