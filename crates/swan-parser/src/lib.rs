//! Parsing engine for the SWAN mini-program template dialect.
//!
//! The pipeline (spec §4): `text -> code points -> tokens -> intermediate
//! tokens -> tree (+ spliced script ASTs)`. [`parse`] runs it end to end;
//! [`parse_for_eslint`] wraps the same result the way an ESLint-style
//! custom parser is expected to — an outer script AST plus a `services`
//! object a rule author queries for the template body.
//!
//! Grounded on the teacher's top-level crate shape (`wp-html-api`): a
//! handful of `pub mod`s for the data model and configuration, the
//! pipeline stages kept private behind a couple of public entry points
//! the way `html_processor`/`tag_processor` are `mod`, not `pub mod`,
//! there. Unlike the teacher, this crate's PHP-extension, WASM, and
//! Markdown-conversion sibling crates have no counterpart here — see
//! DESIGN.md.

pub mod ast;
pub mod errors;
pub mod location;
pub mod options;
pub mod parent;
pub mod script_parser;

mod code_point_reader;
mod directives;
mod expression;
mod intermediate_tokenizer;
mod references;
mod tag_name;
mod tokenizer;
mod tree_builder;

use ast::{Comment, ScriptNode, XDocument, XElement, XModule, XMustache, XNode, XText, XmlType};
use errors::ParseError;
use location::{Loc, Position, Range};
use options::ParseOptions;

/// `parse(text, options)` (spec §6). Runs the full template pipeline for a
/// `.swan` `file_path` (or no `file_path` at all — `ParseOptions::is_swan_template`
/// defaults to treating an unset path as a template); otherwise treats
/// `text` as a plain script file and hands it to the configured
/// `ScriptParser` whole. Spec's own `getDocumentFragment` returns `null`
/// for the latter case; there is no equivalent of "an `XDocument` that
/// isn't really one" in a typed return, so this crate marks it instead via
/// `xml_type: XmlType::Unknown` and a single synthetic module child
/// holding the parsed program.
pub fn parse(text: &str, options: ParseOptions) -> XDocument {
    if options.is_swan_template() {
        tree_builder::build(text, &options)
    } else {
        parse_script_only(text, &options)
    }
}

fn whole_document_loc(text: &str) -> Loc {
    Loc {
        start: Position::new(1, 0),
        end: Position::new(1, text.len() as u32),
    }
}

fn parse_script_only(text: &str, options: &ParseOptions) -> XDocument {
    let range = Range::new(0, text.len());
    let loc = whole_document_loc(text);
    match options.parser.parse_program(text) {
        Ok((body, comments)) => XDocument {
            xml_type: XmlType::Unknown,
            children: vec![XNode::Module(XModule {
                body,
                references: Vec::new(),
                range,
                loc,
            })],
            tokens: Vec::new(),
            comments,
            errors: Vec::new(),
            range,
            loc,
        },
        Err(err) => XDocument {
            xml_type: XmlType::Unknown,
            children: Vec::new(),
            tokens: Vec::new(),
            comments: Vec::new(),
            errors: vec![ParseError::from_script_parser(
                err.message,
                err.offset,
                Position::new(1, err.offset as u32),
            )],
            range,
            loc,
        },
    }
}

/// The outer script program an ESLint-style host parses a file into,
/// generalized here from "always a `<script>` block" to "whatever the
/// configured `file_path` implies": a `.swan` file has no outer script of
/// its own (`body` is empty; the template lives in `template_body`
/// instead); any other file's entire content becomes `body`.
#[derive(Debug, Clone, PartialEq)]
pub struct EslintProgram {
    pub body: Vec<ScriptNode>,
    pub comments: Vec<Comment>,
    pub template_body: Option<XDocument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EslintParseResult {
    pub ast: EslintProgram,
    pub services: TemplateServices,
}

/// `parseForESLint(text, options)` (spec §6).
pub fn parse_for_eslint(text: &str, options: ParseOptions) -> EslintParseResult {
    if options.is_swan_template() {
        let document = tree_builder::build(text, &options);
        let token_store = TokenStore::new(document.tokens.clone(), document.comments.clone());
        EslintParseResult {
            ast: EslintProgram {
                body: Vec::new(),
                comments: document.comments.clone(),
                template_body: Some(document.clone()),
            },
            services: TemplateServices {
                document_fragment: Some(document),
                token_store: Some(token_store),
            },
        }
    } else {
        let (body, comments) = options.parser.parse_program(text).unwrap_or_default();
        EslintParseResult {
            ast: EslintProgram {
                body,
                comments,
                template_body: None,
            },
            services: TemplateServices {
                document_fragment: None,
                token_store: None,
            },
        }
    }
}

/// The visitor surface `defineTemplateBodyVisitor` would otherwise hand to
/// an ESLint host to drive. There is no host traversal engine here, so
/// [`TemplateServices::define_template_body_visitor`] drives the walk
/// itself and calls back into whichever method matches each node, in
/// document order.
pub trait TemplateBodyVisitor {
    fn visit_element(&mut self, _element: &XElement) {}
    fn visit_text(&mut self, _text: &XText) {}
    fn visit_mustache(&mut self, _mustache: &XMustache) {}
    fn visit_module(&mut self, _module: &XModule) {}
}

fn walk_template_body(nodes: &[XNode], visitor: &mut dyn TemplateBodyVisitor) {
    for node in nodes {
        match node {
            XNode::Element(element) => {
                visitor.visit_element(element);
                walk_template_body(&element.children, visitor);
            }
            XNode::Text(text) => visitor.visit_text(text),
            XNode::Mustache(mustache) => visitor.visit_mustache(mustache),
            XNode::Module(module) => visitor.visit_module(module),
        }
    }
}

/// Positional token/comment queries over a document's flat, range-sorted
/// streams (spec §6: `getTokenBefore`/`getTokensBetween`/
/// `commentsExistBetween`), grounded on the teacher's bookmark-offset
/// lookups generalized from single points to range queries via binary
/// search (`partition_point`) rather than a linear scan.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStore {
    tokens: Vec<ast::Token>,
    comments: Vec<Comment>,
}

impl TokenStore {
    pub fn new(tokens: Vec<ast::Token>, comments: Vec<Comment>) -> Self {
        Self { tokens, comments }
    }

    /// The last token whose range ends at or before `offset`.
    pub fn token_before(&self, offset: usize) -> Option<&ast::Token> {
        let idx = self.tokens.partition_point(|t| t.range.end <= offset);
        idx.checked_sub(1).map(|i| &self.tokens[i])
    }

    /// The first token whose range starts at or after `offset`.
    pub fn token_after(&self, offset: usize) -> Option<&ast::Token> {
        let idx = self.tokens.partition_point(|t| t.range.start < offset);
        self.tokens.get(idx)
    }

    /// Every token fully inside `[start, end)`, in document order.
    pub fn tokens_between(&self, start: usize, end: usize) -> &[ast::Token] {
        let lo = self.tokens.partition_point(|t| t.range.start < start);
        let hi = self.tokens.partition_point(|t| t.range.start < end);
        &self.tokens[lo..hi]
    }

    pub fn comments_exist_between(&self, start: usize, end: usize) -> bool {
        self.comments
            .iter()
            .any(|c| c.range.start >= start && c.range.end <= end)
    }
}

/// `services` (spec §6): `defineTemplateBodyVisitor`, `getTemplateBodyTokenStore`,
/// `getDocumentFragment`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateServices {
    document_fragment: Option<XDocument>,
    token_store: Option<TokenStore>,
}

impl TemplateServices {
    pub fn get_document_fragment(&self) -> Option<&XDocument> {
        self.document_fragment.as_ref()
    }

    pub fn get_template_body_token_store(&self) -> Option<&TokenStore> {
        self.token_store.as_ref()
    }

    pub fn define_template_body_visitor(&self, visitor: &mut dyn TemplateBodyVisitor) {
        if let Some(document) = &self.document_fragment {
            walk_template_body(&document.children, visitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_swan_template_produces_template_xml_type() {
        let doc = parse("<view>hi</view>", ParseOptions::default());
        assert_eq!(doc.xml_type, XmlType::Swan);
        assert_eq!(doc.children.len(), 1);
    }

    #[test]
    fn parse_non_swan_file_runs_script_only() {
        let mut options = ParseOptions::default();
        options.file_path = Some("helper.js".to_string());
        let doc = parse("const a = 1;", options);
        assert_eq!(doc.xml_type, XmlType::Unknown);
        assert_eq!(doc.children.len(), 1);
        assert!(matches!(doc.children[0], XNode::Module(_)));
    }

    #[test]
    fn parse_for_eslint_exposes_template_body_and_services() {
        let result = parse_for_eslint("<view>{{x}}</view>", ParseOptions::default());
        assert!(result.ast.template_body.is_some());
        assert!(result.services.get_document_fragment().is_some());
        assert!(result.services.get_template_body_token_store().is_some());
    }

    #[test]
    fn parse_for_eslint_non_template_has_no_template_body() {
        let mut options = ParseOptions::default();
        options.file_path = Some("plain.js".to_string());
        let result = parse_for_eslint("const a = 1;", options);
        assert!(result.ast.template_body.is_none());
        assert!(result.services.get_document_fragment().is_none());
    }

    struct CountingVisitor {
        elements: usize,
        mustaches: usize,
    }

    impl TemplateBodyVisitor for CountingVisitor {
        fn visit_element(&mut self, _element: &XElement) {
            self.elements += 1;
        }
        fn visit_mustache(&mut self, _mustache: &XMustache) {
            self.mustaches += 1;
        }
    }

    #[test]
    fn define_template_body_visitor_walks_in_document_order() {
        let result = parse_for_eslint(
            "<view><text>{{a}}</text>{{b}}</view>",
            ParseOptions::default(),
        );
        let mut visitor = CountingVisitor {
            elements: 0,
            mustaches: 0,
        };
        result.services.define_template_body_visitor(&mut visitor);
        assert_eq!(visitor.elements, 2);
        assert_eq!(visitor.mustaches, 2);
    }

    #[test]
    fn token_store_queries_are_consistent() {
        let result = parse_for_eslint("<view>{{x}}</view>", ParseOptions::default());
        let store = result.services.get_template_body_token_store().unwrap();
        assert!(store.token_before(100).is_some());
        assert!(store.token_after(0).is_some());
        assert!(store.tokens_between(0, 0).is_empty());
    }
}
