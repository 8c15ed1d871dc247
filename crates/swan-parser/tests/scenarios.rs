//! Black-box tests for the literal scenario table in spec §8, driven
//! entirely through the public `swan_parser::parse`/`parse_for_eslint`
//! surface rather than the private `tree_builder` module the inline
//! `#[cfg(test)]` modules in `src/` exercise directly. Complements those
//! unit tests rather than duplicating them: this file checks what a real
//! embedder sees through `services`/`TokenStore`, not internal builder
//! state.

use swan_parser::ast::{
    XAttributeOrDirective, XAttributeValuePiece, XExpressionBody, XNode,
};
use swan_parser::errors::ErrorCode;
use swan_parser::options::ParseOptions;
use swan_parser::{parse, parse_for_eslint};

fn first_element(children: &[XNode]) -> &swan_parser::ast::XElement {
    match &children[0] {
        XNode::Element(el) => el,
        other => panic!("expected element, got {other:?}"),
    }
}

/// Scenario 1: a mustache directive value (`s-if="{{cond}}"`) parses its
/// payload as a script expression.
#[test]
fn scenario_1_mustache_directive_value() {
    let doc = parse(r#"<view s-if="{{cond}}"></view>"#, ParseOptions::default());
    let el = first_element(&doc.children);
    let XAttributeOrDirective::Directive(dir) = &el.start_tag.attributes[0] else {
        panic!("expected directive");
    };
    assert_eq!(dir.key.prefix, "s-");
    assert_eq!(dir.key.name, "if");
    let XAttributeValuePiece::Mustache(m) = &dir.value.pieces[0] else {
        panic!("expected mustache piece");
    };
    let XExpressionBody::Script(node) = &m.value.expression else {
        panic!("expected script expression");
    };
    assert_eq!(node.type_name(), Some("Identifier"));
}

/// Scenario 2: a plain-literal directive value (no mustache) still parses
/// as an expression when `parse_expression` is enabled.
#[test]
fn scenario_2_plain_literal_directive_value() {
    let doc = parse(r#"<view s-if="cond"></view>"#, ParseOptions::default());
    let el = first_element(&doc.children);
    let XAttributeOrDirective::Directive(dir) = &el.start_tag.attributes[0] else {
        panic!("expected directive");
    };
    assert!(matches!(
        dir.value.pieces[0],
        XAttributeValuePiece::Expression(_)
    ));
}

/// Scenario: `parse_expression: false` preserves directive literals
/// verbatim instead of invoking the script parser.
#[test]
fn parse_expression_disabled_keeps_raw_literal() {
    let mut options = ParseOptions::default();
    options.parse_expression = false;
    let doc = parse(r#"<view s-if="cond"></view>"#, options);
    let el = first_element(&doc.children);
    let XAttributeOrDirective::Directive(dir) = &el.start_tag.attributes[0] else {
        panic!("expected directive");
    };
    let XAttributeValuePiece::Literal(lit) = &dir.value.pieces[0] else {
        panic!("expected literal");
    };
    assert_eq!(lit.value, "cond");
}

/// Scenario: `<import-sjs>` bodies become a script module child, not text.
#[test]
fn import_sjs_body_is_a_module_node() {
    let doc = parse(
        "<import-sjs module=\"m\">exports.a = 1;</import-sjs>",
        ParseOptions::default(),
    );
    let el = first_element(&doc.children);
    assert_eq!(el.children.len(), 1);
    assert!(matches!(el.children[0], XNode::Module(_)));
}

/// Scenario: a duplicate attribute is recovered-from, not fatal, and is
/// reported through `XDocument::errors`.
#[test]
fn duplicate_attribute_is_recovered_and_reported() {
    let doc = parse(
        r#"<view class="a" class="b">hi</view>"#,
        ParseOptions::default(),
    );
    assert!(doc
        .errors
        .iter()
        .any(|e| e.code == Some(ErrorCode::DuplicateAttribute)));
    // recovery: the element still parses with its text child intact.
    let el = first_element(&doc.children);
    assert_eq!(el.children.len(), 1);
}

/// Scenario: `s-for` introduces scope variables, and a descendant mustache
/// referencing the loop variable resolves against them (testable property
/// 5, spec invariant 6).
#[test]
fn for_directive_variables_resolve_in_descendant_mustache() {
    let result = parse_for_eslint(
        r#"<view s-for="item in list">{{item}}</view>"#,
        ParseOptions::default(),
    );
    let doc = result.ast.template_body.expect("template body");
    let el = first_element(&doc.children);
    assert_eq!(el.variables.len(), 1);
    assert_eq!(el.variables[0].name, "item");
    let XNode::Mustache(m) = &el.children[0] else {
        panic!("expected mustache child");
    };
    assert_eq!(m.value.references.len(), 1);
    assert!(m.value.references[0].resolved);
}

/// Scenario 6: an inline-object mustache payload (`{{a:1,b:2}}`) parses as
/// an `ObjectExpression`, not three separate identifiers or a syntax error
/// — the payload looks like a block body without the wrapper trick.
#[test]
fn scenario_6_inline_object_mustache() {
    let doc = parse(r#"<view style="{{a:1,b:2}}"/>"#, ParseOptions::default());
    let el = first_element(&doc.children);
    let XAttributeOrDirective::Attribute(attr) = &el.start_tag.attributes[0] else {
        panic!("expected plain attribute");
    };
    let XAttributeValuePiece::Mustache(m) = &attr.value.pieces[0] else {
        panic!("expected mustache piece");
    };
    let XExpressionBody::Script(node) = &m.value.expression else {
        panic!("expected object expression");
    };
    assert_eq!(node.type_name(), Some("ObjectExpression"));
}

/// Scenario: an unterminated mustache inside a directive value still
/// yields a tree (recover-and-continue), with `missing-expression-end-tag`
/// recorded.
#[test]
fn unterminated_mustache_recovers() {
    let doc = parse(r#"<view s-if="{{cond""#, ParseOptions::default());
    assert!(doc
        .errors
        .iter()
        .any(|e| e.code == Some(ErrorCode::MissingExpressionEndTag)));
}

/// Scenario: a void/self-closing custom element has no end tag.
#[test]
fn self_closing_element_has_no_end_tag() {
    let doc = parse(r#"<include src="a.swan"/>"#, ParseOptions::default());
    let el = first_element(&doc.children);
    assert!(el.end_tag.is_none());
    assert!(el.start_tag.self_closing);
}

/// Scenario: an end tag with no matching open element is reported and
/// discarded rather than corrupting the stack.
#[test]
fn mismatched_end_tag_is_reported() {
    let doc = parse("<view></span></view>", ParseOptions::default());
    assert!(doc
        .errors
        .iter()
        .any(|e| e.code == Some(ErrorCode::XInvalidEndTag)));
}

/// `services.getDocumentFragment()`/`getTemplateBodyTokenStore()` are
/// populated for a template file and absent for a plain script file (spec
/// §6's `parseForESLint` contract).
#[test]
fn eslint_services_are_populated_only_for_templates() {
    let template = parse_for_eslint("<view>{{x}}</view>", ParseOptions::default());
    assert!(template.services.get_document_fragment().is_some());
    assert!(template.services.get_template_body_token_store().is_some());

    let mut script_options = ParseOptions::default();
    script_options.file_path = Some("helper.js".to_string());
    let script = parse_for_eslint("const a = 1;", script_options);
    assert!(script.services.get_document_fragment().is_none());
    assert!(script.services.get_template_body_token_store().is_none());
}
