//! Parse configuration (spec §6 "Recognised options").
//!
//! Shaped like the teacher's `TagQuery<'a>` builder in `tag_processor.rs`
//! (a plain struct of `Option<_>` fields with `Default`, rather than a
//! typestate builder) — this crate's equivalent surface is smaller, so it
//! stays a flat struct instead of growing `TagQuery`'s fluent setters.

use std::sync::Arc;

use crate::script_parser::{OxcScriptParser, ScriptParser};

/// Recognised keys for the script backend (spec §6: "configuration object
/// passed verbatim to the script parser").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceType {
    Script,
    Module,
    CommonJs,
}

impl Default for SourceType {
    fn default() -> Self {
        SourceType::Script
    }
}

#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub ecma_version: u32,
    pub source_type: SourceType,
    pub range: bool,
    pub loc: bool,
    pub tokens: bool,
    pub comments: bool,
    pub allow_reserved: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            ecma_version: 2020,
            source_type: SourceType::Script,
            range: true,
            loc: true,
            tokens: true,
            comments: true,
            allow_reserved: false,
        }
    }
}

#[derive(Clone)]
pub struct ParseOptions {
    /// Determines `xmlType`: a `.swan` extension runs the full template
    /// pipeline; any other extension runs the script parser over the
    /// whole input (spec §6).
    pub file_path: Option<String>,
    /// If true, every unmatched `XElement` reports `missing-end-tag` on
    /// pop (spec §6).
    pub no_open_tag: bool,
    /// If false, mustache payloads and directive literals are preserved
    /// as raw `Mustache`/`XLiteral` pieces without invoking the script
    /// parser (spec §6).
    pub parse_expression: bool,
    pub script: ScriptOptions,
    /// The external collaborator expression/script fragments are handed
    /// to (spec §1). Defaults to [`OxcScriptParser`]; swappable so an
    /// embedder can plug in a different front end behind the same
    /// `ScriptParser` seam without forking the tree builder.
    pub parser: Arc<dyn ScriptParser>,
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("file_path", &self.file_path)
            .field("no_open_tag", &self.no_open_tag)
            .field("parse_expression", &self.parse_expression)
            .field("script", &self.script)
            .field("parser", &"<dyn ScriptParser>")
            .finish()
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            file_path: None,
            no_open_tag: false,
            parse_expression: true,
            script: ScriptOptions::default(),
            parser: Arc::new(OxcScriptParser::default()),
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_swan_template(&self) -> bool {
        self.file_path
            .as_deref()
            .map(|p| p.ends_with(".swan"))
            .unwrap_or(true)
    }

    /// Applies `script` and rebuilds the default [`OxcScriptParser`] to
    /// match it (`source_type`/`allow_reserved` — see
    /// `OxcScriptParser::with_options`). Mutating `self.script` in place
    /// after construction does *not* reconfigure an already-built parser;
    /// go through this method (or swap `self.parser` directly for a custom
    /// backend) to change script parsing behavior.
    pub fn with_script(mut self, script: ScriptOptions) -> Self {
        self.parser = Arc::new(OxcScriptParser::with_options(&script));
        self.script = script;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_swan_template_defaults_true_for_unset_path() {
        assert!(ParseOptions::default().is_swan_template());
    }

    #[test]
    fn is_swan_template_false_for_other_extensions() {
        let mut options = ParseOptions::default();
        options.file_path = Some("helper.js".to_string());
        assert!(!options.is_swan_template());
    }

    #[test]
    fn with_script_allow_reserved_accepts_future_reserved_identifier() {
        let options = ParseOptions::default().with_script(ScriptOptions {
            allow_reserved: true,
            ..ScriptOptions::default()
        });
        assert!(options.parser.parse_expression("yield").is_ok());
    }
}
