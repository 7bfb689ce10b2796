//! Dialect parsers: each lowers one source schema language into the
//! canonical intermediate model.

mod document;
mod graph;
mod keyvalue;
mod relational;

use crate::model::IntermediateSchema;
use thiserror::Error;

pub use document::parse_document;
pub use graph::parse_graph;
pub use keyvalue::parse_keyvalue;
pub use relational::parse_relational;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The dialect's mandatory structural anchor is absent.
    #[error("malformed {dialect} schema: {reason}")]
    MalformedSchema {
        dialect: &'static str,
        reason: String,
    },
    /// Raised by strict mode when a dropped reference is promoted to a failure.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A relationship or inline reference did not match a known entity;
    /// the offending item was dropped.
    UnresolvedReference,
    /// A sub-block failed local recognition and was skipped.
    MalformedFragment,
    /// Two schemas being merged declare the same entity name.
    DuplicateEntity,
}

/// A recoverable condition recorded during a parse. Fragment-level trouble
/// never aborts the surrounding document.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A parsed schema together with every recoverable issue encountered.
/// Callers decide the pass/fail policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub schema: IntermediateSchema,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn clean(schema: IntermediateSchema) -> Self {
        Self {
            schema,
            diagnostics: Vec::new(),
        }
    }

    /// Strict mode: any unresolved reference that best-effort parsing dropped
    /// becomes a hard failure.
    pub fn strict(self) -> Result<IntermediateSchema, ParseError> {
        if let Some(d) = self
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::UnresolvedReference)
        {
            return Err(ParseError::UnresolvedReference(d.message.clone()));
        }
        Ok(self.schema)
    }
}

/// The supported source dialects. Doubles as the parser registry: the set is
/// fixed at compile time and read-only, so it is safely shareable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Graph,
    Document,
    KeyValue,
    Relational,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Graph,
        Dialect::Document,
        Dialect::KeyValue,
        Dialect::Relational,
    ];

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "graph" | "graph-schema" => Some(Self::Graph),
            "document" | "document-rule" => Some(Self::Document),
            "keyvalue" | "key-value" | "kv" => Some(Self::KeyValue),
            "relational" | "sql" | "ddl" => Some(Self::Relational),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Document => "document",
            Self::KeyValue => "keyvalue",
            Self::Relational => "relational",
        }
    }

    /// Lower raw text of this dialect into the canonical model.
    pub fn parse(self, text: &str) -> Result<ParseOutput, ParseError> {
        match self {
            Self::Graph => graph::parse_graph(text),
            Self::Document => document::parse_document(text),
            Self::KeyValue => keyvalue::parse_keyvalue(text),
            Self::Relational => relational::parse_relational(text),
        }
    }
}

/// Look up a dialect by name and parse. The entry point external callers use.
pub fn parse(dialect_name: &str, text: &str) -> Result<ParseOutput, MapError> {
    let dialect = Dialect::from_name(dialect_name)
        .ok_or_else(|| MapError::UnknownDialect(dialect_name.to_string()))?;
    Ok(dialect.parse(text)?)
}

/// Split on a separator at nesting depth zero. Parentheses and brackets both
/// count, so `DECIMAL(10,2)` and `ENUM ["a","b"]` payloads stay intact.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.into_iter().filter(|s| !s.is_empty()).collect()
}
