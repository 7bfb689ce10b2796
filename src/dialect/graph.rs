//! Parser for the property-graph schema dialect.
//!
//! Recognizes a `CREATE GRAPH TYPE <name> { ... }` envelope containing
//! entity blocks `(Label: Name {props})`, relationship patterns
//! `(:Src) - [r: NAME (fwd);(bwd)] -> (:Tgt)` and key declarations
//! `FOR (x: Label) EXCLUSIVE MANDATORY SINGLETON x.prop`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::{split_top_level, Diagnostic, DiagnosticKind, ParseError, ParseOutput};
use crate::model::{
    Entity, EntityKind, IntermediateSchema, KeyConstraint, Property, PropertyKind, Relationship,
    Requirement, ScalarType, DEFAULT_CARDINALITY,
};

static ENVELOPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CREATE GRAPH TYPE\s+(\w+)").unwrap());
static ENTITY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\(([\w\s&:]+?\{.*?\})\)").unwrap());
static ENTITY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(\w+)\s*:\s*([\w\s&]+?)\s*\{(.*)\}").unwrap());
static RELATIONSHIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(:(\w+)\)\s*-\s*\[(.*?)\]\s*->\s*\(:(\w+)\)").unwrap());
static CARDINALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([\w:]+)\)\s*;\s*\(([\w:]+)\)").unwrap());
static REL_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\w+\s*:\s*(\w+)").unwrap());
static REL_PROPS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((.*)\)").unwrap());
static KEY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"FOR\s+\(x:\s*(\w+)\)\s+EXCLUSIVE\s+MANDATORY\s+SINGLETON\s+x\.(\w+|\([^)]+\))")
        .unwrap()
});
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]*)""#).unwrap());
static ARRAY_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ARRAY\s+(\w+)").unwrap());
static ARRAY_BOUNDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\s*[,:]\s*(\d+)\)").unwrap());

pub fn parse_graph(text: &str) -> Result<ParseOutput, ParseError> {
    let malformed = |reason: &str| ParseError::MalformedSchema {
        dialect: "graph",
        reason: reason.to_string(),
    };

    let name = ENVELOPE
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| malformed("missing CREATE GRAPH TYPE envelope"))?;

    let open = text.find('{').ok_or_else(|| malformed("missing type body"))?;
    let close = text.rfind('}').ok_or_else(|| malformed("unclosed type body"))?;
    if close <= open {
        return Err(malformed("unclosed type body"));
    }
    let body = &text[open + 1..close];

    let mut schema = IntermediateSchema::new(name);
    let mut diagnostics = Vec::new();

    for caps in ENTITY_BLOCK.captures_iter(body) {
        let block = &caps[1];
        match parse_entity(block) {
            Some(entity) => schema.insert_entity(entity),
            None => {
                warn!(fragment = block, "skipping malformed entity block");
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MalformedFragment,
                    format!("malformed entity block: {}", block.trim()),
                ));
            }
        }
    }

    // Relationship and key patterns refer to entities by their source label;
    // direct entity names are accepted as a fallback.
    let mut resolver: HashMap<String, String> = HashMap::new();
    for entity in &schema.entities {
        if let Some(label) = &entity.source_label {
            resolver.insert(label.clone(), entity.name.clone());
        }
        resolver.insert(entity.name.clone(), entity.name.clone());
    }

    for caps in RELATIONSHIP.captures_iter(body) {
        let (source_label, content, target_label) = (&caps[1], &caps[2], &caps[3]);
        match (resolver.get(source_label), resolver.get(target_label)) {
            (Some(source), Some(target)) => {
                schema
                    .relationships
                    .push(parse_relationship(content, source, target));
            }
            _ => {
                warn!(source = source_label, target = target_label, "dropping relationship with unresolved endpoint");
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnresolvedReference,
                    format!(
                        "relationship endpoint not found: (:{}) -> (:{})",
                        source_label, target_label
                    ),
                ));
            }
        }
    }

    for caps in KEY_DECL.captures_iter(body) {
        let (label, props_str) = (&caps[1], &caps[2]);
        let Some(entity) = resolver.get(label) else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedReference,
                format!("key constraint on unknown label {}", label),
            ));
            continue;
        };
        let cleaned = props_str.trim().trim_matches(['(', ')']);
        let properties: Vec<String> = cleaned
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        schema
            .key_constraints
            .push(KeyConstraint::new(entity.clone(), properties, None));
    }

    Ok(ParseOutput {
        schema,
        diagnostics,
    })
}

fn parse_entity(block: &str) -> Option<Entity> {
    let caps = ENTITY_HEADER.captures(block.trim())?;
    let (label, name_part, props_part) = (&caps[1], &caps[2], &caps[3]);

    // `Super & Sub` encodes single inheritance.
    let (name, extends) = match name_part.split_once('&') {
        Some((sup, sub)) => (sub.trim().to_string(), Some(sup.trim().to_string())),
        None => (name_part.trim().to_string(), None),
    };

    let mut entity = Entity::new(name, EntityKind::Graph);
    entity.extends = extends;
    entity.source_label = Some(label.to_string());
    entity.properties = parse_properties(props_part);
    Some(entity)
}

fn parse_properties(props_text: &str) -> Vec<Property> {
    let mut properties = Vec::new();
    for line in split_top_level(props_text, ',') {
        let is_optional = line.contains("OPTIONAL");
        let cleaned = line.replace("OPTIONAL", "");
        let cleaned = cleaned.trim();

        let Some((name, type_str)) = cleaned.split_once(char::is_whitespace) else {
            continue;
        };
        let type_str = type_str.trim();
        let upper = type_str.to_uppercase();

        let kind = if upper.contains("ENUM") {
            let values = QUOTED
                .captures_iter(type_str)
                .map(|c| c[1].to_string())
                .collect();
            PropertyKind::Enum { values }
        } else if upper.contains("ARRAY") {
            let element = ARRAY_ELEMENT
                .captures(type_str)
                .map(|c| map_scalar(&c[1]))
                .unwrap_or(ScalarType::String);
            let (min, max) = ARRAY_BOUNDS
                .captures(type_str)
                .map(|c| (c[1].to_string(), c[2].to_string()))
                .unwrap_or_else(|| ("0".to_string(), "N".to_string()));
            PropertyKind::Array { element, min, max }
        } else {
            PropertyKind::Scalar(map_scalar(type_str))
        };

        properties.push(Property {
            name: name.to_string(),
            kind,
            requirement: Some(if is_optional {
                Requirement::Optional
            } else {
                Requirement::Required
            }),
            key: false,
        });
    }
    properties
}

fn parse_relationship(content: &str, source: &str, target: &str) -> Relationship {
    let mut remaining = content.to_string();

    let (fwd, bwd) = match CARDINALITY.captures(&remaining) {
        Some(caps) => {
            let pair = (caps[1].to_string(), caps[2].to_string());
            let span = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            remaining.replace_range(span, "");
            pair
        }
        None => (
            DEFAULT_CARDINALITY.to_string(),
            DEFAULT_CARDINALITY.to_string(),
        ),
    };

    let properties = REL_PROPS
        .captures(&remaining)
        .map(|c| parse_properties(&c[1]))
        .unwrap_or_default();

    let name = REL_NAME
        .captures(&remaining)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "RELATED_TO".to_string());

    Relationship {
        name,
        source: source.to_string(),
        target: target.to_string(),
        cardinality_fwd: fwd,
        cardinality_bwd: bwd,
        properties,
    }
}

fn map_scalar(token: &str) -> ScalarType {
    match token.trim().to_uppercase().as_str() {
        "INT" | "FLOAT" => ScalarType::Number,
        "STR" => ScalarType::String,
        "BOOL" | "BOOLEAN" => ScalarType::Boolean,
        "DATE" => ScalarType::Date,
        other => ScalarType::Custom(other.to_string()),
    }
}
