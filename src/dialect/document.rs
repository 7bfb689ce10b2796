//! Parser for the document-rule dialect.
//!
//! The grammar is a set of named rules `lhs ::= rhs`, one per line. A
//! mandatory `root` rule enumerates the top-level fields; everything else is
//! reached by indirection through the rule table.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::{split_top_level, Diagnostic, DiagnosticKind, ParseError, ParseOutput};
use crate::model::{
    Entity, EntityKind, IntermediateSchema, KeyConstraint, Property, PropertyKind, Requirement,
    ScalarType,
};

static CONTINUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*\n\s*").unwrap());

pub fn parse_document(text: &str) -> Result<ParseOutput, ParseError> {
    // Rules may span lines; a dangling comma continues on the next line.
    let joined = CONTINUATION.replace_all(text, ", ");

    let mut rules: HashMap<String, String> = HashMap::new();
    for line in joined.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((lhs, rhs)) = line.split_once("::=") {
            rules.insert(lhs.trim().to_string(), rhs.trim().to_string());
        }
    }

    let root = rules.get("root").ok_or(ParseError::MalformedSchema {
        dialect: "document",
        reason: "missing root rule".to_string(),
    })?;

    let mut schema = IntermediateSchema::new("DocumentSchema");
    let mut diagnostics = Vec::new();

    let root_body = root.trim().trim_matches(['{', '}']);
    for field in root_body.split(',') {
        let Some((entity_name, rule_ref)) = field.split_once(':') else {
            continue;
        };
        let (entity_name, rule_ref) = (entity_name.trim(), rule_ref.trim());

        let resolved = resolve_object_rule(rule_ref, &rules);
        let Some(rule_name) = resolved.filter(|r| rules.contains_key(r)) else {
            warn!(field = entity_name, rule = rule_ref, "skipping field with unresolved rule");
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedReference,
                format!("field {} references unknown rule {}", entity_name, rule_ref),
            ));
            continue;
        };

        let mut stack = Vec::new();
        let (properties, key_props) =
            build_properties(&rule_name, &rules, &mut stack, &mut diagnostics);

        let mut entity = Entity::new(entity_name, EntityKind::Document);
        entity.properties = properties;
        schema.insert_entity(entity);

        for key in key_props {
            schema
                .key_constraints
                .push(KeyConstraint::new(entity_name, vec![key], None));
        }
    }

    Ok(ParseOutput {
        schema,
        diagnostics,
    })
}

/// Resolve a rule reference to the name of the object rule it denotes.
/// `[x]` wrappers (array-of-object) are unwrapped, either on the reference
/// itself or on the referenced rule's right-hand side.
fn resolve_object_rule(rule_ref: &str, rules: &HashMap<String, String>) -> Option<String> {
    let unwrap = |s: &str| s.trim_matches(['[', ']']).trim().to_string();
    if rule_ref.starts_with('[') && rule_ref.ends_with(']') {
        return Some(unwrap(rule_ref));
    }
    let rhs = rules.get(rule_ref)?;
    if rhs.starts_with('[') && rhs.ends_with(']') {
        Some(unwrap(rhs))
    } else {
        Some(rule_ref.to_string())
    }
}

fn build_properties(
    rule_name: &str,
    rules: &HashMap<String, String>,
    stack: &mut Vec<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<Property>, Vec<String>) {
    let Some(body) = rules.get(rule_name) else {
        return (Vec::new(), Vec::new());
    };
    if stack.iter().any(|r| r == rule_name) {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::MalformedFragment,
            format!("recursive rule reference: {}", rule_name),
        ));
        return (Vec::new(), Vec::new());
    }
    stack.push(rule_name.to_string());

    let mut properties = Vec::new();
    let mut key_props = Vec::new();

    for def in split_top_level(body.trim_matches(['{', '}']), ',') {
        let Some((name, token)) = def.split_once(':') else {
            continue;
        };
        let (name, mut token) = (name.trim(), token.trim());

        // A trailing `k` marks a key member; stripped before type lookup.
        let is_key = token.len() > 1
            && token.ends_with('k')
            && !token.starts_with("arr_")
            && !token.starts_with('[');
        if is_key {
            token = &token[..token.len() - 1];
        }

        let kind = match token {
            "R" => PropertyKind::Scalar(ScalarType::Number),
            "TS" => PropertyKind::Scalar(ScalarType::Date),
            "S" => PropertyKind::Scalar(ScalarType::String),
            "null" => PropertyKind::Scalar(ScalarType::Null),
            t if t.starts_with('[') && t.ends_with(']') => {
                let values = t
                    .trim_matches(['[', ']'])
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty() && *v != "...")
                    .map(str::to_string)
                    .collect();
                PropertyKind::Enum { values }
            }
            t if t.starts_with("arr_") => {
                match resolve_object_rule(t, rules).filter(|r| rules.contains_key(r)) {
                    Some(nested_rule) => {
                        let (mut nested, nested_keys) =
                            build_properties(&nested_rule, rules, stack, diagnostics);
                        // Key members discovered inside the nested rule stay
                        // tagged on the nested property itself.
                        for p in &mut nested {
                            if nested_keys.iter().any(|k| k == &p.name) {
                                p.key = true;
                            }
                        }
                        PropertyKind::ObjectArray { properties: nested }
                    }
                    None => {
                        diagnostics.push(Diagnostic::new(
                            DiagnosticKind::UnresolvedReference,
                            format!("array token {} references unknown rule", t),
                        ));
                        PropertyKind::Array {
                            element: ScalarType::String,
                            min: "0".to_string(),
                            max: "N".to_string(),
                        }
                    }
                }
            }
            _ => PropertyKind::Scalar(ScalarType::String),
        };

        if is_key {
            key_props.push(name.to_string());
        }
        properties.push(Property {
            name: name.to_string(),
            kind,
            requirement: is_key.then_some(Requirement::Required),
            key: is_key,
        });
    }

    stack.pop();
    (properties, key_props)
}
