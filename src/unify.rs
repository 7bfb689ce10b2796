//! Unification of canonical schema documents.
//!
//! Two levels are offered: a text-level merge over generated documents and a
//! model-level merge over intermediate schemas. The text-level merge is the
//! classic pipeline integration point; the model-level merge detects entity
//! name collisions and should be preferred when the schemas are still in hand.

use tracing::warn;

use crate::dialect::{Diagnostic, DiagnosticKind};
use crate::model::IntermediateSchema;

pub const UNIFIED_SCHEMA_NAME: &str = "UnifiedPolySchema";

/// Merge canonical documents into one `SCHEMA UnifiedPolySchema { ... }`
/// wrapper. Each document's body is extracted, re-indented one level and
/// the bodies joined with a blank line between them. Documents without an
/// extractable body are skipped. Total: never fails, garbage degrades to
/// garbage output.
pub fn unify(documents: &[String]) -> String {
    let mut bodies = Vec::new();
    for doc in documents {
        match extract_body(doc) {
            Some(body) if !body.trim().is_empty() => {
                bodies.push(format!("\t{}", body.trim()));
            }
            Some(_) => {}
            None => warn!("skipping document without a recognizable SCHEMA body"),
        }
    }
    format!(
        "SCHEMA {} {{\n{}\n}}",
        UNIFIED_SCHEMA_NAME,
        bodies.join("\n\n")
    )
}

/// Extract the text between the first `{` following the `SCHEMA` keyword and
/// its matching brace. The walk is balance-aware, so nested braces inside an
/// entity body (ARRAY of OBJECT, property tag lists) do not truncate it.
fn extract_body(document: &str) -> Option<&str> {
    let schema_at = document.find("SCHEMA")?;
    let rest = &document[schema_at..];
    let open = rest.find('{')?;

    let mut depth = 0i32;
    for (i, c) in rest[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Model-level unification: merge entity maps, concatenate relationships and
/// key constraints. Entity name collisions are reported and resolved with
/// last-write-wins, the same rule the model applies within one parse.
pub fn merge(
    schemas: impl IntoIterator<Item = IntermediateSchema>,
) -> (IntermediateSchema, Vec<Diagnostic>) {
    let mut unified = IntermediateSchema::new(UNIFIED_SCHEMA_NAME);
    let mut diagnostics = Vec::new();

    for schema in schemas {
        for entity in schema.entities {
            if unified.entity(&entity.name).is_some() {
                warn!(entity = entity.name.as_str(), "entity redefined during merge");
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicateEntity,
                    format!("entity {} defined by more than one schema", entity.name),
                ));
            }
            unified.insert_entity(entity);
        }
        unified.relationships.extend(schema.relationships);
        unified.key_constraints.extend(schema.key_constraints);
    }

    (unified, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{parse_keyvalue, parse_relational};
    use crate::generator::generate;
    use crate::model::{Entity, EntityKind};

    fn canonical(name: &str, entity: &str) -> String {
        let mut schema = IntermediateSchema::new(name);
        schema.insert_entity(Entity::new(entity, EntityKind::Graph));
        generate(&schema)
    }

    #[test]
    fn test_unify_two_documents() {
        let a = canonical("A", "Person");
        let b = canonical("B", "Company");
        let unified = unify(&[a, b]);

        assert!(unified.starts_with("SCHEMA UnifiedPolySchema {\n"));
        assert!(unified.ends_with("\n}"));
        assert!(unified.contains("ENTITY Person {"));
        assert!(unified.contains("ENTITY Company {"));
        // Outer envelope names are discarded.
        assert!(!unified.contains("SCHEMA A"));
        assert!(!unified.contains("SCHEMA B"));
        // Exactly one blank line between the two bodies.
        assert_eq!(unified.matches("\n\n").count(), 1);
    }

    #[test]
    fn test_unify_is_concatenative() {
        let docs: Vec<String> = [("A", "X"), ("B", "Y"), ("C", "Z")]
            .iter()
            .map(|(n, e)| canonical(n, e))
            .collect();

        let all = unify(&docs);
        let singles: Vec<String> = docs
            .iter()
            .map(|d| body_of(&unify(std::slice::from_ref(d))))
            .collect();
        assert_eq!(body_of(&all), singles.join("\n\n"));
    }

    fn body_of(unified: &str) -> String {
        let open = unified.find('{').unwrap();
        let close = unified.rfind('}').unwrap();
        unified[open + 1..close]
            .trim_matches('\n')
            .to_string()
    }

    #[test]
    fn test_extract_body_survives_nested_braces() {
        let doc = "SCHEMA S {\n\tENTITY E {\n\t\tDOCUMENT {\n\t\t\ta: NUMBER { KEY }\n\t\t}\n\t}\n}";
        let body = extract_body(doc).unwrap();
        assert!(body.contains("a: NUMBER { KEY }"));
        assert!(body.trim_end().ends_with("\t}"));
    }

    #[test]
    fn test_unify_skips_unparsable_documents() {
        let good = canonical("A", "Person");
        let unified = unify(&[good, "not a schema at all".to_string()]);
        assert!(unified.contains("ENTITY Person {"));
    }

    #[test]
    fn test_end_to_end_unification() {
        let relational = parse_relational("CREATE TABLE users (id INT PRIMARY KEY);")
            .unwrap()
            .schema;
        let keyvalue = parse_keyvalue(
            r#"{"title":"Cache","properties":{"Session":{"properties":{"token":{"type":"string"}}}}}"#,
        )
        .unwrap()
        .schema;

        let unified = unify(&[generate(&relational), generate(&keyvalue)]);
        assert!(unified.contains("ENTITY users {"));
        assert!(unified.contains("ENTITY Session {"));
        assert!(unified.contains("CONSTRAINT usersKey ON users.id IS KEY"));
    }

    #[test]
    fn test_merge_reports_duplicates() {
        let mut a = IntermediateSchema::new("A");
        a.insert_entity(Entity::new("Person", EntityKind::Graph));
        let mut b = IntermediateSchema::new("B");
        b.insert_entity(Entity::new("Person", EntityKind::Document));
        b.insert_entity(Entity::new("Company", EntityKind::Document));

        let (unified, diagnostics) = merge([a, b]);
        assert_eq!(unified.name, UNIFIED_SCHEMA_NAME);
        assert_eq!(unified.entities.len(), 2);
        // Last write wins.
        assert_eq!(unified.entity("Person").unwrap().kind, EntityKind::Document);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateEntity);
    }
}
