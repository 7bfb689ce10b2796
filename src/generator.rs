//! Generator for the canonical schema language.
//!
//! A pure function of the intermediate schema: iteration order is exactly
//! the order the model recorded, never re-sorted, so output is byte-stable
//! and safe for the text-level unifier to re-parse.

use crate::model::{
    Entity, EntityKind, IntermediateSchema, KeyConstraint, Property, PropertyKind, Relationship,
    Requirement,
};

/// Render an intermediate schema as canonical text. Performs no validation:
/// a dangling entity reference is rendered verbatim.
pub fn generate(schema: &IntermediateSchema) -> String {
    let mut out = String::new();
    out.push_str(&format!("SCHEMA {} {{\n", schema.name));
    for entity in &schema.entities {
        write_entity(&mut out, entity);
    }
    for rel in &schema.relationships {
        write_relationship(&mut out, rel, schema);
    }
    for key in &schema.key_constraints {
        write_key_constraint(&mut out, key);
    }
    out.push('}');
    out
}

fn write_entity(out: &mut String, entity: &Entity) {
    out.push_str(&format!("\tENTITY {}", entity.name));
    if let Some(sup) = &entity.extends {
        out.push_str(&format!(" EXTENDS {}", sup));
    }
    out.push_str(&format!(" {{\n\t\t{} {{\n", entity.kind));
    for prop in &entity.properties {
        write_property(out, prop, 3);
    }
    out.push_str("\t\t}\n\t}\n");
}

fn write_property(out: &mut String, prop: &Property, indent: usize) {
    let pad = "\t".repeat(indent);

    let type_str = match &prop.kind {
        PropertyKind::Scalar(t) => t.to_string(),
        PropertyKind::Enum { values } => {
            let quoted: Vec<String> = values.iter().map(|v| format!("\"{}\"", v)).collect();
            format!("ENUM [{}]", quoted.join(", "))
        }
        PropertyKind::Array { element, .. } => format!("ARRAY [ {} ]", element),
        PropertyKind::ObjectArray { properties } => {
            let mut nested = String::new();
            for p in properties {
                write_property(&mut nested, p, indent + 2);
            }
            format!(
                "ARRAY [\n{pad}\tOBJECT {{\n{nested}{pad}\t}}\n{pad}]",
                pad = pad,
                nested = nested
            )
        }
    };

    let mut tags: Vec<&str> = Vec::new();
    match prop.requirement {
        Some(Requirement::Required) => tags.push("REQUIRED"),
        Some(Requirement::Optional) => tags.push("OPTIONAL"),
        None => {}
    }
    if prop.key {
        tags.push("KEY");
    }

    if tags.is_empty() {
        out.push_str(&format!("{}{}: {}\n", pad, prop.name, type_str));
    } else {
        out.push_str(&format!(
            "{}{}: {} {{ {} }}\n",
            pad,
            prop.name,
            type_str,
            tags.join(", ")
        ));
    }
}

fn write_relationship(out: &mut String, rel: &Relationship, schema: &IntermediateSchema) {
    out.push_str(&format!(
        "\tRELATION {} FROM {} TO {}",
        rel.name, rel.source, rel.target
    ));

    // Cardinality is meaningless for foreign-key-style links; omit the pair
    // when the source resolves to a relational entity (or not at all).
    let show_cardinality = schema
        .entity(&rel.source)
        .map(|e| e.kind != EntityKind::Relational)
        .unwrap_or(false);
    if show_cardinality {
        out.push_str(&format!(
            " ({}) ; ({})",
            rel.cardinality_fwd, rel.cardinality_bwd
        ));
    }

    if rel.properties.is_empty() {
        out.push('\n');
    } else {
        out.push_str(" {\n");
        for prop in &rel.properties {
            write_property(out, prop, 2);
        }
        out.push_str("\t}\n");
    }
}

fn write_key_constraint(out: &mut String, key: &KeyConstraint) {
    let props = if key.properties.len() == 1 {
        key.properties[0].clone()
    } else {
        format!("({})", key.properties.join(", "))
    };
    out.push_str(&format!(
        "\tCONSTRAINT {} ON {}.{} IS KEY\n",
        key.name, key.entity, props
    ));
}
