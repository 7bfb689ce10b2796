//! Parser for the JSON-Schema-like key-value dialect.

use serde_json::Value;

use super::{ParseError, ParseOutput};
use crate::model::{
    Entity, EntityKind, IntermediateSchema, Property, PropertyKind, Requirement, ScalarType,
};

pub fn parse_keyvalue(text: &str) -> Result<ParseOutput, ParseError> {
    let malformed = |reason: String| ParseError::MalformedSchema {
        dialect: "keyvalue",
        reason,
    };

    let data: Value = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    let root = data
        .as_object()
        .ok_or_else(|| malformed("top-level value is not an object".to_string()))?;

    let name = root
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("KeyValueSchema");
    let mut schema = IntermediateSchema::new(name);

    let entities = root.get("properties").and_then(Value::as_object);
    for (entity_name, entity_schema) in entities.into_iter().flatten() {
        let mut entity = Entity::new(entity_name.clone(), EntityKind::KeyValue);

        let required: Vec<&str> = entity_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let props = entity_schema.get("properties").and_then(Value::as_object);
        for (prop_name, prop_schema) in props.into_iter().flatten() {
            let typ = map_type(prop_schema.get("type").and_then(Value::as_str));
            let requirement = if required.contains(&prop_name.as_str()) {
                Requirement::Required
            } else {
                Requirement::Optional
            };
            entity.properties.push(Property {
                name: prop_name.clone(),
                kind: PropertyKind::Scalar(typ),
                requirement: Some(requirement),
                key: false,
            });
        }

        schema.insert_entity(entity);
    }

    // This dialect never states relationships or key constraints.
    Ok(ParseOutput::clean(schema))
}

fn map_type(json_type: Option<&str>) -> ScalarType {
    match json_type.map(str::to_lowercase).as_deref() {
        Some("integer") | Some("number") => ScalarType::Number,
        Some("string") => ScalarType::String,
        Some("boolean") => ScalarType::Boolean,
        Some("date-time") => ScalarType::Date,
        _ => ScalarType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cache_schema() {
        let input = r#"{
            "title": "Cache",
            "properties": {
                "Session": {
                    "required": ["token"],
                    "properties": {
                        "token": {"type": "string"},
                        "ttl": {"type": "integer"}
                    }
                }
            }
        }"#;
        let out = parse_keyvalue(input).unwrap();
        assert!(out.diagnostics.is_empty());
        let schema = out.schema;
        assert_eq!(schema.name, "Cache");
        assert_eq!(schema.entities.len(), 1);

        let session = schema.entity("Session").unwrap();
        assert_eq!(session.kind, EntityKind::KeyValue);
        assert_eq!(session.properties.len(), 2);

        let token = &session.properties[0];
        assert_eq!(token.name, "token");
        assert_eq!(token.kind, PropertyKind::Scalar(ScalarType::String));
        assert_eq!(token.requirement, Some(Requirement::Required));

        let ttl = &session.properties[1];
        assert_eq!(ttl.kind, PropertyKind::Scalar(ScalarType::Number));
        assert_eq!(ttl.requirement, Some(Requirement::Optional));

        assert!(schema.relationships.is_empty());
        assert!(schema.key_constraints.is_empty());
    }

    #[test]
    fn test_default_schema_name_and_type_fallback() {
        let input = r#"{
            "properties": {
                "Flag": {"properties": {"raw": {"type": "blob"}, "on": {"type": "boolean"}}}
            }
        }"#;
        let out = parse_keyvalue(input).unwrap();
        assert_eq!(out.schema.name, "KeyValueSchema");
        let flag = out.schema.entity("Flag").unwrap();
        assert_eq!(flag.properties[0].kind, PropertyKind::Scalar(ScalarType::String));
        assert_eq!(
            flag.properties[1].kind,
            PropertyKind::Scalar(ScalarType::Boolean)
        );
    }

    #[test]
    fn test_malformed_input_is_fatal() {
        assert!(matches!(
            parse_keyvalue("{not json"),
            Err(ParseError::MalformedSchema { dialect: "keyvalue", .. })
        ));
        assert!(parse_keyvalue("[1, 2, 3]").is_err());
    }
}
