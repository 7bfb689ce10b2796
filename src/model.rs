use std::fmt;

/// Scalar types of the canonical schema language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    Number,
    String,
    Boolean,
    Date,
    Null,
    /// Format-specific token carried through verbatim.
    Custom(String),
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Number => write!(f, "NUMBER"),
            ScalarType::String => write!(f, "STRING"),
            ScalarType::Boolean => write!(f, "BOOLEAN"),
            ScalarType::Date => write!(f, "DATE"),
            ScalarType::Null => write!(f, "NULL"),
            ScalarType::Custom(t) => write!(f, "{}", t),
        }
    }
}

/// The shape of a property, one variant per type family.
/// Enum payloads and array bounds live here instead of an untyped bag,
/// so invalid combinations cannot be constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    Enum {
        values: Vec<String>,
    },
    Array {
        element: ScalarType,
        /// Lower bound, `"0"` when unspecified.
        min: String,
        /// Upper bound, `"N"` meaning unbounded.
        max: String,
    },
    /// Array of nested objects (document dialect).
    ObjectArray { properties: Vec<Property> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    /// At most one of REQUIRED/OPTIONAL; `None` when the dialect says nothing.
    pub requirement: Option<Requirement>,
    /// KEY tag, additive to the requirement.
    pub key: bool,
}

impl Property {
    pub fn scalar(name: impl Into<String>, typ: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Scalar(typ),
            requirement: None,
            key: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Relational,
    Graph,
    Document,
    KeyValue,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Relational => write!(f, "RELATIONAL"),
            EntityKind::Graph => write!(f, "GRAPH"),
            EntityKind::Document => write!(f, "DOCUMENT"),
            EntityKind::KeyValue => write!(f, "KEY_VALUE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub properties: Vec<Property>,
    /// Supertype name, single inheritance only.
    pub extends: Option<String>,
    /// Source-format-local label used for relationship resolution.
    /// Not part of the canonical identity.
    pub source_label: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: Vec::new(),
            extends: None,
            source_label: None,
        }
    }
}

/// A named edge between two entities, referencing them by name only.
/// Endpoints are resolved against the schema's entity list at generation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub name: String,
    pub source: String,
    pub target: String,
    /// `lo:hi` multiplicity, forward direction.
    pub cardinality_fwd: String,
    /// `lo:hi` multiplicity, backward direction.
    pub cardinality_bwd: String,
    pub properties: Vec<Property>,
}

pub const DEFAULT_CARDINALITY: &str = "0:N";

#[derive(Debug, Clone, PartialEq)]
pub struct KeyConstraint {
    pub name: String,
    pub entity: String,
    /// Property names, order preserved for deterministic rendering.
    pub properties: Vec<String>,
}

impl KeyConstraint {
    /// Build a key constraint; the name defaults to `{entity}Key`.
    pub fn new(entity: impl Into<String>, properties: Vec<String>, name: Option<String>) -> Self {
        let entity = entity.into();
        let name = name.unwrap_or_else(|| format!("{}Key", entity));
        Self {
            name,
            entity,
            properties,
        }
    }
}

/// Root aggregate produced by every dialect parser and consumed by the
/// generator. Owns its entities; relationships and key constraints are
/// schema-scoped facts that reference entities by name.
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateSchema {
    pub name: String,
    /// Insertion order is first-seen order; names are unique.
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub key_constraints: Vec<KeyConstraint>,
}

impl IntermediateSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            relationships: Vec::new(),
            key_constraints: Vec::new(),
        }
    }

    /// Insert an entity, replacing in place when the name is already present
    /// (last write wins, position unchanged).
    pub fn insert_entity(&mut self, entity: Entity) {
        match self.entities.iter_mut().find(|e| e.name == entity.name) {
            Some(slot) => *slot = entity,
            None => self.entities.push(entity),
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

impl Default for IntermediateSchema {
    fn default() -> Self {
        Self::new("UnnamedSchema")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_entity_replaces_in_place() {
        let mut schema = IntermediateSchema::new("S");
        schema.insert_entity(Entity::new("A", EntityKind::Graph));
        schema.insert_entity(Entity::new("B", EntityKind::Graph));

        let mut replacement = Entity::new("A", EntityKind::Relational);
        replacement
            .properties
            .push(Property::scalar("id", ScalarType::Number));
        schema.insert_entity(replacement);

        assert_eq!(schema.entities.len(), 2);
        assert_eq!(schema.entities[0].name, "A");
        assert_eq!(schema.entities[0].kind, EntityKind::Relational);
        assert_eq!(schema.entities[0].properties.len(), 1);
        assert_eq!(schema.entities[1].name, "B");
    }

    #[test]
    fn test_key_constraint_default_name() {
        let key = KeyConstraint::new("users", vec!["id".into()], None);
        assert_eq!(key.name, "usersKey");

        let named = KeyConstraint::new("users", vec!["id".into()], Some("pk_users".into()));
        assert_eq!(named.name, "pk_users");
    }

    #[test]
    fn test_entity_lookup() {
        let mut schema = IntermediateSchema::default();
        assert_eq!(schema.name, "UnnamedSchema");
        schema.insert_entity(Entity::new("Session", EntityKind::KeyValue));
        assert!(schema.entity("Session").is_some());
        assert!(schema.entity("Missing").is_none());
    }
}
