pub mod dialect;
pub mod generator;
pub mod model;
pub mod unify;

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Map schema text of a named dialect to the canonical schema language
#[wasm_bindgen(js_name = "mapSchema")]
pub fn map_schema(source: &str, dialect_name: &str) -> Result<String, String> {
    let output = dialect::parse(dialect_name, source).map_err(|e| e.to_string())?;
    Ok(generator::generate(&output.schema))
}

/// Merge canonical schema documents into one unified document
#[wasm_bindgen(js_name = "unifySchemas")]
pub fn unify_schemas(documents: Vec<String>) -> String {
    unify::unify(&documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_schema_round_trip() {
        let canonical =
            map_schema("CREATE TABLE users (id INT PRIMARY KEY);", "relational").unwrap();
        assert!(canonical.starts_with("SCHEMA RelationalSchema {"));
        assert!(canonical.contains("id: NUMBER { OPTIONAL, KEY }"));
    }

    #[test]
    fn test_map_schema_unknown_dialect() {
        let err = map_schema("whatever", "cobol").unwrap_err();
        assert!(err.contains("unknown dialect"));
    }

    #[test]
    fn test_unify_entry_point() {
        let a = map_schema("CREATE TABLE users (id INT PRIMARY KEY);", "relational").unwrap();
        let b = map_schema(
            r#"{"title":"Cache","properties":{"Session":{"properties":{"token":{"type":"string"}}}}}"#,
            "keyvalue",
        )
        .unwrap();
        let unified = unify_schemas(vec![a, b]);
        assert!(unified.contains("ENTITY users {"));
        assert!(unified.contains("ENTITY Session {"));
    }
}
