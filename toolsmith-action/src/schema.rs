//! Callable-tool schemas derived from action structs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A function-calling tool schema: name, description, JSON Schema parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Tool name (the action kind tag).
    pub name: String,
    /// What the tool does, taken from the struct's doc comment.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

/// Derive the schema for `T`, named `name`.
///
/// Default values are stripped from every property so the model always
/// supplies explicit values, and every object definition forbids additional
/// properties.
pub fn function_schema_for<T: JsonSchema>(name: &str) -> FunctionSchema {
    let root = schemars::schema_for!(T);
    let mut parameters =
        serde_json::to_value(&root).unwrap_or_else(|_| Value::Object(Map::new()));

    let mut description = String::new();
    if let Value::Object(map) = &mut parameters {
        map.remove("$schema");
        map.remove("title");
        if let Some(Value::String(doc)) = map.remove("description") {
            description = doc;
        }
    }
    close_object(&mut parameters);
    if let Some(Value::Object(defs)) = parameters.get_mut("definitions") {
        for def in defs.values_mut() {
            close_object(def);
        }
    }

    FunctionSchema {
        name: name.to_string(),
        description,
        parameters,
    }
}

/// JSON Schema of `T` as a plain value.
pub fn schema_value<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

fn close_object(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };
    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for property in properties.values_mut() {
            if let Value::Object(p) = property {
                p.remove("default");
            }
        }
    }
    if map.get("type").and_then(Value::as_str) == Some("object") {
        map.insert("additionalProperties".into(), Value::Bool(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Copy a file somewhere else.
    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct CopyFile {
        /// Source path.
        from: String,
        /// Destination path.
        to: String,
        /// Overwrite the destination.
        #[serde(default)]
        force: bool,
        #[serde(default)]
        options: Vec<CopyOption>,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct CopyOption {
        key: String,
    }

    #[test]
    fn name_and_description_come_from_type() {
        let schema = function_schema_for::<CopyFile>("copy_file");
        assert_eq!(schema.name, "copy_file");
        assert_eq!(schema.description, "Copy a file somewhere else.");
        assert!(schema.parameters.get("title").is_none());
        assert!(schema.parameters.get("$schema").is_none());
    }

    #[test]
    fn defaults_are_stripped() {
        let schema = function_schema_for::<CopyFile>("copy_file");
        let force = &schema.parameters["properties"]["force"];
        assert!(force.get("default").is_none());
        assert_eq!(force["description"], "Overwrite the destination.");
    }

    #[test]
    fn objects_forbid_extra_fields() {
        let schema = function_schema_for::<CopyFile>("copy_file");
        assert_eq!(schema.parameters["additionalProperties"], false);
        assert_eq!(
            schema.parameters["definitions"]["CopyOption"]["additionalProperties"],
            false
        );
    }
}
