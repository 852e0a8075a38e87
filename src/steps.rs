use serde_json::{json, Value};

use crate::config::SequenceConfig;
use crate::schema::validate_value;

/// Success check applied to the `result` of a response.
///
/// Every step first requires that the response carries no `error`; the
/// predicate then decides whether the result itself is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Any result is accepted.
    NoError,
    /// The result is an object whose `field` is an array.
    HasArray(String),
    /// The result is an object whose `field` is a non-empty array.
    NonEmptyArray(String),
    /// The result validates against this JSON Schema.
    MatchesSchema(Value),
}

impl Predicate {
    pub fn check(&self, result: &Value) -> Result<(), String> {
        match self {
            Self::NoError => Ok(()),
            Self::HasArray(field) => array_field(result, field).map(|_| ()),
            Self::NonEmptyArray(field) => {
                if array_field(result, field)?.is_empty() {
                    Err(format!("`{field}` is empty"))
                } else {
                    Ok(())
                }
            }
            Self::MatchesSchema(schema) => {
                validate_value(schema, result).map_err(|e| e.to_string())
            }
        }
    }
}

fn array_field<'a>(result: &'a Value, field: &str) -> Result<&'a Vec<Value>, String> {
    match result.get(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(format!("`{field}` is not an array: {other}")),
        None => Err(format!("result has no `{field}` field")),
    }
}

/// One request/response interaction of a conformance run.
#[derive(Debug, Clone)]
pub struct Step {
    pub label: String,
    pub method: String,
    pub params: Option<Value>,
    pub predicate: Predicate,
    /// Notification sent once this step has passed. No response is read.
    pub notify_after: Option<String>,
}

impl Step {
    pub fn new(
        label: impl Into<String>,
        method: impl Into<String>,
        params: Option<Value>,
        predicate: Predicate,
    ) -> Self {
        Self {
            label: label.into(),
            method: method.into(),
            params,
            predicate,
            notify_after: None,
        }
    }

    pub fn notify_after(mut self, method: impl Into<String>) -> Self {
        self.notify_after = Some(method.into());
        self
    }
}

/// The fixed MCP sequence: initialize, resources/list, tools/list,
/// resources/read, tools/call, prompts/list.
pub fn standard_sequence(config: &SequenceConfig) -> Vec<Step> {
    let predicate = |strict: Value| {
        if config.strict {
            Predicate::MatchesSchema(strict)
        } else {
            Predicate::NoError
        }
    };

    let init_params = json!({
        "protocolVersion": config.protocol_version,
        "capabilities": {},
        "clientInfo": {
            "name": config.client_name,
            "version": config.client_version
        }
    });
    let read_params = json!({ "uri": config.resource_uri });
    let call_params = json!({
        "name": config.tool_name,
        "arguments": config.tool_arguments
    });

    let mut initialize = Step::new(
        "Initialize",
        "initialize",
        Some(init_params),
        predicate(initialize_schema()),
    );
    if let Some(method) = &config.initialized_notification {
        initialize = initialize.notify_after(method.clone());
    }

    vec![
        initialize,
        Step::new(
            "List Resources",
            "resources/list",
            None,
            predicate(listing_schema("resources")),
        ),
        Step::new(
            "List Tools",
            "tools/list",
            None,
            predicate(listing_schema("tools")),
        ),
        Step::new(
            format!("Read Resource {}", config.resource_uri),
            "resources/read",
            Some(read_params),
            predicate(array_schema("contents")),
        ),
        Step::new(
            format!("Call Tool {}", config.tool_name),
            "tools/call",
            Some(call_params),
            predicate(array_schema("content")),
        ),
        Step::new(
            "List Prompts",
            "prompts/list",
            None,
            predicate(listing_schema("prompts")),
        ),
    ]
}

fn initialize_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["capabilities"],
        "properties": {
            "capabilities": { "type": "object" },
            "protocolVersion": { "type": "string" }
        }
    })
}

fn listing_schema(field: &str) -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": [field],
        "properties": {
            field: {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": { "type": "string" }
                    }
                }
            }
        }
    })
}

fn array_schema(field: &str) -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": [field],
        "properties": {
            field: { "type": "array" }
        }
    })
}
