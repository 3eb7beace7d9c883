// ABOUTME: Compiled template model: raw artifact plus parameter/output definitions.
// ABOUTME: Defines the compiler boundary and a per-invocation template cache.

mod cache;
mod metadata;
mod value;

pub use cache::{JsonTemplateLoader, TemplateCache};
pub use metadata::{AutoGenerateConfig, MetadataType, ParamMetadata, substitute_references};
pub use value::{ParamValue, display_json};

use async_trait::async_trait;
use nonempty::NonEmpty;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::control_plane::Artifact;

/// Metadata key holding this tool's parameter extensions.
pub const METADATA_KEY: &str = "terrane";

/// Errors from compiling or interpreting a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("module not found: {0}")]
    ModuleNotFound(PathBuf),

    #[error("failed to compile {path}: {message}")]
    Compile { path: PathBuf, message: String },

    #[error("invalid template: {0}")]
    Invalid(String),

    #[error("unsupported type '{ty}' for parameter '{name}'")]
    UnsupportedType { name: String, ty: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Declared type of a parameter or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    String,
    Bool,
    Number,
    Array,
    Object,
}

impl ParamType {
    /// Parse a template type name. Returns the type and whether it is secure.
    pub fn parse(ty: &str) -> Option<(ParamType, bool)> {
        match ty.to_ascii_lowercase().as_str() {
            "string" => Some((ParamType::String, false)),
            "securestring" => Some((ParamType::String, true)),
            "bool" | "boolean" => Some((ParamType::Bool, false)),
            "int" | "number" => Some((ParamType::Number, false)),
            "array" => Some((ParamType::Array, false)),
            "object" => Some((ParamType::Object, false)),
            "secureobject" => Some((ParamType::Object, true)),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Bool => "bool",
            ParamType::Number => "int",
            ParamType::Array => "array",
            ParamType::Object => "object",
        };
        write!(f, "{name}")
    }
}

/// Where a template deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScope {
    Subscription,
    ResourceGroup,
}

/// One input parameter declared by a template.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub secure: bool,
    pub default: Option<Value>,
    pub allowed_values: Option<NonEmpty<Value>>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub description: Option<String>,
    pub metadata: ParamMetadata,
}

impl ParamDef {
    /// A plain parameter with no constraints.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            secure: false,
            default: None,
            allowed_values: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            description: None,
            metadata: ParamMetadata::default(),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// The default converted to the declared type, if it converts.
    pub fn default_value(&self) -> Option<ParamValue> {
        self.default
            .as_ref()
            .and_then(|v| ParamValue::from_json(self.param_type, v))
    }

    fn from_arm(name: &str, def: &Value) -> Result<Self, TemplateError> {
        let ty = def.get("type").and_then(Value::as_str).unwrap_or_default();
        let (param_type, secure) =
            ParamType::parse(ty).ok_or_else(|| TemplateError::UnsupportedType {
                name: name.to_string(),
                ty: ty.to_string(),
            })?;

        let allowed_values = def
            .get("allowedValues")
            .and_then(Value::as_array)
            .and_then(|values| NonEmpty::from_vec(values.clone()));

        let metadata_block = def.get("metadata");
        let description = metadata_block
            .and_then(|m| m.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let metadata = match metadata_block.and_then(|m| m.get(METADATA_KEY)) {
            Some(raw) => ParamMetadata::from_value(raw).map_err(|e| {
                TemplateError::Invalid(format!("metadata of parameter '{name}': {e}"))
            })?,
            None => ParamMetadata::default(),
        };

        Ok(Self {
            name: name.to_string(),
            param_type,
            secure,
            default: def.get("defaultValue").cloned(),
            allowed_values,
            min_value: def.get("minValue").and_then(Value::as_i64),
            max_value: def.get("maxValue").and_then(Value::as_i64),
            min_length: def
                .get("minLength")
                .and_then(Value::as_u64)
                .map(|n| n as usize),
            max_length: def
                .get("maxLength")
                .and_then(Value::as_u64)
                .map(|n| n as usize),
            description,
            metadata,
        })
    }
}

/// One output declared by a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDef {
    pub name: String,
    pub output_type: ParamType,
}

/// A compiled template. Immutable once built.
#[derive(Debug, Clone)]
pub struct Template {
    pub artifact: Artifact,
    /// Parameters in declaration order.
    pub parameters: Vec<ParamDef>,
    pub outputs: Vec<OutputDef>,
    pub target_scope: TargetScope,
}

impl Template {
    /// Build a template from compiled ARM-style JSON.
    pub fn from_arm_json(artifact: impl Into<Artifact>) -> Result<Self, TemplateError> {
        let artifact = artifact.into();
        let doc: Value = serde_json::from_slice(&artifact)
            .map_err(|e| TemplateError::Invalid(format!("template is not valid JSON: {e}")))?;

        let target_scope = match doc.get("$schema").and_then(Value::as_str) {
            Some(schema) if schema.contains("subscriptionDeploymentTemplate") => {
                TargetScope::Subscription
            }
            _ => TargetScope::ResourceGroup,
        };

        let mut parameters = Vec::new();
        if let Some(defs) = doc.get("parameters").and_then(Value::as_object) {
            for (name, def) in defs {
                parameters.push(ParamDef::from_arm(name, def)?);
            }
        }

        let mut outputs = Vec::new();
        if let Some(defs) = doc.get("outputs").and_then(Value::as_object) {
            for (name, def) in defs {
                let ty = def.get("type").and_then(Value::as_str).unwrap_or_default();
                let (output_type, _) =
                    ParamType::parse(ty).ok_or_else(|| TemplateError::UnsupportedType {
                        name: name.clone(),
                        ty: ty.to_string(),
                    })?;
                outputs.push(OutputDef {
                    name: name.clone(),
                    output_type,
                });
            }
        }

        Ok(Self {
            artifact,
            parameters,
            outputs,
            target_scope,
        })
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Output name as declared, matched case-insensitively.
    pub fn output_casing(&self, key: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(key))
            .map(|o| o.name.as_str())
    }
}

/// Turns a source module into a compiled template.
#[async_trait]
pub trait TemplateCompiler: Send + Sync {
    async fn compile(&self, module_path: &Path) -> Result<Template, TemplateError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arm(doc: Value) -> Template {
        Template::from_arm_json(serde_json::to_vec(&doc).unwrap()).unwrap()
    }

    #[test]
    fn parses_parameters_in_declaration_order() {
        let template = arm(json!({
            "$schema": "https://schema.management.azure.com/schemas/2018-05-01/subscriptionDeploymentTemplate.json#",
            "parameters": {
                "zeta": {"type": "string"},
                "alpha": {"type": "int", "minValue": 1, "maxValue": 10},
                "secret": {"type": "securestring"}
            },
            "outputs": {"AZURE_ENDPOINT": {"type": "string"}}
        }));

        let names: Vec<_> = template.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "secret"]);
        assert_eq!(template.target_scope, TargetScope::Subscription);

        let alpha = template.parameter("alpha").unwrap();
        assert_eq!(alpha.param_type, ParamType::Number);
        assert_eq!(alpha.max_value, Some(10));
        assert!(template.parameter("secret").unwrap().secure);
    }

    #[test]
    fn resource_group_scope_is_default() {
        let template = arm(json!({"parameters": {}}));
        assert_eq!(template.target_scope, TargetScope::ResourceGroup);
    }

    #[test]
    fn reads_description_and_extension_metadata() {
        let template = arm(json!({
            "parameters": {
                "location": {
                    "type": "string",
                    "allowedValues": ["eastus", "westus"],
                    "metadata": {
                        "description": "Primary region",
                        "terrane": {"type": "location"}
                    }
                }
            }
        }));
        let location = template.parameter("location").unwrap();
        assert_eq!(location.description.as_deref(), Some("Primary region"));
        assert!(location.metadata.is(MetadataType::Location));
        assert_eq!(location.allowed_values.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn empty_allowed_values_are_ignored() {
        let template = arm(json!({
            "parameters": {"x": {"type": "string", "allowedValues": []}}
        }));
        assert!(template.parameter("x").unwrap().allowed_values.is_none());
    }

    #[test]
    fn rejects_unknown_types() {
        let doc = json!({"parameters": {"x": {"type": "tuple"}}});
        let err = Template::from_arm_json(serde_json::to_vec(&doc).unwrap()).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedType { .. }));
    }

    #[test]
    fn output_casing_is_case_insensitive() {
        let template = arm(json!({"outputs": {"WEB_URI": {"type": "string"}}}));
        assert_eq!(template.output_casing("web_uri"), Some("WEB_URI"));
        assert_eq!(template.output_casing("other"), None);
    }
}
