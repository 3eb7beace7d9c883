// ABOUTME: Extension metadata attached to template parameters.
// ABOUTME: Drives location, resource-group and generated-value prompting.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Matches `$(p:name)` references to other parameters.
static PARAM_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(p:\s*([A-Za-z_][A-Za-z0-9_\-]*)\s*\)").expect("Invalid regex pattern")
});

/// Special prompting behaviour declared by a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataType {
    /// Region picker, optionally restricted by quota.
    Location,
    /// Pick an existing resource group.
    ResourceGroup,
    /// Generated without asking.
    Generate,
    /// Ask whether to generate or type the value.
    GenerateOrManual,
}

/// Character-class policy for generated values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoGenerateConfig {
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default)]
    pub no_lower: bool,
    #[serde(default)]
    pub no_upper: bool,
    #[serde(default)]
    pub no_numeric: bool,
    #[serde(default)]
    pub no_special: bool,
    #[serde(default)]
    pub min_lower: usize,
    #[serde(default)]
    pub min_upper: usize,
    #[serde(default)]
    pub min_numeric: usize,
    #[serde(default)]
    pub min_special: usize,
}

fn default_length() -> usize {
    16
}

impl Default for AutoGenerateConfig {
    fn default() -> Self {
        Self {
            length: default_length(),
            no_lower: false,
            no_upper: false,
            no_numeric: false,
            no_special: false,
            min_lower: 0,
            min_upper: 0,
            min_numeric: 0,
            min_special: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(rename = "type")]
    kind: Option<MetadataType>,
    #[serde(default, deserialize_with = "string_or_list")]
    usage_name: Vec<String>,
    default: Option<Value>,
    config: Option<AutoGenerateConfig>,
}

/// Parsed `terrane` metadata block of a parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMetadata {
    pub kind: Option<MetadataType>,
    /// Quota requirements, `"<usage-name>[, <capacity>]"` each.
    pub usage_name: Vec<String>,
    /// Pre-selected or pre-filled prompt value.
    pub default: Option<Value>,
    pub auto_generate: Option<AutoGenerateConfig>,
    raw: Option<Value>,
}

impl ParamMetadata {
    /// Parse the metadata block. Unknown fields are kept for reference scanning.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let parsed: RawMetadata = serde_json::from_value(value.clone())?;
        Ok(Self {
            kind: parsed.kind,
            usage_name: parsed.usage_name,
            default: parsed.default,
            auto_generate: parsed.config,
            raw: Some(value.clone()),
        })
    }

    pub fn is(&self, kind: MetadataType) -> bool {
        self.kind == Some(kind)
    }

    /// Names referenced through `$(p:name)` anywhere in the block, in order of
    /// first appearance.
    pub fn references(&self) -> Vec<String> {
        let Some(raw) = &self.raw else {
            return Vec::new();
        };

        let text = raw.to_string();
        let mut names: Vec<String> = Vec::new();
        for caps in PARAM_REFERENCE.captures_iter(&text) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Replace every `$(p:name)` in `text` using `lookup`. Unresolvable
/// references are left as-is.
pub fn substitute_references(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    PARAM_REFERENCE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}
