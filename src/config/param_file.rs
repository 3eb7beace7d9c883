// ABOUTME: Parameter file loading with environment variable substitution.
// ABOUTME: Resolves ${VAR} and ${VAR=default} from the env store, then the process env.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::store::ConfigStore;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?:=([^}]*))?\}").expect("Invalid regex pattern")
});

static WHOLE_ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{([A-Za-z_][A-Za-z0-9_]*)(?:=([^}]*))?\}$").expect("Invalid regex pattern")
});

#[derive(Debug, Deserialize)]
struct RawParameterFile {
    #[serde(default)]
    parameters: HashMap<String, RawParameterEntry>,
}

#[derive(Debug, Deserialize)]
struct RawParameterEntry {
    #[serde(default)]
    value: Option<Value>,
}

/// Values supplied by the project's parameter file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterFile {
    values: HashMap<String, Value>,
    /// Parameters whose whole value is a single `${VAR}` reference.
    env_mappings: HashMap<String, String>,
}

impl ParameterFile {
    pub fn from_values(values: HashMap<String, Value>) -> Self {
        Self {
            values,
            env_mappings: HashMap::new(),
        }
    }

    /// Parse parameter file JSON, substituting variables through `lookup`.
    ///
    /// A value that is exactly one `${VAR}` reference to an unset variable
    /// without a default counts as absent, so the parameter is resolved from
    /// saved configuration or a prompt instead.
    pub fn from_json(json: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw: RawParameterFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("invalid parameter file: {e}")))?;

        let mut values = HashMap::new();
        let mut env_mappings = HashMap::new();

        for (name, entry) in raw.parameters {
            let Some(value) = entry.value else {
                continue;
            };

            if let Value::String(text) = &value
                && let Some(caps) = WHOLE_ENV_REFERENCE.captures(text)
            {
                let var = caps[1].to_string();
                let resolved = lookup(&var).or_else(|| caps.get(2).map(|m| m.as_str().to_string()));
                env_mappings.insert(name.clone(), var);
                if let Some(resolved) = resolved {
                    values.insert(name, Value::String(resolved));
                }
                continue;
            }

            values.insert(name, substitute_value(value, &lookup));
        }

        Ok(Self {
            values,
            env_mappings,
        })
    }

    /// Load and substitute the parameter file. A missing file yields no values.
    pub fn load(path: &Path, env: &dyn ConfigStore) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no parameter file");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), "reading parameter file");
        Self::from_json(&content, |name| {
            env.get_string(name)
                .filter(|v| !v.is_empty())
                .or_else(|| std::env::var(name).ok())
        })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Variable a parameter is mapped to, if its value is a single reference.
    pub fn env_mapping(&self, name: &str) -> Option<&str> {
        self.env_mappings.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn substitute_value(value: Value, lookup: &impl Fn(&str) -> Option<String>) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_env(&s, lookup)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| substitute_value(v, lookup))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute_value(v, lookup)))
                .collect(),
        ),
        other => other,
    }
}

/// Replace `${VAR}` and `${VAR=default}` using `lookup`.
///
/// Unknown variables without a default become empty strings.
pub fn substitute_env(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    ENV_REFERENCE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            lookup(&caps[1])
                .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
                .unwrap_or_default()
        })
        .into_owned()
}
