// ABOUTME: Parameter resolution: parameter file, saved config, defaults, then prompts.
// ABOUTME: Prompts run in dependency order; new values are saved in one batch.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::error::ParamError;
use super::graph::prompt_order;
use super::prompt::{Prompter, check_definition};
use super::session::SessionContext;
use crate::config::{LOCATION_ENV_KEY, ParameterFile, parameter_config_key};
use crate::console::Console;
use crate::control_plane::{ArmParameters, LocationOps, ResourceOps};
use crate::diagnostics::{Diagnostics, Warning};
use crate::store::ConfigStore;
use crate::template::{MetadataType, ParamDef, ParamValue, Template};

/// Concrete values for one deployment attempt.
///
/// Parameters that fall back to their template default are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParameters {
    values: BTreeMap<String, ParamValue>,
}

impl ResolvedParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parameters in the shape sent to the control plane.
    pub fn to_arm(&self) -> ArmParameters {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

impl FromIterator<(String, ParamValue)> for ResolvedParameters {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Collaborators used by one resolution.
pub struct ResolveContext<'a, C: ?Sized> {
    pub console: &'a dyn Console,
    pub control_plane: &'a C,
    /// Saved parameter values, under `infra.parameters.<name>`.
    pub config: &'a mut dyn ConfigStore,
    /// Environment values; receives the shared location once fixed.
    pub env: &'a mut dyn ConfigStore,
    pub session: &'a mut SessionContext,
    pub diagnostics: &'a mut Diagnostics,
}

/// Resolves template parameters once per invocation.
#[derive(Debug, Default)]
pub struct ParameterResolver {
    cached: Option<ResolvedParameters>,
}

impl ParameterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously resolved parameters, if any.
    pub fn cached(&self) -> Option<&ResolvedParameters> {
        self.cached.as_ref()
    }

    /// Resolve every parameter of `template` that lacks a default.
    ///
    /// Later calls return the first result without prompting again.
    pub async fn resolve<C>(
        &mut self,
        template: &Template,
        parameter_file: &ParameterFile,
        ctx: ResolveContext<'_, C>,
    ) -> Result<ResolvedParameters, ParamError>
    where
        C: LocationOps + ResourceOps + ?Sized,
    {
        if let Some(cached) = &self.cached {
            tracing::debug!("using cached parameters");
            return Ok(cached.clone());
        }

        let ResolveContext {
            console,
            control_plane,
            config,
            env,
            session,
            diagnostics,
        } = ctx;

        let mut resolved = ResolvedParameters::new();
        let mut defaulted: HashSet<&str> = HashSet::new();
        let mut queued: Vec<&ParamDef> = Vec::new();
        let mut config_modified = false;

        for def in &template.parameters {
            if let Some(value) = from_parameter_file(def, parameter_file) {
                resolved.insert(def.name.clone(), value);
                continue;
            }

            let key = parameter_config_key(&def.name);
            if let Some(saved) = config.get(&key) {
                if let Some(value) = ParamValue::from_json(def.param_type, &saved) {
                    tracing::debug!(parameter = %def.name, "using saved value");
                    resolved.insert(def.name.clone(), value);
                    continue;
                }

                diagnostics.warn(Warning::stale_saved_value(format!(
                    "saved value for parameter '{}' is no longer a valid {}; discarding it",
                    def.name, def.param_type
                )));
                match config.unset(&key) {
                    Ok(()) => config_modified = true,
                    Err(e) => diagnostics.warn(Warning::parameter_persistence(format!(
                        "failed to discard saved value for '{}': {e}",
                        def.name
                    ))),
                }
            }

            if def.has_default() {
                defaulted.insert(def.name.as_str());
            } else {
                queued.push(def);
            }
        }

        for def in &queued {
            check_definition(def)?;
        }

        let declared: HashSet<&str> = template.parameters.iter().map(|p| p.name.as_str()).collect();
        let satisfied: HashSet<&str> = template
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| resolved.contains(name) || defaulted.contains(name))
            .collect();
        let order = prompt_order(&queued, &satisfied, &declared)?;

        let mut known: BTreeMap<String, String> = resolved
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        for name in &defaulted {
            if let Some(value) = template.parameter(name).and_then(ParamDef::default_value) {
                known.insert(name.to_string(), value.to_string());
            }
        }

        let mut prompter = Prompter {
            console,
            control_plane,
            session,
        };

        for index in order {
            let def = queued[index];
            let shared_location = def.metadata.is(MetadataType::Location)
                && parameter_file.env_mapping(&def.name) == Some(LOCATION_ENV_KEY);

            let outcome = prompter.prompt(def, &known, shared_location).await?;

            if outcome.persist {
                match config.set(&parameter_config_key(&def.name), outcome.value.to_json()) {
                    Ok(()) => config_modified = true,
                    Err(e) => diagnostics.warn(Warning::parameter_persistence(format!(
                        "failed to save value for '{}': {e}",
                        def.name
                    ))),
                }
            }

            known.insert(def.name.clone(), outcome.value.to_string());
            resolved.insert(def.name.clone(), outcome.value);
        }

        if config_modified && let Err(e) = config.save() {
            diagnostics.warn(Warning::parameter_persistence(format!(
                "failed to save parameter values: {e}"
            )));
        }

        if prompter.session.location_fixed_this_run()
            && let Some(location) = prompter.session.shared_location()
            && env.get_string(LOCATION_ENV_KEY).as_deref() != Some(location)
        {
            let written = env
                .set(LOCATION_ENV_KEY, Value::String(location.to_string()))
                .and_then(|()| env.save());
            if let Err(e) = written {
                diagnostics.warn(Warning::parameter_persistence(format!(
                    "failed to save {LOCATION_ENV_KEY}: {e}"
                )));
            }
        }

        tracing::debug!(resolved = resolved.len(), "parameters resolved");
        self.cached = Some(resolved.clone());
        Ok(resolved)
    }
}

/// Parameter-file value for `def`, if usable.
///
/// An empty string is ignored when a default exists to fall back to.
fn from_parameter_file(def: &ParamDef, parameter_file: &ParameterFile) -> Option<ParamValue> {
    let raw = parameter_file.get(&def.name)?;
    if raw.as_str().is_some_and(str::is_empty) && def.has_default() {
        return None;
    }

    let value = ParamValue::from_file_value(def.param_type, raw);
    if value.is_none() {
        tracing::warn!(
            parameter = %def.name,
            expected = %def.param_type,
            "ignoring parameter file value of the wrong type"
        );
    }
    value
}
