// ABOUTME: Interactive prompting for one queued parameter.
// ABOUTME: Picks select, validated free-text, location or generated input by definition.

use std::collections::BTreeMap;

use serde_json::Value;

use super::error::ParamError;
use super::password;
use super::quota::{UsageRequirement, locations_with_quota};
use super::session::SessionContext;
use super::validate::validate_input;
use crate::console::{Console, ConsoleError, PromptOptions};
use crate::control_plane::{Location, LocationOps, ResourceOps};
use crate::template::{
    MetadataType, ParamDef, ParamType, ParamValue, display_json, substitute_references,
};

const BOOL_OPTIONS: [&str; 2] = ["False", "True"];
const GENERATE_OPTIONS: [&str; 2] = ["Auto generate", "Manual input"];

/// A prompted value and whether it may be saved for later runs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PromptOutcome {
    pub value: ParamValue,
    pub persist: bool,
}

impl PromptOutcome {
    fn saved(value: ParamValue) -> Self {
        Self {
            value,
            persist: true,
        }
    }
}

/// Reject definitions whose metadata can never produce a valid prompt.
///
/// Run over every queued parameter before the first prompt.
pub(crate) fn check_definition(def: &ParamDef) -> Result<(), ParamError> {
    let Some(default) = &def.metadata.default else {
        return Ok(());
    };

    if let Some(allowed) = &def.allowed_values {
        let shown = display_json(default);
        if !allowed.iter().any(|v| display_json(v) == shown) {
            return Err(ParamError::InvalidAllowedDefault {
                parameter: def.name.clone(),
                value: shown,
            });
        }
        return Ok(());
    }

    match def.param_type {
        ParamType::Bool | ParamType::Number => {
            if ParamValue::from_file_value(def.param_type, default).is_none() {
                return Err(ParamError::UnsupportedDefault {
                    parameter: def.name.clone(),
                    reason: format!("{} is not a valid {}", display_json(default), def.param_type),
                });
            }
        }
        ParamType::String => {
            if !default.is_string() {
                return Err(ParamError::UnsupportedDefault {
                    parameter: def.name.clone(),
                    reason: "expected a string".to_string(),
                });
            }
        }
        ParamType::Array | ParamType::Object => {}
    }
    Ok(())
}

/// Prompts for parameters using the console and control-plane listings.
pub(crate) struct Prompter<'a, C: ?Sized> {
    pub console: &'a dyn Console,
    pub control_plane: &'a C,
    pub session: &'a mut SessionContext,
}

impl<C> Prompter<'_, C>
where
    C: LocationOps + ResourceOps + ?Sized,
{
    /// Obtain a value for `def`.
    ///
    /// `known` holds the rendered values of parameters resolved so far, used
    /// to fill `$(p:name)` references. `shared_location` marks a location
    /// parameter bound to the session's shared location.
    pub async fn prompt(
        &mut self,
        def: &ParamDef,
        known: &BTreeMap<String, String>,
        shared_location: bool,
    ) -> Result<PromptOutcome, ParamError> {
        tracing::debug!(parameter = %def.name, "prompting for parameter");

        if def.param_type == ParamType::String {
            match def.metadata.kind {
                Some(MetadataType::Location) => {
                    return self.prompt_location(def, known, shared_location).await;
                }
                Some(MetadataType::ResourceGroup) => return self.prompt_resource_group(def).await,
                Some(MetadataType::Generate) => return generated(def),
                Some(MetadataType::GenerateOrManual) => return self.prompt_generate_or_manual(def),
                None => {}
            }
        }

        if def.allowed_values.is_some() {
            return self.select_allowed(def);
        }

        if def.param_type == ParamType::Bool {
            return self.select_bool(def);
        }

        let value = self.prompt_validated(def, text_default(def)?)?;
        Ok(PromptOutcome {
            value,
            persist: !def.secure,
        })
    }

    async fn prompt_location(
        &mut self,
        def: &ParamDef,
        known: &BTreeMap<String, String>,
        shared_location: bool,
    ) -> Result<PromptOutcome, ParamError> {
        if shared_location && let Some(location) = self.session.shared_location() {
            tracing::debug!(parameter = %def.name, location, "using shared location");
            return Ok(PromptOutcome::saved(ParamValue::String(location.to_string())));
        }

        let subscription = self.session.subscription().cloned().ok_or_else(|| {
            ParamError::MissingSubscription {
                parameter: def.name.clone(),
            }
        })?;

        let mut locations: Vec<Location> = self.control_plane.list_locations(&subscription).await?;
        if let Some(allowed) = &def.allowed_values {
            locations.retain(|l| {
                allowed
                    .iter()
                    .any(|v| v.as_str().is_some_and(|a| a.eq_ignore_ascii_case(&l.name)))
            });
        }

        if !def.metadata.usage_name.is_empty() {
            let requirements = def
                .metadata
                .usage_name
                .iter()
                .map(|u| UsageRequirement::parse(&substitute_references(u, |n| known.get(n).cloned())))
                .collect::<Result<Vec<_>, _>>()?;
            let names: Vec<String> = locations.iter().map(|l| l.name.clone()).collect();
            let qualifying =
                locations_with_quota(self.control_plane, &subscription, &names, &requirements)
                    .await?;
            locations.retain(|l| qualifying.contains(&l.name));
        }

        if locations.is_empty() {
            return Err(ParamError::NoLocations {
                parameter: def.name.clone(),
            });
        }
        locations.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let preferred = def
            .metadata
            .default
            .as_ref()
            .and_then(Value::as_str)
            .or(self.session.shared_location());
        let default = preferred
            .and_then(|p| locations.iter().position(|l| l.name.eq_ignore_ascii_case(p)))
            .unwrap_or(0);

        let options: Vec<String> = locations
            .iter()
            .map(|l| format!("{} ({})", l.display_name, l.name))
            .collect();
        let choice = self.console.select(&prompt_message(def), &options, default)?;
        let location = pick(&locations, choice)?.name.clone();

        if shared_location && !self.session.location_fixed_this_run() {
            self.session.fix_location(location.clone());
        }

        Ok(PromptOutcome::saved(ParamValue::String(location)))
    }

    async fn prompt_resource_group(&self, def: &ParamDef) -> Result<PromptOutcome, ParamError> {
        let subscription = self.session.subscription().ok_or_else(|| {
            ParamError::MissingSubscription {
                parameter: def.name.clone(),
            }
        })?;

        let mut groups = self.control_plane.list_resource_groups(subscription).await?;
        if groups.is_empty() {
            return Err(ParamError::NoResourceGroups {
                parameter: def.name.clone(),
            });
        }
        groups.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        self.console.message(&format!(
            "Parameter {} requires an existing resource group.",
            def.name
        ));
        let options: Vec<String> = groups.iter().map(|g| g.as_str().to_string()).collect();
        let choice = self.console.select(&prompt_message(def), &options, 0)?;
        let group = pick(&options, choice)?.clone();
        Ok(PromptOutcome::saved(ParamValue::String(group)))
    }

    fn prompt_generate_or_manual(&self, def: &ParamDef) -> Result<PromptOutcome, ParamError> {
        let options: Vec<String> = GENERATE_OPTIONS.iter().map(|s| s.to_string()).collect();
        let message = format!("How would you like to set the '{}' parameter?", def.name);
        if self.console.select(&message, &options, 0)? == 0 {
            return generated(def);
        }

        let value = self.prompt_validated(def, None)?;
        Ok(PromptOutcome {
            value,
            persist: !def.secure,
        })
    }

    fn select_allowed(&self, def: &ParamDef) -> Result<PromptOutcome, ParamError> {
        let Some(allowed) = &def.allowed_values else {
            return Err(ParamError::UnsupportedDefault {
                parameter: def.name.clone(),
                reason: "no allowed values".to_string(),
            });
        };

        let options: Vec<String> = allowed.iter().map(display_json).collect();
        let default = match &def.metadata.default {
            Some(value) => {
                let shown = display_json(value);
                options.iter().position(|o| *o == shown).ok_or_else(|| {
                    ParamError::InvalidAllowedDefault {
                        parameter: def.name.clone(),
                        value: shown,
                    }
                })?
            }
            None => 0,
        };

        let choice = self.console.select(&prompt_message(def), &options, default)?;
        let raw = allowed.get(choice).ok_or_else(|| out_of_range(choice))?;
        let value = ParamValue::from_file_value(def.param_type, raw).ok_or_else(|| {
            ParamError::InvalidAllowedValue {
                parameter: def.name.clone(),
                value: display_json(raw),
            }
        })?;
        Ok(PromptOutcome::saved(value))
    }

    fn select_bool(&self, def: &ParamDef) -> Result<PromptOutcome, ParamError> {
        let options: Vec<String> = BOOL_OPTIONS.iter().map(|s| s.to_string()).collect();
        let default = match def
            .metadata
            .default
            .as_ref()
            .and_then(|d| ParamValue::from_file_value(ParamType::Bool, d))
        {
            Some(ParamValue::Bool(true)) => 1,
            _ => 0,
        };

        let choice = self.console.select(&prompt_message(def), &options, default)?;
        Ok(PromptOutcome::saved(ParamValue::Bool(choice == 1)))
    }

    /// Ask for free text until it validates, reporting each failure.
    fn prompt_validated(
        &self,
        def: &ParamDef,
        default: Option<String>,
    ) -> Result<ParamValue, ParamError> {
        let options = PromptOptions::new(prompt_message(def))
            .with_help(def.description.clone())
            .with_default(default)
            .secure(def.secure);

        loop {
            let input = self.console.prompt(&options)?;
            match validate_input(def, &input) {
                Ok(value) => return Ok(value),
                Err(reason) => self.console.message(&format!("Error: {reason}.")),
            }
        }
    }
}

fn prompt_message(def: &ParamDef) -> String {
    if def.secure {
        format!(
            "Enter a value for the '{}' infrastructure secured parameter:",
            def.name
        )
    } else {
        format!("Enter a value for the '{}' infrastructure parameter:", def.name)
    }
}

/// Pre-filled text for a free-text prompt, from the metadata default.
fn text_default(def: &ParamDef) -> Result<Option<String>, ParamError> {
    let Some(default) = &def.metadata.default else {
        return Ok(None);
    };

    let text = match def.param_type {
        ParamType::String => default.as_str().map(str::to_string),
        ParamType::Number | ParamType::Bool => {
            ParamValue::from_file_value(def.param_type, default).map(|v| v.to_string())
        }
        ParamType::Array | ParamType::Object => Some(default.to_string()),
    };

    text.map(Some).ok_or_else(|| ParamError::UnsupportedDefault {
        parameter: def.name.clone(),
        reason: format!("{} is not a valid {}", display_json(default), def.param_type),
    })
}

fn generated(def: &ParamDef) -> Result<PromptOutcome, ParamError> {
    let config = def.metadata.auto_generate.clone().unwrap_or_default();
    let value = password::generate(&config).map_err(|reason| ParamError::Generate {
        parameter: def.name.clone(),
        reason,
    })?;
    Ok(PromptOutcome::saved(ParamValue::String(value)))
}

fn pick<T>(items: &[T], index: usize) -> Result<&T, ParamError> {
    items.get(index).ok_or_else(|| out_of_range(index))
}

fn out_of_range(index: usize) -> ParamError {
    ConsoleError::Unavailable(format!("selection {index} is out of range")).into()
}
