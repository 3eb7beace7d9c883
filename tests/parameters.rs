// ABOUTME: Integration tests for parameter resolution and prompting.
// ABOUTME: Covers precedence, prompt ordering, persistence and location quota filtering.

mod support;

use serde_json::{Value, json};
use std::collections::HashMap;

use support::{Answer, FakeControlPlane, SUBSCRIPTION, ScriptedConsole, init_tracing};
use terrane::config::{LOCATION_ENV_KEY, ParameterFile};
use terrane::control_plane::Usage;
use terrane::diagnostics::{Diagnostics, WarningKind};
use terrane::params::{ParamError, ParameterResolver, ResolveContext, ResolvedParameters, SessionContext};
use terrane::store::{ConfigStore, MemoryStore};
use terrane::template::{ParamValue, Template};
use terrane::types::SubscriptionId;

fn template(parameters: Value) -> Template {
    Template::from_arm_json(serde_json::to_vec(&json!({ "parameters": parameters })).unwrap())
        .unwrap()
}

fn no_file() -> ParameterFile {
    ParameterFile::default()
}

struct Harness {
    plane: FakeControlPlane,
    config: MemoryStore,
    env: MemoryStore,
    session: SessionContext,
    diagnostics: Diagnostics,
}

impl Harness {
    fn new() -> Self {
        Self::with_plane(FakeControlPlane::new())
    }

    fn with_plane(plane: FakeControlPlane) -> Self {
        init_tracing();
        Self {
            plane,
            config: MemoryStore::new(),
            env: MemoryStore::new(),
            session: SessionContext::new(Some(SubscriptionId::new(SUBSCRIPTION))),
            diagnostics: Diagnostics::default(),
        }
    }

    async fn resolve(
        &mut self,
        resolver: &mut ParameterResolver,
        template: &Template,
        file: &ParameterFile,
        console: &ScriptedConsole,
    ) -> Result<ResolvedParameters, ParamError> {
        resolver
            .resolve(
                template,
                file,
                ResolveContext {
                    console,
                    control_plane: &self.plane,
                    config: &mut self.config,
                    env: &mut self.env,
                    session: &mut self.session,
                    diagnostics: &mut self.diagnostics,
                },
            )
            .await
    }

    async fn resolve_once(
        &mut self,
        template: &Template,
        file: &ParameterFile,
        console: &ScriptedConsole,
    ) -> Result<ResolvedParameters, ParamError> {
        self.resolve(&mut ParameterResolver::new(), template, file, console)
            .await
    }
}

mod precedence {
    use super::*;

    #[tokio::test]
    async fn file_values_beat_saved_values_and_defaults_are_left_out() {
        let mut h = Harness::new();
        h.config
            .set("infra.parameters.size", json!(3))
            .unwrap();
        let t = template(json!({
            "size": {"type": "int"},
            "tier": {"type": "string", "defaultValue": "basic"},
        }));
        let file = ParameterFile::from_values(HashMap::from([("size".to_string(), json!(5))]));
        let console = ScriptedConsole::new([]);

        let resolved = h.resolve_once(&t, &file, &console).await.unwrap();

        assert_eq!(resolved.get("size"), Some(&ParamValue::Number(5)));
        assert!(!resolved.contains("tier"));
        assert!(console.asked().is_empty());
    }

    #[tokio::test]
    async fn saved_values_are_reused_without_saving_again() {
        let mut h = Harness::new();
        h.config
            .set("infra.parameters.size", json!(3))
            .unwrap();
        let t = template(json!({"size": {"type": "int"}}));
        let console = ScriptedConsole::new([]);

        let resolved = h.resolve_once(&t, &no_file(), &console).await.unwrap();

        assert_eq!(resolved.get("size"), Some(&ParamValue::Number(3)));
        assert_eq!(h.config.save_count(), 0);
    }

    #[tokio::test]
    async fn stale_saved_value_is_discarded_and_prompted_again() {
        let mut h = Harness::new();
        h.config
            .set("infra.parameters.size", json!("big"))
            .unwrap();
        let t = template(json!({"size": {"type": "int"}}));
        let console = ScriptedConsole::new([Answer::Text("4")]);

        let resolved = h.resolve_once(&t, &no_file(), &console).await.unwrap();

        assert_eq!(resolved.get("size"), Some(&ParamValue::Number(4)));
        assert!(h.diagnostics.has(WarningKind::StaleSavedValue));
        assert_eq!(h.config.get("infra.parameters.size"), Some(json!(4)));
        assert_eq!(h.config.save_count(), 1);
    }

    #[tokio::test]
    async fn second_resolution_uses_the_cache() {
        let mut h = Harness::new();
        let t = template(json!({"name": {"type": "string"}}));
        let mut resolver = ParameterResolver::new();

        let first = ScriptedConsole::new([Answer::Text("web")]);
        let resolved = h.resolve(&mut resolver, &t, &no_file(), &first).await.unwrap();

        let second = ScriptedConsole::new([]);
        let again = h.resolve(&mut resolver, &t, &no_file(), &second).await.unwrap();

        assert_eq!(resolved, again);
        assert!(second.asked().is_empty());
    }
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn manual_secure_values_are_not_saved() {
        let mut h = Harness::new();
        let t = template(json!({
            "prefix": {"type": "string"},
            "adminPassword": {"type": "securestring"},
        }));
        let console = ScriptedConsole::new([Answer::Text("app"), Answer::Text("Sup3r$ecret")]);

        let resolved = h.resolve_once(&t, &no_file(), &console).await.unwrap();

        assert_eq!(
            resolved.get("adminPassword"),
            Some(&ParamValue::String("Sup3r$ecret".into()))
        );
        assert_eq!(h.config.get("infra.parameters.prefix"), Some(json!("app")));
        assert_eq!(h.config.get("infra.parameters.adminPassword"), None);
        assert_eq!(
            console.asked()[1],
            "Enter a value for the 'adminPassword' infrastructure secured parameter:"
        );
    }

    #[tokio::test]
    async fn generated_values_are_saved_in_one_batch() {
        let mut h = Harness::new();
        let t = template(json!({
            "dbPassword": {
                "type": "securestring",
                "metadata": {"terrane": {"type": "generate", "config": {"length": 20}}}
            },
            "prefix": {"type": "string"},
        }));
        let console = ScriptedConsole::new([Answer::Text("app")]);

        h.resolve_once(&t, &no_file(), &console).await.unwrap();

        let saved = h.config.get("infra.parameters.dbPassword").unwrap();
        assert_eq!(saved.as_str().unwrap().len(), 20);
        assert_eq!(h.config.save_count(), 1);
        assert_eq!(console.asked().len(), 1);
    }
}

mod prompting {
    use super::*;

    #[tokio::test]
    async fn invalid_input_is_reported_and_asked_again() {
        let mut h = Harness::new();
        let t = template(json!({"replicas": {"type": "int", "minValue": 1, "maxValue": 10}}));
        let console = ScriptedConsole::new([Answer::Text("0"), Answer::Text("7")]);

        let resolved = h.resolve_once(&t, &no_file(), &console).await.unwrap();

        assert_eq!(resolved.get("replicas"), Some(&ParamValue::Number(7)));
        assert_eq!(console.asked().len(), 2);
        let errors: Vec<String> = console
            .messages()
            .into_iter()
            .filter(|m| m.starts_with("Error: "))
            .collect();
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn bool_and_allowed_values_are_selected() {
        let mut h = Harness::new();
        let t = template(json!({
            "enableLogs": {"type": "bool"},
            "sku": {"type": "string", "allowedValues": ["S1", "P1"]},
        }));
        let console = ScriptedConsole::new([Answer::Select(1), Answer::Select(1)]);

        let resolved = h.resolve_once(&t, &no_file(), &console).await.unwrap();

        assert_eq!(resolved.get("enableLogs"), Some(&ParamValue::Bool(true)));
        assert_eq!(resolved.get("sku"), Some(&ParamValue::String("P1".into())));
        assert_eq!(
            console.select_options(),
            vec![
                vec!["False".to_string(), "True".to_string()],
                vec!["S1".to_string(), "P1".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn cycle_fails_before_any_prompt() {
        let mut h = Harness::new();
        let t = template(json!({
            "a": {"type": "string", "metadata": {"terrane": {"type": "location", "usageName": "x.$(p:b)"}}},
            "b": {"type": "string", "metadata": {"terrane": {"type": "location", "usageName": "y.$(p:a)"}}},
            "c": {"type": "string"},
        }));
        let console = ScriptedConsole::new([Answer::Text("never")]);

        let err = h.resolve_once(&t, &no_file(), &console).await.unwrap_err();

        assert!(matches!(err, ParamError::DependencyCycle { .. }));
        assert!(err.is_configuration());
        assert!(console.asked().is_empty());
        assert_eq!(h.plane.location_queries(), 0);
    }

    #[tokio::test]
    async fn unknown_reference_is_a_configuration_error() {
        let mut h = Harness::new();
        let t = template(json!({
            "a": {"type": "string", "metadata": {"terrane": {"usageName": "x.$(p:missing)"}}},
        }));
        let console = ScriptedConsole::new([]);

        let err = h.resolve_once(&t, &no_file(), &console).await.unwrap_err();
        assert!(matches!(err, ParamError::UnknownReference { .. }));
    }

    #[tokio::test]
    async fn invalid_metadata_default_fails_before_any_prompt() {
        let mut h = Harness::new();
        let t = template(json!({
            "first": {"type": "string"},
            "sku": {
                "type": "string",
                "allowedValues": ["S1", "P1"],
                "metadata": {"terrane": {"default": "X9"}}
            },
        }));
        let console = ScriptedConsole::new([Answer::Text("x")]);

        let err = h.resolve_once(&t, &no_file(), &console).await.unwrap_err();

        assert!(matches!(err, ParamError::InvalidAllowedDefault { .. }));
        assert!(console.asked().is_empty());
    }
}

mod locations {
    use super::*;

    fn quota(name: &str, current: f64, limit: f64) -> Usage {
        Usage {
            name: name.into(),
            current_value: current,
            limit,
        }
    }

    #[tokio::test]
    async fn referenced_parameter_is_prompted_first_and_fills_quota_names() {
        let plane = FakeControlPlane::new()
            .with_usages("eastus", vec![quota("OpenAI.Standard.gpt", 0.0, 100.0)])
            .with_usages("westus", vec![quota("OpenAI.Standard.gpt", 95.0, 100.0)]);
        let mut h = Harness::with_plane(plane);
        let t = template(json!({
            "aiLocation": {
                "type": "string",
                "metadata": {"terrane": {"type": "location", "usageName": "OpenAI.Standard.$(p:model), 10"}}
            },
            "model": {"type": "string"},
        }));
        let console = ScriptedConsole::new([Answer::Text("gpt"), Answer::Select(0)]);

        let resolved = h.resolve_once(&t, &no_file(), &console).await.unwrap();

        assert!(console.asked()[0].contains("'model'"));
        assert_eq!(console.select_options(), vec![vec!["East US (eastus)".to_string()]]);
        assert_eq!(resolved.get("aiLocation"), Some(&ParamValue::String("eastus".into())));
    }

    #[tokio::test]
    async fn locations_failing_quota_queries_are_skipped() {
        let plane = FakeControlPlane::new()
            .with_usages("eastus", vec![quota("Cores", 0.0, 10.0)])
            .with_failing_usages("westus");
        let mut h = Harness::with_plane(plane);
        let t = template(json!({
            "location": {"type": "string", "metadata": {"terrane": {"type": "location", "usageName": "Cores, 2"}}},
        }));
        let console = ScriptedConsole::new([Answer::Select(0)]);

        h.resolve_once(&t, &no_file(), &console).await.unwrap();

        assert_eq!(console.select_options(), vec![vec!["East US (eastus)".to_string()]]);
    }

    #[tokio::test]
    async fn no_location_with_quota_is_an_error() {
        let mut h = Harness::new();
        let t = template(json!({
            "location": {"type": "string", "metadata": {"terrane": {"type": "location", "usageName": "Cores"}}},
        }));
        let console = ScriptedConsole::new([Answer::Select(0)]);

        let err = h.resolve_once(&t, &no_file(), &console).await.unwrap_err();

        assert!(matches!(err, ParamError::NoQuotaLocation { .. }));
        assert!(console.asked().is_empty());
    }

    #[tokio::test]
    async fn shared_location_is_fixed_and_written_back() {
        let mut h = Harness::new();
        let t = template(json!({
            "location": {"type": "string", "metadata": {"terrane": {"type": "location"}}},
        }));
        let file = ParameterFile::from_json(
            r#"{"parameters": {"location": {"value": "${AZURE_LOCATION}"}}}"#,
            |_| None,
        )
        .unwrap();
        let console = ScriptedConsole::new([Answer::Select(1)]);

        let resolved = h.resolve_once(&t, &file, &console).await.unwrap();

        assert_eq!(resolved.get("location"), Some(&ParamValue::String("westus".into())));
        assert_eq!(h.session.shared_location(), Some("westus"));
        assert!(h.session.location_fixed_this_run());
        assert_eq!(h.env.get_string(LOCATION_ENV_KEY).as_deref(), Some("westus"));
    }

    #[tokio::test]
    async fn shared_location_already_known_is_not_prompted() {
        let mut h = Harness::new();
        h.session = SessionContext::new(Some(SubscriptionId::new(SUBSCRIPTION))).with_location("eastus");
        let t = template(json!({
            "location": {"type": "string", "metadata": {"terrane": {"type": "location"}}},
        }));
        let file = ParameterFile::from_json(
            r#"{"parameters": {"location": {"value": "${AZURE_LOCATION}"}}}"#,
            |_| None,
        )
        .unwrap();
        let console = ScriptedConsole::new([]);

        let resolved = h.resolve_once(&t, &file, &console).await.unwrap();

        assert_eq!(resolved.get("location"), Some(&ParamValue::String("eastus".into())));
        assert_eq!(h.env.save_count(), 0);
    }

    #[tokio::test]
    async fn resource_group_parameters_list_existing_groups() {
        let plane = FakeControlPlane::new()
            .with_group("rg-b", vec![])
            .with_group("rg-a", vec![]);
        let mut h = Harness::with_plane(plane);
        let t = template(json!({
            "group": {"type": "string", "metadata": {"terrane": {"type": "resourceGroup"}}},
        }));
        let console = ScriptedConsole::new([Answer::Select(1)]);

        let resolved = h.resolve_once(&t, &no_file(), &console).await.unwrap();

        assert_eq!(resolved.get("group"), Some(&ParamValue::String("rg-b".into())));
        assert!(console
            .messages()
            .contains(&"Parameter group requires an existing resource group.".to_string()));
    }
}
