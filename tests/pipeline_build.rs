//! End-to-end build scenarios driving the bundled Tera engine.

use kraft::build::COMPONENT_LABEL_KEY;
use kraft::environment::{Destination, Environment};
use kraft::eval::tera::TeraEvaluator;
use kraft::pipeline::Pipeline;
use kraft::project::Project;
use kraft::registry::{Component, Registry};
use serde_json::json;
use std::sync::Arc;

/// Overlay that passes the injected parameter document through unchanged.
const PASSTHROUGH_OVERLAY: &str = r#"{{ extVar(name="__ksonnet/params") | json_encode() }}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn project_with_env(env_name: &str) -> Project {
    init_tracing();
    let mut project = Project::in_memory();
    project.add_environment(Environment::new(
        env_name,
        Destination::new("https://localhost:6443", "dev"),
    ));
    project.set_environment_params(env_name, PASSTHROUGH_OVERLAY);
    project
}

fn service_component(name: &str) -> Component {
    Component::template(
        format!("{name}.jsonnet"),
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": name }
        })
        .to_string(),
    )
}

fn pipeline(project: Project, registry: Registry, env_name: &str) -> Pipeline {
    Pipeline::new(project, registry, env_name, Arc::new(TeraEvaluator::factory()))
}

#[tokio::test]
async fn two_components_build_into_two_labeled_objects() {
    let project = project_with_env("default");
    let mut registry = Registry::new();
    let root = registry.root_mut();
    root.insert_component(service_component("guestbook")).unwrap();
    root.insert_component(service_component("ui")).unwrap();

    let objects = pipeline(project, registry, "default").objects(&[]).await.unwrap();

    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].component(), Some("guestbook"));
    assert_eq!(objects[1].component(), Some("ui"));
    assert!(objects.iter().all(|o| o.kind() == Some("Service")));

    let value = objects[0].clone().into_value();
    assert_eq!(value["metadata"]["name"], json!("guestbook"));
}

#[tokio::test]
async fn parameters_flow_from_override_into_rendered_objects() {
    let project = project_with_env("prod");
    let mut registry = Registry::new();
    let root = registry.root_mut();
    root.insert_component(Component::template(
        "web.jsonnet",
        concat!(
            r#"{% set params = extVar(name="__ksonnet/params") %}"#,
            r#"{"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "web"}, "#,
            r#""spec": {"replicas": {{ params.components.web.replicas }}}}"#,
        ),
    ))
    .unwrap();
    root.set_global_params(json!({ "components": { "web": { "replicas": 1 } } }));
    root.set_env_override("prod", json!({ "components": { "web": { "replicas": 3 } } }));

    let objects = pipeline(project, registry, "prod").objects(&[]).await.unwrap();

    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].as_map()["spec"]["replicas"], json!(3));
}

#[tokio::test]
async fn modules_aggregate_in_lexicographic_path_order() {
    let project = project_with_env("default");
    let mut registry = Registry::new();
    registry.root_mut().insert_component(service_component("web")).unwrap();
    registry.add_module("auth/certs").insert_component(service_component("ca")).unwrap();
    registry.add_module("auth").insert_component(service_component("gate")).unwrap();

    let objects = pipeline(project, registry, "default").objects(&[]).await.unwrap();

    let labels: Vec<_> = objects.iter().filter_map(|o| o.component()).collect();
    // Root module first, then /auth, then /auth/certs - nested paths
    // collapse into dotted label tokens.
    assert_eq!(labels, vec!["web", "auth.gate", "auth.certs.ca"]);
}

#[tokio::test]
async fn filtered_build_is_the_matching_subset_of_the_unfiltered_build() {
    let project = project_with_env("default");
    let mut registry = Registry::new();
    registry.root_mut().insert_component(service_component("web")).unwrap();
    registry.add_module("auth").insert_component(service_component("gate")).unwrap();

    let pipeline = pipeline(project, registry, "default");

    let all = pipeline.objects(&[]).await.unwrap();
    let filtered = pipeline.objects(&["auth.gate".to_string()]).await.unwrap();

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].component(), Some("auth.gate"));
    assert!(all.contains(&filtered[0]));

    // An empty filter means no filtering at all.
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn list_wrappers_never_reach_the_output() {
    let project = project_with_env("default");
    let mut registry = Registry::new();
    registry
        .root_mut()
        .insert_component(Component::template(
            "bundle.jsonnet",
            json!({
                "apiVersion": "v1",
                "kind": "List",
                "items": [
                    { "apiVersion": "v1", "kind": "Service", "metadata": { "name": "svc" } },
                    { "apiVersion": "v1", "kind": "ConfigMap", "metadata": { "name": "cfg" } },
                ]
            })
            .to_string(),
        ))
        .unwrap();

    let objects = pipeline(project, registry, "default").objects(&[]).await.unwrap();

    assert_eq!(objects.len(), 2);
    for object in &objects {
        assert_ne!(object.kind(), Some("List"));
        assert_eq!(object.component(), Some("bundle"));
    }
}

#[tokio::test]
async fn raw_documents_receive_parameters_via_patch() {
    let project = project_with_env("default");
    let mut registry = Registry::new();
    let root = registry.root_mut();
    root.insert_component(Component::raw(
        "cfg.yaml",
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "cfg" },
            "data": { "level": "info" }
        }),
    ))
    .unwrap();
    root.set_global_params(json!({
        "components": { "cfg": { "data": { "level": "debug" } } }
    }));

    let objects = pipeline(project, registry, "default").objects(&[]).await.unwrap();

    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].as_map()["data"]["level"], json!("debug"));
}

#[tokio::test]
async fn yaml_is_a_multi_document_stream_of_the_same_objects() {
    let project = project_with_env("default");
    let mut registry = Registry::new();
    let root = registry.root_mut();
    root.insert_component(service_component("guestbook")).unwrap();
    root.insert_component(service_component("ui")).unwrap();

    let yaml = pipeline(project, registry, "default").yaml(&[]).await.unwrap();

    assert_eq!(yaml.matches("---").count(), 1);
    assert_eq!(yaml.matches("kind: Service").count(), 2);
    assert!(yaml.contains(&format!("{COMPONENT_LABEL_KEY}: guestbook")));
    assert!(yaml.contains(&format!("{COMPONENT_LABEL_KEY}: ui")));
}

#[tokio::test]
async fn build_fails_with_context_when_a_component_does_not_render() {
    let project = project_with_env("default");
    let mut registry = Registry::new();
    registry
        .root_mut()
        .insert_component(Component::template("broken.jsonnet", "{{ undefined_fn() }}"))
        .unwrap();

    let err = pipeline(project, registry, "default").objects(&[]).await.unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("building module \"/\""), "unexpected error: {chain}");
}

#[test]
fn env_parameters_without_inheritance_is_a_zero_valued_stub() {
    let project = project_with_env("default");
    let mut registry = Registry::new();
    registry.root_mut().insert_component(service_component("web")).unwrap();
    registry.add_module("auth").insert_component(service_component("gate")).unwrap();

    let pipeline = pipeline(project, registry, "default");
    let stub = pipeline.env_parameters("/", false).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&stub).unwrap();
    assert_eq!(parsed, json!({ "components": { "auth.gate": {}, "web": {} } }));
}

#[test]
fn env_parameters_with_inheritance_carries_merged_values() {
    let project = project_with_env("prod");
    let mut registry = Registry::new();
    let root = registry.root_mut();
    root.insert_component(service_component("web")).unwrap();
    root.set_global_params(json!({ "components": { "web": { "replicas": 1, "tag": "v1" } } }));
    root.set_env_override("prod", json!({ "components": { "web": { "replicas": 5 } } }));

    let pipeline = pipeline(project, registry, "prod");
    let resolved = pipeline.env_parameters("/", true).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&resolved).unwrap();
    assert_eq!(parsed["components"]["web"], json!({ "replicas": 5, "tag": "v1" }));
}
