//! Integration tests for graph documents (YAML / JSON)

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use serde_json::json;

use wavegraph::component::Constant;
use wavegraph::{
    ComponentDescriptor, ComponentRegistry, Graph, GraphSpec, InputSocket, OutputSocket, Pipeline,
    RunConfig, SocketType, SocketValues, WaveError,
};

const FAN_IN: &str = r#"
schema: wavegraph/graph@1
components:
  left:
    type: Constant
    params: { value: [1, 2], type: "list[int]" }
  right:
    type: Constant
    params: { value: [3], type: "list[int]" }
  join:
    type: ListJoiner
    params: { type: int }
connections:
  - { sender: left.value, receiver: join.values }
  - { sender: right.value, receiver: join.values }
"#;

fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::with_builtins();
    registry.register("Scale", |params| {
        let factor = params.get("factor").and_then(|f| f.as_i64()).unwrap_or(1);
        ComponentDescriptor::builder("Scale")
            .input(InputSocket::required("x", SocketType::Int))
            .output(OutputSocket::new("y", SocketType::Int))
            .params(json!({ "factor": factor }))
            .blocking(move |inputs| {
                let x = inputs.get("x").and_then(|v| v.as_i64()).unwrap_or_default();
                Ok(SocketValues::from([("y".to_string(), json!(x * factor))]))
            })
    });
    registry
}

#[tokio::test]
async fn test_yaml_document_runs() {
    let graph = GraphSpec::from_yaml(FAN_IN)
        .unwrap()
        .build(&ComponentRegistry::with_builtins())
        .unwrap();
    let output = Pipeline::new(graph)
        .unwrap()
        .run(BTreeMap::new(), &RunConfig::default())
        .await
        .unwrap();
    assert_eq!(output.get("join.values"), Some(&json!([1, 2, 3])));
}

#[test]
fn test_value_roundtrip_keeps_structure() {
    let mut graph = Graph::new();
    graph
        .add_component("seed", Constant::from_params(&json!({"value": 2, "type": "int"})).unwrap())
        .unwrap();
    let registry = registry();
    graph
        .add_component("scale", registry.create("Scale", &json!({"factor": 3})).unwrap())
        .unwrap();
    graph.connect("seed.value", "scale.x").unwrap();
    graph.expose_output("scale.y").unwrap();

    let value = graph.to_value();
    assert_eq!(value["schema"], json!("wavegraph/graph@1"));
    assert_eq!(value["components"]["scale"]["type"], json!("Scale"));
    assert_eq!(value["components"]["scale"]["params"], json!({"factor": 3}));
    assert_eq!(value["outputs"], json!(["scale.y"]));

    let rebuilt = Graph::from_value(value, &registry).unwrap();
    assert_eq!(rebuilt.to_serializable(), graph.to_serializable());
    assert_eq!(rebuilt.output_endpoints(), graph.output_endpoints());
}

#[tokio::test]
async fn test_rebuilt_graph_runs_like_original() {
    let registry = registry();
    let mut graph = Graph::new();
    graph
        .add_component("scale", registry.create("Scale", &json!({"factor": 4})).unwrap())
        .unwrap();

    let yaml = graph.to_serializable().to_yaml().unwrap();
    let rebuilt = GraphSpec::from_yaml(&yaml).unwrap().build(&registry).unwrap();
    let output = Pipeline::new(rebuilt)
        .unwrap()
        .run(BTreeMap::from([("scale.x".to_string(), json!(5))]), &RunConfig::default())
        .await
        .unwrap();
    assert_eq!(output.get("scale.y"), Some(&json!(20)));
}

#[test]
fn test_json_document_with_unknown_type_fails() {
    let doc = json!({
        "schema": "wavegraph/graph@1",
        "components": { "x": { "type": "Mystery" } },
    });
    let err = GraphSpec::from_json(&doc.to_string())
        .unwrap()
        .build(&ComponentRegistry::with_builtins())
        .unwrap_err();
    assert!(matches!(err, WaveError::UnknownComponentType { ref type_name } if type_name == "Mystery"));
}

#[test]
fn test_document_connections_are_rechecked() {
    let doc = FAN_IN.replace("type: int }", "type: str }");
    let err = GraphSpec::from_yaml(&doc)
        .unwrap()
        .build(&ComponentRegistry::with_builtins())
        .unwrap_err();
    assert_eq!(err.code(), "WAVE-006");
}

#[test]
fn test_document_with_bad_endpoint_fails() {
    let doc = FAN_IN.replace("sender: left.value", "sender: left");
    let err = GraphSpec::from_yaml(&doc)
        .unwrap()
        .build(&ComponentRegistry::with_builtins())
        .unwrap_err();
    assert!(matches!(err, WaveError::MalformedEndpoint { .. }));
}
