//! Decoding partially evaluated trees into Rust types

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;
use weft_expr::{Context, Error, Tree, Unresolvable};

mod test_support;
use test_support::{empty, fixture, tree};

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct Step {
    image: String,
    args: Vec<String>,
    resources: Resources,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct Resources {
    replicas: Option<i64>,
    region: String,
}

fn step_spec() -> Tree {
    tree(json!({
        "image": {"$fn.concat": ["alpine:", "3.19"]},
        "args": ["--region", "${parameters.region}"],
        "resources": {
            "replicas": {"$type": "Parameter", "name": "replicas"},
            "region": "eu",
        },
        "token": {"$type": "Secret", "name": "token"},
    }))
}

#[test]
fn test_complete_tree_decodes() {
    let (step, unresolvable): (Step, _) = fixture()
        .evaluate_into(&Context::new(), &step_spec())
        .unwrap();
    assert!(unresolvable.is_empty());
    assert_eq!(
        step,
        Step {
            image: "alpine:3.19".into(),
            args: vec!["--region".into(), "eu-west-1".into()],
            resources: Resources {
                replicas: Some(3),
                region: "eu".into(),
            },
            token: Some("s3cr3t".into()),
        }
    );
}

#[test]
fn test_pending_fields_are_left_out() {
    let (step, unresolvable): (Step, _) = empty()
        .evaluate_into(&Context::new(), &step_spec())
        .unwrap();

    assert_eq!(step.image, "alpine:3.19");
    assert!(step.args.is_empty());
    assert_eq!(step.resources.replicas, None);
    assert_eq!(step.resources.region, "eu");
    assert_eq!(step.token, None);

    let expected = Unresolvable::parameter("region")
        .merged(Unresolvable::parameter("replicas"))
        .merged(Unresolvable::secret("token"));
    assert_eq!(unresolvable, expected);
}

#[test]
fn test_pending_root_decodes_defaults() {
    let spec = tree(json!({"$type": "Secret", "name": "step"}));
    let (step, unresolvable): (Step, _) = empty().evaluate_into(&Context::new(), &spec).unwrap();
    assert_eq!(step, Step::default());
    assert_eq!(unresolvable, Unresolvable::secret("step"));
}

#[test]
fn test_computed_mappings_decode_whole() {
    let spec = tree(json!({"$fn.merge": [{"a": 1}, {"b": 2}]}));
    let (merged, unresolvable): (BTreeMap<String, i64>, _) =
        empty().evaluate_into(&Context::new(), &spec).unwrap();
    assert!(unresolvable.is_empty());
    assert_eq!(merged, BTreeMap::from([("a".into(), 1), ("b".into(), 2)]));
}

#[test]
fn test_decode_errors_name_the_problem() {
    let spec = tree(json!({"image": 42}));
    let err = empty()
        .evaluate_into::<Step>(&Context::new(), &spec)
        .unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)));

    let spec = tree(json!({"nested": {"bad": {"$fn.nope": []}}}));
    let (_, unresolvable): (BTreeMap<String, serde_json::Value>, _) =
        empty().evaluate_into(&Context::new(), &spec).unwrap();
    assert_eq!(unresolvable.invocations.len(), 1);
}

#[test]
fn test_evaluation_errors_carry_the_field_path() {
    let spec = tree(json!({"resources": {"replicas": {"$fn.jsonUnmarshal": "{not json"}}}));
    let err = empty()
        .evaluate_into::<Step>(&Context::new(), &spec)
        .unwrap_err();
    assert!(err.to_string().contains("resources"), "{err}");
}
