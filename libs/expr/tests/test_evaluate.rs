//! End-to-end evaluation of workflow trees

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use weft_expr::{
    workflow, Context, Error, Evaluator, MemoryParameterTypeResolver, Options, Tree,
    Unresolvable, DEPTH_FULL,
};

mod test_support;
use test_support::{empty, eval, fixture, tree};

fn secret(name: &str) -> serde_json::Value {
    json!({"$type": "Secret", "name": name})
}

#[test]
fn test_literal_passthrough() {
    let spec = json!({"a": 1, "b": [true, null, "x", 2.5], "c": {"d": {}}});
    let result = eval(empty(), spec.clone()).unwrap();
    assert!(result.complete());
    assert_eq!(result.value, tree(spec));
}

#[test]
fn test_unresolved_secret() {
    let result = eval(empty(), json!({"env": {"TOKEN": secret("token")}})).unwrap();
    assert_eq!(result.unresolvable, Unresolvable::secret("token"));
    assert_eq!(result.value, tree(json!({"env": {"TOKEN": secret("token")}})));

    let result = eval(fixture(), json!({"env": {"TOKEN": secret("token")}})).unwrap();
    assert!(result.complete());
    assert_eq!(result.value, tree(json!({"env": {"TOKEN": "s3cr3t"}})));
}

#[test]
fn test_partial_evaluation_round_trip() {
    let spec = json!([secret("token"), "${parameters.region}", {"$fn.concat": ["x", "y"]}]);

    let first = eval(empty(), spec).unwrap();
    assert_eq!(first.unresolvable.len(), 2);
    assert_eq!(first.value.as_sequence().map(Vec::len), Some(3));
    assert_eq!(first.value.as_sequence().map(|s| s[2].clone()), Some(Tree::from("xy")));

    let second = fixture()
        .evaluate_all(&Context::new(), &first.value)
        .unwrap();
    assert!(second.complete());
    assert_eq!(second.value, tree(json!(["s3cr3t", "eu-west-1", "xy"])));
}

#[test]
fn test_type_references() {
    let result = eval(
        fixture(),
        json!({
            "connection": {"$type": "Connection", "type": "aws", "name": "prod"},
            "output": {"$type": "Output", "from": "build", "name": "digest"},
            "legacy": {"$type": "Output", "taskName": "build", "name": "image"},
            "parameter": {"$type": "Parameter", "name": "replicas"},
            "answer": {"$type": "Answer", "askRef": "approval", "name": "approved"},
        }),
    )
    .unwrap();
    assert!(result.complete());
    assert_eq!(
        result.value,
        tree(json!({
            "connection": {"region": "us-east-1", "accessKey": "AKIA"},
            "output": "sha256:abc",
            "legacy": "registry/app:1.2",
            "parameter": 3,
            "answer": true,
        }))
    );
}

#[test]
fn test_unresolved_type_references_are_recorded() {
    let result = eval(
        empty(),
        json!([
            {"$type": "Connection", "type": "aws", "name": "prod"},
            {"$type": "Output", "from": "build", "name": "digest"},
            {"$type": "Parameter", "name": "replicas"},
            {"$type": "Answer", "askRef": "approval", "name": "approved"},
        ]),
    )
    .unwrap();

    let mut expected = Unresolvable::connection("aws", "prod");
    expected.extends(Unresolvable::output("build", "digest"));
    expected.extends(Unresolvable::parameter("replicas"));
    expected.extends(Unresolvable::answer("approval", "approved"));
    assert_eq!(result.unresolvable, expected);
}

#[test]
fn test_reference_fields_are_evaluated_first() {
    let spec = json!({"$type": "Secret", "name": "${parameters.region}"});

    // The field itself is pending, so only the parameter is reported
    let result = eval(empty(), spec.clone()).unwrap();
    assert_eq!(result.unresolvable, Unresolvable::parameter("region"));
    assert_eq!(result.value, tree(spec.clone()));

    let result = eval(fixture(), spec).unwrap();
    assert_eq!(result.unresolvable, Unresolvable::secret("eu-west-1"));
    assert_eq!(
        result.value,
        tree(json!({"$type": "Secret", "name": "eu-west-1"}))
    );
}

#[test]
fn test_malformed_type_references() {
    let err = eval(fixture(), json!({"$type": "Secret"})).unwrap_err();
    assert!(matches!(err, Error::InvalidType { ref type_name, .. } if type_name == "Secret"));
    assert!(matches!(err.root_cause(), Error::MissingField { field } if field == "name"));

    let err = eval(fixture(), json!({"$type": "Secret", "name": 7})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::UnexpectedType { .. }));

    let err = eval(fixture(), json!({"$type": "Output", "name": "x"})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::MissingField { field } if field == "from"));
}

#[test]
fn test_unknown_type_is_walked() {
    let result = eval(
        fixture(),
        json!({"$type": "Custom", "user": "${secrets.user}"}),
    )
    .unwrap();
    assert_eq!(
        result.value,
        tree(json!({"$type": "Custom", "user": "admin"}))
    );
}

#[test]
fn test_data_queries() {
    let result = eval(fixture(), json!({"$type": "Data", "query": "limits.cpu"})).unwrap();
    assert_eq!(result.value, Tree::from(2_i64));

    let result = eval(
        fixture(),
        json!({"$type": "Data", "name": "config", "query": "hosts[1]"}),
    )
    .unwrap();
    assert_eq!(result.value, Tree::from("b.example.com"));

    let err = eval(fixture(), json!({"$type": "Data", "name": "other", "query": "env"})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::DataResolverNotFound { name } if name == "other"));

    let err = eval(empty(), json!({"$type": "Data", "query": "env"})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::DataResolverNotFound { .. }));

    let err = eval(fixture(), json!({"$type": "Data", "query": "nope"})).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_positional_invocation_with_partial_argument() {
    let ev = workflow::evaluator(Options::default().with_parameter_resolver(Arc::new(
        MemoryParameterTypeResolver::new([("region", Tree::from("eu-west-1"))]),
    )));
    let spec = json!({"$fn.concat": ["${parameters.region}", "/", secret("token")]});

    let result = eval(&ev, spec).unwrap();
    assert_eq!(result.unresolvable, Unresolvable::secret("token"));
    // Resolved arguments are kept in their evaluated form
    assert_eq!(
        result.value,
        tree(json!({"$fn.concat": ["eu-west-1", "/", secret("token")]}))
    );

    let result = fixture()
        .evaluate_all(&Context::new(), &result.value)
        .unwrap();
    assert_eq!(result.value, Tree::from("eu-west-1/s3cr3t"));
}

#[test]
fn test_invocation_forms() {
    let result = eval(fixture(), json!({"$fn.toString": 5})).unwrap();
    assert_eq!(result.value, Tree::from("5"));

    let result = eval(
        fixture(),
        json!({"$fn.merge": {"objects": [{"a": 1}, {"b": "${secrets.user}"}]}}),
    )
    .unwrap();
    assert_eq!(result.value, tree(json!({"a": 1, "b": "admin"})));

    // Arguments computed by a template still pick the calling convention
    let result = eval(fixture(), json!({"$fn.concat": "${['a', 'b']}"})).unwrap();
    assert_eq!(result.value, Tree::from("ab"));
}

#[test]
fn test_unknown_function_is_unresolvable() {
    let spec = json!({"$fn.frobnicate": [1, 2]});
    let result = eval(fixture(), spec.clone()).unwrap();
    assert_eq!(result.value, tree(spec));
    assert_eq!(
        result.unresolvable,
        Unresolvable::invocation("frobnicate", Error::FunctionNotFound)
    );
}

#[test]
fn test_function_errors_name_the_function() {
    let err = eval(fixture(), json!({"$fn.toString": [1, 2]})).unwrap_err();
    assert!(matches!(err, Error::Invocation { ref name, .. } if name == "toString"));
    assert!(matches!(err.root_cause(), Error::Arity { wanted: 1, got: 2, .. }));

    let err = eval(fixture(), json!({"$fn.concat": {"a": 1}})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::KeywordArgsUnsupported));
}

#[test]
fn test_encoding_envelopes() {
    let result = eval(fixture(), json!({"$encoding": "base64", "data": "aGVsbG8="})).unwrap();
    assert_eq!(result.value, Tree::from("hello"));

    let result = eval(fixture(), json!({"$encoding": "", "data": "${secrets.user}"})).unwrap();
    assert_eq!(result.value, Tree::from("admin"));

    let err = eval(fixture(), json!({"$encoding": "rot13", "data": "x"})).unwrap_err();
    assert!(matches!(err, Error::UnknownEncoding(ref name) if name == "rot13"));

    let err = eval(fixture(), json!({"$encoding": "base64", "data": "***"})).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));

    let err = eval(fixture(), json!({"$encoding": "base64"})).unwrap_err();
    assert!(matches!(err, Error::MissingField { .. }));
}

#[test]
fn test_encoding_of_unresolved_data() {
    let spec = json!({"$encoding": "base64", "data": secret("payload")});
    let result = eval(empty(), spec.clone()).unwrap();
    assert_eq!(result.value, tree(spec));
    assert_eq!(result.unresolvable, Unresolvable::secret("payload"));
}

#[test]
fn test_unsupported_runtime_type() {
    #[derive(Debug)]
    struct Handle;

    let spec = Tree::mapping([("handle", Tree::foreign(Handle))]);
    let err = empty()
        .evaluate_all(&Context::new(), &spec)
        .unwrap_err();
    assert!(matches!(err, Error::PathEvaluation { .. }));
    assert!(matches!(err.root_cause(), Error::UnsupportedValue { .. }));
}

#[test]
fn test_depth() {
    let spec = tree(json!({"outer": {"inner": secret("token")}}));
    let ctx = Context::new();

    assert_eq!(fixture().evaluate(&ctx, &spec, 0).unwrap().value, spec);
    assert_eq!(fixture().evaluate(&ctx, &spec, 2).unwrap().value, spec);

    let result = fixture().evaluate(&ctx, &spec, 3).unwrap();
    assert_eq!(result.value, tree(json!({"outer": {"inner": "s3cr3t"}})));
    assert_eq!(
        fixture().evaluate(&ctx, &spec, DEPTH_FULL).unwrap().value,
        result.value
    );
}

#[test]
fn test_cancellation() {
    let ctx = Context::new();
    ctx.cancel();
    let err = fixture()
        .evaluate_all(&ctx, &tree(json!({"a": [1, 2]})))
        .unwrap_err();
    assert!(err.is_cancellation());

    let ctx = Context::new().with_timeout(Duration::ZERO);
    let err = fixture()
        .evaluate_all(&ctx, &tree(json!("x")))
        .unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded));
}

#[test]
fn test_generic_evaluator_ignores_dialect() {
    let spec = tree(json!({"secret": secret("token"), "text": "${secrets.token}"}));
    let result = Evaluator::generic()
        .evaluate_all(&Context::new(), &spec)
        .unwrap();
    assert!(result.complete());
    assert_eq!(result.value, spec);
}

#[test]
fn test_unresolvable_as_error() {
    let result = eval(empty(), json!([secret("a"), "${outputs.build.image}"])).unwrap();
    let err = Error::from(result.unresolvable.as_error().unwrap_err());
    let message = err.to_string();
    assert!(message.contains("secret \"a\""), "{message}");
    assert!(message.contains("output \"image\" from step \"build\""), "{message}");
}
