//! Resolver chains, in-memory resolvers and the template namespaces

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use weft_expr::{
    workflow, ChainConnectionTypeResolvers, ChainDataTypeResolvers, ChainOutputTypeResolvers,
    ChainParameterTypeResolvers, ChainSecretTypeResolvers, ChainStatusTypeResolvers, Context,
    ConnectionTypeResolver, DataTypeResolver, Error, MemoryConnectionTypeResolver,
    MemoryDataTypeResolver, MemoryOutputTypeResolver, MemoryParameterTypeResolver,
    MemorySecretTypeResolver, MemoryStatusTypeResolver, Language, NoOpResolver, Options,
    OutputTypeResolver, ParameterTypeResolver, Result, SecretTypeResolver, StatusTypeResolver,
    Tree, Unresolvable,
};

mod test_support;
use test_support::{empty, eval, fixture, tree};

/// A secret store that is unreachable.
struct Unavailable;

impl SecretTypeResolver for Unavailable {
    fn resolve_secret(&self, _ctx: &Context, _name: &str) -> Result<Option<String>> {
        Err(Error::Resolver("secret store unavailable".into()))
    }
}

#[test]
fn test_chain_returns_first_found() {
    let ctx = Context::new();
    let chain = ChainSecretTypeResolvers::new(vec![
        Arc::new(MemorySecretTypeResolver::new([("a", "first")])),
        Arc::new(NoOpResolver),
        Arc::new(MemorySecretTypeResolver::new([("a", "second"), ("b", "only")])),
    ]);

    assert_eq!(chain.resolve_secret(&ctx, "a").unwrap().as_deref(), Some("first"));
    assert_eq!(chain.resolve_secret(&ctx, "b").unwrap().as_deref(), Some("only"));
    assert_eq!(chain.resolve_secret(&ctx, "c").unwrap(), None);
}

#[test]
fn test_chain_bulk_lookups_prefer_earlier_resolvers() {
    let ctx = Context::new();
    let chain = ChainSecretTypeResolvers::new(vec![
        Arc::new(MemorySecretTypeResolver::new([("a", "first")])),
        Arc::new(MemorySecretTypeResolver::new([("a", "second"), ("b", "only")])),
    ]);
    let all = chain.resolve_all_secrets(&ctx).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["a"], "first");
    assert_eq!(all["b"], "only");

    let outputs = ChainOutputTypeResolvers::new(vec![
        Arc::new(MemoryOutputTypeResolver::new().with("build", "image", "app:1")),
        Arc::new(
            MemoryOutputTypeResolver::new()
                .with("build", "image", "app:0")
                .with("build", "digest", "sha256:abc")
                .with("test", "report", "ok"),
        ),
    ]);
    let all = outputs.resolve_all_outputs(&ctx).unwrap();
    assert_eq!(all["build"]["image"], Tree::from("app:1"));
    assert_eq!(all["build"]["digest"], Tree::from("sha256:abc"));
    assert_eq!(all["test"]["report"], Tree::from("ok"));
}

#[test]
fn test_chain_errors_stop_the_lookup() {
    let chain = ChainSecretTypeResolvers::new(vec![
        Arc::new(Unavailable),
        Arc::new(MemorySecretTypeResolver::new([("a", "found")])),
    ]);
    assert!(matches!(
        chain.resolve_secret(&Context::new(), "a"),
        Err(Error::Resolver(_))
    ));
}

#[test]
fn test_chains_of_every_kind() {
    let ctx = Context::new();

    let connections = ChainConnectionTypeResolvers::new(vec![
        Arc::new(NoOpResolver),
        Arc::new(MemoryConnectionTypeResolver::new().with("aws", "prod", "conn")),
    ]);
    assert_eq!(
        connections.resolve_connection(&ctx, "aws", "prod").unwrap(),
        Some(Tree::from("conn"))
    );

    let parameters = ChainParameterTypeResolvers::new(vec![
        Arc::new(MemoryParameterTypeResolver::new([("n", Tree::from(1_i64))])),
        Arc::new(MemoryParameterTypeResolver::new([("n", Tree::from(2_i64))])),
    ]);
    assert_eq!(parameters.resolve_parameter(&ctx, "n").unwrap(), Some(Tree::from(1_i64)));
    assert_eq!(parameters.resolve_all_parameters(&ctx).unwrap()["n"], Tree::from(1_i64));

    let statuses = ChainStatusTypeResolvers::new(vec![
        Arc::new(MemoryStatusTypeResolver::new().with("build", "failed", false)),
        Arc::new(MemoryStatusTypeResolver::new().with("build", "failed", true)),
    ]);
    assert_eq!(statuses.resolve_status(&ctx, "build", "failed").unwrap(), Some(false));

    let data = ChainDataTypeResolvers::new(vec![
        Arc::new(NoOpResolver),
        Arc::new(MemoryDataTypeResolver::new(json!({"k": "v"}))),
    ]);
    assert_eq!(data.resolve_data(&ctx).unwrap(), Some(tree(json!({"k": "v"}))));
    assert_eq!(ChainDataTypeResolvers::default().resolve_data(&ctx).unwrap(), None);
}

#[test]
fn test_noop_resolver_finds_nothing() {
    let ctx = Context::new();
    assert_eq!(NoOpResolver.resolve_secret(&ctx, "a").unwrap(), None);
    assert_eq!(NoOpResolver.resolve_output(&ctx, "a", "b").unwrap(), None);
    assert!(NoOpResolver.resolve_all_secrets(&ctx).unwrap().is_empty());
    assert!(NoOpResolver.resolve_all_connections(&ctx).unwrap().is_empty());
}

#[test]
fn test_namespaces_expand_to_everything_known() {
    let result = eval(fixture(), json!("${secrets}")).unwrap();
    assert!(result.complete());
    assert_eq!(result.value, tree(json!({"token": "s3cr3t", "user": "admin"})));

    let result = eval(fixture(), json!("${connections.aws}")).unwrap();
    assert_eq!(
        result.value,
        tree(json!({"prod": {"region": "us-east-1", "accessKey": "AKIA"}}))
    );

    let result = eval(fixture(), json!("${outputs}")).unwrap();
    assert_eq!(
        result.value,
        tree(json!({"build": {"image": "registry/app:1.2", "digest": "sha256:abc"}}))
    );

    let result = eval(fixture(), json!("${status.build}")).unwrap();
    assert_eq!(result.value, tree(json!({"succeeded": true, "failed": false})));

    let result = eval(empty(), json!("${parameters}")).unwrap();
    assert_eq!(result.value, Tree::Mapping(BTreeMap::new()));
}

#[test]
fn test_namespace_lookups() {
    let result = eval(
        fixture(),
        json!({
            "region": "${connections.aws.prod.region}",
            "approved": "${answers.approval.approved}",
            "replicas": "${parameters.replicas * 2}",
            "image": "${outputs['build'].image}",
        }),
    )
    .unwrap();
    assert!(result.complete());
    assert_eq!(
        result.value,
        tree(json!({
            "region": "us-east-1",
            "approved": true,
            "replicas": 6,
            "image": "registry/app:1.2",
        }))
    );
}

#[test]
fn test_namespace_keys_must_be_names() {
    let err = eval(fixture(), json!("${secrets[0]}")).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Type(_)));
}

#[test]
fn test_missing_namespace_entries_are_unresolvable() {
    let result = eval(
        fixture(),
        json!(["${connections.gcp.dev}", "${outputs.deploy.url}", "${answers.approval.who}"]),
    )
    .unwrap();
    let expected = Unresolvable::connection("gcp", "dev")
        .merged(Unresolvable::output("deploy", "url"))
        .merged(Unresolvable::answer("approval", "who"));
    assert_eq!(result.unresolvable, expected);
}

#[test]
fn test_resolver_failures_are_errors() {
    let ev = workflow::evaluator(Options::default().with_secret_resolver(Arc::new(Unavailable)));

    let err = eval(&ev, json!({"$type": "Secret", "name": "token"})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Resolver(_)));

    let err = eval(&ev, json!("${secrets.token}")).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Resolver(_)));
}

#[test]
fn test_named_data_resolvers() {
    let ev = workflow::evaluator(
        Options::default()
            .with_data_resolver("inventory", Arc::new(MemoryDataTypeResolver::new(json!({"count": 4}))))
            .with_data_resolver("unavailable", Arc::new(NoOpResolver)),
    );

    let result = eval(&ev, json!({"$type": "Data", "name": "inventory", "query": "count + 1"})).unwrap();
    assert_eq!(result.value, Tree::from(5_i64));

    let result = eval(&ev, json!({"$type": "Data", "name": "unavailable", "query": "count"})).unwrap();
    assert_eq!(result.unresolvable, Unresolvable::data("unavailable"));

    let err = eval(&ev, json!({"$type": "Data", "query": "count"})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::DataResolverNotFound { .. }));
}

/// Resolver data that reads like workflow syntax.
fn lookalikes() -> &'static weft_expr::Evaluator {
    static EV: std::sync::OnceLock<weft_expr::Evaluator> = std::sync::OnceLock::new();
    EV.get_or_init(|| {
        workflow::evaluator(
            Options::default()
                .with_secret_resolver(Arc::new(MemorySecretTypeResolver::new([("pw", "abc${nope}")])))
                .with_parameter_resolver(Arc::new(MemoryParameterTypeResolver::new([
                    ("ref", tree(json!({"$type": "Secret", "name": "token"}))),
                    ("call", tree(json!({"$fn.concat": ["a", "b"]}))),
                ])))
                .with_default_data_resolver(
                    "config",
                    Arc::new(MemoryDataTypeResolver::new(json!({
                        "greeting": "hello ${name}",
                        "ref": {"$type": "Secret", "name": "pw"},
                    }))),
                ),
        )
    })
}

#[test]
fn test_resolved_strings_are_not_templates() {
    let ev = lookalikes();
    let cases = [
        (json!("${secrets.pw}"), json!("abc${nope}")),
        (json!("x ${secrets.pw}"), json!("x abc${nope}")),
        (json!({"$type": "Secret", "name": "pw"}), json!("abc${nope}")),
        (json!({"$fn.concat": ["${secrets.pw}", "!"]}), json!("abc${nope}!")),
        (json!("${secrets.pw ?? 'unset'}"), json!("abc${nope}")),
        (json!("${secrets}"), json!({"pw": "abc${nope}"})),
        (json!({"auth": ["${secrets.pw}"]}), json!({"auth": ["abc${nope}"]})),
    ];
    for (spec, expected) in cases {
        let result = eval(ev, spec.clone()).unwrap();
        assert!(result.complete(), "{spec}");
        assert_eq!(result.value, tree(expected), "{spec}");
    }
}

#[test]
fn test_resolved_mappings_are_not_references() {
    let ev = lookalikes();
    let cases = [
        (json!("${parameters.ref}"), json!({"$type": "Secret", "name": "token"})),
        (json!("${parameters.ref.name}"), json!("token")),
        (json!({"$type": "Parameter", "name": "ref"}), json!({"$type": "Secret", "name": "token"})),
        (json!({"$type": "Parameter", "name": "call"}), json!({"$fn.concat": ["a", "b"]})),
        (json!({"$type": "Data", "query": "greeting"}), json!("hello ${name}")),
        (json!({"$type": "Data", "query": "ref"}), json!({"$type": "Secret", "name": "pw"})),
        (json!({"$type": "Data", "query": "$"}), json!({
            "greeting": "hello ${name}",
            "ref": {"$type": "Secret", "name": "pw"},
        })),
        (
            json!({"$fn.path": [{"$type": "Data", "query": "$"}, "ref.name"]}),
            json!("pw"),
        ),
        (json!({"$fn.path": [{"$type": "Parameter", "name": "ref"}, "name"]}), json!("token")),
    ];
    for (spec, expected) in cases {
        let result = eval(ev, spec.clone()).unwrap();
        assert!(result.complete(), "{spec}");
        assert_eq!(result.value, tree(expected), "{spec}");
    }
}

#[test]
fn test_resolved_values_keep_their_shape_at_partial_depth() {
    let ev = lookalikes();
    let spec = tree(json!({
        "ref": {"$type": "Parameter", "name": "ref"},
        "call": {"$type": "Parameter", "name": "call"},
        "data": {"$type": "Data", "query": "$"},
    }));
    for depth in [1, 2, 3] {
        let shallow = ev.evaluate(&Context::new(), &spec, depth).unwrap();
        assert!(shallow.complete());
        let full = ev.evaluate_all(&Context::new(), &shallow.value).unwrap();
        assert!(full.complete(), "depth {depth}");
        assert_eq!(
            full.value,
            tree(json!({
                "ref": {"$type": "Secret", "name": "token"},
                "call": {"$fn.concat": ["a", "b"]},
                "data": {
                    "greeting": "hello ${name}",
                    "ref": {"$type": "Secret", "name": "pw"},
                },
            })),
            "depth {depth}"
        );
    }
}

#[test]
fn test_jsonpath_navigates_resolved_values_as_data() {
    let ev = lookalikes();
    let spec = tree(json!({
        "call": {"$type": "Parameter", "name": "call"},
        "data": {"$type": "Data", "query": "$"},
    }));
    let select = |query: &str| {
        let result = ev
            .evaluate_query(&Context::new(), &spec, Language::JsonPath, query)
            .unwrap();
        assert!(result.complete(), "{query}");
        result.value
    };

    assert_eq!(select("$.call.*"), tree(json!([["a", "b"]])));
    assert_eq!(select("$.call['$fn.concat'][1]"), tree(json!("b")));
    assert_eq!(select("$.data.ref.name"), tree(json!("pw")));
    assert_eq!(select("$.data['greeting','ref']"), tree(json!([
        "hello ${name}",
        {"$type": "Secret", "name": "pw"},
    ])));
    assert_eq!(select("$..name"), tree(json!(["pw"])));
}
