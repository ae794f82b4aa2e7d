#![allow(dead_code)]

use std::sync::{Arc, Once, OnceLock};

use serde_json::json;
use tracing_subscriber::EnvFilter;
use weft_expr::{
    workflow, Context, EvalResult, Evaluator, MemoryAnswerTypeResolver,
    MemoryConnectionTypeResolver, MemoryDataTypeResolver, MemoryOutputTypeResolver,
    MemoryParameterTypeResolver, MemorySecretTypeResolver, MemoryStatusTypeResolver, Options,
    Result, Tree,
};

static TRACING: Once = Once::new();

/// Route evaluator logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Options with every resolver backed by the same fixture values.
pub fn fixture_options() -> Options {
    Options::default()
        .with_secret_resolver(Arc::new(
            MemorySecretTypeResolver::new([("token", "s3cr3t"), ("user", "admin")]),
        ))
        .with_connection_resolver(Arc::new(MemoryConnectionTypeResolver::new().with(
            "aws",
            "prod",
            Tree::from(json!({"region": "us-east-1", "accessKey": "AKIA"})),
        )))
        .with_output_resolver(Arc::new(
            MemoryOutputTypeResolver::new()
                .with("build", "image", "registry/app:1.2")
                .with("build", "digest", "sha256:abc"),
        ))
        .with_parameter_resolver(Arc::new(
            MemoryParameterTypeResolver::new([
                ("region", Tree::from("eu-west-1")),
                ("replicas", Tree::from(3_i64)),
            ]),
        ))
        .with_answer_resolver(Arc::new(
            MemoryAnswerTypeResolver::new().with("approval", "approved", true),
        ))
        .with_status_resolver(Arc::new(
            MemoryStatusTypeResolver::new()
                .with("build", "succeeded", true)
                .with("build", "failed", false),
        ))
        .with_default_data_resolver(
            "config",
            Arc::new(MemoryDataTypeResolver::new(json!({
                "env": "staging",
                "limits": {"cpu": 2, "memory": "1Gi"},
                "hosts": ["a.example.com", "b.example.com"],
            }))),
        )
}

static FIXTURE: OnceLock<Evaluator> = OnceLock::new();

/// A workflow evaluator that can resolve every fixture reference.
pub fn fixture() -> &'static Evaluator {
    init_tracing();
    FIXTURE.get_or_init(|| workflow::evaluator(fixture_options()))
}

static EMPTY: OnceLock<Evaluator> = OnceLock::new();

/// A workflow evaluator that can resolve nothing.
pub fn empty() -> &'static Evaluator {
    init_tracing();
    EMPTY.get_or_init(|| workflow::evaluator(Options::default()))
}

pub fn eval(ev: &Evaluator, value: serde_json::Value) -> Result<EvalResult> {
    ev.evaluate_all(&Context::new(), &Tree::from(value))
}

pub fn tree(value: serde_json::Value) -> Tree {
    Tree::from(value)
}
