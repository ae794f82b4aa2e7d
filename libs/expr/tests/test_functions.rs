//! Standard library functions, called both as `$fn.` mappings and inside
//! `${...}` expressions

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use weft_expr::functions::get_function_metadata;
use weft_expr::{
    invoker, library, workflow, Arg, Context, Descriptor, Error, EvalResult, Invoker, Options,
    Result, Tree, Unresolvable,
};

mod test_support;
use test_support::{empty, eval, fixture, fixture_options, tree};

fn value(spec: serde_json::Value) -> Tree {
    let result = eval(fixture(), spec).unwrap();
    assert!(result.complete(), "unexpected unresolvable: {:?}", result.unresolvable);
    result.value
}

#[test]
fn test_library_registry() {
    let functions = library();
    for name in [
        "append",
        "merge",
        "concat",
        "toString",
        "convertMarkdown",
        "coalesce",
        "equals",
        "notEquals",
        "path",
        "exists",
        "jsonUnmarshal",
    ] {
        assert!(functions.contains(name), "missing {name}");
        assert_eq!(get_function_metadata(name).map(|m| m.name), Some(name));
    }
    assert_eq!(functions.len(), 11);
    assert!(get_function_metadata("nope").is_none());
}

#[test]
fn test_append() {
    assert_eq!(value(json!({"$fn.append": [[1], 2, [3]]})), tree(json!([1, 2, [3]])));
    assert_eq!(value(json!("${append([], 'x')}")), tree(json!(["x"])));

    let err = eval(fixture(), json!({"$fn.append": ["nope", 1]})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::UnexpectedType { .. }));
}

#[test]
fn test_merge() {
    assert_eq!(
        value(json!({"$fn.merge": [{"a": {"x": 1}}, null, {"a": {"y": 2}, "b": 3}]})),
        tree(json!({"a": {"x": 1, "y": 2}, "b": 3}))
    );
    assert_eq!(
        value(json!({"$fn.merge": {
            "objects": [{"a": {"x": 1}}, {"a": {"y": 2}}],
            "mode": "shallow",
        }})),
        tree(json!({"a": {"y": 2}}))
    );

    let err = eval(
        fixture(),
        json!({"$fn.merge": {"objects": [{}, 1]}}),
    )
    .unwrap_err();
    let Error::Invocation { cause, .. } = err else {
        panic!("expected an invocation error");
    };
    assert!(matches!(*cause, Error::KeywordArg { ref arg, .. } if arg == "objects"));

    let err = eval(fixture(), json!({"$fn.merge": {"objects": [], "mode": "sideways"}})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Parse(_) | Error::Type(_)));
}

#[test]
fn test_strings() {
    assert_eq!(value(json!({"$fn.concat": ["a", 1, true, null, [2]]})), Tree::from("a1true[2]"));
    assert_eq!(value(json!("${concat()}")), Tree::from(""));
    assert_eq!(value(json!({"$fn.toString": [{"k": "v"}]})), Tree::from(r#"{"k":"v"}"#));
    assert_eq!(value(json!("${toString(1.5)}")), Tree::from("1.5"));
}

#[test]
fn test_convert_markdown() {
    assert_eq!(
        value(json!({"$fn.convertMarkdown": ["jira", "## Plan\n- **ship** it"]})),
        Tree::from("h2. Plan\n* *ship* it")
    );
    assert_eq!(
        value(json!({"$fn.convertMarkdown": {"to": "jira", "content": "`x`"}})),
        Tree::from("{{x}}")
    );

    let err = eval(fixture(), json!({"$fn.convertMarkdown": ["html", "x"]})).unwrap_err();
    assert!(matches!(
        err,
        Error::Invocation { ref cause, .. } if matches!(**cause, Error::PositionalArg { arg: 0, .. })
    ));

    let err = eval(fixture(), json!({"$fn.convertMarkdown": {"to": "jira"}})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::MissingField { field } if field == "content"));
}

#[test]
fn test_coalesce_skips_unresolved_arguments() {
    assert_eq!(value(json!("${coalesce(null, secrets.nope, 'x', 'y')}")), Tree::from("x"));
    assert_eq!(value(json!({"$fn.coalesce": [null, null]})), Tree::Null);

    let spec = json!({"$fn.coalesce": [null, {"$type": "Secret", "name": "nope"}]});
    let result = eval(fixture(), spec.clone()).unwrap();
    assert_eq!(result.unresolvable, Unresolvable::secret("nope"));
    assert_eq!(result.value, tree(spec));
}

#[test]
fn test_equality() {
    assert_eq!(value(json!({"$fn.equals": [{"a": [1]}, {"a": [1.0]}]})), Tree::Bool(true));
    assert_eq!(value(json!("${notEquals('a', 'b')}")), Tree::Bool(true));
    assert_eq!(value(json!("${equals(parameters.replicas, 3)}")), Tree::Bool(true));

    let result = eval(empty(), json!("${equals(parameters.replicas, 3)}")).unwrap();
    assert_eq!(result.unresolvable, Unresolvable::parameter("replicas"));
}

#[test]
fn test_path_and_exists() {
    let object = json!({"a": {"b": [10, 20]}});
    assert_eq!(value(json!({"$fn.path": [object.clone(), "a.b[1]"]})), Tree::from(20_i64));
    assert_eq!(value(json!({"$fn.path": [object.clone(), "a.c", "fallback"]})), Tree::from("fallback"));
    assert_eq!(
        value(json!({"$fn.path": {"object": object.clone(), "query": "a.c", "default": 0}})),
        Tree::from(0_i64)
    );
    assert_eq!(value(json!({"$fn.exists": [object.clone(), "a.b"]})), Tree::Bool(true));
    assert_eq!(value(json!({"$fn.exists": [object.clone(), "a.z"]})), Tree::Bool(false));
    assert_eq!(value(json!("${path({a: {b: 1}}, 'a.b')}")), Tree::from(1_i64));
    assert_eq!(value(json!("${exists({a: 1}, 'b')}")), Tree::Bool(false));

    let err = eval(fixture(), json!({"$fn.path": [object.clone(), "a.c"]})).unwrap_err();
    assert!(err.is_not_found());

    // Type errors are not swallowed by the default
    let err = eval(fixture(), json!({"$fn.path": [object, "a.b.c", 1]})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Type(_)));
}

#[test]
fn test_path_only_forces_what_it_walks() {
    let spec = json!({"$fn.path": [
        {"ready": "yes", "pending": {"$type": "Secret", "name": "nope"}},
        "ready",
    ]});
    assert_eq!(value(spec), Tree::from("yes"));

    let spec = json!({"$fn.exists": [
        {"pending": {"$type": "Secret", "name": "nope"}},
        "pending.field",
    ]});
    let result = eval(fixture(), spec).unwrap();
    assert_eq!(result.unresolvable, Unresolvable::secret("nope"));
}

#[test]
fn test_json_unmarshal() {
    assert_eq!(
        value(json!({"$fn.jsonUnmarshal": "{\"a\": [1, null]}"})),
        tree(json!({"a": [1, null]}))
    );
    let err = eval(fixture(), json!({"$fn.jsonUnmarshal": "{"})).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Deserialize(_)));
}

#[test]
fn test_operators_in_expressions() {
    assert_eq!(value(json!("${7 / 2}")), Tree::from(3.5));
    assert_eq!(value(json!("${8 / 2}")), Tree::from(4_i64));
    assert_eq!(value(json!("${2 ** 10 % 1000}")), Tree::from(24_i64));
    assert_eq!(value(json!("${'v' + 1}")), Tree::from("v1"));
    assert_eq!(value(json!("${[1] + [2]}")), tree(json!([1, 2])));
    assert_eq!(value(json!("${6 & 3 | 8}")), Tree::from(10_i64));
    assert_eq!(value(json!("${1 << 4 >> 2}")), Tree::from(4_i64));
    assert_eq!(value(json!("${'abc' =~ '^a'}")), Tree::Bool(true));
    assert_eq!(value(json!("${'b' in ['a', 'b']}")), Tree::Bool(true));
    assert_eq!(value(json!("${'ell' in 'hello'}")), Tree::Bool(true));
    assert_eq!(value(json!("${parameters.replicas >= 3 ? 'many' : 'few'}")), Tree::from("many"));

    for bad in ["${1 / 0}", "${1 % 0}", "${'a' - 1}", "${true < 1}", "${1 << 64}"] {
        let err = eval(fixture(), json!(bad)).unwrap_err();
        assert!(matches!(err, Error::Type(_)), "{bad}: {err}");
    }
}

/// A user-supplied function registered next to the standard library.
struct Shout;

impl Descriptor for Shout {
    fn description(&self) -> &'static str {
        "Upper-cases its argument"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        Ok(invoker(move |ctx: &Context| {
            let result = args[0].evaluate_all(ctx)?;
            if !result.complete() {
                return Ok(EvalResult::partial(Tree::Null, result.unresolvable));
            }
            match result.value {
                Tree::String(s) => Ok(EvalResult::new(Tree::String(s.to_uppercase()))),
                other => Err(Error::unexpected_type(&["string"], other.type_name())),
            }
        }))
    }

    fn keyword_invoker<'a>(
        &self,
        args: BTreeMap<String, Arg<'a>>,
    ) -> Result<Box<dyn Invoker + 'a>> {
        let _ = args;
        Err(Error::KeywordArgsUnsupported)
    }
}

#[test]
fn test_custom_functions() {
    let mut functions = library();
    functions.insert("shout", Arc::new(Shout));
    let ev = workflow::evaluator(fixture_options().with_functions(functions));

    let result = ev
        .evaluate_all(&Context::new(), &tree(json!({"$fn.shout": "${secrets.user}"})))
        .unwrap();
    assert_eq!(result.value, Tree::from("ADMIN"));

    let result = ev
        .evaluate_all(&Context::new(), &tree(json!("${shout('hi')}!")))
        .unwrap();
    assert_eq!(result.value, Tree::from("HI!"));

    // The default options do not know it
    let result = eval(empty(), json!("${shout('hi')}")).unwrap();
    assert_eq!(
        result.unresolvable,
        Unresolvable::invocation("shout", Error::FunctionNotFound)
    );
}
