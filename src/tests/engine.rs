use crate::{
    tests::util::{json, log_try_init, NESTED, SIMPLE},
    Error, JsonPatchExecutor, JsonPath, PatchEngine, PatchExecutor, PatchKind,
    PatchOperation, PatchOptions, PatchRequest, PathEvaluator, ResolvedLocation,
};
use serde_json::{json, Value};
use std::{cell::RefCell, rc::Rc};

fn apply(document: &str, path: &str, kind: PatchKind, value: &str) -> Result<Value, Error> {
    apply_with(PatchOptions::default(), document, path, kind, value)
}

fn apply_with(
    options: PatchOptions,
    document: &str,
    path: &str,
    kind: PatchKind,
    value: &str,
) -> Result<Value, Error> {
    let engine = PatchEngine::new(options);
    let output = engine.apply(&PatchRequest::new(document, path, kind, value))?;
    Ok(json(&output))
}

#[test]
fn replace_single_member() -> Result<(), Error> {
    log_try_init();

    let engine = PatchEngine::new(PatchOptions::default());
    let output = engine.apply(&PatchRequest::new(SIMPLE, "$.a", PatchKind::Replace, r#""z""#))?;
    assert_eq!(r#"{"a":"z"}"#, output);

    Ok(())
}

#[test]
fn replace_filtered_member() -> Result<(), Error> {
    log_try_init();

    let result = apply(NESTED, "$.v[?(@.x=='test2')].y", PatchKind::Replace, r#""W""#)?;
    assert_eq!(
        json!([{"x": "test1", "y": "hello"}, {"x": "test2", "y": "W"}]),
        result["v"]
    );
    assert_eq!(json!("c"), result["y"]);

    Ok(())
}

#[test]
fn zero_locations_leave_document_unchanged() -> Result<(), Error> {
    log_try_init();

    let result = apply(NESTED, "$.v[?(@.x=='UNKNOWN')].y", PatchKind::Remove, "")?;
    assert_eq!(json(NESTED), result);

    // the value is only decoded for an actual location
    let result = apply(NESTED, "$.missing", PatchKind::Add, "{not json")?;
    assert_eq!(json(NESTED), result);

    Ok(())
}

#[test]
fn numbers_keep_their_text() -> Result<(), Error> {
    log_try_init();

    let engine = PatchEngine::new(PatchOptions::default());
    let document = r#"{"a": "b", "n": 100000000000000000000001, "f": 1.10, "e": 1e400}"#;

    let request = PatchRequest::new(document, "$.missing", PatchKind::Remove, "");
    assert_eq!(document, engine.apply(&request)?);

    let request = PatchRequest::new(document, "$.a", PatchKind::Replace, r#""z""#);
    assert_eq!(
        r#"{"a":"z","n":100000000000000000000001,"f":1.10,"e":1e400}"#,
        engine.apply(&request)?
    );

    let request = PatchRequest::new(document, "$.n", PatchKind::Test, "100000000000000000000001");
    assert!(engine.apply(&request)?.contains(":100000000000000000000001,"));

    let request = PatchRequest::new(document, "$.n", PatchKind::Test, "100000000000000000000002");
    assert!(matches!(engine.apply(&request), Err(Error::PatchApply(_))));

    Ok(())
}

#[test]
fn remove_every_match() -> Result<(), Error> {
    log_try_init();

    let result = apply(NESTED, "$.v[*].y", PatchKind::Remove, "")?;
    assert_eq!(json!([{"x": "test1"}, {"x": "test2"}]), result["v"]);

    Ok(())
}

#[test]
fn remove_array_siblings() -> Result<(), Error> {
    log_try_init();

    let result = apply(NESTED, "$.v[*]", PatchKind::Remove, "")?;
    assert_eq!(json!([]), result["v"]);

    let result = apply(r#"{"a": [1, 3, 2, 4, 5]}"#, "$.a[?@ > 2]", PatchKind::Remove, "")?;
    assert_eq!(json!({"a": [1, 2]}), result);

    let result = apply(r#"{"a": [0, 1, 2, 3, 4]}"#, "$.a[::-2]", PatchKind::Remove, "")?;
    assert_eq!(json!({"a": [1, 3]}), result);

    Ok(())
}

#[test]
fn remove_array_siblings_without_rebase() {
    log_try_init();

    let options = PatchOptions::default().rebase_locations(false);
    let result = apply_with(options, NESTED, "$.v[*]", PatchKind::Remove, "");
    assert!(matches!(result, Err(Error::PatchApply(_))), "{result:?}");
}

#[test]
fn insert_before_every_match() -> Result<(), Error> {
    log_try_init();

    let result = apply(r#"{"a": [1, 2]}"#, "$.a[*]", PatchKind::Add, "0")?;
    assert_eq!(json!({"a": [0, 1, 0, 2]}), result);

    let options = PatchOptions::default().rebase_locations(false);
    let result = apply_with(options, r#"{"a": [1, 2]}"#, "$.a[*]", PatchKind::Add, "0")?;
    assert_eq!(json!({"a": [0, 0, 1, 2]}), result);

    Ok(())
}

#[test]
fn move_from_array_into_array() -> Result<(), Error> {
    log_try_init();

    let result = apply(
        r#"{"a": ["x", "y"], "b": [10, 20]}"#,
        "$.b[*]",
        PatchKind::Move,
        r#""/a/0""#,
    )?;
    assert_eq!(json!({"a": [], "b": ["x", 10, "y", 20]}), result);

    Ok(())
}

#[test]
fn copy_into_every_match() -> Result<(), Error> {
    log_try_init();

    let result = apply(
        r#"{"template": {"enabled": true}, "services": {"a": {}, "b": {}}}"#,
        "$.services.*.settings",
        PatchKind::Copy,
        r#""/template""#,
    );
    // `settings` does not exist yet, so nothing matches
    assert_eq!(
        json(r#"{"template": {"enabled": true}, "services": {"a": {}, "b": {}}}"#),
        result?
    );

    let result = apply(
        r#"{"template": {"enabled": true}, "services": {"a": {"settings": null}, "b": {"settings": 1}}}"#,
        "$.services.*.settings",
        PatchKind::Copy,
        r#""/template""#,
    )?;
    assert_eq!(
        json!({"a": {"settings": {"enabled": true}}, "b": {"settings": {"enabled": true}}}),
        result["services"]
    );

    Ok(())
}

#[test]
fn test_every_match() -> Result<(), Error> {
    log_try_init();

    let result = apply(r#"{"v": [{"n": 1}, {"n": 1.0}]}"#, "$.v[*].n", PatchKind::Test, "1")?;
    assert_eq!(json!({"v": [{"n": 1}, {"n": 1.0}]}), result);

    let result = apply(r#"{"v": [{"n": 1}, {"n": 2}]}"#, "$.v[*].n", PatchKind::Test, "1");
    assert!(matches!(result, Err(Error::PatchApply(ref msg)) if msg.contains("test failed")));

    Ok(())
}

#[test]
fn nested_match_removed_by_earlier_operation() {
    log_try_init();

    let result = apply(r#"{"a": {"b": 1}}"#, "$..*", PatchKind::Remove, "");
    let Err(e) = result else {
        panic!("`$.a.b` no longer exists once `$.a` is removed");
    };
    assert!(matches!(e, Error::PatchApply(_)));
    assert!(e.to_string().contains("removed by an earlier operation"), "{e}");
}

#[test]
fn root_only_location() {
    log_try_init();

    let result = apply(SIMPLE, "$", PatchKind::Replace, r#""z""#);
    let Err(e) = result else {
        panic!("the root cannot be patched");
    };
    assert!(matches!(e, Error::InvalidLocation(_)));
    assert!(e.to_string().contains("only Root"), "{e}");
}

#[test]
fn errors() {
    log_try_init();

    let result = apply("{not json", "$.a", PatchKind::Remove, "");
    assert!(matches!(result, Err(Error::Document(_))), "{result:?}");
    assert!(result
        .unwrap_err()
        .to_string()
        .starts_with("Error during parsing json"));

    let result = apply(SIMPLE, ".$", PatchKind::Remove, "");
    assert!(matches!(result, Err(Error::Path(_))), "{result:?}");

    let result = apply(SIMPLE, "$.a", PatchKind::Replace, "{not json");
    assert!(matches!(result, Err(Error::ValueDecode(_))), "{result:?}");

    let result = apply(SIMPLE, "$.a", PatchKind::Replace, "");
    assert!(matches!(result, Err(Error::PatchApply(_))), "{result:?}");
}

#[test]
fn input_document_is_untouched() {
    log_try_init();

    let engine = PatchEngine::new(PatchOptions::default());
    let document = json(r#"{"a": [1, 2, "x", 3]}"#);

    let result = engine.apply_value(&document, "$.a[*]", PatchKind::Test, "1");
    assert!(result.is_err());

    let result = engine.apply_value(&document, "$.a[0]", PatchKind::Remove, "");
    assert!(result.is_ok());
    assert_eq!(json!({"a": [1, 2, "x", 3]}), document);
}

#[test]
fn member_order_and_pretty_output() -> Result<(), Error> {
    log_try_init();

    let engine = PatchEngine::new(PatchOptions::default());
    let request = PatchRequest::new(r#"{"z": 1, "a": 2, "m": 3}"#, "$.a", PatchKind::Remove, "");
    assert_eq!(r#"{"z":1,"m":3}"#, engine.apply(&request)?);

    let engine = PatchEngine::new(PatchOptions::default().pretty(true));
    let request = PatchRequest::new(r#"{"z": 1, "a": 2}"#, "$.a", PatchKind::Replace, "[3]");
    assert_eq!("{\n  \"z\": 1,\n  \"a\": [\n    3\n  ]\n}", engine.apply(&request)?);

    Ok(())
}

#[test]
fn pointers() -> Result<(), Error> {
    log_try_init();

    let engine = PatchEngine::new(PatchOptions::default());
    let pointers = |expression: &str| -> Result<Vec<String>, Error> {
        Ok(engine
            .pointers(NESTED, expression)?
            .iter()
            .map(ToString::to_string)
            .collect())
    };

    assert_eq!(vec!["/a"], pointers("a")?);
    assert_eq!(vec!["/a"], pointers(".a")?);
    assert_eq!(vec!["/f/w"], pointers("f.w")?);
    assert_eq!(vec!["/f/w", "/f/q", "/f/y"], pointers("f.*")?);
    assert_eq!(vec!["/v/0", "/v/1"], pointers("v.*")?);
    assert_eq!(vec!["/v/1"], pointers("$.v[?(@.x=='test2')]")?);
    assert_eq!(vec!["/v/0/y"], pointers("..v[?(@.x=='test1')].y")?);
    assert_eq!(vec!["/v/0/y", "/v/1/y"], pointers("$.v[*].y")?);
    assert_eq!(vec!["/y", "/v/0/y", "/v/1/y", "/f/y"], pointers("$..y")?);
    assert!(pointers("$.v[?(@.x=='UNKNOWN')].y")?.is_empty());
    assert_eq!(vec!["/v/0/x", "/v/0/y", "/v/1/x", "/v/1/y"], pointers("v.**")?);
    assert_eq!(vec!["/f/w", "/f/q", "/f/y"], pointers("$.f.**")?);

    assert!(matches!(pointers(".$"), Err(Error::Path(_))));
    assert!(matches!(pointers("$"), Err(Error::InvalidLocation(_))));

    Ok(())
}

#[test]
fn translated_pointers_address_matched_nodes() -> Result<(), Error> {
    log_try_init();

    let document = r#"{
        "a.b": {"x/y": [1, {"m~n": 2}], "it's": 3, "": 4, "0": [5]},
        "plain": {"nested": [true, null]}
    }"#;
    let value = json(document);
    let engine = PatchEngine::new(PatchOptions::default());

    let json_path = JsonPath::parse("$..*")?;
    let matched = json_path.evaluate(&value);
    let pointers = engine.pointers(document, "$..*")?;
    assert_eq!(matched.len(), pointers.len());

    for (matched, pointer) in matched.into_iter().zip(&pointers) {
        assert_eq!(Some(matched), value.pointer(&pointer.to_string()), "{pointer}");
    }

    Ok(())
}

/// Returns fixed locations whatever the document
struct FixedLocations(Vec<&'static str>);

impl PathEvaluator for FixedLocations {
    fn evaluate(&self, _document: &Value, _expression: &str) -> Result<Vec<ResolvedLocation>, Error> {
        Ok(self.0.iter().map(|l| ResolvedLocation::new(*l)).collect())
    }
}

/// Records every operation before delegating to [`JsonPatchExecutor`]
#[derive(Default)]
struct RecordingExecutor(Rc<RefCell<Vec<Value>>>);

impl PatchExecutor for RecordingExecutor {
    fn apply(&self, document: Value, operation: &PatchOperation) -> Result<Value, Error> {
        self.0.borrow_mut().push(operation.to_json());
        JsonPatchExecutor.apply(document, operation)
    }
}

#[test]
fn custom_collaborators() -> Result<(), Error> {
    log_try_init();

    let recorded = Rc::new(RefCell::new(Vec::new()));
    let engine = PatchEngine::with_collaborators(
        FixedLocations(vec!["$['a.b'][1]", "a.c", "$['a.b'][0]"]),
        RecordingExecutor(recorded.clone()),
        PatchOptions::default(),
    );

    let document = json(r#"{"a.b": ["x", "y", "z"], "a": {"c": 1}}"#);
    let result = engine.apply_value(&document, "ignored", PatchKind::Replace, "0")?;
    assert_eq!(json!({"a.b": [0, 0, "z"], "a": {"c": 0}}), result);

    let operations = recorded.borrow().clone();
    assert_eq!(
        vec![
            json!({"op": "replace", "path": "/a.b/1", "value": 0}),
            json!({"op": "replace", "path": "/a/c", "value": 0}),
            json!({"op": "replace", "path": "/a.b/0", "value": 0}),
        ],
        operations
    );

    Ok(())
}

#[test]
fn custom_evaluator_location_errors() {
    log_try_init();

    let engine = PatchEngine::with_collaborators(
        FixedLocations(vec!["$.a", "$.a[*]"]),
        JsonPatchExecutor,
        PatchOptions::default(),
    );
    let document = json(r#"{"a": [1]}"#);

    let result = engine.apply_value(&document, "ignored", PatchKind::Replace, "0");
    assert!(matches!(result, Err(Error::InvalidLocation(_))), "{result:?}");
}

#[test]
fn engine_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PatchEngine>();

    let engine = PatchEngine::new(PatchOptions::default());
    std::thread::scope(|scope| {
        for key in ["a", "b"] {
            let engine = &engine;
            scope.spawn(move || {
                let document = json!({"a": 1, "b": 2});
                let result = engine.apply_value(&document, key, PatchKind::Remove, "");
                assert_eq!(1, result.map(|v| v.as_object().map_or(0, |m| m.len())).unwrap_or(0));
            });
        }
    });
}
