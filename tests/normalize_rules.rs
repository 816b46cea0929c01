// tests/normalize_rules.rs

use serde_json::{Map, Value, json};

use agentrun::stream::normalize::{
    EventKind, RULES, classify, extract_api_key_source, extract_result_text, extract_session_id,
    extract_skills, extract_text_delta, extract_tools, normalize_event, parse_error_record, rule,
};

fn obj(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        other => panic!("not an object: {other}"),
    }
}

fn matches(name: &str, v: &Value) -> bool {
    let r = rule(name).unwrap_or_else(|| panic!("no rule named {name}"));
    (r.matches)(v)
}

#[test]
fn rules_are_declared_in_precedence_order() {
    let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec![
            "type_tag_init",
            "type_tag_result",
            "type_tag_error",
            "type_tag_delta",
            "init_fields",
            "result_with_usage",
            "text_delta",
            "error_fields",
        ]
    );
}

#[test]
fn type_tag_rules_are_case_insensitive_substring_matches() {
    assert!(matches("type_tag_init", &json!({"type": "system_INIT"})));
    assert!(matches("type_tag_result", &json!({"type": "Result"})));
    assert!(matches("type_tag_error", &json!({"type": "api_error"})));
    assert!(matches("type_tag_delta", &json!({"type": "content_block_delta"})));
    assert!(matches("type_tag_delta", &json!({"type": "assistant"})));

    assert!(!matches("type_tag_init", &json!({"type": "result"})));
    assert!(!matches("type_tag_delta", &json!({"type": 7})));
    assert!(!matches("type_tag_result", &json!({"kind": "result"})));
}

#[test]
fn init_fields_rule() {
    assert!(matches("init_fields", &json!({"meta": {"apiKeySource": "env"}})));
    assert!(matches("init_fields", &json!({"permissionMode": "dontAsk"})));
    assert!(!matches("init_fields", &json!({"permissionMode": null})));
    assert!(!matches("init_fields", &json!({"apiKeySource": ""})));
}

#[test]
fn result_with_usage_rule() {
    assert!(matches("result_with_usage", &json!({"result": "done", "usage": {}})));
    assert!(matches("result_with_usage", &json!({"output": {"text": "x"}, "cost": 0.1})));
    assert!(!matches("result_with_usage", &json!({"result": "done"})));
    assert!(!matches("result_with_usage", &json!({"usage": {}})));
}

#[test]
fn text_delta_rule() {
    assert!(matches("text_delta", &json!({"delta": "x"})));
    assert!(matches("text_delta", &json!({"delta": {"text": "x"}})));
    assert!(!matches("text_delta", &json!({"delta": {"nope": 1}})));
    assert!(!matches("text_delta", &json!({"delta": ""})));
}

#[test]
fn error_fields_rule() {
    assert!(matches("error_fields", &json!({"error": "boom"})));
    assert!(matches("error_fields", &json!({"message": "m", "code": 3})));
    assert!(!matches("error_fields", &json!({"message": "m"})));
    assert!(!matches("error_fields", &json!({"error": null})));
}

#[test]
fn first_matching_rule_wins() {
    // A type tag beats every field-based rule.
    assert_eq!(classify(&json!({"type": "init", "error": "x"})), EventKind::Init);
    // Init fields beat result/usage.
    assert_eq!(
        classify(&json!({"apiKeySource": "env", "result": "r", "usage": {}})),
        EventKind::Init
    );
    // Result with usage beats a delta.
    assert_eq!(
        classify(&json!({"result": "r", "cost": 1, "delta": "d"})),
        EventKind::Result
    );
    // Delta beats error fields.
    assert_eq!(classify(&json!({"delta": "d", "error": "e"})), EventKind::Delta);
    assert_eq!(classify(&json!({"hello": "world"})), EventKind::Unknown);
}

#[test]
fn nested_delta_text_is_extracted_and_unusable_delta_falls_through() {
    let ev = normalize_event(obj(json!({"delta": {"text": "x"}})));
    assert_eq!(ev.kind, EventKind::Delta);
    assert_eq!(ev.text_delta.as_deref(), Some("x"));

    let v = json!({"delta": {"nope": 1}});
    assert_eq!(extract_text_delta(&v), None);
    let ev = normalize_event(obj(json!({"delta": {"nope": 1}, "error": "bad"})));
    assert_eq!(ev.kind, EventKind::Error);
    assert_eq!(ev.text_delta, None);
}

#[test]
fn session_id_search_prefers_the_later_sibling_subtree() {
    // The record itself is checked before any child.
    let v = json!({
        "message": {"meta": {"sessionId": "deep"}},
        "session_id": "top",
    });
    assert_eq!(extract_session_id(&v), Some("top"));

    let v = json!({"a": {"session_id": "x"}, "b": {"session_id": "y"}});
    assert_eq!(extract_session_id(&v), Some("y"));

    let v = json!({
        "a": [{"x": 1}, {"session": "first"}],
        "b": {"sessionID": "second"},
    });
    assert_eq!(extract_session_id(&v), Some("second"));

    let v = json!({"items": [{"session_id": "one"}, {"session_id": "two"}]});
    assert_eq!(extract_session_id(&v), Some("two"));

    // A whole subtree is exhausted before its earlier sibling is entered.
    let v = json!({"a": {"session_id": "shallow"}, "b": {"c": {"session_id": "nested"}}});
    assert_eq!(extract_session_id(&v), Some("nested"));

    assert_eq!(extract_session_id(&json!({"session_id": ""})), None);
}

#[test]
fn api_key_source_search_uses_the_same_walk_order() {
    let v = json!({"a": {"apiKeySource": "env"}, "b": {"apiKeySource": "keychain"}});
    assert_eq!(extract_api_key_source(&v), Some("keychain"));
}

#[test]
fn result_text_priority_and_one_level_recursion() {
    let v = json!({"text": "low", "result_text": "high"});
    assert_eq!(extract_result_text(&v), Some("high"));

    let v = json!({"result": {"output": "inner"}});
    assert_eq!(extract_result_text(&v), Some("inner"));

    let v = json!({"result": {"deeper": {"text": "too deep"}}});
    assert_eq!(extract_result_text(&v), None);
}

#[test]
fn api_key_source_is_searched_recursively() {
    let v = json!({"system": {"config": {"apiKeySource": "keychain"}}});
    assert_eq!(extract_api_key_source(&v), Some("keychain"));
}

#[test]
fn only_fields_for_the_classification_are_carried() {
    let ev = normalize_event(obj(json!({
        "type": "result",
        "session_id": "sid-1",
        "result_text": "OK",
        "delta": "ignored",
        "apiKeySource": "ignored",
    })));
    assert_eq!(ev.kind, EventKind::Result);
    assert_eq!(ev.session_id.as_deref(), Some("sid-1"));
    assert_eq!(ev.result_text.as_deref(), Some("OK"));
    assert_eq!(ev.text_delta, None);
    assert_eq!(ev.api_key_source, None);
    assert_eq!(ev.raw["delta"], "ignored");

    let ev = normalize_event(obj(json!({
        "type": "init",
        "session_id": "sid-123",
        "apiKeySource": "env",
    })));
    assert_eq!(ev.kind, EventKind::Init);
    assert_eq!(ev.api_key_source.as_deref(), Some("env"));
    assert_eq!(ev.result_text, None);
}

#[test]
fn log_records_have_stable_shape() {
    let ev = normalize_event(obj(json!({"type": "delta", "delta": "hel"})));
    assert_eq!(
        ev.log_record(),
        json!({
            "kind": "delta",
            "session_id": null,
            "text_delta": "hel",
            "result_text": null,
            "api_key_source": null,
        })
    );

    assert_eq!(
        parse_error_record("not-json", "json_decode_error: expected value"),
        json!({
            "kind": "parse_error",
            "error": "json_decode_error: expected value",
            "raw": "not-json",
        })
    );
}

#[test]
fn tools_and_skills_helpers() {
    let v = json!({"tools": ["Read", "Grep"], "skills": ["pdf"], "nested": {"tools": ["X"]}});
    assert_eq!(extract_tools(&v), Some(vec!["Read".to_string(), "Grep".to_string()]));
    assert_eq!(extract_skills(&v), Some(vec!["pdf".to_string()]));
    assert_eq!(extract_tools(&json!({"tools": ["Read", 1]})), None);
    assert_eq!(extract_skills(&json!({})), None);
}
