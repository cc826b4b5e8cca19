//! KSON API tests against the in-memory model
//!
//! Exercises every public operation end to end through the bridge:
//! - formatting with each indent type and style
//! - JSON and YAML transpiling, successful and failing
//! - analysis: tokens, diagnostics and the value tree
//! - schema parsing and validation
//! - reference bookkeeping after all of the above
//!
//! # Running Tests
//! ```bash
//! cargo test -p kson --test api
//! ```

use std::thread;

use proptest::prelude::*;

use kson::testing::model;
use kson::{
    BridgeError, EmbedRule, FormatOptions, FormattingStyle, IndentType, Json, Kson, KsonNumber,
    KsonValue, KsonValueType, Message, MessageSeverity, Position, Runtime, SchemaResult,
    TranspileResult, Yaml,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (kson_bridge::testing::FakeVm, Runtime, Kson) {
    init_logging();
    let (fake, runtime) = model();
    let kson = Kson::new(&runtime).unwrap();
    (fake, runtime, kson)
}

fn listing(messages: &[Message]) -> Vec<String> {
    messages.iter().map(ToString::to_string).collect()
}

fn success_output(result: TranspileResult) -> String {
    match result.into_result() {
        Ok(success) => success.output().unwrap(),
        Err(failure) => panic!("expected success, got {:?}", failure.errors().unwrap()),
    }
}

fn failure_listing(result: TranspileResult) -> Vec<String> {
    match result.into_result() {
        Ok(success) => panic!("expected failure, got {:?}", success.output().unwrap()),
        Err(failure) => listing(&failure.errors().unwrap()),
    }
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_format_plain_spaces() {
    let (_fake, _runtime, kson) = setup();
    let options = FormatOptions::default_for(&kson).unwrap();
    assert_eq!(
        kson.format("key: [1, 2, 3, 4]", &options).unwrap(),
        "key:\n  - 1\n  - 2\n  - 3\n  - 4"
    );
}

#[test]
fn test_format_with_tabs() {
    let (_fake, runtime, kson) = setup();
    let indent = IndentType::tabs(&runtime).unwrap();
    let options = FormatOptions::new(&indent, FormattingStyle::Plain, &[]).unwrap();
    assert_eq!(kson.format("key: [1, 2]", &options).unwrap(), "key:\n\t- 1\n\t- 2");
}

#[test]
fn test_format_styles() {
    let (_fake, runtime, kson) = setup();
    let indent = IndentType::spaces(&runtime, 2).unwrap();
    let cases = [
        (FormattingStyle::Delimited, "{ key: [1, 2] }"),
        (FormattingStyle::Compact, "key:[1,2]"),
        (FormattingStyle::Classic, "{\"key\": [1, 2]}"),
    ];
    for (style, expected) in cases {
        let options = FormatOptions::new(&indent, style, &[]).unwrap();
        assert_eq!(kson.format("key: [1, 2]", &options).unwrap(), expected, "{}", style);
    }
}

#[test]
fn test_format_options_are_reusable() {
    let (_fake, runtime, kson) = setup();
    let indent = IndentType::spaces(&runtime, 4).unwrap();
    let rules = [EmbedRule::new(&runtime, "/query", Some("sql")).unwrap()];
    let options = FormatOptions::new(&indent, FormattingStyle::Plain, &rules).unwrap();
    for _ in 0..10 {
        assert_eq!(kson.format("a: [true]", &options).unwrap(), "a:\n    - true");
    }
    assert_eq!(options.embed_block_rules().unwrap().len(), 1);
}

#[test]
fn test_format_leaves_broken_source_alone() {
    let (_fake, _runtime, kson) = setup();
    let options = FormatOptions::default_for(&kson).unwrap();
    assert_eq!(kson.format("key: [1, 2", &options).unwrap(), "key: [1, 2");
}

// ============================================================================
// Transpiling
// ============================================================================

#[test]
fn test_to_json_success() {
    let (_fake, runtime, kson) = setup();
    let json = Json::new(&runtime, true).unwrap();
    let result = kson.to_json("key: [1, 2, 3, 4]", &json).unwrap();
    assert!(result.is_success());
    assert_eq!(success_output(result), "{\"key\": [1, 2, 3, 4]}");
}

#[test]
fn test_to_json_failure() {
    let (_fake, runtime, kson) = setup();
    let json = Json::new(&runtime, true).unwrap();
    let result = kson.to_json("key: [1, 2, 3, 4", &json).unwrap();
    assert!(!result.is_success());
    assert_eq!(failure_listing(result), ["0,5 to 0,16 - Unclosed list"]);
}

#[test]
fn test_to_json_embed_tags() {
    let (_fake, runtime, kson) = setup();
    let retained = kson
        .to_json("block: %sql", &Json::new(&runtime, true).unwrap())
        .unwrap();
    assert_eq!(
        success_output(retained),
        "{\"block\": {\"embedTag\": \"sql\", \"embedContent\": \"\"}}"
    );

    let dropped = kson
        .to_json("block: %sql", &Json::new(&runtime, false).unwrap())
        .unwrap();
    assert_eq!(success_output(dropped), "{\"block\": \"\"}");
}

#[test]
fn test_to_yaml() {
    let (_fake, runtime, kson) = setup();
    let yaml = Yaml::new(&runtime, true).unwrap();
    assert_eq!(
        success_output(kson.to_yaml("key: [1, 2, 3, 4]", &yaml).unwrap()),
        "key:\n  - 1\n  - 2\n  - 3\n  - 4"
    );
    assert_eq!(
        failure_listing(kson.to_yaml("key: [1, 2, 3, 4", &yaml).unwrap()),
        ["0,5 to 0,16 - Unclosed list"]
    );
}

#[test]
fn test_failure_messages_are_errors() {
    let (_fake, runtime, kson) = setup();
    let json = Json::new(&runtime, true).unwrap();
    let TranspileResult::Failure(failure) = kson.to_json("a: [", &json).unwrap() else {
        panic!("expected failure");
    };
    let errors = failure.errors().unwrap();
    assert_eq!(errors[0].severity(), MessageSeverity::Error);
    assert_eq!(errors[0].start(), Position::new(0, 3));
    assert_eq!(errors[0].end(), Position::new(0, 4));
}

// ============================================================================
// Analysis
// ============================================================================

#[test]
fn test_analyze_tokens() {
    let (_fake, _runtime, kson) = setup();
    let analysis = kson.analyze("key: [1, 2, 3, 4]", None).unwrap();
    assert!(analysis.errors().unwrap().is_empty());

    let tokens: Vec<String> = analysis
        .tokens()
        .unwrap()
        .iter()
        .map(|token| format!("{} to {} - {}: {}", token.start(), token.end(), token.token_type(), token.text()))
        .collect();
    assert_eq!(
        tokens,
        [
            "0,0 to 0,3 - UNQUOTED_STRING: key",
            "0,3 to 0,4 - COLON: :",
            "0,5 to 0,6 - SQUARE_BRACKET_L: [",
            "0,6 to 0,7 - NUMBER: 1",
            "0,7 to 0,8 - COMMA: ,",
            "0,9 to 0,10 - NUMBER: 2",
            "0,10 to 0,11 - COMMA: ,",
            "0,12 to 0,13 - NUMBER: 3",
            "0,13 to 0,14 - COMMA: ,",
            "0,15 to 0,16 - NUMBER: 4",
            "0,16 to 0,17 - SQUARE_BRACKET_R: ]",
            "0,17 to 0,17 - EOF: ",
        ]
    );
}

#[test]
fn test_analyze_reports_errors_without_value() {
    let (_fake, _runtime, kson) = setup();
    let analysis = kson.analyze("just words", Some("notes.kson")).unwrap();
    assert_eq!(
        listing(&analysis.errors().unwrap()),
        ["0,0 to 0,10 - Expected ':' after a key"]
    );
    assert!(analysis.kson_value().unwrap().is_none());
}

#[test]
fn test_value_tree() {
    let (_fake, _runtime, kson) = setup();
    let source = "name: kson\ncount: 3\nratio: 0.5\nok: true\nnothing: null\nblock: %sql\nlist: [1, 2.5]";
    let analysis = kson.analyze(source, None).unwrap();
    let Some(KsonValue::KsonObject(root)) = analysis.kson_value().unwrap() else {
        panic!("expected an object");
    };
    assert_eq!(root.start().unwrap(), Position::new(0, 0));
    assert_eq!(root.end().unwrap(), Position::new(6, 14));
    assert_eq!(root.value_type().unwrap(), KsonValueType::Object);

    let properties = root.properties().unwrap();
    assert_eq!(properties.len(), 7);

    let Some(KsonValue::KsonString(name)) = properties.get("name") else {
        panic!("expected a string");
    };
    assert_eq!(name.value().unwrap(), "kson");
    assert_eq!(name.start().unwrap(), Position::new(0, 6));
    assert_eq!(name.end().unwrap(), Position::new(0, 10));

    let Some(KsonValue::KsonNumber(KsonNumber::Integer(count))) = properties.get("count") else {
        panic!("expected an integer");
    };
    assert_eq!(count.value().unwrap(), 3);

    let Some(KsonValue::KsonNumber(ratio)) = properties.get("ratio") else {
        panic!("expected a number");
    };
    assert!(matches!(ratio, KsonNumber::Decimal(_)));
    assert_eq!(ratio.as_f64().unwrap(), 0.5);

    let Some(KsonValue::KsonBoolean(ok)) = properties.get("ok") else {
        panic!("expected a boolean");
    };
    assert!(ok.value().unwrap());

    assert!(matches!(properties.get("nothing"), Some(KsonValue::KsonNull(_))));

    let Some(KsonValue::KsonEmbed(block)) = properties.get("block") else {
        panic!("expected an embed");
    };
    assert_eq!(block.tag().unwrap().as_deref(), Some("sql"));
    assert_eq!(block.content().unwrap(), "");

    let Some(KsonValue::KsonArray(list)) = properties.get("list") else {
        panic!("expected an array");
    };
    let elements = list.elements().unwrap();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].value_type().unwrap(), KsonValueType::Integer);
    assert_eq!(elements[1].value_type().unwrap(), KsonValueType::Decimal);
    assert_eq!(elements[1].start().unwrap(), Position::new(6, 10));
}

#[test]
fn test_value_types_agree_with_variants() {
    let (_fake, _runtime, kson) = setup();
    let analysis = kson
        .analyze("a: x\nb: 1\nc: 1.5\nd: false\ne: null\nf: %\ng: []", None)
        .unwrap();
    let Some(KsonValue::KsonObject(root)) = analysis.kson_value().unwrap() else {
        panic!("expected an object");
    };
    for (key, value) in root.properties().unwrap() {
        let expected = match &value {
            KsonValue::KsonObject(_) => KsonValueType::Object,
            KsonValue::KsonArray(_) => KsonValueType::Array,
            KsonValue::KsonString(_) => KsonValueType::String,
            KsonValue::KsonNumber(KsonNumber::Integer(_)) => KsonValueType::Integer,
            KsonValue::KsonNumber(KsonNumber::Decimal(_)) => KsonValueType::Decimal,
            KsonValue::KsonBoolean(_) => KsonValueType::Boolean,
            KsonValue::KsonNull(_) => KsonValueType::Null,
            KsonValue::KsonEmbed(_) => KsonValueType::Embed,
        };
        assert_eq!(value.value_type().unwrap(), expected, "{}", key);
    }
}

#[test]
fn test_property_lookup() {
    let (_fake, _runtime, kson) = setup();
    let analysis = kson.analyze("name: John\nage: 30", None).unwrap();
    let Some(KsonValue::KsonObject(root)) = analysis.kson_value().unwrap() else {
        panic!("expected an object");
    };
    let Some(KsonValue::KsonNumber(age)) = root.get_property_by_name("age").unwrap() else {
        panic!("expected a number");
    };
    assert_eq!(age.as_f64().unwrap(), 30.0);
    assert!(root.get_property_by_name("city").unwrap().is_none());

    let keys = root.property_keys().unwrap();
    assert_eq!(keys["age"].value().unwrap(), "age");
    assert_eq!(keys["age"].start().unwrap(), Position::new(1, 0));
    assert_eq!(keys["age"].end().unwrap(), Position::new(1, 3));
}

#[test]
fn test_values_compare_through_runtime() {
    let (_fake, _runtime, kson) = setup();
    let first = kson.analyze("a: [1, 2]", None).unwrap().kson_value().unwrap();
    let second = kson.analyze("a: [1, 2]", None).unwrap().kson_value().unwrap();
    assert_eq!(first, second);
    let other = kson.analyze("a: [1, 3]", None).unwrap().kson_value().unwrap();
    assert_ne!(first, other);
}

// ============================================================================
// Schemas
// ============================================================================

#[test]
fn test_schema_validation() {
    let (_fake, _runtime, kson) = setup();
    let SchemaResult::Success(success) = kson.parse_schema(r#"{ "type": "string" }"#).unwrap() else {
        panic!("expected a parsed schema");
    };
    let validator = success.schema_validator().unwrap();
    assert!(validator.validate(r#""a good old JSON string""#, None).unwrap().is_empty());
    assert_eq!(
        listing(&validator.validate("42", Some("value.kson")).unwrap()),
        ["0,0 to 0,2 - Expected one of: string, but got: integer"]
    );
}

#[test]
fn test_schema_failure() {
    let (_fake, _runtime, kson) = setup();
    let result = kson.parse_schema("{}").unwrap();
    assert!(!result.is_success());
    let failure = result.into_result().unwrap_err();
    assert_eq!(failure.errors().unwrap().len(), 1);
}

// ============================================================================
// References and threads
// ============================================================================

#[test]
fn test_everything_released() {
    let (fake, runtime, kson) = setup();
    {
        let options = FormatOptions::default_for(&kson).unwrap();
        kson.format("a: 1", &options).unwrap();
        let json = Json::new(&runtime, false).unwrap();
        let _ = success_output(kson.to_json("a: [1]", &json).unwrap());
        let analysis = kson.analyze("a: [1, 2]\nb: %x", None).unwrap();
        let _ = analysis.tokens().unwrap();
        let _value = analysis.kson_value().unwrap();
        assert!(runtime.pinned_references() > 1);
    }
    assert_eq!(runtime.pinned_references(), 1);
    drop(kson);
    assert_eq!(runtime.pinned_references(), 0);

    let stats = fake.stats();
    assert_eq!(stats.live_locals, 0);
    assert_eq!(stats.double_deletes, 0);
    assert_eq!(stats.pending_exceptions, 0);
    assert_eq!(stats.attaches, stats.detaches);
}

#[test]
fn test_shared_across_threads() {
    let (_fake, runtime, kson) = setup();
    let json = Json::new(&runtime, true).unwrap();
    thread::scope(|scope| {
        for worker in 0..4 {
            let kson = &kson;
            let json = &json;
            scope.spawn(move || {
                for i in 0..100 {
                    let output = success_output(kson.to_json(&format!("n: {}", worker * 1000 + i), json).unwrap());
                    assert_eq!(output, format!("{{\"n\": {}}}", worker * 1000 + i));
                }
            });
        }
    });
    drop(json);
    drop(kson);
    assert_eq!(runtime.pinned_references(), 0);
}

#[test]
fn test_options_from_another_runtime_rejected() {
    let (_fake, _runtime, kson) = setup();
    let (_other_fake, other) = model();
    let indent = IndentType::spaces(&other, 2).unwrap();
    let options = FormatOptions::new(&indent, FormattingStyle::Plain, &[]).unwrap();
    let err = kson.format("a: 1", &options).unwrap_err();
    assert!(matches!(err, BridgeError::NativeInvocation { .. }));
}

#[test]
fn test_calls_after_shutdown_fail() {
    let (fake, runtime, kson) = setup();
    let options = FormatOptions::default_for(&kson).unwrap();
    runtime.shutdown().unwrap();
    assert!(kson.format("a: 1", &options).is_err());
    assert!(kson.analyze("a: 1", None).is_err());
    drop(options);
    drop(kson);
    assert!(fake.stats().destroyed);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_integer_lists_transpile(items in proptest::collection::vec(any::<i32>(), 1..16)) {
        let (_fake, runtime, kson) = setup();
        let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
        let source = format!("items: [{}]", rendered.join(", "));
        let json = Json::new(&runtime, true).unwrap();
        let output = success_output(kson.to_json(&source, &json).unwrap());
        prop_assert_eq!(output, format!("{{\"items\": [{}]}}", rendered.join(", ")));

        let analysis = kson.analyze(&source, None).unwrap();
        let Some(KsonValue::KsonObject(root)) = analysis.kson_value().unwrap() else {
            panic!("expected an object");
        };
        let Some(KsonValue::KsonArray(array)) = root.get_property_by_name("items").unwrap() else {
            panic!("expected an array");
        };
        let mut values = Vec::new();
        for element in array.elements().unwrap() {
            let KsonValue::KsonNumber(KsonNumber::Integer(integer)) = element else {
                panic!("expected an integer");
            };
            values.push(integer.value().unwrap());
        }
        prop_assert_eq!(values, items);
    }
}
