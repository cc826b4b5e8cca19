//! Tests against the real KSON native library
//!
//! Ignored by default: they need the platform library, located through
//! `KSON_LIBRARY_DIR` (or next to the test binary). All tests share the
//! process-wide runtime.
//!
//! # Running Tests
//! ```bash
//! KSON_LIBRARY_DIR=/path/to/lib cargo test -p kson --test native_library -- --ignored
//! ```

use kson::{
    FormatOptions, FormattingStyle, IndentType, Json, Kson, KsonNumber, KsonValue, Message,
    SchemaResult, TranspileResult, Yaml,
};

const NEEDS_LIBRARY: &str = "needs the KSON native library";

fn kson() -> &'static Kson {
    let _ = env_logger::builder().is_test(true).try_init();
    Kson::global().expect(NEEDS_LIBRARY)
}

fn options(style: FormattingStyle) -> FormatOptions {
    let indent = IndentType::spaces(kson().runtime(), 2).unwrap();
    FormatOptions::new(&indent, style, &[]).unwrap()
}

fn listing(messages: &[Message]) -> String {
    messages.iter().map(|message| format!("{}\n", message)).collect()
}

fn output(result: TranspileResult) -> String {
    result.into_result().map_err(|_| "expected success").unwrap().output().unwrap()
}

fn errors(result: TranspileResult) -> String {
    match result.into_result() {
        Ok(_) => panic!("expected failure"),
        Err(failure) => listing(&failure.errors().unwrap()),
    }
}

const EMBED_SOURCE: &str = "key: $embed\nThis is embedded content\nembed$$";

#[test]
#[ignore = "needs the KSON native library"]
fn test_format_plain() {
    let formatted = kson().format("key: [1, 2, 3, 4]", &options(FormattingStyle::Plain)).unwrap();
    assert_eq!(formatted, "key:\n  - 1\n  - 2\n  - 3\n  - 4");
}

#[test]
#[ignore = "needs the KSON native library"]
fn test_format_classic() {
    let formatted = kson().format("key: [1, 2, 3, 4]", &options(FormattingStyle::Classic)).unwrap();
    assert_eq!(formatted, "{\n  \"key\": [\n    1,\n    2,\n    3,\n    4\n  ]\n}");
}

#[test]
#[ignore = "needs the KSON native library"]
fn test_to_json() {
    let json = Json::new(kson().runtime(), true).unwrap();
    assert_eq!(
        output(kson().to_json("key: [1, 2, 3, 4]", &json).unwrap()),
        "{\n  \"key\": [\n    1,\n    2,\n    3,\n    4\n  ]\n}"
    );
    assert_eq!(
        errors(kson().to_json("key: [1, 2, 3, 4", &json).unwrap()),
        "0,5 to 0,16 - Unclosed list\n"
    );
}

#[test]
#[ignore = "needs the KSON native library"]
fn test_to_json_embed_tags() {
    let retained = Json::new(kson().runtime(), true).unwrap();
    assert_eq!(
        output(kson().to_json(EMBED_SOURCE, &retained).unwrap()),
        "{\n  \"key\": {\n    \"embedTag\": \"embed\",\n    \"embedContent\": \"This is embedded content\\nembed\"\n  }\n}"
    );
    let dropped = Json::new(kson().runtime(), false).unwrap();
    assert_eq!(
        output(kson().to_json(EMBED_SOURCE, &dropped).unwrap()),
        "{\n  \"key\": \"This is embedded content\\nembed\"\n}"
    );
}

#[test]
#[ignore = "needs the KSON native library"]
fn test_to_yaml() {
    let yaml = Yaml::new(kson().runtime(), true).unwrap();
    assert_eq!(
        output(kson().to_yaml("key: [1, 2, 3, 4]", &yaml).unwrap()),
        "key:\n  - 1\n  - 2\n  - 3\n  - 4"
    );
    assert_eq!(
        errors(kson().to_yaml("key: [1, 2, 3, 4", &yaml).unwrap()),
        "0,5 to 0,16 - Unclosed list\n"
    );
}

#[test]
#[ignore = "needs the KSON native library"]
fn test_analyze_tokens() {
    let analysis = kson().analyze("key: [1, 2, 3, 4]", None).unwrap();
    assert!(analysis.errors().unwrap().is_empty());
    let tokens: String = analysis
        .tokens()
        .unwrap()
        .iter()
        .map(|token| format!("{} to {} - {}: {}\n", token.start(), token.end(), token.token_type(), token.text()))
        .collect();
    assert_eq!(
        tokens,
        "0,0 to 0,3 - UNQUOTED_STRING: key\n\
         0,3 to 0,4 - COLON: :\n\
         0,5 to 0,6 - SQUARE_BRACKET_L: [\n\
         0,6 to 0,7 - NUMBER: 1\n\
         0,7 to 0,8 - COMMA: ,\n\
         0,9 to 0,10 - NUMBER: 2\n\
         0,10 to 0,11 - COMMA: ,\n\
         0,12 to 0,13 - NUMBER: 3\n\
         0,13 to 0,14 - COMMA: ,\n\
         0,15 to 0,16 - NUMBER: 4\n\
         0,16 to 0,17 - SQUARE_BRACKET_R: ]\n\
         0,17 to 0,17 - EOF: \n"
    );
}

#[test]
#[ignore = "needs the KSON native library"]
fn test_value_tree() {
    let source = "key: value\nlist:\n  - 1\n  - 2.1\n  - 3E5\nembed:%tag\n%%";
    let analysis = kson().analyze(source, None).unwrap();
    let Some(KsonValue::KsonObject(root)) = analysis.kson_value().unwrap() else {
        panic!("expected an object");
    };
    assert_eq!((root.end().unwrap().line(), root.end().unwrap().column()), (6, 2));

    let properties = root.properties().unwrap();
    assert_eq!(properties.len(), 3);

    let Some(KsonValue::KsonString(string)) = properties.get("key") else {
        panic!("expected a string");
    };
    assert_eq!(string.value().unwrap(), "value");
    assert_eq!(string.start().unwrap().to_string(), "0,5");
    assert_eq!(string.end().unwrap().to_string(), "0,10");

    let Some(KsonValue::KsonArray(array)) = properties.get("list") else {
        panic!("expected an array");
    };
    assert_eq!(array.start().unwrap().to_string(), "2,2");
    assert_eq!(array.end().unwrap().to_string(), "4,7");
    let elements = array.elements().unwrap();
    let [KsonValue::KsonNumber(KsonNumber::Integer(first)), KsonValue::KsonNumber(KsonNumber::Decimal(second)), KsonValue::KsonNumber(KsonNumber::Decimal(third))] =
        elements.as_slice()
    else {
        panic!("expected an integer and two decimals");
    };
    assert_eq!(first.value().unwrap(), 1);
    assert_eq!(second.value().unwrap(), 2.1);
    assert_eq!(third.value().unwrap(), 3e5);
    assert_eq!(third.start().unwrap().to_string(), "4,4");

    let Some(KsonValue::KsonEmbed(embed)) = properties.get("embed") else {
        panic!("expected an embed");
    };
    assert_eq!(embed.tag().unwrap().as_deref(), Some("tag"));
    assert_eq!(embed.content().unwrap(), "");
    assert_eq!(embed.start().unwrap().to_string(), "5,6");
    assert_eq!(embed.end().unwrap().to_string(), "6,2");
}

#[test]
#[ignore = "needs the KSON native library"]
fn test_nested_property_lookup() {
    let analysis = kson().analyze("person:\n  name: Alice\n  age: 25", None).unwrap();
    let Some(KsonValue::KsonObject(root)) = analysis.kson_value().unwrap() else {
        panic!("expected an object");
    };
    let Some(KsonValue::KsonObject(person)) = root.get_property_by_name("person").unwrap() else {
        panic!("expected a nested object");
    };
    let Some(KsonValue::KsonString(name)) = person.get_property_by_name("name").unwrap() else {
        panic!("expected a string");
    };
    assert_eq!(name.value().unwrap(), "Alice");
    assert!(person.get_property_by_name("city").unwrap().is_none());
}

#[test]
#[ignore = "needs the KSON native library"]
fn test_schema_validation() {
    let SchemaResult::Success(success) = kson().parse_schema(r#"{ "type": "string" }"#).unwrap() else {
        panic!("expected a parsed schema");
    };
    let validator = success.schema_validator().unwrap();
    assert!(validator.validate(r#""a good old JSON string""#, None).unwrap().is_empty());
    assert_eq!(
        listing(&validator.validate("42", None).unwrap()),
        "0,0 to 0,2 - Expected one of: string, but got: integer\n"
    );
}
