//! In-memory model of the KSON runtime API
//!
//! [`define_model`] installs every class this crate calls into a
//! [`FakeVm`], backed by a deliberately small line-based parser: one
//! `key: value` pair per line, where a value is a scalar, a flat `[a, b]`
//! list or a `%tag` embed. That is enough to drive every wrapper through
//! realistic object graphs without the native library.

use kson_bridge::testing::{FakeHeap, FakeValue, FakeVm, ObjId};
use kson_bridge::{Enumerated, Runtime};

use crate::enums::{FormattingStyle, KsonValueType, MessageSeverity, TokenType};

const KSON: &str = "org/kson/Kson";
const POSITION: &str = "org/kson/api/Position";
const MESSAGE: &str = "org/kson/api/Message";
const TOKEN: &str = "org/kson/api/Token";
const ANALYSIS: &str = "org/kson/api/Analysis";
const RESULT_SUCCESS: &str = "org/kson/api/Result$Success";
const RESULT_FAILURE: &str = "org/kson/api/Result$Failure";
const SCHEMA_SUCCESS: &str = "org/kson/api/SchemaResult$Success";
const SCHEMA_FAILURE: &str = "org/kson/api/SchemaResult$Failure";
const VALIDATOR: &str = "org/kson/api/SchemaValidatorService";
const VALUE: &str = "org/kson/api/KsonValue";
const OBJECT: &str = "org/kson/api/KsonValue$KsonObject";
const ARRAY: &str = "org/kson/api/KsonValue$KsonArray";
const STRING: &str = "org/kson/api/KsonValue$KsonString";
const INTEGER: &str = "org/kson/api/KsonValue$KsonNumber$Integer";
const DECIMAL: &str = "org/kson/api/KsonValue$KsonNumber$Decimal";
const BOOLEAN: &str = "org/kson/api/KsonValue$KsonBoolean";
const NULL: &str = "org/kson/api/KsonValue$KsonNull";
const EMBED: &str = "org/kson/api/KsonValue$KsonEmbed";
const SPACES: &str = "org/kson/api/IndentType$Spaces";
const TABS: &str = "org/kson/api/IndentType$Tabs";
const EMBED_RULE: &str = "org/kson/api/EmbedRule";
const FORMAT_OPTIONS: &str = "org/kson/api/FormatOptions";
const TRANSPILE_OPTIONS: &str = "org/kson/api/TranspileOptions";
const JSON: &str = "org/kson/api/TranspileOptions$Json";
const YAML: &str = "org/kson/api/TranspileOptions$Yaml";

const POSITION_TYPE: &str = "()Lorg/kson/api/Position;";
const STRING_TYPE: &str = "()Ljava/lang/String;";
const LIST_TYPE: &str = "()Ljava/util/List;";

/// A fresh fake runtime with the whole model installed
pub fn model() -> (FakeVm, Runtime) {
    let fake = FakeVm::new();
    define_model(&fake);
    let runtime = Runtime::with_vm(Box::new(fake.clone()));
    (fake, runtime)
}

/// Install the enum classes only
pub fn define_enums(fake: &FakeVm) {
    define_enum::<MessageSeverity>(fake);
    define_enum::<FormattingStyle>(fake);
    define_enum::<KsonValueType>(fake);
    define_enum::<TokenType>(fake);
}

fn define_enum<T: Enumerated>(fake: &FakeVm) {
    let names: Vec<String> = T::CONSTANTS
        .iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    fake.define_enum(&T::CLASS.to_string_lossy(), &names);
}

/// Install every class of the model
pub fn define_model(fake: &FakeVm) {
    define_enums(fake);

    fake.define_class(KSON)
        .singleton("INSTANCE", "Lorg/kson/Kson;")
        .method(
            "format",
            "(Ljava/lang/String;Lorg/kson/api/FormatOptions;)Ljava/lang/String;",
            format,
        )
        .method(
            "toJson",
            "(Ljava/lang/String;Lorg/kson/api/TranspileOptions$Json;)Lorg/kson/api/Result;",
            |heap, _, args| transpile(heap, args, render_json),
        )
        .method(
            "toYaml",
            "(Ljava/lang/String;Lorg/kson/api/TranspileOptions$Yaml;)Lorg/kson/api/Result;",
            |heap, _, args| transpile(heap, args, |doc, retain| render_plain(doc, "  ", retain)),
        )
        .method(
            "analyze",
            "(Ljava/lang/String;Ljava/lang/String;)Lorg/kson/api/Analysis;",
            analyze,
        )
        .method(
            "parseSchema",
            "(Ljava/lang/String;)Lorg/kson/api/SchemaResult;",
            parse_schema,
        )
        .build();

    fake.define_class(POSITION)
        .constructor("(II)V", &["line", "column"])
        .getter("getLine", "()I", "line")
        .getter("getColumn", "()I", "column")
        .build();
    fake.define_class(MESSAGE)
        .constructor(
            "(Ljava/lang/String;Lorg/kson/api/MessageSeverity;Lorg/kson/api/Position;Lorg/kson/api/Position;)V",
            &["message", "severity", "start", "end"],
        )
        .getter("getMessage", STRING_TYPE, "message")
        .getter("getSeverity", "()Lorg/kson/api/MessageSeverity;", "severity")
        .getter("getStart", POSITION_TYPE, "start")
        .getter("getEnd", POSITION_TYPE, "end")
        .build();
    fake.define_class(TOKEN)
        .getter("getTokenType", "()Lorg/kson/api/TokenType;", "tokenType")
        .getter("getText", STRING_TYPE, "text")
        .getter("getStart", POSITION_TYPE, "start")
        .getter("getEnd", POSITION_TYPE, "end")
        .build();
    fake.define_class(ANALYSIS)
        .getter("getErrors", LIST_TYPE, "errors")
        .getter("getTokens", LIST_TYPE, "tokens")
        .getter("getKsonValue", "()Lorg/kson/api/KsonValue;", "ksonValue")
        .build();

    fake.define_class(SPACES)
        .constructor("(I)V", &["size"])
        .getter("getSize", "()I", "size")
        .build();
    fake.define_class(TABS)
        .singleton("INSTANCE", "Lorg/kson/api/IndentType$Tabs;")
        .build();
    fake.define_class(EMBED_RULE)
        .constructor("(Ljava/lang/String;Ljava/lang/String;)V", &["pathPattern", "tag"])
        .getter("getPathPattern", STRING_TYPE, "pathPattern")
        .getter("getTag", STRING_TYPE, "tag")
        .build();
    fake.define_class(FORMAT_OPTIONS)
        .constructor(
            "(Lorg/kson/api/IndentType;Lorg/kson/api/FormattingStyle;Ljava/util/List;)V",
            &["indentType", "formattingStyle", "embedBlockRules"],
        )
        .getter("getIndentType", "()Lorg/kson/api/IndentType;", "indentType")
        .getter("getFormattingStyle", "()Lorg/kson/api/FormattingStyle;", "formattingStyle")
        .getter("getEmbedBlockRules", LIST_TYPE, "embedBlockRules")
        .build();
    fake.define_class(TRANSPILE_OPTIONS)
        .getter("getRetainEmbedTags", "()Z", "retainEmbedTags")
        .build();
    for class in [JSON, YAML] {
        fake.define_class(class)
            .constructor("(Z)V", &["retainEmbedTags"])
            .build();
    }

    fake.define_class(RESULT_SUCCESS)
        .getter("getOutput", STRING_TYPE, "output")
        .build();
    fake.define_class(RESULT_FAILURE)
        .getter("getErrors", LIST_TYPE, "errors")
        .build();
    fake.define_class(SCHEMA_SUCCESS)
        .getter("getSchemaValidator", "()Lorg/kson/api/SchemaValidatorService;", "schemaValidator")
        .build();
    fake.define_class(SCHEMA_FAILURE)
        .getter("getErrors", LIST_TYPE, "errors")
        .build();
    fake.define_class(VALIDATOR)
        .method("validate", "(Ljava/lang/String;Ljava/lang/String;)Ljava/util/List;", validate)
        .build();

    fake.define_class(VALUE)
        .getter("getStart", POSITION_TYPE, "start")
        .getter("getEnd", POSITION_TYPE, "end")
        .getter("getType", "()Lorg/kson/api/KsonValueType;", "type")
        .build();
    fake.define_class(OBJECT)
        .getter("getProperties", "()Ljava/util/Map;", "properties")
        .getter("getPropertyKeys", "()Ljava/util/Map;", "propertyKeys")
        .build();
    fake.define_class(ARRAY)
        .getter("getElements", LIST_TYPE, "elements")
        .build();
    fake.define_class(STRING)
        .getter("getValue", STRING_TYPE, "value")
        .build();
    fake.define_class(INTEGER).getter("getValue", "()I", "value").build();
    fake.define_class(DECIMAL).getter("getValue", "()D", "value").build();
    fake.define_class(BOOLEAN).getter("getValue", "()Z", "value").build();
    fake.define_class(NULL).build();
    fake.define_class(EMBED)
        .getter("getTag", STRING_TYPE, "tag")
        .getter("getContent", STRING_TYPE, "content")
        .build();
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    Scalar {
        kind: KsonValueType,
        text: String,
        line: usize,
        column: usize,
    },
    Array {
        items: Vec<Node>,
        line: usize,
        column: usize,
        width: usize,
    },
}

struct Entry {
    key: String,
    line: usize,
    value: Node,
}

struct Diagnostic {
    message: String,
    start: (usize, usize),
    end: (usize, usize),
}

struct Lexeme {
    token_type: TokenType,
    text: String,
    line: usize,
    column: usize,
}

#[derive(Default)]
struct Document {
    entries: Vec<Entry>,
    errors: Vec<Diagnostic>,
    tokens: Vec<Lexeme>,
    end: (usize, usize),
}

impl Document {
    fn diagnostic(&mut self, message: &str, start: (usize, usize), end: (usize, usize)) {
        self.errors.push(Diagnostic {
            message: message.to_string(),
            start,
            end,
        });
    }

    fn lexeme(&mut self, token_type: TokenType, text: &str, line: usize, column: usize) {
        self.tokens.push(Lexeme {
            token_type,
            text: text.to_string(),
            line,
            column,
        });
    }
}

fn classify(text: &str) -> KsonValueType {
    match text {
        "true" | "false" => KsonValueType::Boolean,
        "null" => KsonValueType::Null,
        _ if text.parse::<i32>().is_ok() => KsonValueType::Integer,
        _ if text.parse::<f64>().is_ok() => KsonValueType::Decimal,
        _ if text.starts_with('%') => KsonValueType::Embed,
        _ => KsonValueType::String,
    }
}

fn scalar_token(kind: KsonValueType, text: &str) -> TokenType {
    match kind {
        KsonValueType::Boolean if text == "true" => TokenType::True,
        KsonValueType::Boolean => TokenType::False,
        KsonValueType::Null => TokenType::Null,
        KsonValueType::Integer | KsonValueType::Decimal => TokenType::Number,
        KsonValueType::Embed => TokenType::EmbedTag,
        _ => TokenType::UnquotedString,
    }
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '\'' || c == '"')
}

fn parse(source: &str) -> Document {
    let mut doc = Document::default();
    for (line, text) in source.lines().enumerate() {
        doc.end = (line, text.len());
        if text.trim().is_empty() {
            continue;
        }
        let Some(colon) = text.find(':') else {
            doc.diagnostic("Expected ':' after a key", (line, 0), (line, text.len()));
            continue;
        };
        let key = text[..colon].trim_end();
        doc.lexeme(TokenType::UnquotedString, key, line, 0);
        doc.lexeme(TokenType::Colon, ":", line, colon);

        let rest = &text[colon + 1..];
        let column = colon + 1 + (rest.len() - rest.trim_start().len());
        let value = rest.trim();
        let node = if value.starts_with('[') {
            if !value.ends_with(']') {
                doc.diagnostic("Unclosed list", (line, column), (line, text.len()));
                continue;
            }
            parse_list(&mut doc, value, line, column)
        } else {
            let kind = classify(value);
            doc.lexeme(scalar_token(kind, value), value, line, column);
            Node::Scalar {
                kind,
                text: value.to_string(),
                line,
                column,
            }
        };
        doc.entries.push(Entry {
            key: key.to_string(),
            line,
            value: node,
        });
    }
    let (line, column) = doc.end;
    doc.lexeme(TokenType::Eof, "", line, column);
    doc
}

fn parse_list(doc: &mut Document, value: &str, line: usize, column: usize) -> Node {
    doc.lexeme(TokenType::SquareBracketL, "[", line, column);
    let mut position = column + 1;
    let mut items = Vec::new();
    for (index, piece) in value[1..value.len() - 1].split(',').enumerate() {
        if index > 0 {
            doc.lexeme(TokenType::Comma, ",", line, position);
            position += 1;
        }
        let item = piece.trim();
        if !item.is_empty() {
            let start = position + (piece.len() - piece.trim_start().len());
            let kind = classify(item);
            doc.lexeme(scalar_token(kind, item), item, line, start);
            items.push(Node::Scalar {
                kind,
                text: item.to_string(),
                line,
                column: start,
            });
        }
        position += piece.len();
    }
    doc.lexeme(TokenType::SquareBracketR, "]", line, position);
    Node::Array {
        items,
        line,
        column,
        width: value.len(),
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn json_value(node: &Node, retain_embed_tags: bool) -> String {
    match node {
        Node::Scalar {
            kind: KsonValueType::String,
            text,
            ..
        } => format!("{:?}", unquote(text)),
        Node::Scalar {
            kind: KsonValueType::Embed,
            text,
            ..
        } if retain_embed_tags => format!("{{\"embedTag\": {:?}, \"embedContent\": \"\"}}", &text[1..]),
        Node::Scalar {
            kind: KsonValueType::Embed,
            ..
        } => "\"\"".to_string(),
        Node::Scalar { text, .. } => text.clone(),
        Node::Array { items, .. } => {
            let items: Vec<String> = items.iter().map(|item| json_value(item, retain_embed_tags)).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

fn render_json(doc: &Document, retain_embed_tags: bool) -> String {
    let entries: Vec<String> = doc
        .entries
        .iter()
        .map(|entry| format!("{:?}: {}", entry.key, json_value(&entry.value, retain_embed_tags)))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn plain_scalar(node: &Node, retain_embed_tags: bool) -> String {
    match node {
        Node::Scalar {
            kind: KsonValueType::Embed,
            text,
            ..
        } if retain_embed_tags => text.clone(),
        Node::Scalar {
            kind: KsonValueType::Embed,
            ..
        } => "\"\"".to_string(),
        Node::Scalar { text, .. } => unquote(text).to_string(),
        Node::Array { .. } => json_value(node, retain_embed_tags),
    }
}

fn render_plain(doc: &Document, indent: &str, retain_embed_tags: bool) -> String {
    let mut lines = Vec::new();
    for entry in &doc.entries {
        match &entry.value {
            Node::Array { items, .. } => {
                lines.push(format!("{}:", entry.key));
                for item in items {
                    lines.push(format!("{}- {}", indent, plain_scalar(item, retain_embed_tags)));
                }
            }
            value => lines.push(format!("{}: {}", entry.key, plain_scalar(value, retain_embed_tags))),
        }
    }
    lines.join("\n")
}

fn render_inline(doc: &Document, separator: &str, compact: bool) -> String {
    let entries: Vec<String> = doc
        .entries
        .iter()
        .map(|entry| {
            let value = json_value(&entry.value, true);
            if compact {
                format!("{}:{}", entry.key, value.replace(", ", ","))
            } else {
                format!("{}: {}", entry.key, value)
            }
        })
        .collect();
    entries.join(separator)
}

// ============================================================================
// Heap objects
// ============================================================================

fn object(obj: ObjId) -> FakeValue {
    FakeValue::Object(Some(obj))
}

fn constant<T: Enumerated>(heap: &FakeHeap, value: T) -> FakeValue {
    object(heap.enum_constant(&T::CLASS.to_string_lossy(), value.ordinal()))
}

fn position(heap: &mut FakeHeap, (line, column): (usize, usize)) -> FakeValue {
    object(heap.instantiate(
        POSITION,
        &[
            ("line", FakeValue::Int(line as i32)),
            ("column", FakeValue::Int(column as i32)),
        ],
    ))
}

fn message(heap: &mut FakeHeap, text: &str, start: (usize, usize), end: (usize, usize)) -> ObjId {
    let text = object(heap.new_string(text));
    let severity = constant(heap, MessageSeverity::Error);
    let start = position(heap, start);
    let end = position(heap, end);
    heap.instantiate(
        MESSAGE,
        &[("message", text), ("severity", severity), ("start", start), ("end", end)],
    )
}

fn messages(heap: &mut FakeHeap, doc: &Document) -> ObjId {
    let items = doc
        .errors
        .iter()
        .map(|error| message(heap, &error.message, error.start, error.end))
        .collect();
    heap.new_list(items)
}

fn token(heap: &mut FakeHeap, lexeme: &Lexeme) -> ObjId {
    let token_type = constant(heap, lexeme.token_type);
    let text = object(heap.new_string(&lexeme.text));
    let start = position(heap, (lexeme.line, lexeme.column));
    let end = position(heap, (lexeme.line, lexeme.column + lexeme.text.len()));
    heap.instantiate(
        TOKEN,
        &[("tokenType", token_type), ("text", text), ("start", start), ("end", end)],
    )
}

fn value_node(
    heap: &mut FakeHeap,
    class: &str,
    kind: KsonValueType,
    mut fields: Vec<(&str, FakeValue)>,
    start: (usize, usize),
    end: (usize, usize),
) -> ObjId {
    let start = position(heap, start);
    let end = position(heap, end);
    let kind = constant(heap, kind);
    fields.extend([("start", start), ("end", end), ("type", kind)]);
    heap.instantiate(class, &fields)
}

fn value_object(heap: &mut FakeHeap, node: &Node) -> ObjId {
    match node {
        Node::Scalar {
            kind,
            text,
            line,
            column,
        } => {
            let (class, fields) = match kind {
                KsonValueType::Boolean => (BOOLEAN, vec![("value", FakeValue::Boolean(text == "true"))]),
                KsonValueType::Null => (NULL, Vec::new()),
                KsonValueType::Integer => (INTEGER, vec![("value", FakeValue::Int(text.parse().unwrap_or(0)))]),
                KsonValueType::Decimal => (DECIMAL, vec![("value", FakeValue::Double(text.parse().unwrap_or(0.0)))]),
                KsonValueType::Embed => {
                    let tag = (text.len() > 1).then(|| heap.new_string(&text[1..]));
                    let content = heap.new_string("");
                    (EMBED, vec![("tag", FakeValue::Object(tag)), ("content", object(content))])
                }
                _ => (STRING, vec![("value", object(heap.new_string(unquote(text))))]),
            };
            value_node(heap, class, *kind, fields, (*line, *column), (*line, column + text.len()))
        }
        Node::Array {
            items,
            line,
            column,
            width,
        } => {
            let elements = items.iter().map(|item| value_object(heap, item)).collect();
            let elements = object(heap.new_list(elements));
            value_node(
                heap,
                ARRAY,
                KsonValueType::Array,
                vec![("elements", elements)],
                (*line, *column),
                (*line, column + width),
            )
        }
    }
}

fn root_object(heap: &mut FakeHeap, doc: &Document) -> Option<ObjId> {
    if !doc.errors.is_empty() || doc.entries.is_empty() {
        return None;
    }
    let mut properties = Vec::new();
    let mut keys = Vec::new();
    for entry in &doc.entries {
        let value = value_object(heap, &entry.value);
        let key_node = value_object(
            heap,
            &Node::Scalar {
                kind: KsonValueType::String,
                text: entry.key.clone(),
                line: entry.line,
                column: 0,
            },
        );
        properties.push((heap.new_string(&entry.key), value));
        keys.push((heap.new_string(&entry.key), key_node));
    }
    let properties = object(heap.new_map(properties));
    let keys = object(heap.new_map(keys));
    Some(value_node(
        heap,
        OBJECT,
        KsonValueType::Object,
        vec![("properties", properties), ("propertyKeys", keys)],
        (0, 0),
        doc.end,
    ))
}

// ============================================================================
// Method bodies
// ============================================================================

fn string_arg(heap: &FakeHeap, args: &[FakeValue], index: usize) -> Result<String, String> {
    args.get(index)
        .and_then(|arg| arg.object())
        .map(|obj| heap.string(obj))
        .ok_or_else(|| format!("java.lang.NullPointerException: argument {}", index))
}

fn object_arg(args: &[FakeValue], index: usize) -> Result<ObjId, String> {
    args.get(index)
        .and_then(|arg| arg.object())
        .ok_or_else(|| format!("java.lang.NullPointerException: argument {}", index))
}

fn format(heap: &mut FakeHeap, _: ObjId, args: &[FakeValue]) -> Result<FakeValue, String> {
    let source = string_arg(heap, args, 0)?;
    let options = object_arg(args, 1)?;
    let doc = parse(&source);
    if !doc.errors.is_empty() {
        return Ok(object(heap.new_string(&source)));
    }

    let indent = heap
        .field(options, "indentType")
        .object()
        .ok_or("java.lang.NullPointerException: indentType")?;
    let indent = if heap.class_name(indent) == TABS {
        "\t".to_string()
    } else {
        match heap.field(indent, "size") {
            FakeValue::Int(size) => " ".repeat(size.max(0) as usize),
            _ => return Err("java.lang.IllegalStateException: size".to_string()),
        }
    };
    let style = heap
        .field(options, "formattingStyle")
        .object()
        .map(|style| heap.ordinal(style))
        .and_then(|ordinal| FormattingStyle::VALUES.get(ordinal).copied())
        .ok_or("java.lang.NullPointerException: formattingStyle")?;

    let output = match style {
        FormattingStyle::Plain => render_plain(&doc, &indent, true),
        FormattingStyle::Delimited => format!("{{ {} }}", render_inline(&doc, ", ", false)),
        FormattingStyle::Compact => render_inline(&doc, " ", true),
        FormattingStyle::Classic => render_json(&doc, true),
    };
    Ok(object(heap.new_string(&output)))
}

fn transpile(
    heap: &mut FakeHeap,
    args: &[FakeValue],
    render: impl Fn(&Document, bool) -> String,
) -> Result<FakeValue, String> {
    let source = string_arg(heap, args, 0)?;
    let options = object_arg(args, 1)?;
    let retain_embed_tags = !matches!(heap.field(options, "retainEmbedTags"), FakeValue::Boolean(false));
    let doc = parse(&source);
    let result = if doc.errors.is_empty() {
        let output = object(heap.new_string(&render(&doc, retain_embed_tags)));
        heap.instantiate(RESULT_SUCCESS, &[("output", output)])
    } else {
        let errors = object(messages(heap, &doc));
        heap.instantiate(RESULT_FAILURE, &[("errors", errors)])
    };
    Ok(object(result))
}

fn analyze(heap: &mut FakeHeap, _: ObjId, args: &[FakeValue]) -> Result<FakeValue, String> {
    let source = string_arg(heap, args, 0)?;
    let doc = parse(&source);
    let errors = object(messages(heap, &doc));
    let tokens = doc.tokens.iter().map(|lexeme| token(heap, lexeme)).collect();
    let tokens = object(heap.new_list(tokens));
    let value = FakeValue::Object(root_object(heap, &doc));
    Ok(object(heap.instantiate(
        ANALYSIS,
        &[("errors", errors), ("tokens", tokens), ("ksonValue", value)],
    )))
}

fn parse_schema(heap: &mut FakeHeap, _: ObjId, args: &[FakeValue]) -> Result<FakeValue, String> {
    let source = string_arg(heap, args, 0)?;
    let expected = source
        .split_once("\"type\"")
        .and_then(|(_, rest)| rest.split('"').nth(1))
        .map(str::to_string);
    let result = match expected {
        Some(expected) => {
            let expected = object(heap.new_string(&expected));
            let validator = object(heap.instantiate(VALIDATOR, &[("expected", expected)]));
            heap.instantiate(SCHEMA_SUCCESS, &[("schemaValidator", validator)])
        }
        None => {
            let error = message(heap, "Schema must declare a \"type\"", (0, 0), (0, source.len()));
            let errors = object(heap.new_list(vec![error]));
            heap.instantiate(SCHEMA_FAILURE, &[("errors", errors)])
        }
    };
    Ok(object(result))
}

fn validate(heap: &mut FakeHeap, this: ObjId, args: &[FakeValue]) -> Result<FakeValue, String> {
    let source = string_arg(heap, args, 0)?;
    let expected = heap
        .field(this, "expected")
        .object()
        .map(|obj| heap.string(obj))
        .unwrap_or_default();
    let value = source.trim();
    let actual = if value.starts_with('"') {
        "string".to_string()
    } else {
        classify(value).name().to_lowercase()
    };
    let mut errors = Vec::new();
    if actual != expected {
        let text = format!("Expected one of: {}, but got: {}", expected, actual);
        errors.push(message(heap, &text, (0, 0), (0, value.len())));
    }
    Ok(object(heap.new_list(errors)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_listing(doc: &Document) -> Vec<String> {
        doc.tokens
            .iter()
            .map(|t| {
                format!(
                    "{},{} to {},{} - {}: {}",
                    t.line,
                    t.column,
                    t.line,
                    t.column + t.text.len(),
                    t.token_type.name(),
                    t.text
                )
            })
            .collect()
    }

    #[test]
    fn test_list_tokens_match_library_positions() {
        let doc = parse("key: [1, 2, 3, 4]");
        let listing = token_listing(&doc);
        assert_eq!(listing[0], "0,0 to 0,3 - UNQUOTED_STRING: key");
        assert_eq!(listing[2], "0,5 to 0,6 - SQUARE_BRACKET_L: [");
        assert_eq!(listing[8], "0,13 to 0,14 - COMMA: ,");
        assert_eq!(listing[9], "0,15 to 0,16 - NUMBER: 4");
        assert_eq!(listing[10], "0,16 to 0,17 - SQUARE_BRACKET_R: ]");
        assert_eq!(listing[11], "0,17 to 0,17 - EOF: ");
        assert_eq!(listing.len(), 12);
    }

    #[test]
    fn test_unclosed_list_range() {
        let doc = parse("key: [1, 2, 3, 4");
        assert_eq!(doc.errors.len(), 1);
        assert_eq!(doc.errors[0].start, (0, 5));
        assert_eq!(doc.errors[0].end, (0, 16));
    }

    #[test]
    fn test_plain_rendering() {
        let doc = parse("key: [1, 2, 3, 4]");
        assert_eq!(render_plain(&doc, "  ", true), "key:\n  - 1\n  - 2\n  - 3\n  - 4");
    }
}
