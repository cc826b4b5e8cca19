//! Every class and member of the KSON runtime API this crate calls
//!
//! [`ALL`] is checked against the loaded library when a [`crate::Kson`] is
//! created, so a mismatched library fails up front instead of on first use.

use std::ffi::CStr;

use kson_bridge::{Descriptor, ReturnKind};

// ============================================================================
// Entry point
// ============================================================================

pub const KSON_INSTANCE: Descriptor =
    Descriptor::static_field(c"org/kson/Kson", c"INSTANCE", c"Lorg/kson/Kson;");

pub const KSON_FORMAT: Descriptor = Descriptor::method(
    c"org/kson/Kson",
    c"format",
    c"(Ljava/lang/String;Lorg/kson/api/FormatOptions;)Ljava/lang/String;",
    ReturnKind::Object,
);

pub const KSON_TO_JSON: Descriptor = Descriptor::method(
    c"org/kson/Kson",
    c"toJson",
    c"(Ljava/lang/String;Lorg/kson/api/TranspileOptions$Json;)Lorg/kson/api/Result;",
    ReturnKind::Object,
);

pub const KSON_TO_YAML: Descriptor = Descriptor::method(
    c"org/kson/Kson",
    c"toYaml",
    c"(Ljava/lang/String;Lorg/kson/api/TranspileOptions$Yaml;)Lorg/kson/api/Result;",
    ReturnKind::Object,
);

pub const KSON_ANALYZE: Descriptor = Descriptor::method(
    c"org/kson/Kson",
    c"analyze",
    c"(Ljava/lang/String;Ljava/lang/String;)Lorg/kson/api/Analysis;",
    ReturnKind::Object,
);

pub const KSON_PARSE_SCHEMA: Descriptor = Descriptor::method(
    c"org/kson/Kson",
    c"parseSchema",
    c"(Ljava/lang/String;)Lorg/kson/api/SchemaResult;",
    ReturnKind::Object,
);

// ============================================================================
// Records
// ============================================================================

pub const POSITION_NEW: Descriptor = Descriptor::constructor(c"org/kson/api/Position", c"(II)V");
pub const POSITION_GET_LINE: Descriptor =
    Descriptor::method(c"org/kson/api/Position", c"getLine", c"()I", ReturnKind::Int);
pub const POSITION_GET_COLUMN: Descriptor =
    Descriptor::method(c"org/kson/api/Position", c"getColumn", c"()I", ReturnKind::Int);

pub const MESSAGE_NEW: Descriptor = Descriptor::constructor(
    c"org/kson/api/Message",
    c"(Ljava/lang/String;Lorg/kson/api/MessageSeverity;Lorg/kson/api/Position;Lorg/kson/api/Position;)V",
);
pub const MESSAGE_GET_MESSAGE: Descriptor = Descriptor::method(
    c"org/kson/api/Message",
    c"getMessage",
    c"()Ljava/lang/String;",
    ReturnKind::Object,
);
pub const MESSAGE_GET_SEVERITY: Descriptor = Descriptor::method(
    c"org/kson/api/Message",
    c"getSeverity",
    c"()Lorg/kson/api/MessageSeverity;",
    ReturnKind::Object,
);
pub const MESSAGE_GET_START: Descriptor = Descriptor::method(
    c"org/kson/api/Message",
    c"getStart",
    c"()Lorg/kson/api/Position;",
    ReturnKind::Object,
);
pub const MESSAGE_GET_END: Descriptor = Descriptor::method(
    c"org/kson/api/Message",
    c"getEnd",
    c"()Lorg/kson/api/Position;",
    ReturnKind::Object,
);

pub const TOKEN_GET_TOKEN_TYPE: Descriptor = Descriptor::method(
    c"org/kson/api/Token",
    c"getTokenType",
    c"()Lorg/kson/api/TokenType;",
    ReturnKind::Object,
);
pub const TOKEN_GET_TEXT: Descriptor =
    Descriptor::method(c"org/kson/api/Token", c"getText", c"()Ljava/lang/String;", ReturnKind::Object);
pub const TOKEN_GET_START: Descriptor = Descriptor::method(
    c"org/kson/api/Token",
    c"getStart",
    c"()Lorg/kson/api/Position;",
    ReturnKind::Object,
);
pub const TOKEN_GET_END: Descriptor = Descriptor::method(
    c"org/kson/api/Token",
    c"getEnd",
    c"()Lorg/kson/api/Position;",
    ReturnKind::Object,
);

// ============================================================================
// Analysis
// ============================================================================

pub const ANALYSIS_GET_ERRORS: Descriptor =
    Descriptor::method(c"org/kson/api/Analysis", c"getErrors", c"()Ljava/util/List;", ReturnKind::Object);
pub const ANALYSIS_GET_TOKENS: Descriptor =
    Descriptor::method(c"org/kson/api/Analysis", c"getTokens", c"()Ljava/util/List;", ReturnKind::Object);
pub const ANALYSIS_GET_KSON_VALUE: Descriptor = Descriptor::method(
    c"org/kson/api/Analysis",
    c"getKsonValue",
    c"()Lorg/kson/api/KsonValue;",
    ReturnKind::Object,
);

// ============================================================================
// Options
// ============================================================================

pub const INDENT_SPACES_NEW: Descriptor =
    Descriptor::constructor(c"org/kson/api/IndentType$Spaces", c"(I)V");
pub const INDENT_SPACES_GET_SIZE: Descriptor =
    Descriptor::method(c"org/kson/api/IndentType$Spaces", c"getSize", c"()I", ReturnKind::Int);
pub const INDENT_TABS_INSTANCE: Descriptor = Descriptor::static_field(
    c"org/kson/api/IndentType$Tabs",
    c"INSTANCE",
    c"Lorg/kson/api/IndentType$Tabs;",
);

pub const EMBED_RULE_NEW: Descriptor = Descriptor::constructor(
    c"org/kson/api/EmbedRule",
    c"(Ljava/lang/String;Ljava/lang/String;)V",
);
pub const EMBED_RULE_GET_PATH_PATTERN: Descriptor = Descriptor::method(
    c"org/kson/api/EmbedRule",
    c"getPathPattern",
    c"()Ljava/lang/String;",
    ReturnKind::Object,
);
pub const EMBED_RULE_GET_TAG: Descriptor =
    Descriptor::method(c"org/kson/api/EmbedRule", c"getTag", c"()Ljava/lang/String;", ReturnKind::Object);

pub const FORMAT_OPTIONS_NEW: Descriptor = Descriptor::constructor(
    c"org/kson/api/FormatOptions",
    c"(Lorg/kson/api/IndentType;Lorg/kson/api/FormattingStyle;Ljava/util/List;)V",
);
pub const FORMAT_OPTIONS_GET_INDENT_TYPE: Descriptor = Descriptor::method(
    c"org/kson/api/FormatOptions",
    c"getIndentType",
    c"()Lorg/kson/api/IndentType;",
    ReturnKind::Object,
);
pub const FORMAT_OPTIONS_GET_FORMATTING_STYLE: Descriptor = Descriptor::method(
    c"org/kson/api/FormatOptions",
    c"getFormattingStyle",
    c"()Lorg/kson/api/FormattingStyle;",
    ReturnKind::Object,
);
pub const FORMAT_OPTIONS_GET_EMBED_BLOCK_RULES: Descriptor = Descriptor::method(
    c"org/kson/api/FormatOptions",
    c"getEmbedBlockRules",
    c"()Ljava/util/List;",
    ReturnKind::Object,
);

pub const TRANSPILE_JSON_NEW: Descriptor =
    Descriptor::constructor(c"org/kson/api/TranspileOptions$Json", c"(Z)V");
pub const TRANSPILE_YAML_NEW: Descriptor =
    Descriptor::constructor(c"org/kson/api/TranspileOptions$Yaml", c"(Z)V");
/// Declared on the sealed base, dispatched to either variant
pub const TRANSPILE_GET_RETAIN_EMBED_TAGS: Descriptor = Descriptor::method(
    c"org/kson/api/TranspileOptions",
    c"getRetainEmbedTags",
    c"()Z",
    ReturnKind::Boolean,
);

// ============================================================================
// Results
// ============================================================================

pub const RESULT_SUCCESS_GET_OUTPUT: Descriptor = Descriptor::method(
    c"org/kson/api/Result$Success",
    c"getOutput",
    c"()Ljava/lang/String;",
    ReturnKind::Object,
);
pub const RESULT_FAILURE_GET_ERRORS: Descriptor = Descriptor::method(
    c"org/kson/api/Result$Failure",
    c"getErrors",
    c"()Ljava/util/List;",
    ReturnKind::Object,
);

pub const SCHEMA_SUCCESS_GET_VALIDATOR: Descriptor = Descriptor::method(
    c"org/kson/api/SchemaResult$Success",
    c"getSchemaValidator",
    c"()Lorg/kson/api/SchemaValidatorService;",
    ReturnKind::Object,
);
pub const SCHEMA_FAILURE_GET_ERRORS: Descriptor = Descriptor::method(
    c"org/kson/api/SchemaResult$Failure",
    c"getErrors",
    c"()Ljava/util/List;",
    ReturnKind::Object,
);
pub const SCHEMA_VALIDATOR_VALIDATE: Descriptor = Descriptor::method(
    c"org/kson/api/SchemaValidatorService",
    c"validate",
    c"(Ljava/lang/String;Ljava/lang/String;)Ljava/util/List;",
    ReturnKind::Object,
);

// ============================================================================
// Values
// ============================================================================

pub const VALUE_GET_START: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue",
    c"getStart",
    c"()Lorg/kson/api/Position;",
    ReturnKind::Object,
);
pub const VALUE_GET_END: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue",
    c"getEnd",
    c"()Lorg/kson/api/Position;",
    ReturnKind::Object,
);
pub const VALUE_GET_TYPE: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue",
    c"getType",
    c"()Lorg/kson/api/KsonValueType;",
    ReturnKind::Object,
);

pub const OBJECT_GET_PROPERTIES: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonObject",
    c"getProperties",
    c"()Ljava/util/Map;",
    ReturnKind::Object,
);
pub const OBJECT_GET_PROPERTY_KEYS: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonObject",
    c"getPropertyKeys",
    c"()Ljava/util/Map;",
    ReturnKind::Object,
);
pub const ARRAY_GET_ELEMENTS: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonArray",
    c"getElements",
    c"()Ljava/util/List;",
    ReturnKind::Object,
);
pub const STRING_GET_VALUE: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonString",
    c"getValue",
    c"()Ljava/lang/String;",
    ReturnKind::Object,
);
pub const INTEGER_GET_VALUE: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonNumber$Integer",
    c"getValue",
    c"()I",
    ReturnKind::Int,
);
pub const DECIMAL_GET_VALUE: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonNumber$Decimal",
    c"getValue",
    c"()D",
    ReturnKind::Double,
);
pub const BOOLEAN_GET_VALUE: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonBoolean",
    c"getValue",
    c"()Z",
    ReturnKind::Boolean,
);
pub const EMBED_GET_TAG: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonEmbed",
    c"getTag",
    c"()Ljava/lang/String;",
    ReturnKind::Object,
);
pub const EMBED_GET_CONTENT: Descriptor = Descriptor::method(
    c"org/kson/api/KsonValue$KsonEmbed",
    c"getContent",
    c"()Ljava/lang/String;",
    ReturnKind::Object,
);

/// Every member called by this crate
pub const ALL: &[Descriptor] = &[
    KSON_INSTANCE,
    KSON_FORMAT,
    KSON_TO_JSON,
    KSON_TO_YAML,
    KSON_ANALYZE,
    KSON_PARSE_SCHEMA,
    POSITION_NEW,
    POSITION_GET_LINE,
    POSITION_GET_COLUMN,
    MESSAGE_NEW,
    MESSAGE_GET_MESSAGE,
    MESSAGE_GET_SEVERITY,
    MESSAGE_GET_START,
    MESSAGE_GET_END,
    TOKEN_GET_TOKEN_TYPE,
    TOKEN_GET_TEXT,
    TOKEN_GET_START,
    TOKEN_GET_END,
    ANALYSIS_GET_ERRORS,
    ANALYSIS_GET_TOKENS,
    ANALYSIS_GET_KSON_VALUE,
    INDENT_SPACES_NEW,
    INDENT_SPACES_GET_SIZE,
    INDENT_TABS_INSTANCE,
    EMBED_RULE_NEW,
    EMBED_RULE_GET_PATH_PATTERN,
    EMBED_RULE_GET_TAG,
    FORMAT_OPTIONS_NEW,
    FORMAT_OPTIONS_GET_INDENT_TYPE,
    FORMAT_OPTIONS_GET_FORMATTING_STYLE,
    FORMAT_OPTIONS_GET_EMBED_BLOCK_RULES,
    TRANSPILE_JSON_NEW,
    TRANSPILE_YAML_NEW,
    TRANSPILE_GET_RETAIN_EMBED_TAGS,
    RESULT_SUCCESS_GET_OUTPUT,
    RESULT_FAILURE_GET_ERRORS,
    SCHEMA_SUCCESS_GET_VALIDATOR,
    SCHEMA_FAILURE_GET_ERRORS,
    SCHEMA_VALIDATOR_VALIDATE,
    VALUE_GET_START,
    VALUE_GET_END,
    VALUE_GET_TYPE,
    OBJECT_GET_PROPERTIES,
    OBJECT_GET_PROPERTY_KEYS,
    ARRAY_GET_ELEMENTS,
    STRING_GET_VALUE,
    INTEGER_GET_VALUE,
    DECIMAL_GET_VALUE,
    BOOLEAN_GET_VALUE,
    EMBED_GET_TAG,
    EMBED_GET_CONTENT,
];

/// Concrete classes results are dispatched to; several are never named by a
/// member above, so all of them are resolved explicitly
pub const VARIANT_CLASSES: &[&CStr] = &[
    c"org/kson/api/Result$Success",
    c"org/kson/api/Result$Failure",
    c"org/kson/api/SchemaResult$Success",
    c"org/kson/api/SchemaResult$Failure",
    c"org/kson/api/IndentType$Spaces",
    c"org/kson/api/IndentType$Tabs",
    c"org/kson/api/TranspileOptions$Json",
    c"org/kson/api/TranspileOptions$Yaml",
    c"org/kson/api/KsonValue$KsonObject",
    c"org/kson/api/KsonValue$KsonArray",
    c"org/kson/api/KsonValue$KsonString",
    c"org/kson/api/KsonValue$KsonNumber$Integer",
    c"org/kson/api/KsonValue$KsonNumber$Decimal",
    c"org/kson/api/KsonValue$KsonBoolean",
    c"org/kson/api/KsonValue$KsonNull",
    c"org/kson/api/KsonValue$KsonEmbed",
];

/// Binary (dotted) name of a slash-separated class name
pub fn binary_name(class: &CStr) -> String {
    class.to_string_lossy().replace('/', ".")
}
