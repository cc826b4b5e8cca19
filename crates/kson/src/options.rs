//! Formatting options
//!
//! Option objects are created in the runtime and held as pinned references,
//! so they can be passed to any number of calls without being rebuilt.

use kson_bridge::{
    downcast, unknown_variant, BridgeResult, Env, FromEmbedded, GlobalRef, JValue, LocalRef,
    Runtime, Sealed, ToEmbedded,
};

use crate::access::{self, to_int, unsigned};
use crate::descriptors as d;
use crate::enums::FormattingStyle;
use crate::kson::Kson;

embedded_wrapper! {
    /// Indentation by a fixed number of spaces
    Spaces
}

embedded_wrapper! {
    /// Indentation by tabs
    Tabs
}

impl Spaces {
    pub fn size(&self) -> BridgeResult<usize> {
        let size = access::int(&self.inner, &d::INDENT_SPACES_GET_SIZE)?;
        unsigned(size, &d::INDENT_SPACES_GET_SIZE)
    }
}

/// Indentation used by [`Kson::format`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum IndentType {
    Spaces(Spaces),
    Tabs(Tabs),
}

impl IndentType {
    /// Indent by `size` spaces
    pub fn spaces(runtime: &Runtime, size: usize) -> BridgeResult<IndentType> {
        let size = to_int(size, &d::INDENT_SPACES_NEW)?;
        runtime
            .with_attachment(|env| env.new_object(&d::INDENT_SPACES_NEW, &[JValue::Int(size)])?.pin())
            .map(|inner| IndentType::Spaces(Spaces { inner }))
    }

    /// Indent by tabs; always the runtime's single `Tabs` instance
    pub fn tabs(runtime: &Runtime) -> BridgeResult<IndentType> {
        runtime
            .with_attachment(|env| env.static_field(&d::INDENT_TABS_INSTANCE)?.pin())
            .map(|inner| IndentType::Tabs(Tabs { inner }))
    }

    pub fn runtime(&self) -> &Runtime {
        match self {
            IndentType::Spaces(spaces) => spaces.runtime(),
            IndentType::Tabs(tabs) => tabs.runtime(),
        }
    }
}

impl Sealed for IndentType {
    const BASE: &'static str = "org.kson.api.IndentType";
    const VARIANTS: &'static [&'static str] =
        &["org.kson.api.IndentType$Spaces", "org.kson.api.IndentType$Tabs"];

    fn from_variant(tag: usize, obj: GlobalRef) -> BridgeResult<Self> {
        Ok(match tag {
            0 => IndentType::Spaces(Spaces::from(obj)),
            1 => IndentType::Tabs(Tabs::from(obj)),
            _ => return Err(unknown_variant::<Self>(tag)),
        })
    }
}

impl FromEmbedded for IndentType {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        downcast(obj)
    }
}

impl ToEmbedded for IndentType {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        match self {
            IndentType::Spaces(spaces) => spaces.to_embedded(env),
            IndentType::Tabs(tabs) => tabs.to_embedded(env),
        }
    }
}

embedded_wrapper! {
    /// Formatting rule for embed blocks whose path matches a pattern
    EmbedRule
}

impl EmbedRule {
    pub fn new(runtime: &Runtime, path_pattern: &str, tag: Option<&str>) -> BridgeResult<EmbedRule> {
        runtime
            .with_attachment(|env| {
                let path_pattern = path_pattern.to_embedded(env)?;
                let tag = tag.to_embedded(env)?;
                env.new_object(&d::EMBED_RULE_NEW, &[path_pattern.as_arg(), tag.as_arg()])?
                    .pin()
            })
            .map(EmbedRule::from)
    }

    pub fn path_pattern(&self) -> BridgeResult<String> {
        access::object(&self.inner, &d::EMBED_RULE_GET_PATH_PATTERN)
    }

    pub fn tag(&self) -> BridgeResult<Option<String>> {
        access::nullable(&self.inner, &d::EMBED_RULE_GET_TAG)
    }
}

embedded_wrapper! {
    /// Options for [`Kson::format`]
    FormatOptions
}

impl FormatOptions {
    /// Options in the runtime `indent_type` belongs to. Every rule must come
    /// from that runtime as well.
    pub fn new(
        indent_type: &IndentType,
        formatting_style: FormattingStyle,
        embed_block_rules: &[EmbedRule],
    ) -> BridgeResult<FormatOptions> {
        indent_type
            .runtime()
            .with_attachment(|env| {
                let indent = indent_type.to_embedded(env)?;
                let style = formatting_style.to_embedded(env)?;
                let rules = embed_block_rules.to_embedded(env)?;
                env.new_object(
                    &d::FORMAT_OPTIONS_NEW,
                    &[indent.as_arg(), style.as_arg(), rules.as_arg()],
                )?
                .pin()
            })
            .map(FormatOptions::from)
    }

    /// Two-space indentation, plain style, no embed rules
    pub fn default_for(kson: &Kson) -> BridgeResult<FormatOptions> {
        let indent = IndentType::spaces(kson.runtime(), 2)?;
        FormatOptions::new(&indent, FormattingStyle::Plain, &[])
    }

    pub fn indent_type(&self) -> BridgeResult<IndentType> {
        access::object(&self.inner, &d::FORMAT_OPTIONS_GET_INDENT_TYPE)
    }

    pub fn formatting_style(&self) -> BridgeResult<FormattingStyle> {
        access::object(&self.inner, &d::FORMAT_OPTIONS_GET_FORMATTING_STYLE)
    }

    pub fn embed_block_rules(&self) -> BridgeResult<Vec<EmbedRule>> {
        access::object(&self.inner, &d::FORMAT_OPTIONS_GET_EMBED_BLOCK_RULES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::model;

    #[test]
    fn test_indent_round_trip() {
        let (_fake, runtime) = model();
        let IndentType::Spaces(spaces) = IndentType::spaces(&runtime, 4).unwrap() else {
            panic!("expected spaces");
        };
        assert_eq!(spaces.size().unwrap(), 4);

        let tabs = IndentType::tabs(&runtime).unwrap();
        assert_eq!(tabs, IndentType::tabs(&runtime).unwrap());
        assert_ne!(tabs, IndentType::spaces(&runtime, 4).unwrap());
    }

    #[test]
    fn test_format_options_accessors() {
        let (_fake, runtime) = model();
        let indent = IndentType::tabs(&runtime).unwrap();
        let rules = vec![
            EmbedRule::new(&runtime, "/scripts/*", Some("bash")).unwrap(),
            EmbedRule::new(&runtime, "/query", None).unwrap(),
        ];
        let options = FormatOptions::new(&indent, FormattingStyle::Delimited, &rules).unwrap();

        assert!(matches!(options.indent_type().unwrap(), IndentType::Tabs(_)));
        assert_eq!(options.formatting_style().unwrap(), FormattingStyle::Delimited);
        let read_back = options.embed_block_rules().unwrap();
        assert_eq!(read_back, rules);
        assert_eq!(read_back[0].path_pattern().unwrap(), "/scripts/*");
        assert_eq!(read_back[0].tag().unwrap().as_deref(), Some("bash"));
        assert_eq!(read_back[1].tag().unwrap(), None);
    }

    #[test]
    fn test_rules_from_another_runtime_rejected() {
        let (_first_fake, first) = model();
        let (_second_fake, second) = model();
        let indent = IndentType::spaces(&first, 2).unwrap();
        let foreign = EmbedRule::new(&second, "/x", None).unwrap();
        assert!(FormatOptions::new(&indent, FormattingStyle::Plain, &[foreign]).is_err());
    }
}
