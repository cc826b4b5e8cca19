//! Options for [`crate::Kson::to_json`] and [`crate::Kson::to_yaml`]

use kson_bridge::{downcast, unknown_variant, BridgeResult, Env, FromEmbedded, GlobalRef, JValue, LocalRef, Runtime, Sealed, ToEmbedded};

use crate::access;
use crate::descriptors as d;

embedded_wrapper! {
    /// JSON output options
    Json
}

embedded_wrapper! {
    /// YAML output options
    Yaml
}

impl Json {
    /// `retain_embed_tags` keeps embed blocks as tagged objects instead of
    /// plain strings
    pub fn new(runtime: &Runtime, retain_embed_tags: bool) -> BridgeResult<Json> {
        runtime
            .with_attachment(|env| {
                env.new_object(&d::TRANSPILE_JSON_NEW, &[JValue::Boolean(retain_embed_tags)])?
                    .pin()
            })
            .map(Json::from)
    }

    pub fn retain_embed_tags(&self) -> BridgeResult<bool> {
        access::boolean(&self.inner, &d::TRANSPILE_GET_RETAIN_EMBED_TAGS)
    }
}

impl Yaml {
    pub fn new(runtime: &Runtime, retain_embed_tags: bool) -> BridgeResult<Yaml> {
        runtime
            .with_attachment(|env| {
                env.new_object(&d::TRANSPILE_YAML_NEW, &[JValue::Boolean(retain_embed_tags)])?
                    .pin()
            })
            .map(Yaml::from)
    }

    pub fn retain_embed_tags(&self) -> BridgeResult<bool> {
        access::boolean(&self.inner, &d::TRANSPILE_GET_RETAIN_EMBED_TAGS)
    }
}

/// Either kind of transpile options
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum TranspileOptions {
    Json(Json),
    Yaml(Yaml),
}

impl TranspileOptions {
    fn inner(&self) -> &GlobalRef {
        match self {
            TranspileOptions::Json(json) => json.as_global(),
            TranspileOptions::Yaml(yaml) => yaml.as_global(),
        }
    }

    pub fn retain_embed_tags(&self) -> BridgeResult<bool> {
        access::boolean(self.inner(), &d::TRANSPILE_GET_RETAIN_EMBED_TAGS)
    }
}

impl From<Json> for TranspileOptions {
    fn from(json: Json) -> Self {
        TranspileOptions::Json(json)
    }
}

impl From<Yaml> for TranspileOptions {
    fn from(yaml: Yaml) -> Self {
        TranspileOptions::Yaml(yaml)
    }
}

impl Sealed for TranspileOptions {
    const BASE: &'static str = "org.kson.api.TranspileOptions";
    const VARIANTS: &'static [&'static str] = &[
        "org.kson.api.TranspileOptions$Json",
        "org.kson.api.TranspileOptions$Yaml",
    ];

    fn from_variant(tag: usize, obj: GlobalRef) -> BridgeResult<Self> {
        Ok(match tag {
            0 => TranspileOptions::Json(Json::from(obj)),
            1 => TranspileOptions::Yaml(Yaml::from(obj)),
            _ => return Err(unknown_variant::<Self>(tag)),
        })
    }
}

impl FromEmbedded for TranspileOptions {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        downcast(obj)
    }
}

impl ToEmbedded for TranspileOptions {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        self.inner().local(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::model;

    #[test]
    fn test_retain_flag() {
        let (_fake, runtime) = model();
        assert!(Json::new(&runtime, true).unwrap().retain_embed_tags().unwrap());
        assert!(!Yaml::new(&runtime, false).unwrap().retain_embed_tags().unwrap());
    }

    #[test]
    fn test_dispatch_to_variant() {
        let (_fake, runtime) = model();
        let yaml = Yaml::new(&runtime, true).unwrap();
        let options = runtime
            .with_attachment(|env| TranspileOptions::from_embedded(yaml.to_embedded(env)?))
            .unwrap();
        assert!(matches!(options, TranspileOptions::Yaml(_)));
        assert!(options.retain_embed_tags().unwrap());
        assert_eq!(options, TranspileOptions::from(yaml));
    }
}
