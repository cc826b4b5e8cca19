//! Parsed KSON values
//!
//! A [`KsonValue`] is a handle to the runtime's value tree; children are
//! fetched on demand, each as its own pinned handle.

use std::collections::HashMap;

use kson_bridge::{downcast, unknown_variant, BridgeResult, FromEmbedded, GlobalRef, LocalRef, Sealed};

use crate::access;
use crate::descriptors as d;
use crate::enums::KsonValueType;
use crate::records::Position;

embedded_wrapper! {
    /// `{ key: value, ... }`
    KsonObject
}

embedded_wrapper! {
    /// `[ value, ... ]`
    KsonArray
}

embedded_wrapper! {
    KsonString
}

embedded_wrapper! {
    /// Whole number
    Integer
}

embedded_wrapper! {
    /// Number with a fraction or exponent
    Decimal
}

embedded_wrapper! {
    KsonBoolean
}

embedded_wrapper! {
    KsonNull
}

embedded_wrapper! {
    /// Embed block: an optional tag plus verbatim content
    KsonEmbed
}

/// Source range and kind, shared by every value
macro_rules! located {
    ($($ty:ident),+) => {
        $(
            impl $ty {
                pub fn start(&self) -> BridgeResult<Position> {
                    access::object(&self.inner, &d::VALUE_GET_START)
                }

                pub fn end(&self) -> BridgeResult<Position> {
                    access::object(&self.inner, &d::VALUE_GET_END)
                }

                pub fn value_type(&self) -> BridgeResult<KsonValueType> {
                    access::object(&self.inner, &d::VALUE_GET_TYPE)
                }
            }
        )+
    };
}

located!(KsonObject, KsonArray, KsonString, Integer, Decimal, KsonBoolean, KsonNull, KsonEmbed);

impl KsonObject {
    /// Properties by key
    pub fn properties(&self) -> BridgeResult<HashMap<String, KsonValue>> {
        access::object(&self.inner, &d::OBJECT_GET_PROPERTIES)
    }

    /// The key nodes by key, e.g. for their source positions
    pub fn property_keys(&self) -> BridgeResult<HashMap<String, KsonString>> {
        access::object(&self.inner, &d::OBJECT_GET_PROPERTY_KEYS)
    }

    pub fn get_property_by_name(&self, name: &str) -> BridgeResult<Option<KsonValue>> {
        Ok(self.properties()?.remove(name))
    }
}

impl KsonArray {
    pub fn elements(&self) -> BridgeResult<Vec<KsonValue>> {
        access::object(&self.inner, &d::ARRAY_GET_ELEMENTS)
    }
}

impl KsonString {
    pub fn value(&self) -> BridgeResult<String> {
        access::object(&self.inner, &d::STRING_GET_VALUE)
    }
}

impl Integer {
    pub fn value(&self) -> BridgeResult<i32> {
        access::int(&self.inner, &d::INTEGER_GET_VALUE)
    }
}

impl Decimal {
    pub fn value(&self) -> BridgeResult<f64> {
        access::double(&self.inner, &d::DECIMAL_GET_VALUE)
    }
}

impl KsonBoolean {
    pub fn value(&self) -> BridgeResult<bool> {
        access::boolean(&self.inner, &d::BOOLEAN_GET_VALUE)
    }
}

impl KsonEmbed {
    pub fn tag(&self) -> BridgeResult<Option<String>> {
        access::nullable(&self.inner, &d::EMBED_GET_TAG)
    }

    pub fn content(&self) -> BridgeResult<String> {
        access::object(&self.inner, &d::EMBED_GET_CONTENT)
    }
}

/// A number, integral or not
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum KsonNumber {
    Integer(Integer),
    Decimal(Decimal),
}

impl KsonNumber {
    /// The value widened to `f64`
    pub fn as_f64(&self) -> BridgeResult<f64> {
        match self {
            KsonNumber::Integer(integer) => integer.value().map(f64::from),
            KsonNumber::Decimal(decimal) => decimal.value(),
        }
    }

    fn inner(&self) -> &GlobalRef {
        match self {
            KsonNumber::Integer(integer) => integer.as_global(),
            KsonNumber::Decimal(decimal) => decimal.as_global(),
        }
    }
}

impl Sealed for KsonNumber {
    const BASE: &'static str = "org.kson.api.KsonValue$KsonNumber";
    const VARIANTS: &'static [&'static str] = &[
        "org.kson.api.KsonValue$KsonNumber$Integer",
        "org.kson.api.KsonValue$KsonNumber$Decimal",
    ];

    fn from_variant(tag: usize, obj: GlobalRef) -> BridgeResult<Self> {
        Ok(match tag {
            0 => KsonNumber::Integer(Integer::from(obj)),
            1 => KsonNumber::Decimal(Decimal::from(obj)),
            _ => return Err(unknown_variant::<Self>(tag)),
        })
    }
}

impl FromEmbedded for KsonNumber {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        downcast(obj)
    }
}

/// Any KSON value
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum KsonValue {
    KsonObject(KsonObject),
    KsonArray(KsonArray),
    KsonString(KsonString),
    KsonNumber(KsonNumber),
    KsonBoolean(KsonBoolean),
    KsonNull(KsonNull),
    KsonEmbed(KsonEmbed),
}

impl KsonValue {
    fn inner(&self) -> &GlobalRef {
        match self {
            KsonValue::KsonObject(value) => value.as_global(),
            KsonValue::KsonArray(value) => value.as_global(),
            KsonValue::KsonString(value) => value.as_global(),
            KsonValue::KsonNumber(value) => value.inner(),
            KsonValue::KsonBoolean(value) => value.as_global(),
            KsonValue::KsonNull(value) => value.as_global(),
            KsonValue::KsonEmbed(value) => value.as_global(),
        }
    }

    pub fn start(&self) -> BridgeResult<Position> {
        access::object(self.inner(), &d::VALUE_GET_START)
    }

    pub fn end(&self) -> BridgeResult<Position> {
        access::object(self.inner(), &d::VALUE_GET_END)
    }

    /// Kind as reported by the runtime; always agrees with the variant
    pub fn value_type(&self) -> BridgeResult<KsonValueType> {
        access::object(self.inner(), &d::VALUE_GET_TYPE)
    }
}

impl Sealed for KsonValue {
    const BASE: &'static str = "org.kson.api.KsonValue";
    const VARIANTS: &'static [&'static str] = &[
        "org.kson.api.KsonValue$KsonObject",
        "org.kson.api.KsonValue$KsonArray",
        "org.kson.api.KsonValue$KsonString",
        "org.kson.api.KsonValue$KsonNumber$Integer",
        "org.kson.api.KsonValue$KsonNumber$Decimal",
        "org.kson.api.KsonValue$KsonBoolean",
        "org.kson.api.KsonValue$KsonNull",
        "org.kson.api.KsonValue$KsonEmbed",
    ];

    fn from_variant(tag: usize, obj: GlobalRef) -> BridgeResult<Self> {
        Ok(match tag {
            0 => KsonValue::KsonObject(KsonObject::from(obj)),
            1 => KsonValue::KsonArray(KsonArray::from(obj)),
            2 => KsonValue::KsonString(KsonString::from(obj)),
            3 => KsonValue::KsonNumber(KsonNumber::Integer(Integer::from(obj))),
            4 => KsonValue::KsonNumber(KsonNumber::Decimal(Decimal::from(obj))),
            5 => KsonValue::KsonBoolean(KsonBoolean::from(obj)),
            6 => KsonValue::KsonNull(KsonNull::from(obj)),
            7 => KsonValue::KsonEmbed(KsonEmbed::from(obj)),
            _ => return Err(unknown_variant::<Self>(tag)),
        })
    }
}

impl FromEmbedded for KsonValue {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        downcast(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{binary_name, VARIANT_CLASSES};
    use crate::options::IndentType;
    use crate::result::TranspileResult;
    use crate::schema_result::SchemaResult;
    use crate::testing::model;
    use crate::transpile_options::TranspileOptions;
    use kson_bridge::{BridgeError, Runtime};

    fn pinned(runtime: &Runtime) -> GlobalRef {
        runtime
            .with_attachment(|env| env.new_string("stray")?.pin())
            .unwrap()
    }

    fn assert_unreachable<T: Sealed + std::fmt::Debug>(runtime: &Runtime) {
        let tag = T::VARIANTS.len();
        match T::from_variant(tag, pinned(runtime)) {
            Err(BridgeError::UnreachableVariant { hierarchy, class }) => {
                assert_eq!(hierarchy, T::BASE);
                assert_eq!(class, format!("variant {}", tag));
            }
            other => panic!("expected UnreachableVariant for {}, got {:?}", T::BASE, other),
        }
    }

    #[test]
    fn test_unknown_tags_rejected() {
        let (fake, runtime) = model();
        assert_unreachable::<KsonValue>(&runtime);
        assert_unreachable::<KsonNumber>(&runtime);
        assert_unreachable::<TranspileResult>(&runtime);
        assert_unreachable::<SchemaResult>(&runtime);
        assert_unreachable::<IndentType>(&runtime);
        assert_unreachable::<TranspileOptions>(&runtime);
        assert_eq!(runtime.pinned_references(), 0);
        assert_eq!(fake.stats().double_deletes, 0);
    }

    #[test]
    fn test_last_tag_builds_last_variant() {
        let (_fake, runtime) = model();
        let embed = KsonValue::from_variant(7, pinned(&runtime)).unwrap();
        assert!(matches!(embed, KsonValue::KsonEmbed(_)));
        let decimal = KsonNumber::from_variant(1, pinned(&runtime)).unwrap();
        assert!(matches!(decimal, KsonNumber::Decimal(_)));
    }

    #[test]
    fn test_variant_tables_are_verified() {
        let verified: Vec<String> = VARIANT_CLASSES.iter().map(|class| binary_name(class)).collect();
        let declared = [
            KsonValue::VARIANTS,
            KsonNumber::VARIANTS,
            TranspileResult::VARIANTS,
            SchemaResult::VARIANTS,
            IndentType::VARIANTS,
            TranspileOptions::VARIANTS,
        ];
        for variants in declared {
            for variant in variants {
                assert!(verified.iter().any(|name| name == variant), "{} is not verified", variant);
            }
        }
    }

    #[test]
    fn test_variant_names_extend_base() {
        for variant in KsonValue::VARIANTS {
            assert!(variant.starts_with(KsonValue::BASE));
        }
        for variant in KsonNumber::VARIANTS {
            assert!(variant.starts_with(KsonNumber::BASE));
        }
    }
}
