//! Type recovery for sealed hierarchies and enums
//!
//! A sealed hierarchy is mirrored by a host enum whose variants are listed in
//! [`Sealed::VARIANTS`]; a result is dispatched by looking its runtime class
//! name up in that table. Enums are mapped by ordinal, so the host list of
//! constants must follow the runtime declaration order exactly.

use std::ffi::CStr;

use crate::attach::Env;
use crate::error::{BridgeError, BridgeResult};
use crate::invoke::Descriptor;
use crate::marshal::FromEmbedded;
use crate::reference::{GlobalRef, LocalRef};
use crate::well_known;

/// Host mirror of a sealed hierarchy
pub trait Sealed: Sized {
    /// Binary name of the sealed base type, e.g. `org.kson.api.Result`
    const BASE: &'static str;

    /// Binary names of the concrete variants; the index is the variant tag
    const VARIANTS: &'static [&'static str];

    /// Build the host variant for `tag`, taking ownership of the pinned object
    fn from_variant(tag: usize, obj: GlobalRef) -> BridgeResult<Self>;
}

/// Binary name of an object's runtime class (`getClass().getName()`)
pub fn runtime_class_name(obj: &LocalRef<'_>) -> BridgeResult<String> {
    let env = obj.env();
    let class = env.call_object(&well_known::OBJECT_GET_CLASS, obj.as_raw(), &[])?;
    let name = env.call_object(&well_known::CLASS_GET_NAME, class.as_raw(), &[])?;
    String::from_embedded(name)
}

/// Tag of a runtime class name within a variant table
#[inline]
pub fn variant_tag(variants: &[&str], class_name: &str) -> Option<usize> {
    variants.iter().position(|variant| *variant == class_name)
}

/// Dispatch an object of a sealed hierarchy to its host variant
pub fn downcast<T: Sealed>(obj: LocalRef<'_>) -> BridgeResult<T> {
    let name = runtime_class_name(&obj)?;
    let tag = variant_tag(T::VARIANTS, &name).ok_or(BridgeError::UnreachableVariant {
        hierarchy: T::BASE,
        class: name,
    })?;
    T::from_variant(tag, obj.pin()?)
}

/// Error for a tag outside `T::VARIANTS`, or one `T` cannot build
pub fn unknown_variant<T: Sealed>(tag: usize) -> BridgeError {
    BridgeError::UnreachableVariant {
        hierarchy: T::BASE,
        class: match T::VARIANTS.get(tag) {
            Some(name) => (*name).to_string(),
            None => format!("variant {}", tag),
        },
    }
}

/// Host mirror of a runtime enum
pub trait Enumerated: Sized + Copy + 'static {
    /// Slash-separated enum class name
    const CLASS: &'static CStr;

    /// Type signature of the constants, e.g. `Lorg/kson/api/MessageSeverity;`
    const SIGNATURE: &'static CStr;

    /// Constant names in declaration order
    const CONSTANTS: &'static [&'static CStr];

    /// Host values in declaration order
    const VALUES: &'static [Self];

    /// Declaration index of this value
    fn ordinal(self) -> usize;

    /// Runtime constant name of this value
    fn name(self) -> &'static str {
        Self::CONSTANTS
            .get(self.ordinal())
            .and_then(|name| name.to_str().ok())
            .unwrap_or("")
    }
}

fn enum_hierarchy<T: Enumerated>() -> &'static str {
    T::CLASS.to_str().unwrap_or("<enum>")
}

/// Map a runtime enum constant to its host value by ordinal
pub fn enum_from_embedded<T: Enumerated>(obj: LocalRef<'_>) -> BridgeResult<T> {
    let ordinal = obj
        .env()
        .call_int(&well_known::ENUM_ORDINAL, obj.as_raw(), &[])?;
    usize::try_from(ordinal)
        .ok()
        .and_then(|index| T::VALUES.get(index).copied())
        .ok_or_else(|| BridgeError::UnreachableVariant {
            hierarchy: enum_hierarchy::<T>(),
            class: format!("ordinal {}", ordinal),
        })
}

fn constant_descriptor<T: Enumerated>(ordinal: usize) -> BridgeResult<Descriptor> {
    let constant = T::CONSTANTS
        .get(ordinal)
        .ok_or_else(|| BridgeError::UnreachableVariant {
            hierarchy: enum_hierarchy::<T>(),
            class: format!("ordinal {}", ordinal),
        })?;
    Ok(Descriptor::static_field(T::CLASS, constant, T::SIGNATURE))
}

/// The runtime constant for a host enum value
pub fn enum_to_embedded<'a, T: Enumerated>(env: Env<'a>, value: T) -> BridgeResult<LocalRef<'a>> {
    env.static_field(&constant_descriptor::<T>(value.ordinal())?)
}

/// Check that every host constant exists at runtime with the expected
/// ordinal and name
pub fn verify_enum<T: Enumerated>(env: Env<'_>) -> BridgeResult<()> {
    for (index, expected) in T::CONSTANTS.iter().enumerate() {
        let constant = env.static_field(&constant_descriptor::<T>(index)?)?;
        let ordinal = env.call_int(&well_known::ENUM_ORDINAL, constant.as_raw(), &[])?;
        let name = String::from_embedded(env.call_object(
            &well_known::ENUM_NAME,
            constant.as_raw(),
            &[],
        )?)?;
        if usize::try_from(ordinal).ok() != Some(index) || name.as_bytes() != expected.to_bytes() {
            return Err(BridgeError::UnreachableVariant {
                hierarchy: enum_hierarchy::<T>(),
                class: format!("{} (ordinal {})", name, ordinal),
            });
        }
    }
    Ok(())
}
