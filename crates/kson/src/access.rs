//! Getter calls on pinned objects
//!
//! Each helper attaches (or reuses the attachment), calls one argument-less
//! member on the object and converts the result before the scope ends.

use kson_bridge::{BridgeError, BridgeResult, Descriptor, FromEmbedded, GlobalRef};

pub(crate) fn object<T: FromEmbedded>(target: &GlobalRef, desc: &Descriptor) -> BridgeResult<T> {
    target
        .runtime()
        .with_attachment(|env| T::from_embedded(env.call_object(desc, target.as_raw(), &[])?))
}

pub(crate) fn nullable<T: FromEmbedded>(target: &GlobalRef, desc: &Descriptor) -> BridgeResult<Option<T>> {
    target.runtime().with_attachment(|env| {
        env.call_nullable(desc, target.as_raw(), &[])?
            .map(T::from_embedded)
            .transpose()
    })
}

pub(crate) fn int(target: &GlobalRef, desc: &Descriptor) -> BridgeResult<i32> {
    target
        .runtime()
        .with_attachment(|env| env.call_int(desc, target.as_raw(), &[]))
}

pub(crate) fn boolean(target: &GlobalRef, desc: &Descriptor) -> BridgeResult<bool> {
    target
        .runtime()
        .with_attachment(|env| env.call_bool(desc, target.as_raw(), &[]))
}

pub(crate) fn double(target: &GlobalRef, desc: &Descriptor) -> BridgeResult<f64> {
    target
        .runtime()
        .with_attachment(|env| env.call_double(desc, target.as_raw(), &[]))
}

/// A runtime `int` that must not be negative, e.g. a line number
pub(crate) fn unsigned(value: i32, desc: &Descriptor) -> BridgeResult<usize> {
    usize::try_from(value).map_err(|_| {
        BridgeError::invocation(desc.display_name(), format!("negative value {}", value))
    })
}

/// A host count passed as a runtime `int`
pub(crate) fn to_int(value: usize, desc: &Descriptor) -> BridgeResult<i32> {
    i32::try_from(value).map_err(|_| {
        BridgeError::invocation(desc.display_name(), format!("{} does not fit an int", value))
    })
}
