//! Value conversion between host values and runtime objects.
//!
//! Implement [`FromEmbedded`] and [`ToEmbedded`] to map a host type onto a
//! runtime class. Strings, optional values, sequences and maps are covered
//! here; wrapper types built on [`GlobalRef`] get theirs from the sealed and
//! enum helpers in [`dispatch`](crate::dispatch).
//!
//! Primitives never become objects: they travel as [`JValue`](crate::vm::JValue) arguments and
//! come back through the typed call forms (`call_int`, `call_bool`, ...).

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use crate::attach::Env;
use crate::error::{BridgeError, BridgeResult};
use crate::reference::{GlobalRef, LocalRef};
use crate::vm::RawObject;
use crate::well_known;

/// Convert a runtime object into a host value.
pub trait FromEmbedded: Sized {
    /// Convert from a non-null local reference, consuming it
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self>;
}

/// Convert a host value into a runtime object.
pub trait ToEmbedded {
    /// Create (or reference) the runtime object for this value
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>>;
}

// ============================================================================
// Strings
// ============================================================================

/// Encode text as UTF-16 code units, checking it fits the runtime's length type
pub fn encode_utf16(text: &str) -> BridgeResult<Vec<u16>> {
    let units: Vec<u16> = text.encode_utf16().collect();
    check_string_length(units.len())?;
    Ok(units)
}

/// Decode UTF-16 code units; unpaired surrogates are an error
pub fn decode_utf16(units: &[u16]) -> BridgeResult<String> {
    String::from_utf16(units).map_err(|_| {
        BridgeError::Encoding(format!(
            "ill-formed UTF-16 in a {} unit string",
            units.len()
        ))
    })
}

pub(crate) fn check_string_length(units: usize) -> BridgeResult<()> {
    if units > i32::MAX as usize {
        return Err(BridgeError::Encoding(format!(
            "string of {} UTF-16 units exceeds the runtime limit",
            units
        )));
    }
    Ok(())
}

impl<'a> Env<'a> {
    /// Create a runtime string
    pub fn new_string(&self, text: &str) -> BridgeResult<LocalRef<'a>> {
        self.runtime().ensure_available()?;
        let units = encode_utf16(text)?;
        let raw = self.vm().new_string(self.raw(), &units);
        if self.vm().exception_check(self.raw()) || raw.is_null() {
            self.discard_exception();
            if !raw.is_null() {
                self.vm().delete_local_ref(self.raw(), raw);
            }
            return Err(BridgeError::invocation(
                "NewString",
                format!("could not allocate a string of {} units", units.len()),
            ));
        }
        Ok(LocalRef::from_raw(*self, raw))
    }

    /// Read a runtime string
    pub fn read_string(&self, string: RawObject) -> BridgeResult<String> {
        self.runtime().ensure_available()?;
        if string.is_null() {
            return Err(BridgeError::invocation("GetStringRegion", "null string"));
        }
        decode_utf16(&self.vm().string_units(self.raw(), string))
    }
}

impl FromEmbedded for String {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        obj.env().read_string(obj.as_raw())
    }
}

impl ToEmbedded for str {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        env.new_string(self)
    }
}

impl ToEmbedded for String {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        env.new_string(self)
    }
}

// ============================================================================
// References and optional values
// ============================================================================

impl FromEmbedded for GlobalRef {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        obj.pin()
    }
}

impl ToEmbedded for GlobalRef {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        self.local(env)
    }
}

impl<T: ToEmbedded + ?Sized> ToEmbedded for &T {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        (**self).to_embedded(env)
    }
}

/// `None` becomes null
impl<T: ToEmbedded> ToEmbedded for Option<T> {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        match self {
            Some(value) => value.to_embedded(env),
            None => Ok(LocalRef::null(env)),
        }
    }
}

// ============================================================================
// Sequences
// ============================================================================

/// Build a fresh `ArrayList` holding `items` in order
pub fn list_to_embedded<'a, T: ToEmbedded>(
    env: Env<'a>,
    items: impl IntoIterator<Item = T>,
) -> BridgeResult<LocalRef<'a>> {
    let list = env.new_object(&well_known::ARRAY_LIST_NEW, &[])?;
    for item in items {
        let element = item.to_embedded(env)?;
        env.call_bool(&well_known::LIST_ADD, list.as_raw(), &[element.as_arg()])?;
    }
    Ok(list)
}

/// Visit every element of a runtime `Iterator`
fn for_each_element<'a>(
    env: Env<'a>,
    iterator: LocalRef<'a>,
    mut f: impl FnMut(LocalRef<'a>) -> BridgeResult<()>,
) -> BridgeResult<()> {
    while env.call_bool(&well_known::ITERATOR_HAS_NEXT, iterator.as_raw(), &[])? {
        let element = env
            .call_nullable(&well_known::ITERATOR_NEXT, iterator.as_raw(), &[])?
            .ok_or_else(|| BridgeError::invocation("java/util/Iterator.next", "null element"))?;
        f(element)?;
    }
    Ok(())
}

/// Read every element of a runtime `List`, in order
pub fn list_from_embedded<T: FromEmbedded>(list: LocalRef<'_>) -> BridgeResult<Vec<T>> {
    let env = list.env();
    let iterator = env.call_object(&well_known::LIST_ITERATOR, list.as_raw(), &[])?;
    drop(list);
    let mut items = Vec::new();
    for_each_element(env, iterator, |element| {
        items.push(T::from_embedded(element)?);
        Ok(())
    })?;
    Ok(items)
}

impl<T: FromEmbedded> FromEmbedded for Vec<T> {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        list_from_embedded(obj)
    }
}

impl<T: ToEmbedded> ToEmbedded for [T] {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        list_to_embedded(env, self.iter())
    }
}

impl<T: ToEmbedded> ToEmbedded for Vec<T> {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        list_to_embedded(env, self.iter())
    }
}

// ============================================================================
// Maps
// ============================================================================

/// Build a fresh `HashMap` holding `entries`
pub fn map_to_embedded<'a, K: ToEmbedded, V: ToEmbedded>(
    env: Env<'a>,
    entries: impl IntoIterator<Item = (K, V)>,
) -> BridgeResult<LocalRef<'a>> {
    let map = env.new_object(&well_known::HASH_MAP_NEW, &[])?;
    for (key, value) in entries {
        let key = key.to_embedded(env)?;
        let value = value.to_embedded(env)?;
        // Dropping the previous value deletes its local reference
        let _previous =
            env.call_nullable(&well_known::MAP_PUT, map.as_raw(), &[key.as_arg(), value.as_arg()])?;
    }
    Ok(map)
}

/// Read every entry of a runtime `Map`
pub fn map_from_embedded<K, V, S>(map: LocalRef<'_>) -> BridgeResult<HashMap<K, V, S>>
where
    K: FromEmbedded + Eq + Hash,
    V: FromEmbedded,
    S: BuildHasher + Default,
{
    let env = map.env();
    let entries = env.call_object(&well_known::MAP_ENTRY_SET, map.as_raw(), &[])?;
    drop(map);
    let iterator = env.call_object(&well_known::SET_ITERATOR, entries.as_raw(), &[])?;
    drop(entries);

    let mut result = HashMap::default();
    for_each_element(env, iterator, |entry| {
        let key = env
            .call_nullable(&well_known::ENTRY_GET_KEY, entry.as_raw(), &[])?
            .ok_or_else(|| BridgeError::invocation("java/util/Map$Entry.getKey", "null key"))?;
        let value = env
            .call_nullable(&well_known::ENTRY_GET_VALUE, entry.as_raw(), &[])?
            .ok_or_else(|| BridgeError::invocation("java/util/Map$Entry.getValue", "null value"))?;
        result.insert(K::from_embedded(key)?, V::from_embedded(value)?);
        Ok(())
    })?;
    Ok(result)
}

impl<K, V, S> FromEmbedded for HashMap<K, V, S>
where
    K: FromEmbedded + Eq + Hash,
    V: FromEmbedded,
    S: BuildHasher + Default,
{
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        map_from_embedded(obj)
    }
}

impl<K: ToEmbedded, V: ToEmbedded, S> ToEmbedded for HashMap<K, V, S> {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        map_to_embedded(env, self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;
    use crate::testing::FakeVm;

    #[test]
    fn test_length_limit() {
        assert!(check_string_length(i32::MAX as usize).is_ok());
        assert!(matches!(
            check_string_length(i32::MAX as usize + 1),
            Err(BridgeError::Encoding(_))
        ));
    }

    #[test]
    fn test_unpaired_surrogate_rejected() {
        let units = [0x0061, 0xD800, 0x0062];
        assert!(matches!(decode_utf16(&units), Err(BridgeError::Encoding(_))));
    }

    #[test]
    fn test_astral_text_round_trips() {
        let runtime = Runtime::with_vm(Box::new(FakeVm::new()));
        let text = "key: \"😀 naïve 日本\"";
        let back = runtime
            .with_attachment(|env| String::from_embedded(text.to_embedded(env)?))
            .unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn test_none_is_null() {
        let runtime = Runtime::with_vm(Box::new(FakeVm::new()));
        let is_null = runtime
            .with_attachment(|env| Ok(None::<&str>.to_embedded(env)?.is_null()))
            .unwrap();
        assert!(is_null);
    }

    #[test]
    fn test_empty_list() {
        let fake = FakeVm::new();
        let runtime = Runtime::with_vm(Box::new(fake.clone()));
        let items: Vec<String> = runtime
            .with_attachment(|env| Vec::from_embedded(Vec::<String>::new().to_embedded(env)?))
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(fake.stats().live_locals, 0);
    }
}
