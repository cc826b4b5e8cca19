//! `equals`, `hashCode` and `toString` of pinned objects
//!
//! Host wrappers compare, hash and print through the runtime object they own,
//! so two wrappers are equal exactly when the runtime says so.

use crate::error::BridgeResult;
use crate::marshal::FromEmbedded;
use crate::reference::GlobalRef;
use crate::well_known;

impl GlobalRef {
    /// `this.equals(other)` in the runtime
    pub fn embedded_equals(&self, other: &GlobalRef) -> BridgeResult<bool> {
        self.runtime().with_attachment(|env| {
            env.call_bool(
                &well_known::OBJECT_EQUALS,
                self.as_raw(),
                &[other.as_arg()],
            )
        })
    }

    /// `this.hashCode()` in the runtime
    pub fn embedded_hash_code(&self) -> BridgeResult<i32> {
        self.runtime()
            .with_attachment(|env| env.call_int(&well_known::OBJECT_HASH_CODE, self.as_raw(), &[]))
    }

    /// `this.toString()` in the runtime
    pub fn embedded_to_string(&self) -> BridgeResult<String> {
        self.runtime().with_attachment(|env| {
            String::from_embedded(env.call_object(&well_known::OBJECT_TO_STRING, self.as_raw(), &[])?)
        })
    }
}

/// Implement `PartialEq`, `Eq`, `Hash` and `Debug` for a wrapper through the
/// runtime object behind `$field`.
///
/// Failures cannot surface through these traits; they are logged and the
/// comparison reports inequality, the hash falls back to the handle address.
#[macro_export]
macro_rules! embedded_object_traits {
    ($ty:ty, $field:ident) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.$field.embedded_equals(&other.$field).unwrap_or_else(|err| {
                    $crate::__log::error!("equals failed for {}: {}", stringify!($ty), err);
                    false
                })
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                match self.$field.embedded_hash_code() {
                    Ok(code) => std::hash::Hash::hash(&code, state),
                    Err(err) => {
                        $crate::__log::error!("hashCode failed for {}: {}", stringify!($ty), err);
                        std::hash::Hash::hash(&(self.$field.as_raw().as_ptr() as usize), state)
                    }
                }
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.$field.embedded_to_string() {
                    Ok(text) => f.write_str(&text),
                    Err(err) => write!(f, "{}(<{}>)", stringify!($ty), err),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::runtime::Runtime;
    use crate::testing::FakeVm;
    use crate::GlobalRef;

    struct Name {
        inner: GlobalRef,
    }

    embedded_object_traits!(Name, inner);

    fn name(runtime: &Runtime, text: &str) -> Name {
        let inner = runtime
            .with_attachment(|env| env.new_string(text)?.pin())
            .unwrap();
        Name { inner }
    }

    #[test]
    fn test_equality_follows_runtime() {
        let runtime = Runtime::with_vm(Box::new(FakeVm::new()));
        assert_eq!(name(&runtime, "key"), name(&runtime, "key"));
        assert_ne!(name(&runtime, "key"), name(&runtime, "value"));
    }

    #[test]
    fn test_hash_and_debug() {
        use std::collections::HashSet;

        let runtime = Runtime::with_vm(Box::new(FakeVm::new()));
        let mut set = HashSet::new();
        set.insert(name(&runtime, "a"));
        set.insert(name(&runtime, "a"));
        set.insert(name(&runtime, "b"));
        assert_eq!(set.len(), 2);
        assert_eq!(format!("{:?}", name(&runtime, "shown")), "shown");
        assert_eq!(name(&runtime, "key").inner.embedded_hash_code().unwrap(), 106079);
    }
}
