//! Declaration macros for runtime-backed types

/// Declare a host wrapper owning one pinned runtime object.
///
/// The wrapper converts in both directions, and compares, hashes and prints
/// through the runtime object.
macro_rules! embedded_wrapper {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        pub struct $name {
            inner: kson_bridge::GlobalRef,
        }

        impl $name {
            /// The pinned runtime object
            #[inline]
            pub fn as_global(&self) -> &kson_bridge::GlobalRef {
                &self.inner
            }

            /// The runtime this object lives in
            #[inline]
            pub fn runtime(&self) -> &kson_bridge::Runtime {
                self.inner.runtime()
            }

            /// An independently owned handle to the same runtime object
            pub fn try_clone(&self) -> kson_bridge::BridgeResult<Self> {
                Ok($name {
                    inner: self.inner.try_clone()?,
                })
            }
        }

        impl From<kson_bridge::GlobalRef> for $name {
            fn from(inner: kson_bridge::GlobalRef) -> Self {
                $name { inner }
            }
        }

        impl kson_bridge::FromEmbedded for $name {
            fn from_embedded(obj: kson_bridge::LocalRef<'_>) -> kson_bridge::BridgeResult<Self> {
                Ok($name { inner: obj.pin()? })
            }
        }

        impl kson_bridge::ToEmbedded for $name {
            fn to_embedded<'a>(
                &self,
                env: kson_bridge::Env<'a>,
            ) -> kson_bridge::BridgeResult<kson_bridge::LocalRef<'a>> {
                self.inner.local(env)
            }
        }

        kson_bridge::embedded_object_traits!($name, inner);
    };
}

/// Declare a host enum mirroring a runtime enum, constants in declaration
/// order.
macro_rules! embedded_enum {
    (
        $(#[$meta:meta])*
        $name:ident = $class:literal, $signature:literal {
            $($variant:ident = $constant:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl kson_bridge::Enumerated for $name {
            const CLASS: &'static std::ffi::CStr = $class;
            const SIGNATURE: &'static std::ffi::CStr = $signature;
            const CONSTANTS: &'static [&'static std::ffi::CStr] = &[$($constant),+];
            const VALUES: &'static [Self] = &[$($name::$variant),+];

            #[inline]
            fn ordinal(self) -> usize {
                self as usize
            }
        }

        impl $name {
            /// Name of the runtime constant, e.g. `ERROR`
            #[inline]
            pub fn name(self) -> &'static str {
                kson_bridge::Enumerated::name(self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl kson_bridge::FromEmbedded for $name {
            fn from_embedded(obj: kson_bridge::LocalRef<'_>) -> kson_bridge::BridgeResult<Self> {
                kson_bridge::enum_from_embedded(obj)
            }
        }

        impl kson_bridge::ToEmbedded for $name {
            fn to_embedded<'a>(
                &self,
                env: kson_bridge::Env<'a>,
            ) -> kson_bridge::BridgeResult<kson_bridge::LocalRef<'a>> {
                kson_bridge::enum_to_embedded(env, *self)
            }
        }
    };
}
