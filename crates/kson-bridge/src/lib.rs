//! Embedding bridge for the KSON runtime
//!
//! Lets Rust code call into objects hosted by the managed runtime that ships
//! inside the KSON native library:
//!
//! - [`Runtime`] owns the runtime instance ([`global`] for the process-wide one)
//! - [`Runtime::attach`] / [`Runtime::with_attachment`] attach the calling thread
//! - [`LocalRef`] and [`GlobalRef`] tie runtime object lifetimes to host values
//! - [`Descriptor`] plus the `Env::call_*` family invoke runtime members
//! - [`FromEmbedded`] / [`ToEmbedded`] convert strings, lists and maps
//! - [`Sealed`] / [`Enumerated`] recover sealed variants and enum constants
//!
//! # Example
//!
//! ```ignore
//! use kson_bridge::{global, Descriptor, FromEmbedded, ReturnKind};
//!
//! const TO_UPPER: Descriptor = Descriptor::method(
//!     c"java/lang/String", c"toUpperCase", c"()Ljava/lang/String;", ReturnKind::Object);
//!
//! let runtime = global()?;
//! let upper = runtime.with_attachment(|env| {
//!     let text = env.new_string("kson")?;
//!     String::from_embedded(env.call_object(&TO_UPPER, text.as_raw(), &[])?)
//! })?;
//! ```

pub mod attach;
pub mod dispatch;
pub mod error;
pub mod invoke;
pub mod jni;
pub mod loader;
pub mod marshal;
pub mod object;
pub mod options;
pub mod reference;
pub mod runtime;
pub mod vm;
pub mod well_known;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use attach::{attachment_depth, is_attached, AttachGuard, Env};
pub use dispatch::{
    downcast, enum_from_embedded, enum_to_embedded, unknown_variant, verify_enum, Enumerated, Sealed,
};
pub use error::{BridgeError, BridgeResult, InitError};
pub use invoke::{verify_descriptors, CallKind, Descriptor, Returned};
pub use marshal::{FromEmbedded, ToEmbedded};
pub use options::RuntimeOptions;
pub use reference::{GlobalRef, LocalRef};
pub use runtime::{global, install_global, Runtime, RuntimeId};
pub use vm::{EmbeddedVm, JValue, RawObject, ReturnKind};

#[doc(hidden)]
pub use log as __log;
