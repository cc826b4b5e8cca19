//! Rust bindings for KSON
//!
//! Every operation runs inside the KSON runtime embedded in the native
//! library; this crate converts arguments and results at the boundary.
//!
//! - [`Kson`] is the entry point: format, transpile, analyze, parse schemas
//! - [`FormatOptions`], [`IndentType`], [`EmbedRule`] and the
//!   [`TranspileOptions`] variants configure the calls
//! - [`TranspileResult`], [`SchemaResult`] and [`Analysis`] carry results;
//!   [`KsonValue`] is a parsed document tree
//! - [`Message`], [`Position`] and [`Token`] are plain host values
//!
//! Runtime objects held by this crate are pinned for as long as the host
//! value lives and released when it is dropped.
//!
//! # Example
//!
//! ```ignore
//! use kson::{FormatOptions, FormattingStyle, IndentType, Kson};
//!
//! let kson = Kson::global()?;
//! let indent = IndentType::spaces(kson.runtime(), 2)?;
//! let options = FormatOptions::new(&indent, FormattingStyle::Plain, &[])?;
//! println!("{}", kson.format("key: [1, 2, 3, 4]", &options)?);
//! ```

#[macro_use]
mod macros;

mod access;

pub mod analysis;
pub mod descriptors;
pub mod enums;
pub mod kson;
pub mod options;
pub mod records;
pub mod result;
pub mod schema_result;
pub mod transpile_options;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use analysis::Analysis;
pub use enums::{FormattingStyle, KsonValueType, MessageSeverity, TokenType};
pub use kson::Kson;
pub use options::{EmbedRule, FormatOptions, IndentType, Spaces, Tabs};
pub use records::{Message, Position, Token};
pub use result::TranspileResult;
pub use schema_result::{SchemaResult, SchemaValidator};
pub use transpile_options::{Json, TranspileOptions, Yaml};
pub use value::{
    Decimal, Integer, KsonArray, KsonBoolean, KsonEmbed, KsonNull, KsonNumber, KsonObject,
    KsonString, KsonValue,
};

pub use kson_bridge::{BridgeError, BridgeResult, Runtime, RuntimeOptions};
