//! Schema parsing and validation

use kson_bridge::{downcast, unknown_variant, BridgeResult, FromEmbedded, GlobalRef, LocalRef, Sealed, ToEmbedded};

use crate::access;
use crate::descriptors as d;
use crate::records::Message;

embedded_wrapper! {
    /// Schema that parsed
    Success
}

embedded_wrapper! {
    /// Schema that did not parse
    Failure
}

embedded_wrapper! {
    /// Validator for documents against a parsed schema
    SchemaValidator
}

impl Success {
    pub fn schema_validator(&self) -> BridgeResult<SchemaValidator> {
        access::object(&self.inner, &d::SCHEMA_SUCCESS_GET_VALIDATOR)
    }
}

impl Failure {
    pub fn errors(&self) -> BridgeResult<Vec<Message>> {
        access::object(&self.inner, &d::SCHEMA_FAILURE_GET_ERRORS)
    }
}

impl SchemaValidator {
    /// Validate a KSON document; an empty list means it conforms.
    ///
    /// `filepath` is only used to resolve references relative to the
    /// document.
    pub fn validate(&self, source: &str, filepath: Option<&str>) -> BridgeResult<Vec<Message>> {
        self.inner.runtime().with_attachment(|env| {
            let source = source.to_embedded(env)?;
            let filepath = filepath.to_embedded(env)?;
            Vec::from_embedded(env.call_object(
                &d::SCHEMA_VALIDATOR_VALIDATE,
                self.inner.as_raw(),
                &[source.as_arg(), filepath.as_arg()],
            )?)
        })
    }
}

/// Result of [`crate::Kson::parse_schema`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum SchemaResult {
    Success(Success),
    Failure(Failure),
}

impl SchemaResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SchemaResult::Success(_))
    }

    pub fn into_result(self) -> Result<Success, Failure> {
        match self {
            SchemaResult::Success(success) => Ok(success),
            SchemaResult::Failure(failure) => Err(failure),
        }
    }
}

impl Sealed for SchemaResult {
    const BASE: &'static str = "org.kson.api.SchemaResult";
    const VARIANTS: &'static [&'static str] = &[
        "org.kson.api.SchemaResult$Success",
        "org.kson.api.SchemaResult$Failure",
    ];

    fn from_variant(tag: usize, obj: GlobalRef) -> BridgeResult<Self> {
        Ok(match tag {
            0 => SchemaResult::Success(Success::from(obj)),
            1 => SchemaResult::Failure(Failure::from(obj)),
            _ => return Err(unknown_variant::<Self>(tag)),
        })
    }
}

impl FromEmbedded for SchemaResult {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        downcast(obj)
    }
}
