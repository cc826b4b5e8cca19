//! Outcome of a transpile call

use kson_bridge::{downcast, unknown_variant, BridgeResult, FromEmbedded, GlobalRef, LocalRef, Sealed};

use crate::access;
use crate::descriptors as d;
use crate::records::Message;

embedded_wrapper! {
    /// Successful transpile
    Success
}

embedded_wrapper! {
    /// Transpile that reported errors
    Failure
}

impl Success {
    /// The transpiled document
    pub fn output(&self) -> BridgeResult<String> {
        access::object(&self.inner, &d::RESULT_SUCCESS_GET_OUTPUT)
    }
}

impl Failure {
    pub fn errors(&self) -> BridgeResult<Vec<Message>> {
        access::object(&self.inner, &d::RESULT_FAILURE_GET_ERRORS)
    }
}

/// Result of [`crate::Kson::to_json`] or [`crate::Kson::to_yaml`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum TranspileResult {
    Success(Success),
    Failure(Failure),
}

impl TranspileResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TranspileResult::Success(_))
    }

    pub fn into_result(self) -> Result<Success, Failure> {
        match self {
            TranspileResult::Success(success) => Ok(success),
            TranspileResult::Failure(failure) => Err(failure),
        }
    }
}

impl Sealed for TranspileResult {
    const BASE: &'static str = "org.kson.api.Result";
    const VARIANTS: &'static [&'static str] =
        &["org.kson.api.Result$Success", "org.kson.api.Result$Failure"];

    fn from_variant(tag: usize, obj: GlobalRef) -> BridgeResult<Self> {
        Ok(match tag {
            0 => TranspileResult::Success(Success::from(obj)),
            1 => TranspileResult::Failure(Failure::from(obj)),
            _ => return Err(unknown_variant::<Self>(tag)),
        })
    }
}

impl FromEmbedded for TranspileResult {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        downcast(obj)
    }
}
