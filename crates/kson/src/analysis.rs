use kson_bridge::BridgeResult;

use crate::access;
use crate::descriptors as d;
use crate::records::{Message, Token};
use crate::value::KsonValue;

embedded_wrapper! {
    /// Result of [`crate::Kson::analyze`]: diagnostics, tokens and, when the
    /// document parsed, its value tree
    Analysis
}

impl Analysis {
    pub fn errors(&self) -> BridgeResult<Vec<Message>> {
        access::object(&self.inner, &d::ANALYSIS_GET_ERRORS)
    }

    pub fn tokens(&self) -> BridgeResult<Vec<Token>> {
        access::object(&self.inner, &d::ANALYSIS_GET_TOKENS)
    }

    /// `None` when the document did not parse
    pub fn kson_value(&self) -> BridgeResult<Option<KsonValue>> {
        access::nullable(&self.inner, &d::ANALYSIS_GET_KSON_VALUE)
    }
}
