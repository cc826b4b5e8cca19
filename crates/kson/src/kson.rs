//! Entry point to the KSON runtime API

use once_cell::sync::OnceCell;

use kson_bridge::{
    verify_descriptors, verify_enum, BridgeResult, Env, FromEmbedded, GlobalRef, Runtime,
    ToEmbedded,
};

use crate::analysis::Analysis;
use crate::descriptors as d;
use crate::enums::{FormattingStyle, KsonValueType, MessageSeverity, TokenType};
use crate::options::FormatOptions;
use crate::result::TranspileResult;
use crate::schema_result::SchemaResult;
use crate::transpile_options::{Json, Yaml};

static GLOBAL: OnceCell<Kson> = OnceCell::new();

/// Handle to the runtime's `Kson` singleton
#[derive(Debug)]
pub struct Kson {
    instance: GlobalRef,
}

impl Kson {
    /// Check the runtime against the API this crate expects and pin the
    /// `Kson` singleton.
    ///
    /// Fails with `SymbolNotFound` (or `UnreachableVariant` for a reordered
    /// enum) if the loaded library does not match.
    pub fn new(runtime: &Runtime) -> BridgeResult<Kson> {
        let instance = runtime.with_attachment(|env| {
            verify_interface(env)?;
            env.static_field(&d::KSON_INSTANCE)?.pin()
        })?;
        log::debug!("KSON interface verified on runtime {}", runtime.id().as_u64());
        Ok(Kson { instance })
    }

    /// The `Kson` of the process-wide runtime, created on first use
    pub fn global() -> BridgeResult<&'static Kson> {
        GLOBAL.get_or_try_init(|| Kson::new(kson_bridge::global()?))
    }

    pub fn runtime(&self) -> &Runtime {
        self.instance.runtime()
    }

    /// Reformat a KSON document
    pub fn format(&self, source: &str, options: &FormatOptions) -> BridgeResult<String> {
        self.runtime().with_attachment(|env| {
            let source = source.to_embedded(env)?;
            let options = options.to_embedded(env)?;
            String::from_embedded(env.call_object(
                &d::KSON_FORMAT,
                self.instance.as_raw(),
                &[source.as_arg(), options.as_arg()],
            )?)
        })
    }

    /// Convert a KSON document to JSON
    pub fn to_json(&self, source: &str, options: &Json) -> BridgeResult<TranspileResult> {
        self.runtime().with_attachment(|env| {
            let source = source.to_embedded(env)?;
            let options = options.to_embedded(env)?;
            TranspileResult::from_embedded(env.call_object(
                &d::KSON_TO_JSON,
                self.instance.as_raw(),
                &[source.as_arg(), options.as_arg()],
            )?)
        })
    }

    /// Convert a KSON document to YAML
    pub fn to_yaml(&self, source: &str, options: &Yaml) -> BridgeResult<TranspileResult> {
        self.runtime().with_attachment(|env| {
            let source = source.to_embedded(env)?;
            let options = options.to_embedded(env)?;
            TranspileResult::from_embedded(env.call_object(
                &d::KSON_TO_YAML,
                self.instance.as_raw(),
                &[source.as_arg(), options.as_arg()],
            )?)
        })
    }

    /// Tokenize and parse a document, collecting every diagnostic.
    ///
    /// `filepath` names the document for schema references; it is optional.
    pub fn analyze(&self, source: &str, filepath: Option<&str>) -> BridgeResult<Analysis> {
        self.runtime().with_attachment(|env| {
            let source = source.to_embedded(env)?;
            let filepath = filepath.to_embedded(env)?;
            Analysis::from_embedded(env.call_object(
                &d::KSON_ANALYZE,
                self.instance.as_raw(),
                &[source.as_arg(), filepath.as_arg()],
            )?)
        })
    }

    /// Parse a schema document into a validator
    pub fn parse_schema(&self, schema_source: &str) -> BridgeResult<SchemaResult> {
        self.runtime().with_attachment(|env| {
            let schema_source = schema_source.to_embedded(env)?;
            SchemaResult::from_embedded(env.call_object(
                &d::KSON_PARSE_SCHEMA,
                self.instance.as_raw(),
                &[schema_source.as_arg()],
            )?)
        })
    }
}

/// Resolve every member, enum constant and result class this crate uses
fn verify_interface(env: Env<'_>) -> BridgeResult<()> {
    verify_descriptors(env, d::ALL)?;
    verify_enum::<MessageSeverity>(env)?;
    verify_enum::<FormattingStyle>(env)?;
    verify_enum::<KsonValueType>(env)?;
    verify_enum::<TokenType>(env)?;
    for class in d::VARIANT_CLASSES {
        env.class(class)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{define_enums, model};
    use kson_bridge::testing::FakeVm;
    use kson_bridge::BridgeError;

    #[test]
    fn test_new_verifies_and_pins() {
        let (fake, runtime) = model();
        let kson = Kson::new(&runtime).unwrap();
        assert_eq!(runtime.pinned_references(), 1);
        assert_eq!(fake.stats().live_locals, 0);
        drop(kson);
        assert_eq!(runtime.pinned_references(), 0);
    }

    #[test]
    fn test_missing_member_fails_verification() {
        // A runtime that only knows the enums
        let fake = FakeVm::new();
        define_enums(&fake);
        let runtime = Runtime::with_vm(Box::new(fake));
        let err = Kson::new(&runtime).unwrap_err();
        assert!(matches!(err, BridgeError::SymbolNotFound { ref class, .. } if class == "org/kson/Kson"));
    }

    #[test]
    fn test_reordered_enum_fails_verification() {
        let fake = FakeVm::new();
        crate::testing::define_model(&fake);
        fake.define_enum("org/kson/api/MessageSeverity", &["WARNING", "ERROR"]);
        let runtime = Runtime::with_vm(Box::new(fake));
        let err = Kson::new(&runtime).unwrap_err();
        assert!(matches!(err, BridgeError::UnreachableVariant { .. }));
    }
}
