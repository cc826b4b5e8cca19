//! Error types for the embedding bridge

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The runtime could not be created
    #[error("Runtime initialization failed: {0}")]
    Initialization(#[from] InitError),

    /// The runtime has been shut down
    #[error("Embedded runtime is not available")]
    RuntimeNotAvailable,

    /// Shutdown was requested from inside one of the runtime's attachment scopes
    #[error("Cannot shut down the embedded runtime from inside an attachment scope")]
    ShutdownWhileAttached,

    /// The calling thread could not attach to the runtime
    #[error("Failed to attach thread to the embedded runtime (status {code})")]
    Attachment {
        /// Status code reported by the runtime
        code: i32,
    },

    /// A class or member named by a descriptor does not exist
    #[error("Symbol not found: {class}.{member}{signature}")]
    SymbolNotFound {
        /// Class name (slash separated)
        class: String,
        /// Member name
        member: String,
        /// Member signature
        signature: String,
    },

    /// The runtime raised an exception, or returned something unusable
    #[error("Call to {member} failed: {message}")]
    NativeInvocation {
        /// Member that was invoked
        member: String,
        /// Rendered exception or failure description
        message: String,
    },

    /// A string could not be re-encoded across the boundary
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A runtime class or enum ordinal has no host-side counterpart
    #[error("Unreachable variant {class} of {hierarchy}")]
    UnreachableVariant {
        /// Sealed base type or enum class
        hierarchy: &'static str,
        /// Runtime class name, or the ordinal for enums
        class: String,
    },
}

impl BridgeError {
    /// Build a `NativeInvocation` error for a member
    pub fn invocation(member: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::NativeInvocation {
            member: member.into(),
            message: message.into(),
        }
    }
}

/// Reasons the runtime could not be created
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    /// No native library is published for this operating system
    #[error("no KSON library is available for {os}/{arch}")]
    UnsupportedPlatform {
        /// Operating system name
        os: String,
        /// CPU architecture name
        arch: String,
    },

    /// The library file could not be loaded
    #[error("library not loadable: {path}: {reason}")]
    LibraryNotFound {
        /// Path that was attempted
        path: String,
        /// Loader diagnostic
        reason: String,
    },

    /// The library does not export the runtime entry point
    #[error("entry point {symbol} missing from {library}")]
    MissingEntryPoint {
        /// Symbol name
        symbol: String,
        /// Library path
        library: String,
    },

    /// The runtime refused to start
    #[error("runtime creation returned status {code}")]
    StartFailed {
        /// Status code reported by the entry point
        code: i32,
    },

    /// A process-wide runtime was already installed
    #[error("a global runtime is already installed")]
    AlreadyInitialized,

    /// A runtime option or path could not be passed to the runtime
    #[error("invalid runtime option: {0}")]
    InvalidOption(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_not_found_display() {
        let err = BridgeError::SymbolNotFound {
            class: "org/kson/Kson".to_string(),
            member: "format".to_string(),
            signature: "(Ljava/lang/String;)Ljava/lang/String;".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Symbol not found: org/kson/Kson.format(Ljava/lang/String;)Ljava/lang/String;"
        );
    }

    #[test]
    fn test_init_error_converts() {
        let err: BridgeError = InitError::StartFailed { code: -1 }.into();
        assert!(matches!(
            err,
            BridgeError::Initialization(InitError::StartFailed { code: -1 })
        ));
    }
}
