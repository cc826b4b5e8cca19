//! Runtime configuration

use std::path::{Path, PathBuf};

use crate::error::InitError;
use crate::loader;

/// Environment variable naming the directory that holds the runtime library
pub const LIBRARY_DIR_ENV: &str = "KSON_LIBRARY_DIR";

/// Environment variable with extra runtime options, separated by whitespace
pub const RUNTIME_OPTIONS_ENV: &str = "KSON_JVM_OPTIONS";

/// Options for creating a [`Runtime`](crate::Runtime)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Full path of the library; takes precedence over `library_dir`
    pub library_path: Option<PathBuf>,

    /// Directory holding the platform's library file
    pub library_dir: Option<PathBuf>,

    /// Options handed to the runtime entry point (e.g. `-Xmx256m`)
    pub vm_options: Vec<String>,

    /// Fail on options the runtime does not recognize (default: false)
    pub strict_options: bool,
}

impl RuntimeOptions {
    /// Options with nothing configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Options read from `KSON_LIBRARY_DIR` and `KSON_JVM_OPTIONS`
    pub fn from_env() -> Self {
        let library_dir = std::env::var_os(LIBRARY_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        let vm_options = std::env::var(RUNTIME_OPTIONS_ENV)
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        RuntimeOptions {
            library_dir,
            vm_options,
            ..Self::default()
        }
    }

    /// Load the library from exactly this path
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Look for the platform library in this directory
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    /// Append a runtime option
    pub fn with_vm_option(mut self, option: impl Into<String>) -> Self {
        self.vm_options.push(option.into());
        self
    }

    /// Reject unrecognized runtime options instead of ignoring them
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_options = strict;
        self
    }

    /// The one library path these options point at on this host
    pub fn resolve_library_path(&self) -> Result<PathBuf, InitError> {
        match &self.library_path {
            Some(path) => Ok(path.clone()),
            None => loader::host_library_path(self.library_dir.as_deref().map(Path::new)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let options = RuntimeOptions::new()
            .with_library_dir("/opt/kson")
            .with_library_path("/tmp/custom.so");
        assert_eq!(
            options.resolve_library_path().unwrap(),
            PathBuf::from("/tmp/custom.so")
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_directory_uses_platform_name() {
        let options = RuntimeOptions::new().with_library_dir("/opt/kson");
        assert_eq!(
            options.resolve_library_path().unwrap(),
            PathBuf::from("/opt/kson/libkson.so")
        );
    }

    #[test]
    fn test_builder_collects_options() {
        let options = RuntimeOptions::new()
            .with_vm_option("-Xmx64m")
            .with_vm_option("-Xss4m")
            .strict(true);
        assert_eq!(options.vm_options, vec!["-Xmx64m", "-Xss4m"]);
        assert!(options.strict_options);
    }
}
