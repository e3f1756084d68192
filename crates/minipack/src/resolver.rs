use std::path::{Path, PathBuf};

use log::trace;

use crate::{config::Config, util::normalize_path};

/// Resolves import specifiers against the directory of the importing module
///
/// Resolution is purely lexical: the specifier is joined onto the importer's
/// directory and `.`/`..` segments are folded. Symlinks are not followed and
/// nothing is cached.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    /// Extensions tried, in order, for extensionless specifiers
    extensions: Vec<String>,
}

impl ModuleResolver {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.extensions.clone())
    }

    /// Resolve `specifier` as written in the module at `importer`.
    ///
    /// Never fails: a specifier pointing nowhere resolves to the joined path
    /// and fails later, when the asset is read.
    pub fn resolve(&self, importer: &Path, specifier: &str) -> PathBuf {
        let base_dir = importer.parent().unwrap_or_else(|| Path::new(""));
        self.resolve_in_directory(base_dir, specifier)
    }

    /// Resolve `specifier` relative to `base_dir`
    pub fn resolve_in_directory(&self, base_dir: &Path, specifier: &str) -> PathBuf {
        // Joining never replaces the base, even for specifiers with a leading slash
        let joined = normalize_path(&base_dir.join(specifier.trim_start_matches('/')));

        if joined.is_file() || joined.extension().is_some() {
            trace!("Resolved '{specifier}' to {}", joined.display());
            return joined;
        }

        for extension in &self.extensions {
            let candidate = joined.with_extension(extension);
            if candidate.is_file() {
                trace!(
                    "Resolved '{specifier}' to {} by appending .{extension}",
                    candidate.display()
                );
                return candidate;
            }
        }

        trace!("'{specifier}' does not exist, using {}", joined.display());
        joined
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
