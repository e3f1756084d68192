//! Asset extraction
//!
//! An asset is one source file read from disk, parsed, assigned an id and
//! lowered into a runtime module body.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;

use crate::{
    session::BuildSession,
    transformer::SourceTransformer,
    types::{FxIndexMap, ModuleId},
    util::normalize_line_endings,
};

/// One resolved, extracted source module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: ModuleId,
    /// Absolute, lexically normalized path the asset was read from
    pub path: PathBuf,
    /// Specifiers exactly as written in the module's import statements
    pub dependencies: Vec<String>,
    /// Lowered module body
    pub code: String,
    /// Specifier to the id of the asset it resolved to.
    /// Filled in by the graph builder.
    pub mapping: FxIndexMap<String, ModuleId>,
}

impl Asset {
    /// Directory the asset's relative specifiers are resolved against
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Turns files into [`Asset`]s through a [`SourceTransformer`]
#[derive(Debug, Clone, Copy)]
pub struct AssetExtractor<'a> {
    transformer: &'a dyn SourceTransformer,
}

impl<'a> AssetExtractor<'a> {
    pub fn new(transformer: &'a dyn SourceTransformer) -> Self {
        Self { transformer }
    }

    /// Read, parse and lower the module at `path`.
    ///
    /// Consumes one id from `session`. Read failures surface as
    /// [`std::io::Error`] and parse failures as
    /// [`ParseError`](crate::transformer::ParseError); neither is recovered.
    pub fn extract(&self, session: &mut BuildSession, path: &Path) -> Result<Asset> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read module {}", path.display()))?;
        let content = normalize_line_endings(content);

        let parsed = self.transformer.parse(path, &content)?;
        let dependencies: Vec<String> = parsed
            .dependency_specifiers()
            .map(str::to_owned)
            .collect();

        let id = session.next_module_id();

        let code = self
            .transformer
            .lower(&parsed)
            .with_context(|| format!("Failed to lower module {}", path.display()))?;

        debug!(
            "Extracted module {id} from {} with {} dependencies",
            path.display(),
            dependencies.len()
        );

        Ok(Asset {
            id,
            path: path.to_path_buf(),
            dependencies,
            code,
            mapping: FxIndexMap::default(),
        })
    }
}
