//! Graph builder that walks a module's imports breadth-first
//!
//! Every specifier of every asset triggers a fresh extraction. There is no
//! cache keyed by path, so a module imported from two places is extracted
//! twice and receives two ids, and an import cycle keeps the walk going until
//! the optional module limit is hit.

use std::{fmt, hash::BuildHasherDefault, path::Path};

use anyhow::Result;
use log::{debug, trace};

use crate::{
    asset::AssetExtractor, module_graph::ModuleGraph, resolver::ModuleResolver,
    session::BuildSession, transformer::SourceTransformer, types::FxIndexMap,
};

/// The walk discovered more modules than the configured limit allows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleLimitExceeded {
    pub limit: usize,
}

impl fmt::Display for ModuleLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module graph exceeded {} modules; the entry likely imports itself through a cycle",
            self.limit
        )
    }
}

impl std::error::Error for ModuleLimitExceeded {}

/// Builds a [`ModuleGraph`] from an entry file
#[derive(Debug)]
pub struct GraphBuilder<'a> {
    extractor: AssetExtractor<'a>,
    resolver: ModuleResolver,
    max_modules: Option<usize>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(transformer: &'a dyn SourceTransformer, resolver: ModuleResolver) -> Self {
        Self {
            extractor: AssetExtractor::new(transformer),
            resolver,
            max_modules: None,
        }
    }

    /// Fail with [`ModuleLimitExceeded`] once the graph would grow past `limit`
    /// assets. `None` leaves the walk unbounded.
    #[must_use]
    pub fn with_module_limit(mut self, limit: Option<usize>) -> Self {
        self.max_modules = limit;
        self
    }

    /// Walk the imports reachable from `entry`.
    ///
    /// Ids come from `session` and continue from wherever its counter stands;
    /// reset the session first for the entry to be module 0. Any extraction
    /// failure aborts the walk and no partial graph is returned.
    pub fn build(&self, session: &mut BuildSession, entry: &Path) -> Result<ModuleGraph> {
        let entry_asset = self.extractor.extract(session, entry)?;
        let mut queue = vec![entry_asset];

        let mut cursor = 0;
        while cursor < queue.len() {
            let importer = queue[cursor].path.clone();
            let dependencies = queue[cursor].dependencies.clone();

            let mut mapping = FxIndexMap::with_capacity_and_hasher(
                dependencies.len(),
                BuildHasherDefault::default(),
            );
            for specifier in dependencies {
                if let Some(limit) = self.max_modules.filter(|&limit| queue.len() >= limit) {
                    return Err(ModuleLimitExceeded { limit }.into());
                }

                let child_path = self.resolver.resolve(&importer, &specifier);
                let child = self.extractor.extract(session, &child_path)?;
                trace!(
                    "{} imports '{specifier}' as module {}",
                    importer.display(),
                    child.id
                );

                mapping.insert(specifier, child.id);
                queue.push(child);
            }
            queue[cursor].mapping = mapping;
            cursor += 1;
        }

        debug!(
            "Built module graph for {} with {} modules",
            entry.display(),
            queue.len()
        );
        Ok(ModuleGraph::new(queue))
    }
}
