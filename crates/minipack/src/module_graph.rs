//! The module graph: every asset reachable from the entry, in discovery order

use crate::{asset::Asset, types::ModuleId};

/// Discovery-ordered sequence of assets
///
/// Position carries no meaning beyond index 0 being the entry module. Ids are
/// only unique per build; a file reachable along several import paths appears
/// once per path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleGraph {
    assets: Vec<Asset>,
}

impl ModuleGraph {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }

    pub fn entry(&self) -> Option<&Asset> {
        self.assets.first()
    }

    /// Look up an asset by id
    pub fn get(&self, id: ModuleId) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Asset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn into_assets(self) -> Vec<Asset> {
        self.assets
    }
}

impl<'a> IntoIterator for &'a ModuleGraph {
    type Item = &'a Asset;
    type IntoIter = std::slice::Iter<'a, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
