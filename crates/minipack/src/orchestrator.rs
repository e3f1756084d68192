//! Bundle orchestration
//!
//! The orchestrator owns the configuration, the source transformer and the
//! build session, and turns them into files in the output directory. Every
//! build starts from a freshly reset session so the entry module is always 0.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    code_generator,
    config::Config,
    graph_builder::GraphBuilder,
    html_injector::{self, LIVE_RELOAD_SNIPPET},
    module_graph::ModuleGraph,
    resolver::ModuleResolver,
    session::BuildSession,
    transformer::{OxcTransformer, SourceTransformer},
    util::normalize_path,
};

/// File name of the emitted bundle inside the output directory
pub const BUNDLE_FILE_NAME: &str = "index.js";
/// File name of the injected page inside the output directory
pub const HTML_FILE_NAME: &str = "index.html";

/// What a changed file means for the dev loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A module: rebuild the bundle
    Code,
    /// A page: re-run the injector
    Markup,
    Other,
}

impl ChangeKind {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some("js") => Self::Code,
            Some("html") => Self::Markup,
            _ => Self::Other,
        }
    }
}

#[derive(Debug)]
pub struct BundleOrchestrator {
    config: Config,
    transformer: Box<dyn SourceTransformer>,
    session: BuildSession,
}

impl BundleOrchestrator {
    pub fn new(config: Config) -> Self {
        Self::with_transformer(config, Box::new(OxcTransformer::new()))
    }

    pub fn with_transformer(config: Config, transformer: Box<dyn SourceTransformer>) -> Self {
        Self {
            config,
            transformer,
            session: BuildSession::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Walk the module graph from the configured entry
    pub fn build_graph(&mut self) -> Result<ModuleGraph> {
        let entry = std::path::absolute(&self.config.entry).with_context(|| {
            format!(
                "Failed to resolve entry path {}",
                self.config.entry.display()
            )
        })?;
        let entry = normalize_path(&entry);

        self.session.reset();
        GraphBuilder::new(
            self.transformer.as_ref(),
            ModuleResolver::from_config(&self.config),
        )
        .with_module_limit(self.config.max_modules)
        .build(&mut self.session, &entry)
    }

    /// Build and emit the bundle text without touching the output directory
    pub fn bundle(&mut self) -> Result<String> {
        let graph = self.build_graph()?;
        let bundle = code_generator::emit(&graph)?;
        info!(
            "Bundled {} modules from {} ({} bytes)",
            graph.len(),
            self.config.entry.display(),
            bundle.len()
        );
        Ok(bundle)
    }

    /// Build the bundle and write it to `<out>/index.js`.
    ///
    /// The bundle is fully produced before anything is written, so a failed
    /// build leaves the previous output in place.
    pub fn write_bundle(&mut self) -> Result<PathBuf> {
        let bundle = self.bundle()?;
        let path = self.output_path(BUNDLE_FILE_NAME)?;
        fs::write(&path, bundle)
            .with_context(|| format!("Failed to write bundle to {}", path.display()))?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Inject the live-reload client into the configured page and write it to
    /// `<out>/index.html`.
    ///
    /// Returns `None` without writing when no page is configured or the page
    /// has no injection marker.
    pub fn write_html(&self) -> Result<Option<PathBuf>> {
        let Some(html_path) = &self.config.html else {
            return Ok(None);
        };
        let html = fs::read_to_string(html_path)
            .with_context(|| format!("Failed to read page {}", html_path.display()))?;

        let Some(injected) = html_injector::inject(&html, LIVE_RELOAD_SNIPPET) else {
            warn!(
                "{} has no </body>, </svg> or </head> tag; live reload was not injected",
                html_path.display()
            );
            return Ok(None);
        };

        let path = self.output_path(HTML_FILE_NAME)?;
        fs::write(&path, injected)
            .with_context(|| format!("Failed to write page to {}", path.display()))?;
        info!(
            "Wrote {}; serve {} at {} for live reload",
            path.display(),
            self.config.out.display(),
            self.config.server.address()
        );
        Ok(Some(path))
    }

    /// React to a changed source file the way the dev loop does.
    ///
    /// Returns `true` when live clients should be sent
    /// [`RELOAD_TOKEN`](crate::html_injector::RELOAD_TOKEN).
    pub fn handle_change(&mut self, changed: &Path) -> Result<bool> {
        match ChangeKind::of(changed) {
            ChangeKind::Code => {
                info!("{} changed, rebuilding bundle", changed.display());
                self.write_bundle()?;
                Ok(true)
            }
            ChangeKind::Markup => {
                info!("{} changed, re-injecting page", changed.display());
                self.write_html()?;
                Ok(true)
            }
            ChangeKind::Other => Ok(false),
        }
    }

    fn output_path(&self, file_name: &str) -> Result<PathBuf> {
        let out = &self.config.out;
        fs::create_dir_all(out)
            .with_context(|| format!("Failed to create output directory {}", out.display()))?;
        Ok(out.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    struct Project {
        _temp_dir: TempDir,
        root: PathBuf,
    }

    impl Project {
        fn new() -> Self {
            let temp_dir = TempDir::new().expect("tempdir");
            let root = temp_dir.path().to_path_buf();
            Self {
                _temp_dir: temp_dir,
                root,
            }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create fixture dir");
            }
            fs::write(&path, content).expect("write fixture");
            path
        }

        fn config(&self) -> Config {
            Config {
                entry: self.root.join("src/entry.js"),
                out: self.root.join("dist"),
                html: Some(self.root.join("src/index.html")),
                ..Config::default()
            }
        }
    }

    #[test]
    fn test_change_kind() {
        assert_eq!(ChangeKind::of(Path::new("src/a.js")), ChangeKind::Code);
        assert_eq!(ChangeKind::of(Path::new("src/index.html")), ChangeKind::Markup);
        assert_eq!(ChangeKind::of(Path::new("src/style.css")), ChangeKind::Other);
        assert_eq!(ChangeKind::of(Path::new("Makefile")), ChangeKind::Other);
    }

    #[test]
    fn test_every_build_starts_at_entry_zero() -> Result<()> {
        let project = Project::new();
        project.write("src/entry.js", "import './a.js';\n");
        project.write("src/a.js", "");

        let mut orchestrator = BundleOrchestrator::new(project.config());
        let first = orchestrator.build_graph()?;
        let second = orchestrator.build_graph()?;
        assert_eq!(first, second);
        assert_eq!(second.assets()[0].id.as_u32(), 0);
        Ok(())
    }

    #[test]
    fn test_write_bundle() -> Result<()> {
        let project = Project::new();
        project.write("src/entry.js", "import { greet } from './greet';\ngreet();\n");
        project.write("src/greet.js", "export function greet() {}\n");

        let mut orchestrator = BundleOrchestrator::new(project.config());
        let path = orchestrator.write_bundle()?;

        assert_eq!(path, project.root.join("dist/index.js"));
        let bundle = fs::read_to_string(path)?;
        assert!(bundle.starts_with("(function (modules) {\n"));
        assert!(bundle.contains(r#"{"./greet":1},"#));
        assert!(bundle.contains("exports.greet = greet;"));
        Ok(())
    }

    #[test]
    fn test_failed_build_writes_nothing() -> Result<()> {
        let project = Project::new();
        project.write("src/entry.js", "import './missing.js';\n");

        let mut orchestrator = BundleOrchestrator::new(project.config());
        assert!(orchestrator.write_bundle().is_err());
        assert!(!project.root.join("dist/index.js").exists());
        Ok(())
    }

    #[test]
    fn test_write_html_injects_snippet() -> Result<()> {
        let project = Project::new();
        project.write("src/index.html", "<html><body></body></html>");

        let orchestrator = BundleOrchestrator::new(project.config());
        let path = orchestrator.write_html()?.expect("page should be written");

        assert_eq!(
            fs::read_to_string(path)?,
            format!("<html><body>{LIVE_RELOAD_SNIPPET}</body></html>")
        );
        Ok(())
    }

    #[test]
    fn test_write_html_without_marker_writes_nothing() -> Result<()> {
        let project = Project::new();
        project.write("src/index.html", "<p>no closing tags here</p>");

        let orchestrator = BundleOrchestrator::new(project.config());
        assert_eq!(orchestrator.write_html()?, None);
        assert!(!project.root.join("dist/index.html").exists());
        Ok(())
    }

    #[test]
    fn test_handle_change_dispatches_by_extension() -> Result<()> {
        let project = Project::new();
        let entry = project.write("src/entry.js", "console.log(1);\n");
        let page = project.write("src/index.html", "<body></body>");

        let mut orchestrator = BundleOrchestrator::new(project.config());

        assert!(!orchestrator.handle_change(&project.root.join("src/style.css"))?);
        assert!(!project.root.join("dist").exists());

        assert!(orchestrator.handle_change(&page)?);
        assert!(project.root.join("dist/index.html").exists());
        assert!(!project.root.join("dist/index.js").exists());

        assert!(orchestrator.handle_change(&entry)?);
        assert!(project.root.join("dist/index.js").exists());
        Ok(())
    }
}
