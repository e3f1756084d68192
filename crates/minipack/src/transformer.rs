//! Source transformer capability
//!
//! The bundler never looks at JavaScript syntax directly. A [`SourceTransformer`]
//! parses a module into a [`ParsedModule`], a parser-independent record of the
//! module's static import and export declarations, and lowers that record into
//! executable text that talks to the runtime through `require`, `module` and
//! `exports`.

use std::{
    fmt,
    ops::Range,
    path::{Path, PathBuf},
};

use anyhow::Result;

pub mod commonjs;
pub mod oxc_transformer;

pub use oxc_transformer::OxcTransformer;

/// Parse and lower entry points used by the asset extractor
pub trait SourceTransformer: fmt::Debug {
    /// Parse `source` as a module, recognizing static import/export declarations.
    ///
    /// `path` is only used for diagnostics.
    fn parse(&self, path: &Path, source: &str) -> Result<ParsedModule>;

    /// Rewrite a parsed module into code runnable inside the runtime's
    /// `function (require, module, exports)` wrapper.
    fn lower(&self, module: &ParsedModule) -> Result<String>;
}

/// A module's source text together with its top-level module declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModule {
    pub path: PathBuf,
    pub source: String,
    /// `#!` interpreter line, which is only valid at the very start of a script
    pub hashbang: Option<Range<usize>>,
    /// Module declarations in source order
    pub declarations: Vec<ModuleDeclaration>,
}

impl ParsedModule {
    /// Specifiers of every declaration that pulls in another module, in source
    /// order and without deduplication
    pub fn dependency_specifiers(&self) -> impl Iterator<Item = &str> {
        self.declarations
            .iter()
            .filter_map(ModuleDeclaration::source)
    }

    pub fn has_exports(&self) -> bool {
        self.declarations
            .iter()
            .any(|declaration| !matches!(declaration, ModuleDeclaration::Import { .. }))
    }
}

/// Static module declaration found at the top level of a module
///
/// Byte ranges index into [`ParsedModule::source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleDeclaration {
    /// `import a, { b as c } from "./x"` or `import "./x"`
    Import {
        span: Range<usize>,
        source: String,
        bindings: Vec<ImportBinding>,
    },
    /// `export const a = 1`, `export function f() {}`, `export class C {}`
    ExportDeclaration {
        /// The `export` keyword up to the start of the declaration
        keyword: Range<usize>,
        /// Names bound by the declaration
        names: Vec<String>,
        end: usize,
        /// A function declaration, initialized before the module body runs
        hoistable: bool,
    },
    /// `export { a, b as c }` or `export { a } from "./x"`
    ExportList {
        span: Range<usize>,
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
    },
    /// `export * from "./x"` or `export * as ns from "./x"`
    ExportAll {
        span: Range<usize>,
        source: String,
        alias: Option<String>,
    },
    /// `export default function f() {}` or `export default class {}`
    ExportDefaultDeclaration {
        keyword: Range<usize>,
        /// Binding name of the function or class, if it has one
        name: Option<String>,
        end: usize,
        /// A function declaration, initialized before the module body runs
        hoistable: bool,
    },
    /// `export default <expression>;`
    ExportDefaultExpression {
        keyword: Range<usize>,
        /// From the end of the expression to the end of the statement
        tail: Range<usize>,
    },
}

impl ModuleDeclaration {
    /// Module specifier this declaration loads, if any
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Import { source, .. } | Self::ExportAll { source, .. } => Some(source),
            Self::ExportList { source, .. } => source.as_deref(),
            Self::ExportDeclaration { .. }
            | Self::ExportDefaultDeclaration { .. }
            | Self::ExportDefaultExpression { .. } => None,
        }
    }
}

/// One local binding introduced by an import declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    /// `import local from "./x"`
    Default(String),
    /// `import * as local from "./x"`
    Namespace(String),
    /// `import { imported as local } from "./x"`
    Named { imported: String, local: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}

/// The transformer rejected a module's source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub path: PathBuf,
    pub messages: Vec<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to parse {}", self.path.display())?;
        if !self.messages.is_empty() {
            write!(f, ": {}", self.messages.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
