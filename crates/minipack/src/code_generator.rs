//! Runtime code generation
//!
//! The bundle is a single self-invoking function that receives a table of
//! modules keyed by id. Each table entry pairs the module body, wrapped in a
//! `function (require, module, exports)` scope, with the module's specifier
//! to id mapping. The bootstrap `require` evaluates a module on every call;
//! there is no module cache.

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::{
    module_graph::ModuleGraph,
    types::{FxIndexMap, ModuleId},
};

const INDENT: &str = "  ";

/// Bootstrap loader, emitted once ahead of the module table
const BOOTSTRAP: &[&str] = &[
    "function require(id) {",
    "  var entry = modules[id];",
    "  var fn = entry[0];",
    "  var mapping = entry[1];",
    "",
    "  function localRequire(name) {",
    "    return require(mapping[name]);",
    "  }",
    "",
    "  var module = { exports: {} };",
    "",
    "  fn(localRequire, module, module.exports);",
    "",
    "  return module.exports;",
    "}",
    "",
];

/// One row of the module table
#[derive(Debug)]
struct ModuleTableEntry<'a> {
    id: ModuleId,
    code: &'a str,
    mapping: &'a FxIndexMap<String, ModuleId>,
}

/// Line-oriented writer for the runtime payload
#[derive(Debug, Default)]
pub struct RuntimeWriter {
    buffer: String,
    depth: usize,
}

impl RuntimeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current indentation
    pub fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.buffer.push_str(INDENT);
            }
            self.buffer.push_str(text);
        }
        self.buffer.push('\n');
    }

    /// Write `text` verbatim, terminated by a newline.
    ///
    /// Module bodies are not re-indented: doing so would change the contents
    /// of multi-line template literals.
    pub fn verbatim(&mut self, text: &str) {
        self.buffer.push_str(text);
        if !text.ends_with('\n') {
            self.buffer.push('\n');
        }
    }

    /// Write the lines produced by `f` one level deeper
    pub fn indented<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub fn finish(self) -> String {
        self.buffer
    }

    fn module_entry(&mut self, entry: &ModuleTableEntry<'_>) -> Result<()> {
        let mapping = serde_json::to_string(entry.mapping)
            .with_context(|| format!("Failed to serialize mapping of module {}", entry.id))?;

        self.line(&format!("{}: [", entry.id));
        self.indented(|w| {
            w.line("function (require, module, exports) {");
            w.verbatim(entry.code);
            w.line("},");
            w.line(&format!("{mapping},"));
        });
        self.line("],");
        Ok(())
    }
}

/// Serialize `graph` into the executable bundle text
pub fn emit(graph: &ModuleGraph) -> Result<String> {
    if let Some(entry) = graph.entry().filter(|entry| !entry.id.is_entry()) {
        warn!(
            "Entry module {} has id {}, but the bootstrap starts at {}; was the build session reset?",
            entry.path.display(),
            entry.id,
            ModuleId::ENTRY
        );
    }

    let table: Vec<ModuleTableEntry<'_>> = graph
        .iter()
        .map(|asset| ModuleTableEntry {
            id: asset.id,
            code: &asset.code,
            mapping: &asset.mapping,
        })
        .collect();

    let mut writer = RuntimeWriter::new();
    writer.line("(function (modules) {");
    writer.indented(|w| {
        for line in BOOTSTRAP {
            w.line(line);
        }
        w.line(&format!("require({});", ModuleId::ENTRY));
    });
    writer.line("})({");

    writer.indented(|w| table.iter().try_for_each(|entry| w.module_entry(entry)))?;
    writer.line("});");

    debug!("Emitted runtime for {} modules", table.len());
    Ok(writer.finish())
}
