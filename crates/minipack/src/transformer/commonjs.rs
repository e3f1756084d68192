//! Lowering of ES module declarations into CommonJS form
//!
//! Only module declarations are rewritten; every other statement is copied
//! through untouched. Imports become `require` calls bound with `var`, exports
//! become assignments on the `exports` object handed in by the runtime.
//! Bindings are copied at import time rather than kept live.
//!
//! Every `require` is hoisted into a prologue, in source order, so imported
//! modules run before the body of the importing module. Exported function
//! declarations are assigned in the prologue as well, ahead of the requires.

use std::{fmt::Write, ops::Range};

use super::{ExportSpecifier, ImportBinding, ModuleDeclaration, ParsedModule};

const INTEROP_MARKER: &str = "Object.defineProperty(exports, \"__esModule\", { value: true });\n";

/// Rewrite `module` into code for the runtime's module wrapper
pub fn lower(module: &ParsedModule) -> String {
    let mut lowering = Lowering::new(&module.source);
    if let Some(hashbang) = &module.hashbang {
        lowering.remove_statement(hashbang.clone());
    }
    for declaration in &module.declarations {
        lowering.declaration(declaration);
    }

    let mut code = String::from("\"use strict\";\n");
    if module.has_exports() {
        code.push_str(INTEROP_MARKER);
    }
    code.push_str(&lowering.hoisted_exports);
    code.push_str(&lowering.requires);
    code.push_str(&lowering.edits.apply(&module.source));
    code
}

#[derive(Debug)]
struct Lowering<'a> {
    source: &'a str,
    edits: TextEdits,
    /// `exports.f = f;` lines for declarations initialized before the body
    hoisted_exports: String,
    /// Hoisted `require` statements, one per line
    requires: String,
    temporaries: usize,
}

impl<'a> Lowering<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: TextEdits::default(),
            hoisted_exports: String::new(),
            requires: String::new(),
            temporaries: 0,
        }
    }

    /// Name for a hidden variable holding a required module
    fn next_temporary(&mut self) -> String {
        let name = format!("__minipack_dep{}", self.temporaries);
        self.temporaries += 1;
        name
    }

    /// Delete a statement along with the line break that follows it
    fn remove_statement(&mut self, span: Range<usize>) {
        let end = if self.source[span.end..].starts_with("\r\n") {
            span.end + 2
        } else if self.source[span.end..].starts_with('\n') {
            span.end + 1
        } else {
            span.end
        };
        self.edits.replace(span.start..end, String::new());
    }

    /// Move a statement into the prologue
    fn hoist(&mut self, span: Range<usize>, code: &str) {
        self.requires.push_str(code);
        self.requires.push('\n');
        self.remove_statement(span);
    }

    fn hoist_export(&mut self, exported: &str, local: &str) {
        let _ = writeln!(self.hoisted_exports, "{} = {local};", member("exports", exported));
    }

    fn declaration(&mut self, declaration: &ModuleDeclaration) {
        match declaration {
            ModuleDeclaration::Import {
                span,
                source,
                bindings,
            } => {
                let code = if bindings.is_empty() {
                    format!("require({});", js_string(source))
                } else {
                    import_bindings(&self.next_temporary(), source, bindings)
                };
                self.hoist(span.clone(), &code);
            }
            ModuleDeclaration::ExportDeclaration {
                keyword,
                names,
                end,
                hoistable,
            } => self.export_declaration(keyword.clone(), names, *end, *hoistable),
            ModuleDeclaration::ExportList {
                span,
                specifiers,
                source: Some(source),
            } => {
                let code = self.reexport_list(specifiers, source);
                self.hoist(span.clone(), &code);
            }
            ModuleDeclaration::ExportList {
                span,
                specifiers,
                source: None,
            } => self.edits.replace(span.clone(), export_list(specifiers)),
            ModuleDeclaration::ExportAll {
                span,
                source,
                alias: Some(alias),
            } => {
                let code = format!(
                    "{} = require({});",
                    member("exports", alias),
                    js_string(source)
                );
                self.hoist(span.clone(), &code);
            }
            ModuleDeclaration::ExportAll {
                span,
                source,
                alias: None,
            } => {
                let code = export_star(&self.next_temporary(), source);
                self.hoist(span.clone(), &code);
            }
            ModuleDeclaration::ExportDefaultDeclaration {
                keyword,
                name: Some(name),
                end,
                hoistable,
            } => {
                self.edits.replace(keyword.clone(), String::new());
                if *hoistable {
                    self.hoist_export("default", name);
                } else {
                    self.edits.insert(*end, format!("\nexports.default = {name};"));
                }
            }
            ModuleDeclaration::ExportDefaultDeclaration {
                keyword,
                name: None,
                end,
                ..
            } => {
                self.edits.replace(keyword.clone(), "exports.default = ".to_owned());
                self.edits.insert(*end, ";".to_owned());
            }
            ModuleDeclaration::ExportDefaultExpression { keyword, tail } => {
                self.edits.replace(keyword.clone(), "exports.default = ".to_owned());
                self.edits.replace(tail.clone(), ";".to_owned());
            }
        }
    }

    /// `export const a = 1`, or `export function f() {}` when `hoistable`
    fn export_declaration(
        &mut self,
        keyword: Range<usize>,
        names: &[String],
        end: usize,
        hoistable: bool,
    ) {
        self.edits.replace(keyword, String::new());
        if hoistable {
            for name in names {
                self.hoist_export(name, name);
            }
        } else {
            let mut assignments = String::new();
            for name in names {
                let _ = write!(assignments, "\n{} = {name};", member("exports", name));
            }
            self.edits.insert(end, assignments);
        }
    }

    /// `export { a as b } from "./x"`
    fn reexport_list(&mut self, specifiers: &[ExportSpecifier], source: &str) -> String {
        let temporary = self.next_temporary();
        let mut code = format!("var {temporary} = require({});", js_string(source));
        for specifier in specifiers {
            let _ = write!(
                code,
                "\n{} = {};",
                member("exports", &specifier.exported),
                member(&temporary, &specifier.local)
            );
        }
        code
    }
}

/// `export { a, b as c }` of local bindings
fn export_list(specifiers: &[ExportSpecifier]) -> String {
    let assignments: Vec<_> = specifiers
        .iter()
        .map(|specifier| {
            format!(
                "{} = {};",
                member("exports", &specifier.exported),
                specifier.local
            )
        })
        .collect();
    assignments.join("\n")
}

fn import_bindings(temporary: &str, source: &str, bindings: &[ImportBinding]) -> String {
    let mut code = format!("var {temporary} = require({});", js_string(source));
    for binding in bindings {
        match binding {
            ImportBinding::Default(local) => {
                let _ = write!(
                    code,
                    "\nvar {local} = {temporary} && {temporary}.__esModule ? {temporary}.default : {temporary};"
                );
            }
            ImportBinding::Namespace(local) => {
                let _ = write!(code, "\nvar {local} = {temporary};");
            }
            ImportBinding::Named { imported, local } => {
                let _ = write!(code, "\nvar {local} = {};", member(temporary, imported));
            }
        }
    }
    code
}

fn export_star(temporary: &str, source: &str) -> String {
    format!(
        "var {temporary} = require({source});\nObject.keys({temporary}).forEach(function (key) {{\n  if (key === \"default\" || key === \"__esModule\" || Object.prototype.hasOwnProperty.call(exports, key)) return;\n  exports[key] = {temporary}[key];\n}});",
        source = js_string(source),
    )
}

/// Quote `value` as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Property access on `object`, falling back to bracket syntax for names that
/// are not identifiers (`export { x as "a-b" }`)
fn member(object: &str, property: &str) -> String {
    if is_identifier(property) {
        format!("{object}.{property}")
    } else {
        format!("{object}[{}]", js_string(property))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Non-overlapping replacements against one source text
#[derive(Debug, Default)]
struct TextEdits {
    edits: Vec<(Range<usize>, String)>,
}

impl TextEdits {
    fn replace(&mut self, range: Range<usize>, text: String) {
        self.edits.push((range, text));
    }

    fn insert(&mut self, at: usize, text: String) {
        self.replace(at..at, text);
    }

    fn apply(mut self, source: &str) -> String {
        // Insertions sort before a replacement starting at the same offset
        self.edits.sort_by_key(|(range, _)| (range.start, range.end));

        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;
        for (range, text) in &self.edits {
            debug_assert!(range.start >= cursor, "overlapping edits at {range:?}");
            output.push_str(&source[cursor..range.start]);
            output.push_str(text);
            cursor = range.end;
        }
        output.push_str(&source[cursor..]);
        output
    }
}
