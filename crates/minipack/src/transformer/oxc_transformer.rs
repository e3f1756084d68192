//! [`SourceTransformer`] backed by the oxc JavaScript parser

use std::{ops::Range, path::Path};

use anyhow::Result;
use log::trace;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, BindingPatternKind, Declaration, ExportDefaultDeclarationKind,
    ImportDeclarationSpecifier, Statement,
};
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use super::{
    ExportSpecifier, ImportBinding, ModuleDeclaration, ParseError, ParsedModule,
    SourceTransformer, commonjs,
};

/// Parses ES modules with oxc and lowers them to CommonJS-style code
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcTransformer;

impl OxcTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl SourceTransformer for OxcTransformer {
    fn parse(&self, path: &Path, source: &str) -> Result<ParsedModule> {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();

        if ret.panicked || !ret.errors.is_empty() {
            return Err(ParseError {
                path: path.to_path_buf(),
                messages: ret.errors.iter().map(diagnostic_message).collect(),
            }
            .into());
        }

        // Static module declarations can only appear at the top level
        let declarations: Vec<_> = ret
            .program
            .body
            .iter()
            .filter_map(module_declaration)
            .collect();

        trace!(
            "Parsed {} with {} module declarations",
            path.display(),
            declarations.len()
        );

        Ok(ParsedModule {
            path: path.to_path_buf(),
            source: source.to_owned(),
            hashbang: ret.program.hashbang.as_ref().map(|hashbang| range(hashbang.span)),
            declarations,
        })
    }

    fn lower(&self, module: &ParsedModule) -> Result<String> {
        Ok(commonjs::lower(module))
    }
}

fn diagnostic_message(diagnostic: &OxcDiagnostic) -> String {
    diagnostic.to_string()
}

fn range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

fn module_declaration(stmt: &Statement<'_>) -> Option<ModuleDeclaration> {
    match stmt {
        Statement::ImportDeclaration(import) => {
            let bindings = import
                .specifiers
                .as_ref()
                .map(|specifiers| specifiers.iter().map(import_binding).collect())
                .unwrap_or_default();
            Some(ModuleDeclaration::Import {
                span: range(import.span),
                source: import.source.value.to_string(),
                bindings,
            })
        }
        Statement::ExportNamedDeclaration(export) => {
            if let Some(declaration) = &export.declaration {
                return Some(ModuleDeclaration::ExportDeclaration {
                    keyword: export.span.start as usize..declaration.span().start as usize,
                    names: declared_names(declaration),
                    end: export.span.end as usize,
                    hoistable: matches!(declaration, Declaration::FunctionDeclaration(_)),
                });
            }
            Some(ModuleDeclaration::ExportList {
                span: range(export.span),
                specifiers: export
                    .specifiers
                    .iter()
                    .map(|specifier| ExportSpecifier {
                        local: specifier.local.name().to_string(),
                        exported: specifier.exported.name().to_string(),
                    })
                    .collect(),
                source: export.source.as_ref().map(|source| source.value.to_string()),
            })
        }
        Statement::ExportAllDeclaration(export) => Some(ModuleDeclaration::ExportAll {
            span: range(export.span),
            source: export.source.value.to_string(),
            alias: export.exported.as_ref().map(|name| name.name().to_string()),
        }),
        Statement::ExportDefaultDeclaration(export) => {
            let inner = export.declaration.span();
            let keyword = export.span.start as usize..inner.start as usize;
            let (name, hoistable) = match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                    (function.id.as_ref().map(|id| id.name.to_string()), true)
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    (class.id.as_ref().map(|id| id.name.to_string()), false)
                }
                _ => {
                    return Some(ModuleDeclaration::ExportDefaultExpression {
                        keyword,
                        tail: inner.end as usize..export.span.end as usize,
                    });
                }
            };
            Some(ModuleDeclaration::ExportDefaultDeclaration {
                keyword,
                name,
                end: export.span.end as usize,
                hoistable,
            })
        }
        _ => None,
    }
}

fn import_binding(specifier: &ImportDeclarationSpecifier<'_>) -> ImportBinding {
    match specifier {
        ImportDeclarationSpecifier::ImportSpecifier(named) => ImportBinding::Named {
            imported: named.imported.name().to_string(),
            local: named.local.name.to_string(),
        },
        ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
            ImportBinding::Default(default.local.name.to_string())
        }
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
            ImportBinding::Namespace(namespace.local.name.to_string())
        }
    }
}

fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    let mut names = Vec::new();
    match declaration {
        Declaration::VariableDeclaration(variables) => {
            for declarator in &variables.declarations {
                collect_binding_names(&declarator.id, &mut names);
            }
        }
        Declaration::FunctionDeclaration(function) => {
            names.extend(function.id.as_ref().map(|id| id.name.to_string()));
        }
        Declaration::ClassDeclaration(class) => {
            names.extend(class.id.as_ref().map(|id| id.name.to_string()));
        }
        // TypeScript-only declarations have no runtime binding
        _ => {}
    }
    names
}

fn collect_binding_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => names.push(ident.name.to_string()),
        BindingPatternKind::ObjectPattern(object) => {
            for property in &object.properties {
                collect_binding_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                collect_binding_names(element, names);
            }
            if let Some(rest) = &array.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assignment) => {
            collect_binding_names(&assignment.left, names);
        }
    }
}
