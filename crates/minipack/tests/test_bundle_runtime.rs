#![allow(clippy::disallowed_methods)]

//! Executes emitted bundles with Node.js. Every test is skipped when `node` is
//! not on PATH.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Command,
};

use minipack::{config::Config, orchestrator::BundleOrchestrator};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(root: &Path, name: &str, content: &str) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn bundle(entry: &Path) -> String {
    let config = Config {
        entry: entry.to_path_buf(),
        ..Default::default()
    };
    BundleOrchestrator::new(config).bundle().unwrap()
}

/// Run `script` with `node -e`, returning stdout, or `None` when node is missing
fn run_node(script: &str) -> Option<String> {
    let output = match Command::new("node").arg("-e").arg(script).output() {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => panic!("Failed to spawn node: {e}"),
    };
    assert!(
        output.status.success(),
        "node failed\nSTDOUT:\n{}\nSTDERR:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    Some(String::from_utf8(output.stdout).unwrap())
}

/// Turn the bundle into an expression evaluating to its `require` function
/// instead of running the entry module
fn loader_expression(bundle: &str) -> String {
    let expression = bundle.trim_end().trim_end_matches(';');
    assert!(expression.contains("\n  require(0);\n"));
    expression.replacen("\n  require(0);\n", "\n  return require;\n", 1)
}

#[test]
fn test_entry_exports_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let entry = write(temp_dir.path(), "entry.js", "export const answer = 42;\n");

    let script = format!(
        "var load = {};\nprocess.stdout.write(JSON.stringify(load(0)));",
        loader_expression(&bundle(&entry))
    );
    let Some(stdout) = run_node(&script) else {
        return;
    };
    assert_eq!(stdout, r#"{"answer":42}"#);
}

#[test]
fn test_single_module_runs_only_its_body() {
    let temp_dir = TempDir::new().unwrap();
    let entry = write(temp_dir.path(), "entry.js", "console.log('entry');\n");

    let Some(stdout) = run_node(&bundle(&entry)) else {
        return;
    };
    assert_eq!(stdout, "entry\n");
}

#[test]
fn test_nested_imports() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = write(
        root,
        "example/entry.js",
        "import message from './message.js';\nconsole.log(message);\n",
    );
    write(
        root,
        "example/message.js",
        "import { name } from './name.js';\nexport default `hello ${name}!`;\n",
    );
    write(root, "example/name.js", "export const name = 'world';\n");

    let Some(stdout) = run_node(&bundle(&entry)) else {
        return;
    };
    assert_eq!(stdout, "hello world!\n");
}

#[test]
fn test_modules_share_globals_but_not_locals() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = write(
        root,
        "entry.js",
        "import './a.js';\nconsole.log(typeof hidden, globalThis.shared);\n",
    );
    write(root, "a.js", "var hidden = 1;\nglobalThis.shared = 'from a';\n");

    let Some(stdout) = run_node(&bundle(&entry)) else {
        return;
    };
    assert_eq!(stdout, "undefined from a\n");
}

#[test]
fn test_every_require_reevaluates_the_module() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = write(
        root,
        "entry.js",
        "import { n as first } from './counter.js';\nimport { n as second } from './counter.js';\nconsole.log(first, second);\n",
    );
    write(
        root,
        "counter.js",
        "globalThis.count = (globalThis.count || 0) + 1;\nexport const n = globalThis.count;\n",
    );

    let Some(stdout) = run_node(&bundle(&entry)) else {
        return;
    };
    assert_eq!(stdout, "1 2\n");
}

#[test]
fn test_loader_returns_fresh_exports_per_call() {
    let temp_dir = TempDir::new().unwrap();
    let entry = write(temp_dir.path(), "entry.js", "export default {};\n");

    let script = format!(
        "var load = {};\nprocess.stdout.write(String(load(0) === load(0)));",
        loader_expression(&bundle(&entry))
    );
    let Some(stdout) = run_node(&script) else {
        return;
    };
    assert_eq!(stdout, "false");
}

#[test]
fn test_reexports_and_interop() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = write(
        root,
        "entry.js",
        "import * as lib from './lib.js';\nimport legacy from './legacy.js';\nconsole.log(lib.a, lib.b, lib.renamed, legacy.kind);\n",
    );
    write(
        root,
        "lib.js",
        "export * from './a.js';\nexport { b as renamed } from './b.js';\nexport { b } from './b.js';\n",
    );
    write(root, "a.js", "export const a = 'A';\nexport default 'ignored';\n");
    write(root, "b.js", "export const b = 'B';\n");
    // A CommonJS module imported with a default import gets module.exports
    write(root, "legacy.js", "module.exports = { kind: 'cjs' };\n");

    let Some(stdout) = run_node(&bundle(&entry)) else {
        return;
    };
    assert_eq!(stdout, "A B B cjs\n");
}

#[test]
fn test_imports_run_before_the_importing_body() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = write(root, "entry.js", "console.log('entry body');\nimport './a.js';\n");
    write(root, "a.js", "console.log('a body');\n");

    let Some(stdout) = run_node(&bundle(&entry)) else {
        return;
    };
    assert_eq!(stdout, "a body\nentry body\n");
}

#[test]
fn test_imported_bindings_are_usable_before_the_import_statement() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = write(
        root,
        "entry.js",
        "#!/usr/bin/env node\ngreet();\nimport { greet } from './greet.js';\n",
    );
    write(
        root,
        "greet.js",
        "export function greet() {\n  console.log('hello');\n}\n",
    );

    let Some(stdout) = run_node(&bundle(&entry)) else {
        return;
    };
    assert_eq!(stdout, "hello\n");
}
