//! minipack: a minimal JavaScript module bundler
//!
//! Starting from an entry module, minipack follows static `import`
//! declarations breadth-first, gives every discovered module an id and emits
//! one script that carries its own small `require` runtime.

pub mod asset;
pub mod code_generator;
pub mod config;
pub mod dirs;
pub mod graph_builder;
pub mod html_injector;
pub mod module_graph;
pub mod orchestrator;
pub mod resolver;
pub mod session;
pub mod transformer;
pub mod types;
pub mod util;
