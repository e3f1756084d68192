//! Configuration loading
//!
//! Settings are layered, lowest priority first:
//! 1. built-in defaults
//! 2. user configuration (`<config dir>/minipack/minipack.toml`)
//! 3. project configuration (`./minipack.toml`, or an explicit `--config` path)
//! 4. `MINIPACK_*` environment variables
//! 5. command line flags, applied by the binary
//!
//! File layers are merged table by table before deserialization, so a project
//! file only needs to name the keys it changes.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::dirs::{self, CONFIG_FILE_NAME};

pub const ENV_ENTRY: &str = "MINIPACK_ENTRY";
pub const ENV_OUT: &str = "MINIPACK_OUT";
pub const ENV_HTML: &str = "MINIPACK_HTML";
pub const ENV_MAX_MODULES: &str = "MINIPACK_MAX_MODULES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// Module the bundle starts from
    pub entry: PathBuf,
    /// Directory receiving `index.js` and `index.html`
    pub out: PathBuf,
    /// Page that gets the live-reload client injected
    pub html: Option<PathBuf>,
    /// Extensions tried, in order, for extensionless import specifiers
    pub extensions: Vec<String>,
    /// Abort the graph walk past this many modules. Unset means unbounded.
    pub max_modules: Option<usize>,
    pub server: ServerConfig,
}

/// Address of the development server that serves `out`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("example/entry.js"),
            out: PathBuf::from("dist"),
            html: None,
            extensions: vec!["js".to_owned()],
            max_modules: None,
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// `project_config` replaces the lookup of `minipack.toml` in the current
    /// directory; unlike the implicit file it must exist.
    pub fn load(project_config: Option<&Path>) -> Result<Self> {
        let mut layered = toml::Table::new();

        if let Some(user_config) = dirs::user_config_file().filter(|path| path.is_file()) {
            debug!("Loading user configuration from {}", user_config.display());
            merge_tables(&mut layered, read_table(&user_config)?);
        }

        let project_config = match project_config {
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(CONFIG_FILE_NAME)).filter(|path| path.is_file()),
        };
        if let Some(project_config) = project_config {
            debug!(
                "Loading project configuration from {}",
                project_config.display()
            );
            merge_tables(&mut layered, read_table(&project_config)?);
        }

        let mut config = Self::from_table(layered)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a single configuration document over the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content).context("Invalid TOML")?;
        Self::from_table(table)
    }

    fn from_table(table: toml::Table) -> Result<Self> {
        toml::Value::Table(table)
            .try_into()
            .context("Invalid minipack configuration")
    }

    /// Apply `MINIPACK_*` overrides, reading variables through `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(entry) = lookup(ENV_ENTRY) {
            self.entry = PathBuf::from(entry);
        }
        if let Some(out) = lookup(ENV_OUT) {
            self.out = PathBuf::from(out);
        }
        if let Some(html) = lookup(ENV_HTML) {
            self.html = Some(PathBuf::from(html));
        }
        if let Some(max_modules) = lookup(ENV_MAX_MODULES) {
            match max_modules.parse() {
                Ok(limit) => self.max_modules = Some(limit),
                Err(e) => warn!("Ignoring {ENV_MAX_MODULES}={max_modules}: {e}"),
            }
        }
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
}

/// Merge `overlay` into `base`; nested tables merge key by key, any other value
/// replaces what was there
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(nested) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, nested);
                } else {
                    base.insert(key, toml::Value::Table(nested));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    /// Sets an environment variable for the lifetime of the guard
    struct EnvVarGuard {
        key: &'static str,
        original_value: Option<String>,
    }

    impl EnvVarGuard {
        #[allow(unsafe_code)]
        fn new(key: &'static str, value: &str) -> Self {
            let original_value = std::env::var(key).ok();
            // SAFETY: tests touching the environment run under #[serial]
            unsafe {
                std::env::set_var(key, value);
            }
            Self {
                key,
                original_value,
            }
        }
    }

    impl Drop for EnvVarGuard {
        #[allow(unsafe_code)]
        fn drop(&mut self) {
            // SAFETY: restoring the environment captured in `new`
            unsafe {
                match self.original_value.take() {
                    Some(original) => std::env::set_var(self.key, original),
                    None => std::env::remove_var(self.key),
                }
            }
        }
    }

    #[test]
    fn test_partial_document_keeps_defaults() -> Result<()> {
        let config = Config::from_toml_str(
            r#"
entry = "src/main.js"
max-modules = 500

[server]
port = 8080
"#,
        )?;

        assert_eq!(config.entry, PathBuf::from("src/main.js"));
        assert_eq!(config.max_modules, Some(500));
        assert_eq!(config.out, PathBuf::from("dist"));
        assert_eq!(config.extensions, vec!["js".to_owned()]);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.address(), "http://localhost:8080");
        Ok(())
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Config::from_toml_str("entyr = \"typo.js\"").expect_err("unknown key");
        assert!(format!("{err:#}").contains("entyr"));
    }

    #[test]
    fn test_layers_merge_nested_tables() -> Result<()> {
        let mut layered: toml::Table =
            toml::from_str("out = \"build\"\n[server]\nhost = \"0.0.0.0\"\nport = 4000\n")?;
        merge_tables(&mut layered, toml::from_str("[server]\nport = 5000\n")?);

        let config = Config::from_table(layered)?;
        assert_eq!(config.out, PathBuf::from("build"));
        assert_eq!(
            config.server,
            ServerConfig {
                host: "0.0.0.0".to_owned(),
                port: 5000,
            }
        );
        Ok(())
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            ENV_ENTRY => Some("app/index.js".to_owned()),
            ENV_HTML => Some("app/index.html".to_owned()),
            ENV_MAX_MODULES => Some("not-a-number".to_owned()),
            _ => None,
        });

        assert_eq!(config.entry, PathBuf::from("app/index.js"));
        assert_eq!(config.html, Some(PathBuf::from("app/index.html")));
        assert_eq!(config.out, PathBuf::from("dist"));
        assert_eq!(config.max_modules, None);
    }

    #[test]
    #[serial]
    fn test_load_explicit_file_then_environment() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("custom.toml");
        fs::write(&path, "entry = \"from-file.js\"\nout = \"file-out\"\n")?;

        let _guard = EnvVarGuard::new(ENV_OUT, "env-out");
        let config = Config::load(Some(&path))?;

        assert_eq!(config.entry, PathBuf::from("from-file.js"));
        assert_eq!(config.out, PathBuf::from("env-out"));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_file_fails() {
        let temp_dir = TempDir::new().expect("tempdir");
        let err = Config::load(Some(&temp_dir.path().join("absent.toml")))
            .expect_err("explicit config must exist");
        assert!(err.to_string().contains("absent.toml"));
    }
}
