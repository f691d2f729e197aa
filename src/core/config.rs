//! Configuration types for mundler.
//!
//! A mundler config file is a YAML mapping of bundle name to bundle
//! properties, mirroring the original config surface (`src`, `dest`, `cwd`,
//! `ignoreFiles`, `prefix`, `watch`, `preTasks`, `postTasks`, `vendorDest`,
//! `useRequire`, `concat`). Bundle declaration order is preserved.
//!
//! Browser alias and shim tables come from the project manifest
//! (`package.json`), under the `browser` and `browserify-shim` keys.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::{MundlerError, Result};

/// Default internal-reference extensions, tried in preference order.
fn default_extensions() -> Vec<String> {
    vec!["js".to_string(), "jsx".to_string()]
}

/// One or more shell commands to run as a pre/post bundling hook.
///
/// A scalar YAML value is a single command; a sequence is run in order. Any
/// other shape fails deserialization, which makes hook misuse fatal at
/// configuration time rather than at rebuild time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TaskList {
    /// A single shell command.
    Single(String),
    /// An ordered list of shell commands.
    Many(Vec<String>),
}

impl TaskList {
    /// The commands in execution order.
    pub fn commands(&self) -> &[String] {
        match self {
            Self::Single(command) => std::slice::from_ref(command),
            Self::Many(commands) => commands,
        }
    }
}

/// Properties of a single named bundle.
///
/// `src` and `dest` are required but kept optional at the serde layer so the
/// missing-property error can name the offending bundle instead of failing
/// the whole config parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleConfig {
    /// Source glob pattern, relative to `cwd` unless absolute.
    pub src: Option<String>,
    /// Destination path of the main bundle artifact.
    pub dest: Option<String>,
    /// Working directory for source resolution; defaults to the process cwd.
    pub cwd: Option<PathBuf>,
    /// Files (relative to the bundle base) excluded from scanning and packing.
    #[serde(default)]
    pub ignore_files: Vec<String>,
    /// Prefix prepended to every exposed module name.
    pub prefix: Option<String>,
    /// Whether this bundle participates in watch mode.
    #[serde(default)]
    pub watch: bool,
    /// Internal-reference extensions, tried in preference order.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Shell command hook(s) run before bundling.
    pub pre_tasks: Option<TaskList>,
    /// Shell command hook(s) run after bundling.
    pub post_tasks: Option<TaskList>,
    /// Explicit destination for the vendor artifact; defaults to
    /// `vendor-<name>.js` alongside `dest`.
    pub vendor_dest: Option<String>,
    /// Expose project files via `require` instead of `add`.
    #[serde(default)]
    pub use_require: bool,
    /// Prepend the vendor buffer to the main artifact instead of writing a
    /// separate vendor file.
    #[serde(default)]
    pub concat: bool,
}

impl BundleConfig {
    /// Verify the required `src`/`dest` properties, failing fast with a
    /// descriptive error naming the missing property and the bundle.
    pub fn verify_required(&self, bundle: &str) -> Result<(&str, &str)> {
        let src = self.src.as_deref().ok_or_else(|| {
            MundlerError::config_bundle("missing required property 'src'", bundle)
        })?;
        let dest = self.dest.as_deref().ok_or_else(|| {
            MundlerError::config_bundle("missing required property 'dest'", bundle)
        })?;
        Ok((src, dest))
    }

    /// The absolute base path all relative source paths resolve against.
    pub fn base_path(&self) -> PathBuf {
        match &self.cwd {
            Some(cwd) if cwd.is_absolute() => cwd.clone(),
            Some(cwd) => std::env::current_dir().unwrap_or_default().join(cwd),
            None => std::env::current_dir().unwrap_or_default(),
        }
    }

    /// The source glob resolved against the bundle base.
    pub fn resolved_src(&self, bundle: &str) -> Result<String> {
        let (src, _) = self.verify_required(bundle)?;
        if Path::new(src).is_absolute() {
            Ok(src.to_string())
        } else {
            Ok(self.base_path().join(src).to_string_lossy().into_owned())
        }
    }
}

/// Which bundles the CLI forces into watch mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WatchSelection {
    /// No CLI override; bundle-level `watch` flags apply as configured.
    #[default]
    None,
    /// Watch every bundle.
    All,
    /// Watch only the named bundles.
    Bundles(Vec<String>),
}

impl WatchSelection {
    /// Whether the override forces `bundle` into watch mode.
    pub fn forces(&self, bundle: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Bundles(names) => names.iter().any(|n| n == bundle),
        }
    }
}

/// The full mundler configuration: an ordered mapping of bundle name to
/// bundle properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MundlerConfig {
    /// Bundles in declaration order.
    #[serde(flatten)]
    pub bundles: IndexMap<String, BundleConfig>,
}

impl MundlerConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            MundlerError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| MundlerError::config(format!("{}: {e}", path.display())))?;
        debug!("Loaded {} bundle(s) from {}", config.bundles.len(), path.display());
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply the CLI watch override to the affected bundles.
    pub fn apply_watch_selection(&mut self, selection: &WatchSelection) {
        for (name, props) in self.bundles.iter_mut() {
            if selection.forces(name) {
                props.watch = true;
            }
        }
    }
}

/// Alias and shim tables sourced from the project manifest (`package.json`).
///
/// Aliases (`browser`) map a module name to a replacement file path and are
/// required into the vendor bundle under their alias. Shims
/// (`browserify-shim`) are configuration-level substitutes. Neither may ever
/// be treated as an ordinary external.
#[derive(Debug, Clone, Default)]
pub struct ProjectManifest {
    /// `browser` field: module name -> replacement path.
    pub aliases: IndexMap<String, String>,
    /// `browserify-shim` field: shimmed module names.
    pub shims: IndexSet<String>,
}

impl ProjectManifest {
    /// Load the manifest from a `package.json` path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MundlerError::io(format!("Failed to read manifest: {}", path.display()), e)
        })?;
        Self::from_json_str(&content)
    }

    /// Load the manifest, falling back to empty tables when the file is
    /// absent. A project without a manifest simply has no aliases or shims.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!("No usable project manifest ({e}), using empty alias/shim tables");
                Self::default()
            }
        }
    }

    /// Parse alias/shim tables out of manifest JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;

        let aliases = value
            .get("browser")
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let shims = value
            .get("browserify-shim")
            .and_then(|v| v.as_object())
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();

        Ok(Self { aliases, shims })
    }

    /// The union of alias and shim names, in manifest order.
    pub fn alias_and_shim_names(&self) -> IndexSet<String> {
        self.aliases
            .keys()
            .cloned()
            .chain(self.shims.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bundles_in_declaration_order() {
        let yaml = r#"
app:
  src: "app/**/*.js"
  dest: "dist/app.js"
admin:
  src: "admin/**/*.js"
  dest: "dist/admin.js"
"#;
        let config = MundlerConfig::from_yaml_str(yaml).unwrap();
        let names: Vec<&String> = config.bundles.keys().collect();
        assert_eq!(names, vec!["app", "admin"]);
    }

    #[test]
    fn missing_src_names_the_bundle() {
        let yaml = "app:\n  dest: \"dist/app.js\"\n";
        let config = MundlerConfig::from_yaml_str(yaml).unwrap();
        let err = config.bundles["app"].verify_required("app").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'src'"), "got: {message}");
        assert!(message.contains("'app'"), "got: {message}");
    }

    #[test]
    fn missing_dest_names_the_bundle() {
        let yaml = "admin:\n  src: \"admin/**/*.js\"\n";
        let config = MundlerConfig::from_yaml_str(yaml).unwrap();
        let err = config.bundles["admin"].verify_required("admin").unwrap_err();
        assert!(err.to_string().contains("'dest'"));
        assert!(err.to_string().contains("'admin'"));
    }

    #[test]
    fn camel_case_keys_round_trip() {
        let yaml = r#"
app:
  src: "app/**/*.js"
  dest: "dist/app.js"
  ignoreFiles:
    - "app/skip.js"
  vendorDest: "dist/vendor.js"
  useRequire: true
  preTasks: "npm run lint"
  postTasks:
    - "echo one"
    - "echo two"
"#;
        let config = MundlerConfig::from_yaml_str(yaml).unwrap();
        let props = &config.bundles["app"];
        assert_eq!(props.ignore_files, vec!["app/skip.js"]);
        assert_eq!(props.vendor_dest.as_deref(), Some("dist/vendor.js"));
        assert!(props.use_require);
        assert_eq!(
            props.pre_tasks.as_ref().unwrap().commands(),
            &["npm run lint".to_string()]
        );
        assert_eq!(props.post_tasks.as_ref().unwrap().commands().len(), 2);
    }

    #[test]
    fn malformed_task_hook_is_fatal_at_parse_time() {
        let yaml = "app:\n  src: \"a\"\n  dest: \"b\"\n  preTasks:\n    nested: true\n";
        assert!(MundlerConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn watch_selection_override() {
        let yaml = r#"
app:
  src: "a"
  dest: "b"
admin:
  src: "c"
  dest: "d"
"#;
        let mut config = MundlerConfig::from_yaml_str(yaml).unwrap();
        config.apply_watch_selection(&WatchSelection::Bundles(vec!["admin".to_string()]));
        assert!(!config.bundles["app"].watch);
        assert!(config.bundles["admin"].watch);

        config.apply_watch_selection(&WatchSelection::All);
        assert!(config.bundles["app"].watch);
    }

    #[test]
    fn manifest_alias_and_shim_tables() {
        let json = r#"{
            "name": "fixture",
            "browser": {"jquery": "./vendor/jquery-custom.js"},
            "browserify-shim": {"legacy": {"exports": "Legacy"}}
        }"#;
        let manifest = ProjectManifest::from_json_str(json).unwrap();
        assert_eq!(
            manifest.aliases.get("jquery").map(String::as_str),
            Some("./vendor/jquery-custom.js")
        );
        assert!(manifest.shims.contains("legacy"));

        let names = manifest.alias_and_shim_names();
        assert!(names.contains("jquery"));
        assert!(names.contains("legacy"));
    }

    #[test]
    fn manifest_without_tables_is_empty() {
        let manifest = ProjectManifest::from_json_str("{\"name\": \"x\"}").unwrap();
        assert!(manifest.aliases.is_empty());
        assert!(manifest.shims.is_empty());
    }

    #[test]
    fn default_extensions_prefer_js_then_jsx() {
        let yaml = "app:\n  src: \"a\"\n  dest: \"b\"\n";
        let config = MundlerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.bundles["app"].extensions, vec!["js", "jsx"]);
    }
}
