// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{Platform, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// triggered_while_running_behaviour = "queue"
/// debounce_ms = 100
///
/// [paths]
/// dest = "lib"
/// vendor = "vendor/**/*"
///
/// [scripts]
/// include = "src/**/*.coffee"
/// extension = "js"
/// cmd = "coffee --stdio --print --bare"
///
/// [styles]
/// include = "style/**/*.styl"
/// exclude = ["style/constants.styl"]
/// watch = "style/**/*.styl"
/// extension = "css"
/// cmd = "stylus --print"
/// ```
///
/// All sections are optional and default to the conventional project layout
/// above. This is the unvalidated form; see [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default = "PipelineSection::default_scripts")]
    pub scripts: PipelineSection,

    #[serde(default = "PipelineSection::default_styles")]
    pub styles: PipelineSection,

    #[serde(default)]
    pub test: TestSection,

    #[serde(default)]
    pub dist: DistSection,
}

/// Validated, immutable configuration.
///
/// Construct through `ConfigFile::try_from(raw)` (see `config::validate`) or
/// [`crate::config::load_and_validate`]. It is shared as `Arc<ConfigFile>` by
/// every task, pipeline and the watch engine.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    paths: PathsSection,
    scripts: PipelineSection,
    styles: PipelineSection,
    test: TestSection,
    dist: DistSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            paths: raw.paths,
            scripts: raw.scripts,
            styles: raw.styles,
            test: raw.test,
            dist: raw.dist,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn paths(&self) -> &PathsSection {
        &self.paths
    }

    pub fn scripts(&self) -> &PipelineSection {
        &self.scripts
    }

    pub fn styles(&self) -> &PipelineSection {
        &self.styles
    }

    pub fn test(&self) -> &TestSection {
        &self.test
    }

    pub fn dist(&self) -> &DistSection {
        &self.dist
    }
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            config: ConfigSection::default(),
            paths: PathsSection::default(),
            scripts: PipelineSection::default_scripts(),
            styles: PipelineSection::default_styles(),
            test: TestSection::default(),
            dist: DistSection::default(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[config]` section: engine behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` or `"cancel"`; what a watch subscription does when it is
    /// triggered while its previous invocation is still running.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued re-runs per watch subscription.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Quiet period used to coalesce bursts of filesystem events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of files a pipeline processes concurrently.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Ring the terminal bell on compile failures.
    #[serde(default = "default_true")]
    pub beep: bool,
}

fn default_queue_length() -> usize {
    1
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            debounce_ms: default_debounce_ms(),
            jobs: default_jobs(),
            beep: true,
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Destination root every pipeline and the vendor copy write into.
    #[serde(default = "default_dest")]
    pub dest: String,

    /// Directories removed by `clean`.
    #[serde(default = "default_clean")]
    pub clean: Vec<String>,

    /// Glob for vendor assets copied verbatim into `dest`.
    #[serde(default = "default_vendor")]
    pub vendor: String,
}

fn default_dest() -> String {
    "lib".to_string()
}

fn default_clean() -> Vec<String> {
    vec!["lib".to_string(), "build".to_string(), "cache".to_string()]
}

fn default_vendor() -> String {
    "vendor/**/*".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            dest: default_dest(),
            clean: default_clean(),
            vendor: default_vendor(),
        }
    }
}

/// `[scripts]` / `[styles]` sections: one compilation pipeline each.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Inclusion glob, relative to the project root.
    pub include: String,

    /// Exclusion globs.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Glob that triggers this pipeline in watch mode.
    ///
    /// If `None`, the pipeline's own include/exclude patterns are watched.
    #[serde(default)]
    pub watch: Option<String>,

    /// Output extension (without the dot); `None` keeps the source name.
    #[serde(default)]
    pub extension: Option<String>,

    /// Shell command that reads a source on stdin and prints the compiled
    /// text on stdout.
    pub cmd: String,

    /// Regex with `line` (and optionally `column`) named groups, matched
    /// against the compiler's stderr to locate a failure.
    #[serde(default = "default_location_pattern")]
    pub location_pattern: String,
}

fn default_location_pattern() -> String {
    r":(?P<line>\d+):(?P<column>\d+)".to_string()
}

impl PipelineSection {
    pub fn default_scripts() -> Self {
        Self {
            include: "src/**/*.coffee".to_string(),
            exclude: Vec::new(),
            watch: None,
            extension: Some("js".to_string()),
            cmd: "coffee --stdio --print --bare".to_string(),
            location_pattern: default_location_pattern(),
        }
    }

    pub fn default_styles() -> Self {
        Self {
            include: "style/**/*.styl".to_string(),
            exclude: vec!["style/constants.styl".to_string()],
            watch: Some("style/**/*.styl".to_string()),
            extension: Some("css".to_string()),
            cmd: "stylus --print".to_string(),
            location_pattern: default_location_pattern(),
        }
    }
}

/// `[test]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TestSection {
    #[serde(default = "default_test_include")]
    pub include: String,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Test runner command; matched test files are appended as arguments.
    #[serde(default = "default_test_cmd")]
    pub cmd: String,

    /// Extra environment for the runner.
    #[serde(default = "default_test_env")]
    pub env: BTreeMap<String, String>,
}

fn default_test_include() -> String {
    "test/**/*.coffee".to_string()
}

fn default_test_cmd() -> String {
    "mocha --reporter spec --compilers coffee:coffee-script/register".to_string()
}

fn default_test_env() -> BTreeMap<String, String> {
    BTreeMap::from([("NODE_ENV".to_string(), "test".to_string())])
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            include: default_test_include(),
            exclude: Vec::new(),
            cmd: default_test_cmd(),
            env: default_test_env(),
        }
    }
}

/// `[dist]` section: inputs of the distribution manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct DistSection {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_platforms")]
    pub platforms: Vec<Platform>,

    #[serde(default)]
    pub icon: Option<String>,

    /// Auxiliary files shipped next to the build output (e.g. `package.json`).
    #[serde(default = "default_aux_files")]
    pub files: Vec<String>,

    /// Directory the packager writes into; also holds the manifest.
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Archive file name produced inside `build_dir`.
    #[serde(default = "default_archive")]
    pub archive: String,

    /// Packager command. Receives the manifest path in `BUILDDAG_MANIFEST`.
    #[serde(default = "default_packager_cmd")]
    pub cmd: String,
}

fn default_app_name() -> String {
    "app".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_platforms() -> Vec<Platform> {
    vec![Platform::Osx64]
}

fn default_aux_files() -> Vec<String> {
    vec!["package.json".to_string()]
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_archive() -> String {
    "build.asar".to_string()
}

fn default_packager_cmd() -> String {
    "nwbuild --manifest \"$BUILDDAG_MANIFEST\"".to_string()
}

impl Default for DistSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_version(),
            platforms: default_platforms(),
            icon: None,
            files: default_aux_files(),
            build_dir: default_build_dir(),
            archive: default_archive(),
            cmd: default_packager_cmd(),
        }
    }
}
