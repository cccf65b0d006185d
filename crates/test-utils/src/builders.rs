#![allow(dead_code)]

use builddag::config::{ConfigFile, PipelineSection, RawConfigFile};
use builddag::types::TriggerWhileRunningBehaviour;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with `jobs = 2` and the bell disabled.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.config.jobs = 2;
        config.config.beep = false;
        Self { config }
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.config.paths.dest = dest.to_string();
        self
    }

    pub fn vendor(mut self, pattern: &str) -> Self {
        self.config.paths.vendor = pattern.to_string();
        self
    }

    pub fn clean(mut self, dirs: &[&str]) -> Self {
        self.config.paths.clean = dirs.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn scripts(mut self, section: PipelineSection) -> Self {
        self.config.scripts = section;
        self
    }

    pub fn styles(mut self, section: PipelineSection) -> Self {
        self.config.styles = section;
        self
    }

    pub fn test_include(mut self, pattern: &str) -> Self {
        self.config.test.include = pattern.to_string();
        self
    }

    pub fn behaviour(mut self, behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self.config.config.queue_length = queue_length;
        self
    }

    pub fn aux_files(mut self, files: &[&str]) -> Self {
        self.config.dist.files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline section with the given include glob and output extension.
pub fn pipeline_section(include: &str, extension: Option<&str>) -> PipelineSection {
    PipelineSection {
        include: include.to_string(),
        exclude: Vec::new(),
        watch: None,
        extension: extension.map(str::to_string),
        cmd: "cat".to_string(),
        location_pattern: r":(?P<line>\d+):(?P<column>\d+)".to_string(),
    }
}
