// tests/config_errors.rs

use std::io::Write;

use builddag::config::{load_and_validate, load_or_default};
use builddag::errors::BuildError;
use builddag::types::{Platform, TriggerWhileRunningBehaviour};
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn empty_file_yields_the_conventional_layout() {
    let file = config_file("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.paths().dest, "lib");
    assert_eq!(cfg.paths().vendor, "vendor/**/*");
    assert_eq!(cfg.scripts().include, "src/**/*.coffee");
    assert_eq!(cfg.scripts().extension.as_deref(), Some("js"));
    assert_eq!(cfg.styles().exclude, vec!["style/constants.styl".to_string()]);
    assert_eq!(cfg.test().env.get("NODE_ENV").map(String::as_str), Some("test"));
    assert_eq!(
        cfg.config_section().triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Queue
    );
}

#[test]
fn sections_override_defaults() {
    let file = config_file(
        r#"
[config]
triggered_while_running_behaviour = "cancel"
debounce_ms = 250
jobs = 3

[paths]
dest = "public"
clean = ["public"]

[scripts]
include = "app/**/*.coffee"
extension = "js"
cmd = "coffee -sp"

[dist]
name = "notes"
version = "1.2.0"
platforms = ["linux64", "win64"]
files = []
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(
        cfg.config_section().triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Cancel
    );
    assert_eq!(cfg.config_section().debounce_ms, 250);
    assert_eq!(cfg.config_section().jobs, 3);
    assert_eq!(cfg.paths().dest, "public");
    assert_eq!(cfg.paths().clean, vec!["public".to_string()]);
    assert_eq!(cfg.scripts().include, "app/**/*.coffee");
    // Untouched sections keep their defaults.
    assert_eq!(cfg.styles().include, "style/**/*.styl");
    assert_eq!(cfg.dist().platforms, vec![Platform::Linux64, Platform::Win64]);
    assert!(cfg.dist().files.is_empty());
}

#[test]
fn invalid_glob_is_a_pattern_error() {
    let file = config_file(
        r#"
[scripts]
include = "src/[unclosed"
cmd = "coffee -sp"
"#,
    );
    match load_and_validate(file.path()) {
        Err(BuildError::Pattern { pattern, .. }) => assert_eq!(pattern, "src/[unclosed"),
        other => panic!("expected Pattern error, got {other:?}"),
    }
}

#[test]
fn location_pattern_needs_a_line_group() {
    let file = config_file(
        r#"
[styles]
include = "style/**/*.styl"
cmd = "stylus --print"
location_pattern = ':(\d+):(\d+)'
"#,
    );
    match load_and_validate(file.path()) {
        Err(BuildError::ConfigError(msg)) => {
            assert!(msg.contains("[styles].location_pattern"));
            assert!(msg.contains("line"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn numeric_limits_and_platforms_are_checked() {
    for (toml, needle) in [
        ("[config]\nqueue_length = 0\n", "queue_length"),
        ("[config]\njobs = 0\n", "jobs"),
        ("[dist]\nplatforms = []\n", "platforms"),
        ("[scripts]\ninclude = \"src/*.coffee\"\ncmd = \"  \"\n", "[scripts].cmd"),
        ("[styles]\ninclude = \"a/*.styl\"\ncmd = \"stylus\"\nextension = \".css\"\n", "extension"),
    ] {
        let file = config_file(toml);
        match load_and_validate(file.path()) {
            Err(BuildError::ConfigError(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected ConfigError for {toml:?}, got {other:?}"),
        }
    }
}

#[test]
fn unknown_enum_values_fail_to_parse() {
    let file = config_file("[dist]\nplatforms = [\"amiga\"]\n");
    assert!(matches!(load_and_validate(file.path()), Err(BuildError::TomlError(_))));

    let file = config_file("[config]\ntriggered_while_running_behaviour = \"restart\"\n");
    assert!(matches!(load_and_validate(file.path()), Err(BuildError::TomlError(_))));
}

#[test]
fn explicit_missing_config_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Other.toml");
    assert!(matches!(load_or_default(&missing), Err(BuildError::IoError(_))));
}
