//! Shared test infrastructure for integration tests.

use serde_json::{json, Value};
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Captured output of one `catadmin` invocation.
#[derive(Debug)]
pub struct RunOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run the binary with an isolated config dir so user rules never leak in.
pub fn run_catadmin(args: &[&str]) -> RunOutput {
    let config_home = tempfile::tempdir().expect("create config home");
    run_catadmin_with_config(config_home.path(), args)
}

/// Run the binary with `config_home` as both `XDG_CONFIG_HOME` and `HOME`.
pub fn run_catadmin_with_config(config_home: &Path, args: &[&str]) -> RunOutput {
    let output = Command::new(env!("CARGO_BIN_EXE_catadmin"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("CATADMIN_TOKEN")
        .output()
        .expect("run catadmin");
    RunOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

pub fn write_json(path: &Path, value: &Value) {
    let text = serde_json::to_string_pretty(value).expect("serialize fixture");
    std::fs::write(path, text).expect("write fixture");
}

/// A small catalog schema in the shape produced by discovery.
pub fn catalog_schema() -> Value {
    let string = "http://www.w3.org/2001/XMLSchema#string";
    json!({
        "entrypoint": "https://catalog.example.org",
        "title": "Manuscript catalog",
        "resources": [
            {"name": "works", "fields": [
                {"name": "title", "range": string},
                {"name": "summary", "range": string},
                {"name": "pages", "range": "http://www.w3.org/2001/XMLSchema#integer"}
            ]},
            {"name": "other", "fields": [
                {"name": "label", "range": string}
            ]},
            {"name": "people", "fields": [
                {"name": "name", "range": string},
                {"name": "dateBirth", "range": string},
                {"name": "nicknames", "range": string}
            ]}
        ]
    })
}
