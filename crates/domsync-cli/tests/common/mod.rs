#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use url::Url;

/// Run the CLI binary against an isolated queue directory.
pub fn run_cli(args: &[&str], queue_dir: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_domsync"));
    cmd.args(args);
    cmd.env("DOMSYNC_QUEUE_DIR", queue_dir);
    cmd.env_remove("DOMSYNC_REMOTE");
    cmd.env_remove("DOMSYNC_API_KEY");
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub fn run_cli_success(args: &[&str], queue_dir: &Path) -> String {
    let output = run_cli(args, queue_dir);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub fn run_cli_failure(args: &[&str], queue_dir: &Path) -> String {
    let output = run_cli(args, queue_dir);
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// A `file://` remote URL for a directory.
pub fn file_remote_url(path: &Path) -> String {
    Url::from_directory_path(path)
        .expect("Failed to convert path to file URL")
        .to_string()
}

/// Parse `list` output into JSON values.
pub fn listed(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("list output is JSON lines"))
        .collect()
}
