//! Stamps `DOMSYNC_VERSION` into the binary.
//!
//! Release tags look like `domsync-v0.3.1`. A build from a tagged commit
//! reports `0.3.1` and later commits report `0.3.1-4-gabc1234`. A dirty tree
//! gets a `-dirty` suffix. Outside a checkout the package version is used.

use std::process::Command;

const TAG_PREFIX: &str = "domsync-v";

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/tags");
    println!("cargo:rerun-if-env-changed=DOMSYNC_VERSION_OVERRIDE");

    let version = std::env::var("DOMSYNC_VERSION_OVERRIDE")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(describe)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=DOMSYNC_VERSION={}", version);
}

fn describe() -> Option<String> {
    let pattern = format!("{}*", TAG_PREFIX);
    let output = Command::new("git")
        .args(["describe", "--tags", "--dirty", "--match", &pattern])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    // No matching tag yet: fall back to the package version.
    described
        .strip_prefix(TAG_PREFIX)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
