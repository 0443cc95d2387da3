//! Stamps the binary with its commit, build time and cargo profile
//!
//! Exposed to the crate as `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE`
//! and printed in the startup banner.

use std::path::Path;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    stamp("GIT_HASH", commit().as_deref().unwrap_or(UNKNOWN));
    stamp("BUILD_TIMESTAMP", &build_time());
    stamp("BUILD_PROFILE", &std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.into()));

    // Re-stamp when the checked-out commit moves
    let head = Path::new("../.git/HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }
    println!("cargo:rerun-if-changed=build.rs");
}

fn stamp(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

/// Short commit id, None outside a git checkout
fn commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

fn build_time() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
